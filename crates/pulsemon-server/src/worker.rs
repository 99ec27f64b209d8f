//! Execution worker: consumes jobs from the queue under a bounded pool.
//!
//! For each job: resolve the monitor (missing or disabled → drop, no
//! error), compute the absolute deadline from the type-specific timeout,
//! run the matching executor — fanned out per location when configured —
//! and hand the outcome to the evaluator. Executor panics become `error`
//! outcomes; transient network failures are re-enqueued with exponential
//! backoff up to the attempt cap. Nothing that happens in here may take the
//! worker loop down.

use pulsemon_common::types::{
    CheckStatus, ExecutionJob, ExecutionOutcome, Monitor, MonitorConfig, MonitorStatus,
};
use pulsemon_probe::{CheckError, CheckOptions, Prober};
use pulsemon_storage::MonitorStore;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::evaluator::ResultEvaluator;
use crate::location;
use crate::queue::ExecutionQueue;

/// Grace added to the outer watchdog past the executor's own deadline, so
/// the executor's timeout outcome wins unless the task is wedged outright.
const WATCHDOG_GRACE: Duration = Duration::from_secs(2);

/// Runs one check inside its own task so an executor panic is contained
/// and converted, never propagated into the worker, and an outright hang is
/// cancelled shortly after the deadline with the elapsed time recorded.
async fn run_guarded(
    prober: Arc<Prober>,
    monitor: &Monitor,
    timeout: Duration,
    opts: CheckOptions,
) -> Result<ExecutionOutcome, CheckError> {
    let deadline = Instant::now() + timeout;
    let monitor_type = monitor.monitor_type;
    let target = monitor.target.clone();
    let config = monitor.config.clone();
    let started = Instant::now();

    let handle = tokio::spawn(async move {
        prober
            .run_check(monitor_type, &target, &config, deadline, opts)
            .await
    });

    match tokio::time::timeout_at(deadline + WATCHDOG_GRACE, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => {
            if join_err.is_panic() {
                tracing::error!(
                    monitor_id = %monitor.id,
                    "Check executor panicked; recording error outcome"
                );
            } else {
                tracing::error!(monitor_id = %monitor.id, "Check task cancelled unexpectedly");
            }
            Ok(ExecutionOutcome::new(
                CheckStatus::Error,
                started.elapsed().as_millis() as u64,
                serde_json::json!({
                    "error_kind": "executor_failure",
                    "reason": "check executor aborted",
                }),
            ))
        }
        Err(_) => Ok(ExecutionOutcome::new(
            CheckStatus::Timeout,
            started.elapsed().as_millis() as u64,
            serde_json::json!({"reason": "check exceeded its deadline and was cancelled"}),
        )),
    }
}

pub struct ExecutionWorker {
    store: Arc<MonitorStore>,
    prober: Arc<Prober>,
    evaluator: Arc<ResultEvaluator>,
    queue: ExecutionQueue,
    semaphore: Arc<Semaphore>,
    engine: EngineConfig,
}

impl ExecutionWorker {
    pub fn new(
        store: Arc<MonitorStore>,
        prober: Arc<Prober>,
        evaluator: Arc<ResultEvaluator>,
        queue: ExecutionQueue,
        engine: EngineConfig,
    ) -> Self {
        let capacity = engine.worker_capacity.max(1);
        Self {
            store,
            prober,
            evaluator,
            queue,
            semaphore: Arc::new(Semaphore::new(capacity)),
            engine,
        }
    }

    /// Drains the queue until it closes. Jobs beyond the pool capacity wait
    /// here for a permit (backpressure, not rejection).
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<ExecutionJob>) {
        tracing::info!(
            capacity = self.engine.worker_capacity,
            "Execution worker started"
        );
        while let Some(job) = rx.recv().await {
            let permit = match self.semaphore.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => break, // semaphore closed on shutdown
            };
            let worker = self.clone();
            tokio::spawn(async move {
                worker.handle_job(job).await;
                drop(permit);
            });
        }
        tracing::info!("Execution worker stopped (queue closed)");
    }

    pub async fn handle_job(&self, job: ExecutionJob) {
        let monitor = match self.store.get_monitor(&job.monitor_id).await {
            Ok(Some(m)) => m,
            Ok(None) => {
                tracing::debug!(monitor_id = %job.monitor_id, "Dropping job for deleted monitor");
                return;
            }
            Err(e) => {
                tracing::error!(monitor_id = %job.monitor_id, error = %e, "Failed to load monitor");
                return;
            }
        };
        if !monitor.enabled || monitor.status == MonitorStatus::Paused {
            tracing::debug!(monitor_id = %monitor.id, "Dropping job for disabled/paused monitor");
            return;
        }

        let timeout_secs = monitor
            .config
            .explicit_timeout_secs()
            .unwrap_or_else(|| self.engine.default_timeout_secs(monitor.monitor_type));
        let timeout = Duration::from_secs(timeout_secs.max(1));

        let outcome = match monitor.fan_out_locations() {
            Some(lc) => {
                let locations = lc.locations.clone();
                Ok(self.run_fan_out(&monitor, &locations, timeout).await)
            }
            None => {
                let opts = CheckOptions {
                    inspect_tls: self.tls_inspection_due(&monitor).await,
                };
                run_guarded(self.prober.clone(), &monitor, timeout, opts).await
            }
        };

        match outcome {
            Ok(outcome) => {
                if let Err(e) = self.evaluator.process(&monitor, outcome).await {
                    tracing::error!(monitor_id = %monitor.id, error = %e, "Failed to evaluate outcome");
                }
            }
            Err(err) if err.is_retryable() && job.attempt + 1 < self.engine.max_attempts => {
                let backoff =
                    Duration::from_millis(self.engine.retry_base_ms * 2u64.pow(job.attempt));
                tracing::warn!(
                    monitor_id = %monitor.id,
                    attempt = job.attempt + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "Transient failure, re-enqueueing with backoff"
                );
                let queue = self.queue.clone();
                let retry = job.retry();
                tokio::spawn(async move {
                    tokio::time::sleep(backoff).await;
                    if let Err(e) = queue.enqueue(retry).await {
                        tracing::error!(error = %e, "Failed to re-enqueue retry job");
                    }
                });
            }
            Err(err) => {
                // Attempts exhausted or not retryable: record per taxonomy.
                let outcome = err.to_outcome(0);
                if let Err(e) = self.evaluator.process(&monitor, outcome).await {
                    tracing::error!(monitor_id = %monitor.id, error = %e, "Failed to evaluate error outcome");
                }
            }
        }
    }

    /// Fans the executor out to every configured location concurrently and
    /// aggregates once all locations settle — one slow location delays only
    /// the aggregate, not the other probes. Per-location failures convert
    /// to down outcomes (a location that errors counts as down, not as
    /// absent), so fan-out runs are never retried as a whole.
    async fn run_fan_out(
        &self,
        monitor: &Monitor,
        locations: &[String],
        timeout: Duration,
    ) -> ExecutionOutcome {
        let inspect_tls = self.tls_inspection_due(monitor).await;
        let mut handles = Vec::with_capacity(locations.len());
        for location in locations {
            let prober = self.prober.clone();
            let probe_monitor = monitor.clone();
            let location = location.clone();
            let opts = CheckOptions { inspect_tls };
            handles.push(tokio::spawn(async move {
                let outcome = match run_guarded(prober, &probe_monitor, timeout, opts).await {
                    Ok(outcome) => outcome,
                    Err(err) => err.to_outcome(0),
                };
                (location, outcome)
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(pair) => outcomes.push(pair),
                Err(e) => {
                    tracing::error!(monitor_id = %monitor.id, error = %e, "Location probe task failed");
                }
            }
        }

        let config = monitor
            .fan_out_locations()
            .expect("fan_out called with location config present");
        location::aggregate(&outcomes, config)
    }

    /// Whether the website TLS inspection is due on this tick, based on the
    /// stored summary of the previous result and the SSL-specific interval.
    async fn tls_inspection_due(&self, monitor: &Monitor) -> bool {
        let MonitorConfig::Website(cfg) = &monitor.config else {
            return false;
        };
        if !cfg.check_tls {
            return false;
        }
        let previous = match self.store.latest_result(&monitor.id).await {
            Ok(prev) => prev,
            Err(e) => {
                tracing::debug!(monitor_id = %monitor.id, error = %e, "Could not load previous result");
                None
            }
        };
        let prev_summary =
            previous.and_then(|p| pulsemon_probe::website::tls_summary_from_detail(&p.details));
        pulsemon_probe::website::ssl_check_due(
            prev_summary.as_ref(),
            cfg.ssl_check_interval_secs,
            monitor.alert_config.ssl_days_until_expiration_warning,
            chrono::Utc::now(),
        )
    }
}
