//! Recurring-job registry: one repeating entry per enabled monitor.
//!
//! The registry is an explicit struct constructed once per process and
//! shared by reference with the API layer and the worker — never ambient
//! global state. Each entry is a tokio task ticking at the monitor's
//! frequency and enqueueing exactly one execution job per tick. Ticks
//! return as soon as the job is enqueued; execution happens on the worker
//! pool.

use anyhow::Result;
use pulsemon_common::types::{ExecutionJob, Monitor};
use pulsemon_storage::MonitorStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::queue::ExecutionQueue;

struct ScheduleEntry {
    job_id: String,
    frequency_secs: u64,
    handle: JoinHandle<()>,
}

pub struct MonitorScheduler {
    entries: Mutex<HashMap<String, ScheduleEntry>>,
    queue: ExecutionQueue,
    store: Arc<MonitorStore>,
}

impl MonitorScheduler {
    pub fn new(queue: ExecutionQueue, store: Arc<MonitorStore>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            queue,
            store,
        }
    }

    /// Registers (or replaces) the recurring entry for a monitor and stamps
    /// the new job id onto the row. Idempotent: re-scheduling an existing
    /// monitor replaces its prior entry without producing duplicate ticks.
    pub async fn schedule(&self, monitor: &Monitor) -> Result<String> {
        let job_id = pulsemon_common::id::next_id();
        let frequency = monitor.frequency_secs.max(1);
        let handle = tokio::spawn(run_schedule_loop(
            monitor.id.clone(),
            frequency,
            self.queue.clone(),
        ));

        let replaced = {
            let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
            entries.insert(
                monitor.id.clone(),
                ScheduleEntry {
                    job_id: job_id.clone(),
                    frequency_secs: frequency,
                    handle,
                },
            )
        };
        if let Some(old) = replaced {
            old.handle.abort();
            tracing::debug!(
                monitor_id = %monitor.id,
                old_job_id = %old.job_id,
                "Replaced existing schedule entry"
            );
        }

        self.store
            .set_scheduled_job_id(&monitor.id, Some(job_id.clone()))
            .await?;

        tracing::info!(
            monitor_id = %monitor.id,
            job_id = %job_id,
            frequency_secs = frequency,
            "Monitor scheduled"
        );
        Ok(job_id)
    }

    /// Removes the recurring entry. Must be called synchronously with every
    /// disable/pause/delete: an orphaned entry firing after deletion is a
    /// correctness bug.
    pub async fn unschedule(&self, monitor_id: &str) -> Result<()> {
        let removed = {
            let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
            entries.remove(monitor_id)
        };
        if let Some(entry) = removed {
            entry.handle.abort();
            tracing::info!(monitor_id = %monitor_id, job_id = %entry.job_id, "Monitor unscheduled");
        }
        // Clear the handle even when no in-memory entry existed (e.g. after
        // a restart); a deleted row is simply gone by now.
        let _ = self.store.set_scheduled_job_id(monitor_id, None).await;
        Ok(())
    }

    /// Enqueues an immediate one-off execution, independent of the
    /// recurring entry.
    pub async fn trigger_now(&self, monitor_id: &str) -> Result<()> {
        self.queue.enqueue(ExecutionJob::new(monitor_id)).await
    }

    /// Rebuilds every repeating entry for enabled, non-paused monitors from
    /// durable state. Called at process start; the registry itself is not
    /// persisted authoritatively anywhere else.
    pub async fn reload_all(&self) -> Result<usize> {
        let monitors = self.store.list_schedulable_monitors().await?;
        let mut count = 0usize;
        for monitor in &monitors {
            if let Err(e) = self.schedule(monitor).await {
                tracing::error!(monitor_id = %monitor.id, error = %e, "Failed to reschedule monitor");
            } else {
                count += 1;
            }
        }
        tracing::info!(count, "Scheduler registry rebuilt");
        Ok(count)
    }

    pub fn entry_count(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .len()
    }

    pub fn entry_frequency(&self, monitor_id: &str) -> Option<u64> {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(monitor_id)
            .map(|e| e.frequency_secs)
    }

    /// Aborts every entry. Used on shutdown.
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        for (_, entry) in entries.drain() {
            entry.handle.abort();
        }
    }
}

impl Drop for MonitorScheduler {
    fn drop(&mut self) {
        self.clear();
    }
}

/// The per-monitor tick loop. The first tick fires immediately, so a newly
/// scheduled or updated monitor gets checked right away.
async fn run_schedule_loop(monitor_id: String, frequency_secs: u64, queue: ExecutionQueue) {
    let mut tick = interval(Duration::from_secs(frequency_secs));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tick.tick().await;
        if let Err(e) = queue.enqueue(ExecutionJob::new(monitor_id.clone())).await {
            tracing::error!(monitor_id = %monitor_id, error = %e, "Failed to enqueue execution job");
        }
    }
}
