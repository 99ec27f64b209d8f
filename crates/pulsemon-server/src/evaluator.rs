//! Result evaluator: turns a raw execution outcome into a persisted
//! [`MonitorResult`].
//!
//! Pipeline per outcome: fetch the immediately preceding result → compute
//! status-change and failure counters → let the alert engine decide →
//! finalize `alerts_sent_for_failure` → persist result + monitor status in
//! one transaction → hand alert decisions to the delivery collaborator.
//! Counters are finalized before the insert because result rows are
//! append-only.

use anyhow::Result;
use chrono::Utc;
use pulsemon_alert::{AlertDecision, AlertEngine};
use pulsemon_common::types::{
    AlertEventKind, CheckStatus, ExecutionOutcome, Monitor, MonitorResult, MonitorStatus,
};
use pulsemon_notify::NotificationDispatcher;
use pulsemon_storage::MonitorStore;
use std::sync::{Arc, Mutex};

pub struct ResultEvaluator {
    store: Arc<MonitorStore>,
    alert_engine: Mutex<AlertEngine>,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl ResultEvaluator {
    pub fn new(store: Arc<MonitorStore>, notifier: Arc<dyn NotificationDispatcher>) -> Self {
        Self {
            store,
            alert_engine: Mutex::new(AlertEngine::new()),
            notifier,
        }
    }

    /// Evaluates and persists one outcome, then dispatches any alerts.
    /// Returns the persisted result.
    pub async fn process(
        &self,
        monitor: &Monitor,
        outcome: ExecutionOutcome,
    ) -> Result<MonitorResult> {
        let now = Utc::now();
        let previous = self.store.latest_result(&monitor.id).await?;

        let is_up = outcome.status.is_up();
        let prev_up = previous.as_ref().map(|p| p.is_up);
        let is_status_change = prev_up.is_some_and(|p| p != is_up);

        let (consecutive_failure_count, carried_alerts) = if is_up {
            (0, 0)
        } else {
            let prev_failing = previous.as_ref().filter(|p| !p.is_up);
            (
                prev_failing.map_or(0, |p| p.consecutive_failure_count) + 1,
                prev_failing.map_or(0, |p| p.alerts_sent_for_failure),
            )
        };

        let mut result = MonitorResult {
            id: pulsemon_common::id::next_id(),
            monitor_id: monitor.id.clone(),
            checked_at: now,
            status: outcome.status,
            response_time_ms: outcome.elapsed_ms,
            details: outcome.detail,
            is_up,
            is_status_change,
            consecutive_failure_count,
            alerts_sent_for_failure: carried_alerts,
            created_at: now,
        };

        let decisions = {
            let mut engine = self.alert_engine.lock().unwrap_or_else(|p| p.into_inner());
            engine.decide(monitor, &result, previous.as_ref(), now)
        };
        if decisions
            .iter()
            .any(|d| d.kind == AlertEventKind::Failure)
        {
            result.alerts_sent_for_failure += 1;
        }

        // A monitor in maintenance keeps checking but holds its displayed
        // status until maintenance is lifted.
        let new_status = if monitor.status == MonitorStatus::Maintenance {
            MonitorStatus::Maintenance
        } else {
            match outcome.status {
                CheckStatus::Up => MonitorStatus::Up,
                CheckStatus::Down | CheckStatus::Timeout => MonitorStatus::Down,
                CheckStatus::Error => MonitorStatus::Error,
            }
        };
        self.store
            .insert_result_and_update_monitor(&result, new_status)
            .await?;

        if is_status_change {
            tracing::info!(
                monitor_id = %monitor.id,
                status = %result.status,
                "Monitor status changed"
            );
        }

        self.dispatch(monitor, &result, &decisions).await;
        Ok(result)
    }

    async fn dispatch(&self, monitor: &Monitor, result: &MonitorResult, decisions: &[AlertDecision]) {
        for decision in decisions {
            tracing::info!(
                monitor_id = %monitor.id,
                event = %decision.kind,
                message = %decision.message,
                "Dispatching alert"
            );
            if let Err(e) = self
                .notifier
                .notify(
                    &monitor.alert_config.provider_ids,
                    decision.kind,
                    monitor,
                    result,
                )
                .await
            {
                tracing::error!(
                    monitor_id = %monitor.id,
                    event = %decision.kind,
                    error = %e,
                    "Alert dispatch failed"
                );
            }
        }
    }
}
