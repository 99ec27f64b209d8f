use chrono::{DateTime, NaiveDate, Utc};
use pulsemon_common::types::{
    AlertEventKind, CheckStatus, Monitor, MonitorResult, MonitorStatus,
};
use std::collections::HashMap;

/// Hard cap on failure alerts per incident (failure streak).
pub const MAX_ALERTS_PER_INCIDENT: u32 = 3;

/// One notification the engine has decided to emit. `message` is the
/// human-readable summary logged alongside the dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDecision {
    pub kind: AlertEventKind,
    pub message: String,
}

/// Whether this tick is a failure-alert tick.
///
/// Alert k (1-based) fires exactly when the consecutive failure count
/// reaches `k × failure_threshold`, for k up to
/// [`MAX_ALERTS_PER_INCIDENT`].
///
/// # Examples
///
/// ```
/// use pulsemon_alert::failure_alert_due;
///
/// // threshold 3: alerts at 3, 6 and 9 consecutive failures, nowhere else
/// assert!(failure_alert_due(3, 3, 0));
/// assert!(!failure_alert_due(4, 3, 1));
/// assert!(failure_alert_due(6, 3, 1));
/// assert!(failure_alert_due(9, 3, 2));
/// assert!(!failure_alert_due(12, 3, 3));
/// ```
pub fn failure_alert_due(consecutive_failures: u32, failure_threshold: u32, alerts_sent: u32) -> bool {
    failure_threshold >= 1
        && alerts_sent < MAX_ALERTS_PER_INCIDENT
        && consecutive_failures == failure_threshold * (alerts_sent + 1)
}

/// Per-process alert decision engine.
///
/// Failure/recovery state lives in the result rows; the only in-memory
/// state is the per-monitor day of the last SSL-expiry alert, which backs
/// the once-per-calendar-day rate limit.
pub struct AlertEngine {
    last_ssl_alert: HashMap<String, NaiveDate>,
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertEngine {
    pub fn new() -> Self {
        Self {
            last_ssl_alert: HashMap::new(),
        }
    }

    /// Evaluates a candidate result (counters computed, not yet persisted)
    /// against the monitor's alert config and the previous result.
    ///
    /// The caller increments `alerts_sent_for_failure` on the candidate
    /// before persisting when a `Failure` decision is returned, keeping
    /// result rows append-only.
    pub fn decide(
        &mut self,
        monitor: &Monitor,
        candidate: &MonitorResult,
        previous: Option<&MonitorResult>,
        now: DateTime<Utc>,
    ) -> Vec<AlertDecision> {
        let cfg = &monitor.alert_config;
        if !cfg.enabled {
            return Vec::new();
        }
        if monitor.is_muted(now) || monitor.status == MonitorStatus::Maintenance {
            tracing::debug!(
                monitor_id = %monitor.id,
                "Alert suppressed (muted or in maintenance)"
            );
            return Vec::new();
        }

        let mut decisions = Vec::new();

        if !candidate.is_up {
            // Timeouts have their own opt-out; down/error follow the
            // failure flag.
            let wanted = match candidate.status {
                CheckStatus::Timeout => cfg.alert_on_timeout,
                _ => cfg.alert_on_failure,
            };
            if wanted
                && failure_alert_due(
                    candidate.consecutive_failure_count,
                    cfg.failure_threshold,
                    candidate.alerts_sent_for_failure,
                )
            {
                decisions.push(AlertDecision {
                    kind: AlertEventKind::Failure,
                    message: format!(
                        "Monitor '{}' ({}) is {} after {} consecutive failed checks",
                        monitor.name,
                        monitor.target,
                        candidate.status,
                        candidate.consecutive_failure_count,
                    ),
                });
            }
        } else if candidate.is_status_change
            && cfg.alert_on_recovery
            && previous.is_some_and(|p| p.alerts_sent_for_failure > 0)
        {
            decisions.push(AlertDecision {
                kind: AlertEventKind::Recovery,
                message: format!(
                    "Monitor '{}' ({}) recovered after {} failed checks",
                    monitor.name,
                    monitor.target,
                    previous.map_or(0, |p| p.consecutive_failure_count),
                ),
            });
        }

        // SSL expiry is evaluated independently of up/down, rate-limited to
        // one alert per calendar day per monitor.
        if cfg.alert_on_ssl_expiration {
            if let Some(days) = candidate
                .details
                .get("tls")
                .and_then(|tls| tls.get("days_remaining"))
                .and_then(|d| d.as_i64())
            {
                if days <= cfg.ssl_days_until_expiration_warning {
                    let today = now.date_naive();
                    let already_sent_today = self
                        .last_ssl_alert
                        .get(&monitor.id)
                        .is_some_and(|day| *day == today);
                    if already_sent_today {
                        tracing::debug!(
                            monitor_id = %monitor.id,
                            "SSL-expiry alert suppressed (already sent today)"
                        );
                    } else {
                        self.last_ssl_alert.insert(monitor.id.clone(), today);
                        decisions.push(AlertDecision {
                            kind: AlertEventKind::SslExpiring,
                            message: if days <= 0 {
                                format!(
                                    "Certificate for '{}' ({}) has expired",
                                    monitor.name, monitor.target,
                                )
                            } else {
                                format!(
                                    "Certificate for '{}' ({}) expires in {} days",
                                    monitor.name, monitor.target, days,
                                )
                            },
                        });
                    }
                }
            }
        }

        decisions
    }
}
