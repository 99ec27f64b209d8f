//! Check executors for every monitor type.
//!
//! Each executor is a pure async function
//! `(target, config, deadline) → ExecutionOutcome` dispatched through
//! [`Prober`]. Elapsed time is measured with a monotonic clock regardless of
//! outcome, including timeouts. The [`validator::TargetValidator`] gates
//! every network call before it is issued.

pub mod http;
pub mod ping;
pub mod port;
pub mod synthetic;
pub mod validator;
pub mod website;

use std::sync::Arc;
use std::time::Duration;

use pulsemon_common::types::{CheckStatus, ExecutionOutcome, MonitorConfig, MonitorType};
use tokio::time::Instant;

use crate::synthetic::TestRunner;
use crate::validator::TargetValidator;

/// Executor-level failure taxonomy. Only `TransientNetwork` is retryable;
/// everything else surfaces immediately as a result.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// Bad target or config. Never retried.
    #[error("invalid target or config: {0}")]
    Validation(String),

    /// The SSRF/injection guard rejected the target. Never retried.
    #[error("target rejected by security policy: {0}")]
    SecurityRejection(String),

    /// Connection refused/reset and similar. Retried with backoff up to the
    /// attempt cap.
    #[error("transient network failure: {0}")]
    TransientNetwork(String),

    /// Deadline exceeded. Recorded as a timeout result, not retried within
    /// the same tick.
    #[error("deadline exceeded after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// Synthetic test-runner failure. Treated as a down result with the
    /// original error preserved in the detail payload.
    #[error("test runner failure: {0}")]
    Runner(String),
}

impl CheckError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckError::TransientNetwork(_))
    }

    /// Converts the error into the outcome the worker records once retries
    /// are exhausted (or immediately, for non-retryable errors).
    pub fn to_outcome(&self, elapsed_ms: u64) -> ExecutionOutcome {
        let (status, kind) = match self {
            CheckError::Validation(_) => (CheckStatus::Error, "validation"),
            CheckError::SecurityRejection(_) => (CheckStatus::Error, "security_rejection"),
            CheckError::TransientNetwork(_) => (CheckStatus::Down, "transient_network"),
            CheckError::Timeout { elapsed_ms } => {
                return ExecutionOutcome::new(
                    CheckStatus::Timeout,
                    *elapsed_ms,
                    serde_json::json!({"error_kind": "timeout", "reason": self.to_string()}),
                )
            }
            CheckError::Runner(_) => (CheckStatus::Down, "runner"),
        };
        ExecutionOutcome::new(
            status,
            elapsed_ms,
            serde_json::json!({"error_kind": kind, "reason": self.to_string()}),
        )
    }
}

/// Per-call execution options decided by the worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOptions {
    /// Whether the website executor should inspect the TLS certificate on
    /// this tick (the SSL-specific interval may throttle it).
    pub inspect_tls: bool,
}

/// Dispatches a check to the executor matching the monitor type. Owns the
/// shared HTTP client, the target validator, and the test-runner
/// collaborator.
pub struct Prober {
    client: reqwest::Client,
    validator: TargetValidator,
    runner: Arc<dyn TestRunner>,
    body_snippet_max: usize,
}

impl Prober {
    pub fn new(
        validator: TargetValidator,
        runner: Arc<dyn TestRunner>,
        body_snippet_max: usize,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pulsemon/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            validator,
            runner,
            body_snippet_max,
        })
    }

    pub fn validator(&self) -> &TargetValidator {
        &self.validator
    }

    /// Runs the type-specific check. The config variant must match the
    /// monitor type; a mismatch is a validation error, not a panic.
    pub async fn run_check(
        &self,
        monitor_type: MonitorType,
        target: &str,
        config: &MonitorConfig,
        deadline: Instant,
        opts: CheckOptions,
    ) -> Result<ExecutionOutcome, CheckError> {
        match (monitor_type, config) {
            (MonitorType::HttpRequest, MonitorConfig::HttpRequest(cfg)) => {
                http::execute(
                    &self.client,
                    &self.validator,
                    target,
                    cfg,
                    deadline,
                    self.body_snippet_max,
                )
                .await
            }
            (MonitorType::Website, MonitorConfig::Website(cfg)) => {
                website::execute(
                    &self.client,
                    &self.validator,
                    target,
                    cfg,
                    deadline,
                    self.body_snippet_max,
                    opts.inspect_tls,
                )
                .await
            }
            (MonitorType::PingHost, MonitorConfig::PingHost(cfg)) => {
                ping::execute(&self.validator, target, cfg, deadline).await
            }
            (MonitorType::PortCheck, MonitorConfig::PortCheck(cfg)) => {
                port::execute(&self.validator, target, cfg, deadline).await
            }
            (MonitorType::SyntheticTest, MonitorConfig::SyntheticTest(cfg)) => {
                synthetic::execute(self.runner.as_ref(), cfg, deadline).await
            }
            (t, c) => Err(CheckError::Validation(format!(
                "config variant {} does not match monitor type {t}",
                c.monitor_type()
            ))),
        }
    }
}

/// Time left until the absolute deadline; zero once it has passed.
pub(crate) fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Truncate to at most `max` characters (not bytes), so multi-byte
/// characters are never split.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect()
}
