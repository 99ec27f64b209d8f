//! Synthetic-test executor: loads a stored script by reference, hands it to
//! the external test-runner collaborator, and maps its pass/fail verdict to
//! up/down. The runner's execution id and report location are captured in
//! the result detail for later retrieval.

use async_trait::async_trait;
use pulsemon_common::types::{CheckStatus, ExecutionOutcome, SyntheticTestConfig};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::Instant;

use crate::{elapsed_ms, remaining, CheckError};

/// Lines of runner log output preserved in the result detail.
const LOG_TAIL_LINES: usize = 20;

/// Verdict returned by the external browser-automation runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptRunReport {
    pub passed: bool,
    pub execution_id: String,
    #[serde(default)]
    pub report_url: Option<String>,
    #[serde(default)]
    pub logs: Vec<String>,
}

/// External test-runner collaborator. The engine only invokes it and
/// consumes the pass/fail verdict plus report artifact.
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run_script(&self, script_ref: &str) -> anyhow::Result<ScriptRunReport>;
}

/// Default runner transport: POSTs the script reference to a configured
/// runner endpoint and decodes the report from its JSON response.
pub struct HttpTestRunner {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTestRunner {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl TestRunner for HttpTestRunner {
    async fn run_script(&self, script_ref: &str) -> anyhow::Result<ScriptRunReport> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({"script_ref": script_ref}))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

/// Stand-in used when no runner endpoint is configured; synthetic monitors
/// then record a runner error instead of silently passing.
pub struct UnconfiguredRunner;

#[async_trait]
impl TestRunner for UnconfiguredRunner {
    async fn run_script(&self, _script_ref: &str) -> anyhow::Result<ScriptRunReport> {
        anyhow::bail!("no test runner endpoint configured")
    }
}

pub(crate) async fn execute(
    runner: &dyn TestRunner,
    config: &SyntheticTestConfig,
    deadline: Instant,
) -> Result<ExecutionOutcome, CheckError> {
    let started = Instant::now();
    match tokio::time::timeout(remaining(deadline), runner.run_script(&config.script_ref)).await {
        Err(_) => Ok(ExecutionOutcome::new(
            CheckStatus::Timeout,
            elapsed_ms(started),
            json!({
                "script_ref": config.script_ref,
                "reason": "test runner did not finish before deadline",
            }),
        )),
        Ok(Err(e)) => Err(CheckError::Runner(e.to_string())),
        Ok(Ok(report)) => {
            let status = if report.passed {
                CheckStatus::Up
            } else {
                CheckStatus::Down
            };
            let log_tail: Vec<&String> = report
                .logs
                .iter()
                .rev()
                .take(LOG_TAIL_LINES)
                .rev()
                .collect();
            Ok(ExecutionOutcome::new(
                status,
                elapsed_ms(started),
                json!({
                    "script_ref": config.script_ref,
                    "execution_id": report.execution_id,
                    "report_url": report.report_url,
                    "logs": log_tail,
                }),
            ))
        }
    }
}
