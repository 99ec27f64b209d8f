#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use pulsemon_common::types::{AlertEventKind, ExecutionJob, Monitor, MonitorResult};
use pulsemon_notify::NotificationDispatcher;
use pulsemon_probe::synthetic::UnconfiguredRunner;
use pulsemon_probe::validator::TargetValidator;
use pulsemon_probe::Prober;
use pulsemon_server::app;
use pulsemon_server::config::ServerConfig;
use pulsemon_server::evaluator::ResultEvaluator;
use pulsemon_server::queue::ExecutionQueue;
use pulsemon_server::scheduler::MonitorScheduler;
use pulsemon_server::state::AppState;
use pulsemon_server::worker::ExecutionWorker;
use pulsemon_storage::MonitorStore;
use serde_json::Value;
use std::sync::{Arc, Mutex, OnceLock};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::util::ServiceExt;

/// Dispatcher stub recording every hand-off instead of delivering it.
pub struct RecordingDispatcher {
    pub sent: Arc<Mutex<Vec<(AlertEventKind, String)>>>,
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn notify(
        &self,
        _provider_ids: &[String],
        event: AlertEventKind,
        monitor: &Monitor,
        _result: &MonitorResult,
    ) -> Result<()> {
        self.sent.lock().unwrap().push((event, monitor.id.clone()));
        Ok(())
    }
}

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: axum::Router,
    pub store: Arc<MonitorStore>,
    pub scheduler: Arc<MonitorScheduler>,
    pub queue: ExecutionQueue,
    pub job_rx: mpsc::Receiver<ExecutionJob>,
    pub worker: Arc<ExecutionWorker>,
    pub evaluator: Arc<ResultEvaluator>,
    pub sent_alerts: Arc<Mutex<Vec<(AlertEventKind, String)>>>,
}

fn ensure_rustls_provider() {
    static RUSTLS_PROVIDER_INIT: OnceLock<()> = OnceLock::new();
    RUSTLS_PROVIDER_INIT.get_or_init(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

pub async fn build_test_context() -> Result<TestContext> {
    pulsemon_common::id::init(1, 1);
    ensure_rustls_provider();

    let temp_dir = tempfile::tempdir()?;
    let db_url = format!(
        "sqlite://{}?mode=rwc",
        temp_dir.path().join("pulsemon.db").display()
    );
    let store = Arc::new(MonitorStore::new(&db_url).await?);

    let mut config = ServerConfig::default();
    // Tests probe loopback listeners and must not wait out real backoffs.
    config.engine.allow_internal_targets = true;
    config.engine.retry_base_ms = 10;
    config.database.data_dir = temp_dir.path().to_string_lossy().to_string();

    let sent_alerts = Arc::new(Mutex::new(Vec::new()));
    let notifier = Arc::new(RecordingDispatcher {
        sent: sent_alerts.clone(),
    });

    let prober = Arc::new(Prober::new(
        TargetValidator::new(config.engine.allow_internal_targets),
        Arc::new(UnconfiguredRunner),
        config.engine.body_snippet_max_chars,
    )?);

    let (queue, job_rx) = ExecutionQueue::new(config.engine.queue_capacity);
    let scheduler = Arc::new(MonitorScheduler::new(queue.clone(), store.clone()));
    let evaluator = Arc::new(ResultEvaluator::new(store.clone(), notifier));
    let worker = Arc::new(ExecutionWorker::new(
        store.clone(),
        prober,
        evaluator.clone(),
        queue.clone(),
        config.engine.clone(),
    ));

    let state = AppState {
        store: store.clone(),
        scheduler: scheduler.clone(),
        config: Arc::new(config),
        start_time: Utc::now(),
    };
    let app = app::build_http_app(state.clone());

    Ok(TestContext {
        temp_dir,
        state,
        app,
        store,
        scheduler,
        queue,
        job_rx,
        worker,
        evaluator,
        sent_alerts,
    })
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    let request = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            builder.body(Body::from(json.to_string())).unwrap()
        }
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

pub fn assert_ok_envelope(body: &Value) {
    assert_eq!(body["err_code"], 0, "expected success envelope: {body}");
}

/// Minimal create-monitor request body for a port-check against loopback.
pub fn port_check_request(name: &str, port: u16) -> Value {
    serde_json::json!({
        "name": name,
        "org_id": "org-test",
        "project_id": "proj-test",
        "monitor_type": "port_check",
        "target": "127.0.0.1",
        "frequency_secs": 60,
        "config": {"port": port, "protocol": "tcp"},
    })
}
