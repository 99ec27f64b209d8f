use anyhow::Result;
use chrono::Utc;
use pulsemon_notify::manager::DeliveryManager;
use pulsemon_notify::plugin::ChannelRegistry;
use pulsemon_probe::synthetic::{HttpTestRunner, TestRunner, UnconfiguredRunner};
use pulsemon_probe::validator::TargetValidator;
use pulsemon_probe::Prober;
use pulsemon_storage::MonitorStore;
use std::sync::Arc;
use tokio::signal;
use tokio::time::{interval, Duration};
use tracing_subscriber::EnvFilter;

use pulsemon_server::app;
use pulsemon_server::config::ServerConfig;
use pulsemon_server::evaluator::ResultEvaluator;
use pulsemon_server::queue::ExecutionQueue;
use pulsemon_server::scheduler::MonitorScheduler;
use pulsemon_server::state::AppState;
use pulsemon_server::worker::ExecutionWorker;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  pulsemon-server [config.toml]    Start the engine (default config/server.toml)");
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install default CryptoProvider: {e:?}"))?;

    pulsemon_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pulsemon=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    if matches!(args.get(1).map(|s| s.as_str()), Some("--help" | "-h")) {
        print_usage();
        return Ok(());
    }
    let config_path = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or("config/server.toml");

    let config = if std::path::Path::new(config_path).exists() {
        ServerConfig::load(config_path)?
    } else {
        tracing::warn!(path = %config_path, "Config file not found, using defaults");
        ServerConfig::default()
    };

    run_server(config).await
}

async fn run_server(config: ServerConfig) -> Result<()> {
    std::fs::create_dir_all(&config.database.data_dir)?;
    let store = Arc::new(MonitorStore::new(&config.database.connection_url()).await?);

    // Notification channels from config seeds
    let registry = ChannelRegistry::default();
    let mut delivery = DeliveryManager::new();
    for seed in &config.channels {
        match registry.create_channel(&seed.channel_type, &seed.id, &seed.config) {
            Ok(channel) => delivery.register(channel),
            Err(e) => {
                tracing::error!(provider_id = %seed.id, error = %e, "Skipping invalid channel seed");
            }
        }
    }
    tracing::info!(
        channels = delivery.channel_count(),
        "Notification channels registered"
    );
    let notifier = Arc::new(delivery);

    // Probing stack
    let runner: Arc<dyn TestRunner> = match &config.runner.url {
        Some(url) => Arc::new(HttpTestRunner::new(url.clone())),
        None => Arc::new(UnconfiguredRunner),
    };
    let validator = TargetValidator::new(config.engine.allow_internal_targets);
    let prober = Arc::new(Prober::new(
        validator,
        runner,
        config.engine.body_snippet_max_chars,
    )?);

    // Queue, scheduler, worker
    let (queue, job_rx) = ExecutionQueue::new(config.engine.queue_capacity);
    let scheduler = Arc::new(MonitorScheduler::new(queue.clone(), store.clone()));
    let evaluator = Arc::new(ResultEvaluator::new(store.clone(), notifier));
    let worker = Arc::new(ExecutionWorker::new(
        store.clone(),
        prober,
        evaluator,
        queue.clone(),
        config.engine.clone(),
    ));
    tokio::spawn(worker.run(job_rx));

    let rescheduled = scheduler.reload_all().await?;
    tracing::info!(count = rescheduled, "Monitors rescheduled from durable state");

    // Result retention sweep
    {
        let store = store.clone();
        let retention_days = config.engine.result_retention_days;
        let sweep_secs = config.engine.retention_sweep_secs.max(60);
        tokio::spawn(async move {
            let mut tick = interval(Duration::from_secs(sweep_secs));
            loop {
                tick.tick().await;
                let cutoff = Utc::now() - chrono::Duration::days(retention_days as i64);
                match store.delete_results_before(cutoff).await {
                    Ok(0) => {}
                    Ok(deleted) => tracing::info!(deleted, "Result retention sweep"),
                    Err(e) => tracing::error!(error = %e, "Result retention sweep failed"),
                }
            }
        });
    }

    let state = AppState {
        store,
        scheduler: scheduler.clone(),
        config: Arc::new(config.clone()),
        start_time: Utc::now(),
    };
    let router = app::build_http_app(state);

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.clear();
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) = signal::unix::signal(signal::unix::SignalKind::terminate()) {
            sig.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
