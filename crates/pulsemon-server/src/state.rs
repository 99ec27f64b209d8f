use crate::config::ServerConfig;
use crate::scheduler::MonitorScheduler;
use chrono::{DateTime, Utc};
use pulsemon_storage::MonitorStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MonitorStore>,
    pub scheduler: Arc<MonitorScheduler>,
    pub config: Arc<ServerConfig>,
    pub start_time: DateTime<Utc>,
}
