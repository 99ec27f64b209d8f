//! Notification hand-off boundary.
//!
//! The alert engine decides *that* and *what* to send; this crate carries
//! the request to the delivery collaborator. [`NotificationDispatcher`] is
//! the collaborator seam; [`manager::DeliveryManager`] is the
//! in-process reference implementation routing provider IDs to pluggable
//! [`NotificationChannel`]s (webhook by default). Real transports —
//! email/Slack/etc. — live behind those endpoints, outside the core.

pub mod channels;
pub mod manager;
pub mod plugin;

#[cfg(test)]
mod tests;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulsemon_common::types::{AlertEventKind, Monitor, MonitorResult};
use serde::{Deserialize, Serialize};

/// The payload handed to a delivery channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertNotification {
    pub event: AlertEventKind,
    pub monitor_id: String,
    pub monitor_name: String,
    pub monitor_type: String,
    pub target: String,
    pub status: String,
    pub response_time_ms: u64,
    pub consecutive_failure_count: u32,
    pub checked_at: DateTime<Utc>,
    pub details: serde_json::Value,
}

impl AlertNotification {
    pub fn from_result(event: AlertEventKind, monitor: &Monitor, result: &MonitorResult) -> Self {
        Self {
            event,
            monitor_id: monitor.id.clone(),
            monitor_name: monitor.name.clone(),
            monitor_type: monitor.monitor_type.to_string(),
            target: monitor.target.clone(),
            status: result.status.to_string(),
            response_time_ms: result.response_time_ms,
            consecutive_failure_count: result.consecutive_failure_count,
            checked_at: result.checked_at,
            details: result.details.clone(),
        }
    }
}

/// External delivery collaborator interface. Delivery success or failure is
/// the collaborator's concern; the engine only reports dispatch errors.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify(
        &self,
        provider_ids: &[String],
        event: AlertEventKind,
        monitor: &Monitor,
        result: &MonitorResult,
    ) -> Result<()>;
}

/// A delivery channel instance bound to one provider ID.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Delivers the notification through this channel.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails after the channel's own retries.
    async fn send(&self, notification: &AlertNotification) -> Result<()>;

    /// Returns the channel type name (e.g., `"webhook"`).
    fn channel_type(&self) -> &str;

    /// The provider ID this instance is registered under.
    fn instance_id(&self) -> &str;
}
