use crate::{AlertNotification, NotificationChannel, NotificationDispatcher};
use anyhow::Result;
use async_trait::async_trait;
use pulsemon_common::types::{AlertEventKind, Monitor, MonitorResult};
use std::collections::HashMap;

/// Routes alert notifications to the channels registered for each provider
/// ID. One channel failing does not stop delivery to the remaining
/// providers; the first error is reported after all sends were attempted.
pub struct DeliveryManager {
    channels: HashMap<String, Box<dyn NotificationChannel>>,
}

impl DeliveryManager {
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
        }
    }

    pub fn register(&mut self, channel: Box<dyn NotificationChannel>) {
        self.channels
            .insert(channel.instance_id().to_string(), channel);
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl Default for DeliveryManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationDispatcher for DeliveryManager {
    async fn notify(
        &self,
        provider_ids: &[String],
        event: AlertEventKind,
        monitor: &Monitor,
        result: &MonitorResult,
    ) -> Result<()> {
        let notification = AlertNotification::from_result(event, monitor, result);
        let mut first_err = None;

        for provider_id in provider_ids {
            let Some(channel) = self.channels.get(provider_id) else {
                tracing::warn!(
                    provider_id = %provider_id,
                    monitor_id = %monitor.id,
                    "No channel registered for provider, skipping"
                );
                continue;
            };
            if let Err(e) = channel.send(&notification).await {
                tracing::error!(
                    provider_id = %provider_id,
                    channel = channel.channel_type(),
                    monitor_id = %monitor.id,
                    error = %e,
                    "Failed to hand off notification"
                );
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
