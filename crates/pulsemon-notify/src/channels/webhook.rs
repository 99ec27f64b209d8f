use crate::plugin::ChannelPlugin;
use crate::{AlertNotification, NotificationChannel};
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// Delivery attempts per notification before giving up.
const MAX_SEND_ATTEMPTS: u32 = 3;

pub struct WebhookChannel {
    instance_id: String,
    client: reqwest::Client,
    url: String,
    body_template: Option<String>,
}

impl WebhookChannel {
    pub fn new(instance_id: &str, url: String, body_template: Option<String>) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            client: reqwest::Client::new(),
            url,
            body_template,
        }
    }

    pub(crate) fn render_body(&self, n: &AlertNotification) -> String {
        if let Some(template) = &self.body_template {
            template
                .replace("{{event}}", &n.event.to_string())
                .replace("{{monitor_id}}", &n.monitor_id)
                .replace("{{monitor_name}}", &n.monitor_name)
                .replace("{{monitor_type}}", &n.monitor_type)
                .replace("{{target}}", &n.target)
                .replace("{{status}}", &n.status)
                .replace("{{response_time_ms}}", &n.response_time_ms.to_string())
                .replace(
                    "{{consecutive_failures}}",
                    &n.consecutive_failure_count.to_string(),
                )
                .replace("{{checked_at}}", &n.checked_at.to_rfc3339())
        } else {
            serde_json::json!({
                "event": n.event.to_string(),
                "monitor_id": n.monitor_id,
                "monitor_name": n.monitor_name,
                "monitor_type": n.monitor_type,
                "target": n.target,
                "status": n.status,
                "response_time_ms": n.response_time_ms,
                "consecutive_failures": n.consecutive_failure_count,
                "checked_at": n.checked_at.to_rfc3339(),
                "details": n.details,
            })
            .to_string()
        }
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    async fn send(&self, notification: &AlertNotification) -> Result<()> {
        let body = self.render_body(notification);
        let mut last_err = None;

        for attempt in 0..MAX_SEND_ATTEMPTS {
            match self
                .client
                .post(&self.url)
                .header("Content-Type", "application/json")
                .body(body.clone())
                .send()
                .await
            {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    let status = resp.status();
                    tracing::warn!(
                        attempt = attempt + 1,
                        status = %status,
                        "Webhook returned non-success status, retrying"
                    );
                    last_err = Some(anyhow::anyhow!("HTTP {status}"));
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        error = %e,
                        "Webhook send failed, retrying"
                    );
                    last_err = Some(e.into());
                }
            }
            if attempt + 1 < MAX_SEND_ATTEMPTS {
                tokio::time::sleep(std::time::Duration::from_millis(100 * 2u64.pow(attempt)))
                    .await;
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("webhook delivery failed")))
    }

    fn channel_type(&self) -> &str {
        "webhook"
    }

    fn instance_id(&self) -> &str {
        &self.instance_id
    }
}

// Plugin

#[derive(Deserialize)]
struct WebhookConfig {
    url: String,
    body_template: Option<String>,
}

pub struct WebhookPlugin;

impl ChannelPlugin for WebhookPlugin {
    fn name(&self) -> &str {
        "webhook"
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        let cfg: WebhookConfig = serde_json::from_value(config.clone())
            .map_err(|e| anyhow::anyhow!("invalid webhook config: {e}"))?;
        if !cfg.url.starts_with("http://") && !cfg.url.starts_with("https://") {
            anyhow::bail!("webhook url must be http(s): {}", cfg.url);
        }
        Ok(())
    }

    fn create_channel(
        &self,
        instance_id: &str,
        config: &Value,
    ) -> Result<Box<dyn NotificationChannel>> {
        let cfg: WebhookConfig = serde_json::from_value(config.clone())
            .map_err(|e| anyhow::anyhow!("invalid webhook config: {e}"))?;
        Ok(Box::new(WebhookChannel::new(
            instance_id,
            cfg.url,
            cfg.body_template,
        )))
    }
}
