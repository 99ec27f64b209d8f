use crate::channels::webhook::WebhookChannel;
use crate::manager::DeliveryManager;
use crate::plugin::ChannelRegistry;
use crate::{AlertNotification, NotificationChannel, NotificationDispatcher};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use pulsemon_common::types::{
    AlertConfig, AlertEventKind, CheckStatus, Monitor, MonitorConfig, MonitorResult,
    MonitorStatus, MonitorType,
};
use std::sync::{Arc, Mutex};

fn make_monitor() -> Monitor {
    let now = Utc::now();
    Monitor {
        id: "mon-7".to_string(),
        org_id: "org".to_string(),
        project_id: "proj".to_string(),
        created_by: "tester".to_string(),
        name: "landing page".to_string(),
        monitor_type: MonitorType::Website,
        target: "https://example.com".to_string(),
        frequency_secs: 300,
        enabled: true,
        status: MonitorStatus::Down,
        config: MonitorConfig::from_type_and_value(MonitorType::Website, None).unwrap(),
        alert_config: AlertConfig::default(),
        location_config: None,
        muted_until: None,
        last_check_at: None,
        last_status_change_at: None,
        scheduled_job_id: None,
        created_at: now,
        updated_at: now,
    }
}

fn make_result() -> MonitorResult {
    let now = Utc::now();
    MonitorResult {
        id: "r-1".to_string(),
        monitor_id: "mon-7".to_string(),
        checked_at: now,
        status: CheckStatus::Down,
        response_time_ms: 1543,
        details: serde_json::json!({"status_code": 502}),
        is_up: false,
        is_status_change: true,
        consecutive_failure_count: 3,
        alerts_sent_for_failure: 0,
        created_at: now,
    }
}

struct RecordingChannel {
    id: String,
    sent: Arc<Mutex<Vec<AlertNotification>>>,
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(&self, notification: &AlertNotification) -> Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }

    fn channel_type(&self) -> &str {
        "recording"
    }

    fn instance_id(&self) -> &str {
        &self.id
    }
}

struct FailingChannel {
    id: String,
}

#[async_trait]
impl NotificationChannel for FailingChannel {
    async fn send(&self, _notification: &AlertNotification) -> Result<()> {
        anyhow::bail!("delivery exploded")
    }

    fn channel_type(&self) -> &str {
        "failing"
    }

    fn instance_id(&self) -> &str {
        &self.id
    }
}

#[test]
fn registry_instantiates_webhook_channels() {
    let registry = ChannelRegistry::default();
    let channel = registry
        .create_channel(
            "webhook",
            "hooks-1",
            &serde_json::json!({"url": "https://hooks.example.com/alert"}),
        )
        .unwrap();
    assert_eq!(channel.channel_type(), "webhook");
    assert_eq!(channel.instance_id(), "hooks-1");
}

#[test]
fn registry_rejects_bad_configs_and_unknown_plugins() {
    let registry = ChannelRegistry::default();
    assert!(registry
        .create_channel("webhook", "x", &serde_json::json!({}))
        .is_err());
    assert!(registry
        .create_channel("webhook", "x", &serde_json::json!({"url": "ftp://nope"}))
        .is_err());
    assert!(registry
        .create_channel("smoke-signal", "x", &serde_json::json!({}))
        .is_err());
}

#[test]
fn webhook_template_substitutes_placeholders() {
    let channel = WebhookChannel::new(
        "hooks-1",
        "https://hooks.example.com".to_string(),
        Some("{{event}}: {{monitor_name}} ({{target}}) is {{status}}".to_string()),
    );
    let notification =
        AlertNotification::from_result(AlertEventKind::Failure, &make_monitor(), &make_result());
    let body = channel.render_body(&notification);
    assert_eq!(body, "failure: landing page (https://example.com) is down");
}

#[test]
fn webhook_default_body_is_json_with_event_fields() {
    let channel = WebhookChannel::new("hooks-1", "https://hooks.example.com".to_string(), None);
    let notification =
        AlertNotification::from_result(AlertEventKind::Recovery, &make_monitor(), &make_result());
    let body: serde_json::Value = serde_json::from_str(&channel.render_body(&notification)).unwrap();
    assert_eq!(body["event"], "recovery");
    assert_eq!(body["monitor_id"], "mon-7");
    assert_eq!(body["consecutive_failures"], 3);
}

#[tokio::test]
async fn manager_routes_by_provider_id_and_skips_unknown() {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let mut manager = DeliveryManager::new();
    manager.register(Box::new(RecordingChannel {
        id: "prov-a".to_string(),
        sent: sent.clone(),
    }));

    manager
        .notify(
            &["prov-a".to_string(), "prov-missing".to_string()],
            AlertEventKind::Failure,
            &make_monitor(),
            &make_result(),
        )
        .await
        .unwrap();

    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].event, AlertEventKind::Failure);
    assert_eq!(sent[0].monitor_name, "landing page");
}

#[tokio::test]
async fn manager_attempts_all_providers_despite_failures() {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let mut manager = DeliveryManager::new();
    manager.register(Box::new(FailingChannel {
        id: "prov-bad".to_string(),
    }));
    manager.register(Box::new(RecordingChannel {
        id: "prov-good".to_string(),
        sent: sent.clone(),
    }));

    let err = manager
        .notify(
            &["prov-bad".to_string(), "prov-good".to_string()],
            AlertEventKind::Failure,
            &make_monitor(),
            &make_result(),
        )
        .await;

    assert!(err.is_err(), "first failure should be surfaced");
    assert_eq!(sent.lock().unwrap().len(), 1, "good channel still delivered");
}
