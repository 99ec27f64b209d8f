use chrono::{Duration, Utc};
use tempfile::TempDir;

use pulsemon_common::types::{
    AlertConfig, CheckStatus, Monitor, MonitorConfig, MonitorResult, MonitorStatus, MonitorType,
};

use crate::store::{MonitorFilter, MonitorStore};

async fn setup() -> (TempDir, MonitorStore) {
    pulsemon_common::id::init(1, 1);
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
    let store = MonitorStore::new(&url).await.unwrap();
    (dir, store)
}

fn make_monitor(name: &str) -> Monitor {
    let now = Utc::now();
    Monitor {
        id: pulsemon_common::id::next_id(),
        org_id: "org-1".to_string(),
        project_id: "proj-1".to_string(),
        created_by: "tester".to_string(),
        name: name.to_string(),
        monitor_type: MonitorType::HttpRequest,
        target: "https://example.com/health".to_string(),
        frequency_secs: 60,
        enabled: true,
        status: MonitorStatus::Pending,
        config: MonitorConfig::from_type_and_value(MonitorType::HttpRequest, None).unwrap(),
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

fn make_result(monitor_id: &str, status: CheckStatus, secs_ago: i64) -> MonitorResult {
    let checked_at = Utc::now() - Duration::seconds(secs_ago);
    MonitorResult {
        id: pulsemon_common::id::next_id(),
        monitor_id: monitor_id.to_string(),
        checked_at,
        status,
        response_time_ms: 42,
        details: serde_json::json!({"status_code": 200}),
        is_up: status.is_up(),
        is_status_change: false,
        consecutive_failure_count: 0,
        alerts_sent_for_failure: 0,
        created_at: checked_at,
    }
}

#[tokio::test]
async fn insert_and_get_monitor_round_trip() {
    let (_dir, store) = setup().await;

    let m = make_monitor("api health");
    let inserted = store.insert_monitor(&m).await.unwrap();
    assert_eq!(inserted.id, m.id);

    let fetched = store.get_monitor(&m.id).await.unwrap().unwrap();
    assert_eq!(fetched.name, "api health");
    assert_eq!(fetched.monitor_type, MonitorType::HttpRequest);
    assert_eq!(fetched.status, MonitorStatus::Pending);
    assert_eq!(fetched.config, m.config);
    assert!(fetched.scheduled_job_id.is_none());
}

#[tokio::test]
async fn get_missing_monitor_returns_none() {
    let (_dir, store) = setup().await;
    assert!(store.get_monitor("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn update_monitor_persists_mutable_fields() {
    let (_dir, store) = setup().await;

    let mut m = store.insert_monitor(&make_monitor("before")).await.unwrap();
    m.name = "after".to_string();
    m.frequency_secs = 120;
    m.enabled = false;

    let updated = store.update_monitor(&m.id, &m).await.unwrap().unwrap();
    assert_eq!(updated.name, "after");
    assert_eq!(updated.frequency_secs, 120);
    assert!(!updated.enabled);
}

#[tokio::test]
async fn list_monitors_applies_filters() {
    let (_dir, store) = setup().await;

    let mut a = make_monitor("a");
    a.org_id = "org-a".to_string();
    let mut b = make_monitor("b");
    b.org_id = "org-b".to_string();
    b.enabled = false;
    store.insert_monitor(&a).await.unwrap();
    store.insert_monitor(&b).await.unwrap();

    let filter = MonitorFilter {
        org_id_eq: Some("org-a".to_string()),
        ..Default::default()
    };
    let rows = store.list_monitors(&filter, 10, 0).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "a");

    let filter = MonitorFilter {
        enabled_eq: Some(false),
        ..Default::default()
    };
    assert_eq!(store.count_monitors(&filter).await.unwrap(), 1);
}

#[tokio::test]
async fn schedulable_excludes_disabled_and_paused() {
    let (_dir, store) = setup().await;

    let enabled = store.insert_monitor(&make_monitor("enabled")).await.unwrap();
    let mut disabled = make_monitor("disabled");
    disabled.enabled = false;
    store.insert_monitor(&disabled).await.unwrap();
    let paused = store.insert_monitor(&make_monitor("paused")).await.unwrap();
    store
        .update_monitor_status(&paused.id, MonitorStatus::Paused)
        .await
        .unwrap();

    let rows = store.list_schedulable_monitors().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, enabled.id);
}

#[tokio::test]
async fn result_insert_updates_monitor_in_same_transaction() {
    let (_dir, store) = setup().await;

    let m = store.insert_monitor(&make_monitor("web")).await.unwrap();
    let mut r = make_result(&m.id, CheckStatus::Down, 0);
    r.is_status_change = true;
    r.consecutive_failure_count = 1;

    store
        .insert_result_and_update_monitor(&r, MonitorStatus::Down)
        .await
        .unwrap();

    let fetched = store.get_monitor(&m.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, MonitorStatus::Down);
    assert!(fetched.last_check_at.is_some());
    assert!(fetched.last_status_change_at.is_some());

    let latest = store.latest_result(&m.id).await.unwrap().unwrap();
    assert_eq!(latest.id, r.id);
    assert_eq!(latest.consecutive_failure_count, 1);
}

#[tokio::test]
async fn result_insert_rolls_back_when_monitor_is_gone() {
    let (_dir, store) = setup().await;

    let m = store.insert_monitor(&make_monitor("gone")).await.unwrap();
    store.delete_monitor(&m.id).await.unwrap();

    let r = make_result(&m.id, CheckStatus::Up, 0);
    let err = store
        .insert_result_and_update_monitor(&r, MonitorStatus::Up)
        .await;
    assert!(err.is_err());

    // The transaction must have rolled back the orphan result row.
    assert_eq!(store.count_results(&m.id).await.unwrap(), 0);
}

#[tokio::test]
async fn latest_result_is_newest_by_checked_at() {
    let (_dir, store) = setup().await;

    let m = store.insert_monitor(&make_monitor("ordered")).await.unwrap();
    let old = make_result(&m.id, CheckStatus::Up, 120);
    let newer = make_result(&m.id, CheckStatus::Down, 10);
    store
        .insert_result_and_update_monitor(&old, MonitorStatus::Up)
        .await
        .unwrap();
    store
        .insert_result_and_update_monitor(&newer, MonitorStatus::Down)
        .await
        .unwrap();

    let latest = store.latest_result(&m.id).await.unwrap().unwrap();
    assert_eq!(latest.id, newer.id);

    let all = store.list_results(&m.id, 10, 0).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, newer.id);
}

#[tokio::test]
async fn synthetic_detail_round_trips_unchanged() {
    let (_dir, store) = setup().await;

    let m = store.insert_monitor(&make_monitor("synthetic")).await.unwrap();
    let mut r = make_result(&m.id, CheckStatus::Up, 0);
    r.details = serde_json::json!({
        "execution_id": "run-8412",
        "report_url": "https://runner.internal/reports/run-8412",
    });

    store
        .insert_result_and_update_monitor(&r, MonitorStatus::Up)
        .await
        .unwrap();

    let latest = store.latest_result(&m.id).await.unwrap().unwrap();
    assert_eq!(latest.details["execution_id"], "run-8412");
    assert_eq!(
        latest.details["report_url"],
        "https://runner.internal/reports/run-8412"
    );
}

#[tokio::test]
async fn retention_sweep_deletes_old_results_only() {
    let (_dir, store) = setup().await;

    let m = store.insert_monitor(&make_monitor("retention")).await.unwrap();
    let old = make_result(&m.id, CheckStatus::Up, 60 * 60 * 24 * 40);
    let fresh = make_result(&m.id, CheckStatus::Up, 60);
    store
        .insert_result_and_update_monitor(&old, MonitorStatus::Up)
        .await
        .unwrap();
    store
        .insert_result_and_update_monitor(&fresh, MonitorStatus::Up)
        .await
        .unwrap();

    let cutoff = Utc::now() - Duration::days(30);
    let deleted = store.delete_results_before(cutoff).await.unwrap();
    assert_eq!(deleted, 1);

    let remaining = store.list_results(&m.id, 10, 0).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, fresh.id);
}
