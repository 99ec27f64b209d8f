mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{assert_ok_envelope, build_test_context, port_check_request, request_json};
use serde_json::json;
use tokio::time::{timeout, Duration};

#[tokio::test]
async fn create_monitor_schedules_and_enqueues_first_tick() -> Result<()> {
    let mut ctx = build_test_context().await?;

    let (status, body) =
        request_json(&ctx.app, "POST", "/v1/monitors", Some(port_check_request("pg", 5432))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_ok_envelope(&body);
    let monitor_id = body["data"]["id"].as_str().unwrap().to_string();
    assert!(body["data"]["scheduled_job_id"].is_string());
    assert_eq!(ctx.scheduler.entry_count(), 1);

    // The recurring entry ticks immediately on schedule.
    let job = timeout(Duration::from_secs(2), ctx.job_rx.recv())
        .await
        .expect("first tick should enqueue promptly")
        .unwrap();
    assert_eq!(job.monitor_id, monitor_id);
    assert_eq!(job.attempt, 0);
    Ok(())
}

#[tokio::test]
async fn create_rejects_bad_frequency_config_and_locations() -> Result<()> {
    let ctx = build_test_context().await?;

    // Below the minimum frequency.
    let mut req = port_check_request("too-fast", 80);
    req["frequency_secs"] = json!(10);
    let (status, body) = request_json(&ctx.app, "POST", "/v1/monitors", Some(req)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    // Config missing the required port.
    let mut req = port_check_request("no-port", 80);
    req["config"] = json!({});
    let (status, _) = request_json(&ctx.app, "POST", "/v1/monitors", Some(req)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Zero selected locations is rejected at save time.
    let mut req = port_check_request("no-locations", 80);
    req["location_config"] = json!({"enabled": true, "locations": [], "strategy": "majority"});
    let (status, _) = request_json(&ctx.app, "POST", "/v1/monitors", Some(req)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Injection attempt in a host-style target.
    let mut req = port_check_request("injection", 80);
    req["target"] = json!("example.com; rm -rf /");
    let (status, _) = request_json(&ctx.app, "POST", "/v1/monitors", Some(req)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(ctx.scheduler.entry_count(), 0);
    Ok(())
}

#[tokio::test]
async fn pause_resume_and_delete_keep_the_registry_in_sync() -> Result<()> {
    let ctx = build_test_context().await?;

    let (status, body) =
        request_json(&ctx.app, "POST", "/v1/monitors", Some(port_check_request("db", 5432))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(ctx.scheduler.entry_count(), 1);

    let (status, _) =
        request_json(&ctx.app, "POST", &format!("/v1/monitors/{id}/pause"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ctx.scheduler.entry_count(), 0);
    let (_, body) = request_json(&ctx.app, "GET", &format!("/v1/monitors/{id}"), None).await;
    assert_eq!(body["data"]["status"], "paused");

    let (status, _) =
        request_json(&ctx.app, "POST", &format!("/v1/monitors/{id}/resume"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ctx.scheduler.entry_count(), 1);

    let (status, _) = request_json(&ctx.app, "DELETE", &format!("/v1/monitors/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ctx.scheduler.entry_count(), 0);

    let (status, _) = request_json(&ctx.app, "GET", &format!("/v1/monitors/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn disabling_via_update_unschedules() -> Result<()> {
    let ctx = build_test_context().await?;

    let (_, body) =
        request_json(&ctx.app, "POST", "/v1/monitors", Some(port_check_request("web", 443))).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(ctx.scheduler.entry_count(), 1);

    let (status, body) = request_json(
        &ctx.app,
        "PUT",
        &format!("/v1/monitors/{id}"),
        Some(json!({"enabled": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(ctx.scheduler.entry_count(), 0);

    let (status, body) = request_json(
        &ctx.app,
        "PUT",
        &format!("/v1/monitors/{id}"),
        Some(json!({"enabled": true, "frequency_secs": 120})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(ctx.scheduler.entry_count(), 1);
    assert_eq!(ctx.scheduler.entry_frequency(&id), Some(120));
    Ok(())
}

#[tokio::test]
async fn reschedule_is_idempotent_and_does_not_duplicate_entries() -> Result<()> {
    let ctx = build_test_context().await?;

    let (_, body) =
        request_json(&ctx.app, "POST", "/v1/monitors", Some(port_check_request("api", 8080))).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let monitor = ctx.store.get_monitor(&id).await?.unwrap();
    let first_job = ctx.scheduler.schedule(&monitor).await?;
    let second_job = ctx.scheduler.schedule(&monitor).await?;
    assert_ne!(first_job, second_job);
    assert_eq!(ctx.scheduler.entry_count(), 1);
    Ok(())
}

#[tokio::test]
async fn run_now_enqueues_one_off_job() -> Result<()> {
    let mut ctx = build_test_context().await?;

    let (_, body) =
        request_json(&ctx.app, "POST", "/v1/monitors", Some(port_check_request("ad-hoc", 9000)))
            .await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    // Drain the immediate scheduling tick first.
    let _ = timeout(Duration::from_secs(2), ctx.job_rx.recv()).await;

    let (status, _) = request_json(&ctx.app, "POST", &format!("/v1/monitors/{id}/run"), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let job = timeout(Duration::from_secs(2), ctx.job_rx.recv())
        .await
        .expect("forced run should enqueue")
        .unwrap();
    assert_eq!(job.monitor_id, id);
    Ok(())
}

#[tokio::test]
async fn reload_all_rebuilds_registry_from_durable_state() -> Result<()> {
    let ctx = build_test_context().await?;

    for (name, port) in [("a", 80u16), ("b", 443)] {
        let (status, _) =
            request_json(&ctx.app, "POST", "/v1/monitors", Some(port_check_request(name, port)))
                .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    ctx.scheduler.clear();
    assert_eq!(ctx.scheduler.entry_count(), 0);

    let count = ctx.scheduler.reload_all().await?;
    assert_eq!(count, 2);
    assert_eq!(ctx.scheduler.entry_count(), 2);
    Ok(())
}

#[tokio::test]
async fn health_endpoint_reports_counts() -> Result<()> {
    let ctx = build_test_context().await?;
    let (_, _) =
        request_json(&ctx.app, "POST", "/v1/monitors", Some(port_check_request("h", 80))).await;

    let (status, body) = request_json(&ctx.app, "GET", "/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_ok_envelope(&body);
    assert_eq!(body["data"]["monitor_count"], 1);
    assert_eq!(body["data"]["scheduled_count"], 1);
    Ok(())
}
