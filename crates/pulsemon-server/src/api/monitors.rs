use crate::api::pagination::PaginationParams;
use crate::api::{
    error_response, success_empty_response, success_paginated_response, success_response,
};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use pulsemon_common::types::{
    CreateMonitorRequest, Monitor, MonitorConfig, MonitorResult, MonitorStatus, MonitorType,
    UpdateMonitorRequest,
};
use pulsemon_probe::validator::TargetValidator;
use pulsemon_storage::MonitorFilter;
use utoipa_axum::{router::OpenApiRouter, routes};

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(create_monitor, list_monitors))
        .routes(routes!(get_monitor, update_monitor, delete_monitor))
        .routes(routes!(pause_monitor))
        .routes(routes!(resume_monitor))
        .routes(routes!(maintenance_monitor))
        .routes(routes!(run_monitor))
        .routes(routes!(list_monitor_results))
}

/// Save-time target sanity check, per monitor type. The full SSRF screen
/// (DNS resolution included) runs before every network call; this rejects
/// the obviously malformed at the door.
fn validate_target(monitor_type: MonitorType, target: &str) -> Result<(), String> {
    match monitor_type {
        MonitorType::HttpRequest | MonitorType::Website => {
            let url = reqwest::Url::parse(target).map_err(|e| format!("invalid url: {e}"))?;
            match url.scheme() {
                "http" | "https" => Ok(()),
                other => Err(format!("unsupported url scheme '{other}'")),
            }
        }
        MonitorType::PingHost | MonitorType::PortCheck => TargetValidator::new(true)
            .check_injection(target)
            .map_err(|e| e.to_string()),
        MonitorType::SyntheticTest => Ok(()),
    }
}

/// 监控列表查询参数
#[derive(Debug, serde::Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
struct ListMonitorsParams {
    /// 组织精确匹配
    #[param(required = false, rename = "org_id__eq")]
    #[serde(rename = "org_id__eq")]
    org_id_eq: Option<String>,
    /// 项目精确匹配
    #[param(required = false, rename = "project_id__eq")]
    #[serde(rename = "project_id__eq")]
    project_id_eq: Option<String>,
    /// 监控类型精确匹配
    #[param(required = false, rename = "monitor_type__eq")]
    #[serde(rename = "monitor_type__eq")]
    monitor_type_eq: Option<String>,
    /// 状态精确匹配
    #[param(required = false, rename = "status__eq")]
    #[serde(rename = "status__eq")]
    status_eq: Option<String>,
    /// 是否启用精确匹配
    #[param(required = false, rename = "enabled__eq")]
    #[serde(rename = "enabled__eq")]
    enabled_eq: Option<bool>,
    /// 每页条数（默认 20）
    #[param(required = false)]
    #[serde(
        default,
        deserialize_with = "crate::api::pagination::deserialize_optional_u64"
    )]
    limit: Option<u64>,
    /// 偏移量（默认 0）
    #[param(required = false)]
    #[serde(
        default,
        deserialize_with = "crate::api::pagination::deserialize_optional_u64"
    )]
    offset: Option<u64>,
}

/// 创建监控。创建后立即进入调度（enabled 时）。
#[utoipa::path(
    post,
    path = "/v1/monitors",
    tag = "Monitors",
    request_body = CreateMonitorRequest,
    responses(
        (status = 201, description = "监控已创建", body = Monitor),
        (status = 400, description = "参数错误", body = crate::api::ApiError)
    )
)]
async fn create_monitor(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<CreateMonitorRequest>,
) -> impl IntoResponse {
    if req.name.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "name must not be empty",
        );
    }
    if let Err(msg) = validate_target(req.monitor_type, &req.target) {
        return error_response(StatusCode::BAD_REQUEST, &trace_id, "invalid_target", &msg);
    }

    let min_frequency = state.config.engine.min_frequency_secs;
    let frequency_secs = req.frequency_secs.unwrap_or(min_frequency);
    if frequency_secs < min_frequency {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "invalid_frequency",
            &format!("frequency_secs must be at least {min_frequency}"),
        );
    }

    let config = match MonitorConfig::from_type_and_value(req.monitor_type, req.config.clone()) {
        Ok(c) => c,
        Err(msg) => {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "invalid_config", &msg)
        }
    };
    let alert_config = req.alert_config.clone().unwrap_or_default();
    if let Err(msg) = alert_config.validate() {
        return error_response(StatusCode::BAD_REQUEST, &trace_id, "invalid_config", &msg);
    }
    if let Some(lc) = &req.location_config {
        if let Err(msg) = lc.validate() {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "invalid_config", &msg);
        }
    }

    let now = chrono::Utc::now();
    let monitor = Monitor {
        id: pulsemon_common::id::next_id(),
        org_id: req.org_id.clone(),
        project_id: req.project_id.clone(),
        created_by: req.created_by.clone().unwrap_or_default(),
        name: req.name.trim().to_string(),
        monitor_type: req.monitor_type,
        target: req.target.clone(),
        frequency_secs,
        enabled: req.enabled,
        status: MonitorStatus::Pending,
        config,
        alert_config,
        location_config: req.location_config.clone(),
        muted_until: None,
        last_check_at: None,
        last_status_change_at: None,
        scheduled_job_id: None,
        created_at: now,
        updated_at: now,
    };

    let mut created = match state.store.insert_monitor(&monitor).await {
        Ok(m) => m,
        Err(e) => {
            tracing::error!(error = %e, "Failed to insert monitor");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };

    if created.enabled {
        match state.scheduler.schedule(&created).await {
            Ok(job_id) => created.scheduled_job_id = Some(job_id),
            Err(e) => {
                tracing::error!(monitor_id = %created.id, error = %e, "Failed to schedule monitor");
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &trace_id,
                    "scheduler_error",
                    "Monitor created but scheduling failed",
                );
            }
        }
    }

    success_response(StatusCode::CREATED, &trace_id, created)
}

/// 分页查询监控列表。
#[utoipa::path(
    get,
    path = "/v1/monitors",
    tag = "Monitors",
    params(ListMonitorsParams),
    responses(
        (status = 200, description = "监控分页列表", body = Vec<Monitor>)
    )
)]
async fn list_monitors(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<ListMonitorsParams>,
) -> impl IntoResponse {
    let pagination = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    };
    let filter = MonitorFilter {
        org_id_eq: params.org_id_eq,
        project_id_eq: params.project_id_eq,
        monitor_type_eq: params.monitor_type_eq,
        status_eq: params.status_eq,
        enabled_eq: params.enabled_eq,
    };

    let total = match state.store.count_monitors(&filter).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count monitors");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };
    match state
        .store
        .list_monitors(&filter, pagination.limit(), pagination.offset())
        .await
    {
        Ok(items) => success_paginated_response(
            StatusCode::OK,
            &trace_id,
            items,
            total,
            pagination.limit(),
            pagination.offset(),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list monitors");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// 获取单个监控。
#[utoipa::path(
    get,
    path = "/v1/monitors/{id}",
    tag = "Monitors",
    params(("id" = String, Path, description = "监控 ID")),
    responses(
        (status = 200, description = "监控详情", body = Monitor),
        (status = 404, description = "不存在", body = crate::api::ApiError)
    )
)]
async fn get_monitor(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_monitor(&id).await {
        Ok(Some(monitor)) => success_response(StatusCode::OK, &trace_id, monitor),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Monitor not found",
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load monitor");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// 更新监控。监控类型不可变更；启用状态变化同步更新调度注册表。
#[utoipa::path(
    put,
    path = "/v1/monitors/{id}",
    tag = "Monitors",
    params(("id" = String, Path, description = "监控 ID")),
    request_body = UpdateMonitorRequest,
    responses(
        (status = 200, description = "更新后的监控", body = Monitor),
        (status = 400, description = "参数错误", body = crate::api::ApiError),
        (status = 404, description = "不存在", body = crate::api::ApiError)
    )
)]
async fn update_monitor(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateMonitorRequest>,
) -> impl IntoResponse {
    let mut monitor = match state.store.get_monitor(&id).await {
        Ok(Some(m)) => m,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                &trace_id,
                "not_found",
                "Monitor not found",
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load monitor");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };

    if let Some(name) = &req.name {
        if name.trim().is_empty() {
            return error_response(
                StatusCode::BAD_REQUEST,
                &trace_id,
                "bad_request",
                "name must not be empty",
            );
        }
        monitor.name = name.trim().to_string();
    }
    if let Some(target) = &req.target {
        if let Err(msg) = validate_target(monitor.monitor_type, target) {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "invalid_target", &msg);
        }
        monitor.target = target.clone();
    }
    if let Some(frequency) = req.frequency_secs {
        let min_frequency = state.config.engine.min_frequency_secs;
        if frequency < min_frequency {
            return error_response(
                StatusCode::BAD_REQUEST,
                &trace_id,
                "invalid_frequency",
                &format!("frequency_secs must be at least {min_frequency}"),
            );
        }
        monitor.frequency_secs = frequency;
    }
    if let Some(config_value) = &req.config {
        match MonitorConfig::from_type_and_value(monitor.monitor_type, Some(config_value.clone()))
        {
            Ok(c) => monitor.config = c,
            Err(msg) => {
                return error_response(StatusCode::BAD_REQUEST, &trace_id, "invalid_config", &msg)
            }
        }
    }
    if let Some(alert_config) = &req.alert_config {
        if let Err(msg) = alert_config.validate() {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "invalid_config", &msg);
        }
        monitor.alert_config = alert_config.clone();
    }
    if let Some(location_config) = &req.location_config {
        if let Some(lc) = location_config {
            if let Err(msg) = lc.validate() {
                return error_response(StatusCode::BAD_REQUEST, &trace_id, "invalid_config", &msg);
            }
        }
        monitor.location_config = location_config.clone();
    }
    if let Some(muted_until) = req.muted_until {
        monitor.muted_until = muted_until;
    }
    if let Some(enabled) = req.enabled {
        monitor.enabled = enabled;
    }

    let updated = match state.store.update_monitor(&id, &monitor).await {
        Ok(Some(m)) => m,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                &trace_id,
                "not_found",
                "Monitor not found",
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to update monitor");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };

    // Scheduler registry is updated synchronously with the state change.
    let schedule_result = if updated.enabled && updated.status != MonitorStatus::Paused {
        state.scheduler.schedule(&updated).await.map(|_| ())
    } else {
        state.scheduler.unschedule(&updated.id).await
    };
    if let Err(e) = schedule_result {
        tracing::error!(monitor_id = %updated.id, error = %e, "Failed to sync scheduler registry");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &trace_id,
            "scheduler_error",
            "Monitor updated but scheduler sync failed",
        );
    }

    match state.store.get_monitor(&id).await {
        Ok(Some(fresh)) => success_response(StatusCode::OK, &trace_id, fresh),
        _ => success_response(StatusCode::OK, &trace_id, updated),
    }
}

/// 删除监控。与取消调度原子完成；残留的调度条目属于正确性缺陷。
#[utoipa::path(
    delete,
    path = "/v1/monitors/{id}",
    tag = "Monitors",
    params(("id" = String, Path, description = "监控 ID")),
    responses(
        (status = 200, description = "已删除"),
        (status = 404, description = "不存在", body = crate::api::ApiError)
    )
)]
async fn delete_monitor(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if let Err(e) = state.scheduler.unschedule(&id).await {
        tracing::error!(monitor_id = %id, error = %e, "Failed to unschedule monitor");
    }
    match state.store.delete_monitor(&id).await {
        Ok(true) => success_empty_response(StatusCode::OK, &trace_id, "monitor deleted"),
        Ok(false) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Monitor not found",
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to delete monitor");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// 暂停监控：状态置为 paused 并同步移除调度条目。
#[utoipa::path(
    post,
    path = "/v1/monitors/{id}/pause",
    tag = "Monitors",
    params(("id" = String, Path, description = "监控 ID")),
    responses(
        (status = 200, description = "已暂停"),
        (status = 404, description = "不存在", body = crate::api::ApiError)
    )
)]
async fn pause_monitor(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state
        .store
        .update_monitor_status(&id, MonitorStatus::Paused)
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            return error_response(
                StatusCode::NOT_FOUND,
                &trace_id,
                "not_found",
                "Monitor not found",
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to pause monitor");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    }
    if let Err(e) = state.scheduler.unschedule(&id).await {
        tracing::error!(monitor_id = %id, error = %e, "Failed to unschedule paused monitor");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &trace_id,
            "scheduler_error",
            "Monitor paused but scheduler sync failed",
        );
    }
    success_empty_response(StatusCode::OK, &trace_id, "monitor paused")
}

/// 恢复已暂停的监控：状态回到 pending 并重新调度。
#[utoipa::path(
    post,
    path = "/v1/monitors/{id}/resume",
    tag = "Monitors",
    params(("id" = String, Path, description = "监控 ID")),
    responses(
        (status = 200, description = "已恢复"),
        (status = 404, description = "不存在", body = crate::api::ApiError),
        (status = 409, description = "监控未启用", body = crate::api::ApiError)
    )
)]
async fn resume_monitor(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let monitor = match state.store.get_monitor(&id).await {
        Ok(Some(m)) => m,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                &trace_id,
                "not_found",
                "Monitor not found",
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load monitor");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };
    if !monitor.enabled {
        return error_response(
            StatusCode::CONFLICT,
            &trace_id,
            "conflict",
            "Monitor is disabled; enable it instead of resuming",
        );
    }
    if let Err(e) = state
        .store
        .update_monitor_status(&id, MonitorStatus::Pending)
        .await
    {
        tracing::error!(error = %e, "Failed to resume monitor");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &trace_id,
            "storage_error",
            "Database error",
        );
    }
    if let Err(e) = state.scheduler.schedule(&monitor).await {
        tracing::error!(monitor_id = %id, error = %e, "Failed to reschedule monitor");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &trace_id,
            "scheduler_error",
            "Monitor resumed but scheduling failed",
        );
    }
    success_empty_response(StatusCode::OK, &trace_id, "monitor resumed")
}

/// 进入维护模式：检查照常执行，状态保持 maintenance，告警全部抑制。
/// 退出维护使用 resume 接口。
#[utoipa::path(
    post,
    path = "/v1/monitors/{id}/maintenance",
    tag = "Monitors",
    params(("id" = String, Path, description = "监控 ID")),
    responses(
        (status = 200, description = "已进入维护模式"),
        (status = 404, description = "不存在", body = crate::api::ApiError)
    )
)]
async fn maintenance_monitor(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state
        .store
        .update_monitor_status(&id, MonitorStatus::Maintenance)
        .await
    {
        Ok(true) => success_empty_response(StatusCode::OK, &trace_id, "monitor in maintenance"),
        Ok(false) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Monitor not found",
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to set maintenance status");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// 立即触发一次检查（不影响周期调度）。
#[utoipa::path(
    post,
    path = "/v1/monitors/{id}/run",
    tag = "Monitors",
    params(("id" = String, Path, description = "监控 ID")),
    responses(
        (status = 202, description = "已入队"),
        (status = 404, description = "不存在", body = crate::api::ApiError)
    )
)]
async fn run_monitor(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_monitor(&id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                &trace_id,
                "not_found",
                "Monitor not found",
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load monitor");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    }
    match state.scheduler.trigger_now(&id).await {
        Ok(()) => success_empty_response(StatusCode::ACCEPTED, &trace_id, "execution enqueued"),
        Err(e) => {
            tracing::error!(monitor_id = %id, error = %e, "Failed to enqueue execution");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "scheduler_error",
                "Failed to enqueue execution",
            )
        }
    }
}

/// 分页查询监控的历史检查结果（按 checked_at 倒序）。
#[utoipa::path(
    get,
    path = "/v1/monitors/{id}/results",
    tag = "Monitors",
    params(("id" = String, Path, description = "监控 ID"), PaginationParams),
    responses(
        (status = 200, description = "结果分页列表", body = Vec<MonitorResult>),
        (status = 404, description = "不存在", body = crate::api::ApiError)
    )
)]
async fn list_monitor_results(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(pagination): Query<PaginationParams>,
) -> impl IntoResponse {
    match state.store.get_monitor(&id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                &trace_id,
                "not_found",
                "Monitor not found",
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load monitor");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    }

    let total = match state.store.count_results(&id).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count results");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };
    match state
        .store
        .list_results(&id, pagination.limit(), pagination.offset())
        .await
    {
        Ok(items) => success_paginated_response(
            StatusCode::OK,
            &trace_id,
            items,
            total,
            pagination.limit(),
            pagination.offset(),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list results");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}
