use crate::state::AppState;
use crate::{api, logging};
use axum::http::HeaderValue;
use axum::middleware;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "pulsemon API",
        description = "pulsemon 合成监控引擎 REST API",
    ),
    tags(
        (name = "Health", description = "服务健康检查"),
        (name = "Monitors", description = "监控与检查结果")
    )
)]
struct ApiDoc;

pub fn build_http_app(state: AppState) -> Router {
    let (health_router, health_spec) = api::routes().split_for_parts();
    let (monitor_router, monitor_spec) = api::monitors::routes().split_for_parts();

    let mut merged_spec = ApiDoc::openapi();
    merged_spec.merge(health_spec);
    merged_spec.merge(monitor_spec);
    let spec = Arc::new(merged_spec);

    let cors = if state.config.cors_allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .cors_allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    health_router
        .merge(monitor_router)
        .layer(middleware::from_fn(logging::request_logging))
        .merge(SwaggerUi::new("/docs").url("/docs/openapi.json", spec.as_ref().clone()))
        .layer(cors)
        .with_state(state)
}
