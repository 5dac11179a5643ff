//! API route definitions

use crate::error::{ApiError, PartialFailure};
use crate::handlers::{gremlin, health};
use crate::state::AppState;
use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(title = "Gremlin Explorer API", description = "Multi-statement Gremlin queries with per-statement diagnostics"),
    paths(
        health::health_check,
        health::readiness_check,
        health::metrics,
        gremlin::gremlin_get,
        gremlin::gremlin_post,
    ),
    components(schemas(
        health::HealthResponse,
        health::BuildInfo,
        health::ReadinessResponse,
        health::MetricsResponse,
        gremlin::GremlinRequest,
        gremlin::QueryEntry,
        gremlin::QueryError,
        gremlin::Diagnostics,
        ApiError,
        PartialFailure,
    )),
    tags(
        (name = "health", description = "Liveness, readiness and counters"),
        (name = "gremlin", description = "Query execution")
    )
)]
pub struct ApiDoc;

/// Create API v1 routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/gremlin",
        get(gremlin::gremlin_get).post(gremlin::gremlin_post),
    )
}

/// Build the full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);
    let cors = build_cors_layer(&state.config.server.cors_origins);

    let mut router = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/api/v1", api_routes());

    if let Some(layer) = cors {
        router = router.layer(layer);
    }

    router
        .with_state(state)
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn build_cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([ACCEPT, CONTENT_TYPE]),
    )
}
