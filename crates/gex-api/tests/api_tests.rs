//! API Integration Tests
//!
//! Every test runs the full router against scripted in-memory sessions.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use gex_api::{create_router, state::AppState};
use gex_core::testing::{ScriptedFactory, Step};
use gex_core::AppConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn create_app(factory: &ScriptedFactory) -> Router {
    let state = AppState::new(AppConfig::default(), Arc::new(factory.clone()));
    create_router(Arc::new(state))
}

/// Helper to create a test request
fn create_json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_app(&ScriptedFactory::default());
    let (status, body) = send(app, create_json_request("GET", "/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_readiness_reports_backend() {
    let app = create_app(&ScriptedFactory::default());
    let (status, body) = send(app, create_json_request("GET", "/ready", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
    assert_eq!(body["backend"], "scripted");
    assert_eq!(body["default_collection"], "thehobbit");
}

#[tokio::test]
async fn test_openapi_lists_gremlin_route() {
    let app = create_app(&ScriptedFactory::default());
    let (status, body) = send(
        app,
        create_json_request("GET", "/api-docs/openapi.json", None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let path = &body["paths"]["/api/v1/gremlin"];
    assert!(path.get("get").is_some());
    assert!(path.get("post").is_some());
}

// =============================================================================
// Gremlin Query Tests
// =============================================================================

#[tokio::test]
async fn test_get_reports_each_statement_in_order() {
    let factory = ScriptedFactory::new(vec![
        Step::rows(vec![json!(3)]),
        Step::throttled(500),
        Step::rows(vec![json!({"id": "bilbo"})]),
    ]);
    let app = create_app(&factory);

    let (status, body) = send(
        app,
        create_json_request(
            "GET",
            "/api/v1/gremlin?query=g.V().count()%3Bg.E().count()%3B%20g.V('bilbo')",
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 3);

    assert_eq!(entries[0]["queryText"], "g.V().count()");
    assert_eq!(entries[0]["queryResult"], json!([3]));
    assert_eq!(entries[0]["diagnostics"]["statusCode"], 200);
    assert_eq!(entries[0]["diagnostics"]["requestCharge"], 2.29);

    assert_eq!(entries[1]["queryText"], "g.E().count()");
    assert!(entries[1].get("queryResult").is_none());
    assert_eq!(entries[1]["queryError"]["kind"], "throttled");
    assert_eq!(entries[1]["queryError"]["statusCode"], 429);
    assert_eq!(entries[1]["queryError"]["retryAfterMs"], 500.0);

    assert_eq!(entries[2]["queryText"], "g.V('bilbo')");
    assert_eq!(entries[2]["queryResult"], json!([{"id": "bilbo"}]));

    assert_eq!(factory.opened(), vec!["thehobbit".to_string()]);
    assert_eq!(factory.closed(), 1);
}

#[tokio::test]
async fn test_post_uses_requested_collection() {
    let factory = ScriptedFactory::new(vec![Step::rows(vec![json!(1)])]);
    let app = create_app(&factory);

    let (status, body) = send(
        app,
        create_json_request(
            "POST",
            "/api/v1/gremlin",
            Some(json!({"query": "  g.V().count();  ;", "collectionId": "lotr"})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(factory.opened(), vec!["lotr".to_string()]);
    assert_eq!(factory.submitted(), vec!["g.V().count()".to_string()]);
}

#[tokio::test]
async fn test_client_side_rejection_has_no_status_code() {
    let factory = ScriptedFactory::new(vec![Step::client_side("Query exceeds 65536 bytes")]);
    let app = create_app(&factory);

    let (status, body) = send(
        app,
        create_json_request("POST", "/api/v1/gremlin", Some(json!({"query": "g.V()"}))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let error = &body[0]["queryError"];
    assert_eq!(error["kind"], "clientSideRejected");
    assert!(error.get("statusCode").is_none());
    assert_eq!(error["message"], "Query exceeds 65536 bytes");
}

#[tokio::test]
async fn test_blank_query_returns_no_entries() {
    let factory = ScriptedFactory::default();

    let (status, body) = send(
        create_app(&factory),
        create_json_request("POST", "/api/v1/gremlin", Some(json!({"query": " ; ;"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = send(
        create_app(&factory),
        create_json_request("GET", "/api/v1/gremlin?query=&collectionId=thehobbit", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    assert!(factory.opened().is_empty());
}

#[tokio::test]
async fn test_missing_query_parameter_is_json_bad_request() {
    let app = create_app(&ScriptedFactory::default());
    let (status, body) = send(
        app,
        create_json_request("GET", "/api/v1/gremlin?collectionId=thehobbit", None),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_malformed_json_body_is_json_bad_request() {
    let app = create_app(&ScriptedFactory::default());
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/gremlin")
        .header("Content-Type", "application/json")
        .body(Body::from("{\"query\": "))
        .unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_deadline_keeps_completed_outcomes() {
    let factory = ScriptedFactory::new(vec![Step::rows(vec![json!(1)]), Step::hang()]);
    let mut config = AppConfig::default();
    config.server.request_timeout_secs = 1;
    let app = create_router(Arc::new(AppState::new(config, Arc::new(factory.clone()))));

    let (status, body) = send(
        app,
        create_json_request(
            "POST",
            "/api/v1/gremlin",
            Some(json!({"query": "g.V(); g.E(); g.V('x')"})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["code"], "BATCH_TIMEOUT");
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["queryText"], "g.V()");
    assert_eq!(results[0]["queryResult"], json!([1]));
    assert_eq!(factory.submitted(), vec!["g.V()", "g.E()"]);
    assert_eq!(factory.closed(), 1);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_bad_gateway() {
    let factory = ScriptedFactory::unreachable();
    let app = create_app(&factory);

    let (status, body) = send(
        app,
        create_json_request("POST", "/api/v1/gremlin", Some(json!({"query": "g.V()"}))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "CONNECTION_ERROR");
    assert!(factory.submitted().is_empty());
}

#[tokio::test]
async fn test_transport_failure_keeps_earlier_results() {
    let factory = ScriptedFactory::new(vec![
        Step::rows(vec![json!(3)]),
        Step::transport(),
        Step::rows(vec![json!(4)]),
    ]);
    let app = create_app(&factory);

    let (status, body) = send(
        app,
        create_json_request(
            "POST",
            "/api/v1/gremlin",
            Some(json!({"query": "g.V().count(); g.E().count(); g.V('x')"})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "TRANSPORT_ERROR");
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["queryResult"], json!([3]));
    assert_eq!(results[1]["queryError"]["kind"], "transport");
    assert_eq!(
        factory.submitted(),
        vec!["g.V().count()".to_string(), "g.E().count()".to_string()]
    );
}

#[tokio::test]
async fn test_metrics_count_queries() {
    let factory = ScriptedFactory::new(vec![
        Step::rows(vec![json!(1)]),
        Step::throttled(100),
        Step::rejected(400, "Unable to resolve symbol 'h'"),
    ]);
    let state = Arc::new(AppState::new(AppConfig::default(), Arc::new(factory)));

    let (status, _) = send(
        create_router(state.clone()),
        create_json_request(
            "POST",
            "/api/v1/gremlin",
            Some(json!({"query": "g.V(); g.E(); h.V()"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        create_router(state),
        create_json_request("GET", "/metrics", None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_requests"], 1);
    assert_eq!(body["queries_succeeded"], 1);
    assert_eq!(body["queries_failed"], 2);
    assert_eq!(body["queries_throttled"], 1);
}
