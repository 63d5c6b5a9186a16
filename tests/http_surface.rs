use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use session_runtime::{SessionManager, StubDriverFactory};
use webagent_policy::UrlPolicy;
use webagent_runtime::config::{Config, Transport};
use webagent_runtime::server::{self, ServeHealth, ServeState};

fn rest_config() -> Config {
    let mut config = Config::default();
    config.transport = Transport::Rest;
    config
}

fn state(config: Config) -> (ServeState, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(SessionManager::new(
        Arc::new(StubDriverFactory::default()),
        Arc::new(replay_store::ReplayStore::new(dir.path())),
        UrlPolicy::default(),
        4,
        30 * 60 * 1_000,
        dir.path().to_path_buf(),
    ));
    let health = ServeHealth::new();
    (ServeState::new(Arc::new(config), manager, health), dir)
}

#[tokio::test]
async fn health_reports_session_capacity() {
    let (state, _dir) = state(rest_config());
    let router = server::build_router(state);

    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["sessions_active"], 0);
    assert_eq!(body["sessions_max"], 4);
}

#[tokio::test]
async fn livez_is_ok_before_readyz_is_marked() {
    let (state, _dir) = state(rest_config());
    let router = server::build_router(state.clone());

    let live = router
        .clone()
        .oneshot(Request::builder().uri("/livez").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(live.status(), StatusCode::OK);

    let ready = router
        .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(ready.status(), StatusCode::SERVICE_UNAVAILABLE);

    state.health().mark_ready();
}

#[tokio::test]
async fn metrics_endpoint_serves_prometheus_text() {
    let (state, _dir) = state(rest_config());
    let router = server::build_router(state);

    let response = router
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(body.contains("webagent_sessions_active"));
}

#[tokio::test]
async fn tools_route_is_absent_under_stdio_transport() {
    let (state, _dir) = state(Config::default());
    let router = server::build_router(state);

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/tools/web_agent_session_create")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tools_route_dispatches_under_rest_transport() {
    let (state, _dir) = state(rest_config());
    let router = server::build_router(state);

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/tools/web_agent_session_create")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"target_url":"https://example.com"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["result"]["session_id"].is_string());
}

#[tokio::test]
async fn unknown_tool_name_returns_404_with_error_code() {
    let (state, _dir) = state(rest_config());
    let router = server::build_router(state);

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/tools/not_a_real_tool")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error_code"], "UNKNOWN_TOOL");
}
