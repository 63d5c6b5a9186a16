use axum::{
    extract::{Path, State},
    http::Method,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use prometheus::{Encoder, TextEncoder};
use tracing::error;

use crate::config::Transport;
use crate::metrics;
use crate::tools::{self, ToolRequest, ToolResponse};

use super::state::ServeState;

/// Operational surface (`/health`, `/livez`, `/readyz`, `/metrics`) is always
/// mounted; `POST /tools/{name}` is added only when the configured transport
/// is `rest`, per the tool dispatch front door's HTTP binding.
pub fn build_router(state: ServeState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/livez", get(live_handler))
        .route("/readyz", get(ready_handler))
        .route("/metrics", get(metrics_handler));

    if state.config.transport == Transport::Rest {
        router = router.route("/tools/:name", post(tools_handler));
    }

    router.layer(cors_layer()).with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

async fn health_handler(State(state): State<ServeState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "sessions_active": state.manager.len(),
        "sessions_max": state.config.max_sessions,
    }))
}

async fn live_handler(State(state): State<ServeState>) -> impl IntoResponse {
    if state.health().is_live() {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn ready_handler(State(state): State<ServeState>) -> impl IntoResponse {
    if state.health().is_ready() {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn metrics_handler() -> impl IntoResponse {
    metrics::register_metrics();
    let registry = metrics::global_registry();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&registry.gather(), &mut buffer) {
        error!(?err, "failed to encode prometheus metrics");
        return (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "metric encode error").into_response();
    }

    match String::from_utf8(buffer) {
        Ok(body) => match axum::http::HeaderValue::from_str(encoder.format_type()) {
            Ok(content_type) => ([(axum::http::header::CONTENT_TYPE, content_type)], body).into_response(),
            Err(err) => {
                error!(?err, "failed to build content-type header for metrics");
                (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "metric encode error").into_response()
            }
        },
        Err(err) => {
            error!(?err, "failed to convert prometheus metrics to utf8");
            (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "metric encode error").into_response()
        }
    }
}

async fn tools_handler(
    State(state): State<ServeState>,
    Path(name): Path<String>,
    Json(args): Json<Value>,
) -> impl IntoResponse {
    let response = tools::dispatch(&state.manager, ToolRequest { tool: name, args }).await;
    match response {
        ToolResponse::Ok { result } => (axum::http::StatusCode::OK, Json(json!({ "result": result }))),
        ToolResponse::Err { error_code, message } => {
            let status = status_for_code(&error_code);
            (status, Json(json!({ "error_code": error_code, "message": message })))
        }
    }
}

fn status_for_code(code: &str) -> axum::http::StatusCode {
    use axum::http::StatusCode;
    match code {
        "UNKNOWN_TOOL" | "UNKNOWN_SESSION" => StatusCode::NOT_FOUND,
        "VALIDATION_ERROR" | "INVALID_URL" | "INVALID_SCHEME" | "DISALLOWED_SCHEME" | "DOMAIN_NOT_ALLOWED"
        | "DOMAIN_DENIED" => StatusCode::BAD_REQUEST,
        "SESSION_NOT_ACTIVE" | "ALREADY_STARTED" | "MAX_STEPS_REACHED" | "DURATION_EXCEEDED" => {
            StatusCode::CONFLICT
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
