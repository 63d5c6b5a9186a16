//! The five-tool dispatch front door: `{tool, args}` in, `{result}` or
//! `{error_code, message}` out. Schema validation happens here, once, before
//! the request reaches the Session Manager.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use webagent_core_types::{SessionId, TraceId};

use crate::errors::AppError;
use session_runtime::{CreateSessionInput, SessionManager, StepInput, StopResult};

pub const TOOL_SESSION_CREATE: &str = "web_agent_session_create";
pub const TOOL_STEP: &str = "web_agent_step";
pub const TOOL_SNAPSHOT: &str = "web_agent_snapshot";
pub const TOOL_SESSION_STOP: &str = "web_agent_session_stop";
pub const TOOL_REPLAY: &str = "web_agent_replay";

#[derive(Clone, Debug, Deserialize)]
pub struct ToolRequest {
    pub tool: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum ToolResponse {
    Ok { result: Value },
    Err { error_code: String, message: String },
}

#[derive(Clone, Debug, Deserialize)]
struct SnapshotArgs {
    session_id: String,
    #[serde(default)]
    capture: Option<session_runtime::CaptureRequest>,
}

#[derive(Clone, Debug, Deserialize)]
struct StopArgs {
    session_id: String,
    #[serde(default)]
    preserve: bool,
}

#[derive(Clone, Debug, Deserialize)]
struct ReplayArgs {
    trace_id: String,
    #[serde(default)]
    start: Option<u64>,
    #[serde(default)]
    end: Option<u64>,
}

pub async fn dispatch(manager: &Arc<SessionManager>, request: ToolRequest) -> ToolResponse {
    let result = match request.tool.as_str() {
        TOOL_SESSION_CREATE => handle_create(manager, request.args).await,
        TOOL_STEP => handle_step(manager, request.args).await,
        TOOL_SNAPSHOT => handle_snapshot(manager, request.args).await,
        TOOL_SESSION_STOP => handle_stop(manager, request.args).await,
        TOOL_REPLAY => handle_replay(manager, request.args).await,
        other => Err(AppError::UnknownTool(other.to_string())),
    };

    match result {
        Ok(value) => ToolResponse::Ok { result: value },
        Err(err) => ToolResponse::Err {
            error_code: webagent_core_types::DomainError::code(&err).to_string(),
            message: err.to_string(),
        },
    }
}

async fn handle_create(manager: &Arc<SessionManager>, args: Value) -> Result<Value, AppError> {
    let input: CreateSessionInput =
        serde_json::from_value(args).map_err(|err| AppError::Validation(err.to_string()))?;
    validate_create(&input)?;

    let output = manager.create(input).await?;
    Ok(serde_json::to_value(output).expect("CreateSessionOutput always serializes"))
}

async fn handle_step(manager: &Arc<SessionManager>, args: Value) -> Result<Value, AppError> {
    #[derive(Deserialize)]
    struct Args {
        session_id: String,
        #[serde(flatten)]
        step: StepInput,
    }
    let args: Args = serde_json::from_value(args).map_err(|err| AppError::Validation(err.to_string()))?;
    validate_step(&args.step)?;

    let session_id = SessionId(args.session_id.clone());
    let session = manager
        .get(&session_id)
        .ok_or_else(|| AppError::Session(session_runtime::SessionError::UnknownSession(args.session_id)))?;
    manager.touch(&session_id).await?;

    let result = session.step(args.step).await?;
    Ok(serde_json::to_value(result).expect("StepResult always serializes"))
}

async fn handle_snapshot(manager: &Arc<SessionManager>, args: Value) -> Result<Value, AppError> {
    let args: SnapshotArgs = serde_json::from_value(args).map_err(|err| AppError::Validation(err.to_string()))?;
    if let Some(cap) = &args.capture {
        validate_capture(cap)?;
    }

    let session_id = SessionId(args.session_id.clone());
    let session = manager
        .get(&session_id)
        .ok_or_else(|| AppError::Session(session_runtime::SessionError::UnknownSession(args.session_id)))?;
    manager.touch(&session_id).await?;

    let packet = session.snapshot(args.capture).await?;
    Ok(serde_json::to_value(packet).expect("StatePacket always serializes"))
}

async fn handle_stop(manager: &Arc<SessionManager>, args: Value) -> Result<Value, AppError> {
    let args: StopArgs = serde_json::from_value(args).map_err(|err| AppError::Validation(err.to_string()))?;
    let session_id = SessionId(args.session_id.clone());

    let stop: Option<StopResult> = manager.stop(&session_id, args.preserve).await;
    let stop = stop.ok_or_else(|| AppError::Session(session_runtime::SessionError::UnknownSession(args.session_id)))?;
    Ok(serde_json::to_value(stop).expect("StopResult always serializes"))
}

/// Pure file read + filter + reconstruct — never launches a browser.
async fn handle_replay(manager: &Arc<SessionManager>, args: Value) -> Result<Value, AppError> {
    let args: ReplayArgs = serde_json::from_value(args).map_err(|err| AppError::Validation(err.to_string()))?;
    let trace_id = TraceId(args.trace_id);

    let events = manager
        .replay_store()
        .filter(&trace_id, args.start, args.end)
        .await
        .map_err(|err| AppError::Validation(err.to_string()))?;

    Ok(serde_json::json!({ "trace_id": trace_id.0, "events": events }))
}

fn validate_create(input: &CreateSessionInput) -> Result<(), AppError> {
    if input.target_url.is_empty() || input.target_url.len() > 2048 {
        return Err(AppError::Validation("target_url must be 1..=2048 chars".to_string()));
    }
    if let Some((w, h)) = input.viewport {
        if !(320..=7680).contains(&w) {
            return Err(AppError::Validation("viewport width out of range [320,7680]".to_string()));
        }
        if !(200..=4320).contains(&h) {
            return Err(AppError::Validation("viewport height out of range [200,4320]".to_string()));
        }
    }
    if let Some(steps) = input.max_steps {
        if !(1..=50_000).contains(&steps) {
            return Err(AppError::Validation("max_steps out of range [1,50000]".to_string()));
        }
    }
    if let Some(duration) = input.max_duration_ms {
        if duration < 1_000 {
            return Err(AppError::Validation("max_duration_ms must be >= 1000".to_string()));
        }
    }
    if let Some(cap) = &input.capture {
        validate_capture(cap)?;
    }
    Ok(())
}

fn validate_step(input: &StepInput) -> Result<(), AppError> {
    if let Some(timeout) = input.action.timeout_ms {
        if !(50..=120_000).contains(&timeout) {
            return Err(AppError::Validation("timeout_ms out of range [50,120000]".to_string()));
        }
    }
    if let Some(max_actions) = input.action.max_actions_per_step {
        if !(1..=20).contains(&max_actions) {
            return Err(AppError::Validation("max_actions_per_step out of range [1,20]".to_string()));
        }
    }
    if let Some(cap) = &input.capture {
        validate_capture(cap)?;
    }
    Ok(())
}

fn validate_capture(capture: &session_runtime::CaptureRequest) -> Result<(), AppError> {
    if let Some(max_frames) = capture.max_frames {
        if !(1..=64).contains(&max_frames) {
            return Err(AppError::Validation("capture.max_frames out of range [1,64]".to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use webagent_policy::UrlPolicy;

    async fn manager() -> (Arc<SessionManager>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mgr = SessionManager::new(
            Arc::new(session_runtime::StubDriverFactory::default()),
            Arc::new(replay_store::ReplayStore::new(dir.path())),
            UrlPolicy::default(),
            4,
            30 * 60 * 1_000,
            dir.path().to_path_buf(),
        );
        (Arc::new(mgr), dir)
    }

    #[tokio::test]
    async fn unknown_tool_returns_error_response() {
        let (mgr, _dir) = manager().await;
        let response = dispatch(&mgr, ToolRequest { tool: "bogus_tool".to_string(), args: Value::Null }).await;
        match response {
            ToolResponse::Err { error_code, message } => {
                assert_eq!(error_code, "UNKNOWN_TOOL");
                assert!(message.contains("bogus_tool"));
            }
            ToolResponse::Ok { .. } => panic!("expected an error response"),
        }
    }

    #[tokio::test]
    async fn create_then_step_round_trip_through_dispatch() {
        let (mgr, _dir) = manager().await;
        let create = dispatch(
            &mgr,
            ToolRequest {
                tool: TOOL_SESSION_CREATE.to_string(),
                args: serde_json::json!({ "target_url": "https://example.com" }),
            },
        )
        .await;
        let result = match create {
            ToolResponse::Ok { result } => result,
            ToolResponse::Err { error_code, message } => panic!("{error_code}: {message}"),
        };
        let session_id = result["session_id"].as_str().unwrap().to_string();

        let step = dispatch(
            &mgr,
            ToolRequest {
                tool: TOOL_STEP.to_string(),
                args: serde_json::json!({
                    "session_id": session_id,
                    "action": { "action": "wait", "timeout_ms": 100 },
                }),
            },
        )
        .await;
        assert!(matches!(step, ToolResponse::Ok { .. }));
    }

    #[tokio::test]
    async fn target_url_over_length_limit_is_rejected() {
        let (mgr, _dir) = manager().await;
        let long_url = format!("https://example.com/{}", "a".repeat(2048));
        let response = dispatch(
            &mgr,
            ToolRequest {
                tool: TOOL_SESSION_CREATE.to_string(),
                args: serde_json::json!({ "target_url": long_url }),
            },
        )
        .await;
        match response {
            ToolResponse::Err { error_code, .. } => assert_eq!(error_code, "VALIDATION_ERROR"),
            ToolResponse::Ok { .. } => panic!("expected rejection"),
        }
    }
}
