//! Session Manager (admission, lookup, aging, GC) and Browser Session state
//! machine (`Created -> Starting -> Active -> Stopping -> Stopped`) binding
//! the browser driver, capture coordinator, state builder, action executor,
//! replay store and URL policy into one create/step/snapshot/stop loop.

mod driver_factory;
mod error;
mod manager;
pub mod metrics;
mod session;
mod types;

pub use driver_factory::{ChromiumDriverFactory, DriverFactory, StubDriverFactory};
pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Session, SessionConfig, SessionState};
pub use types::{
    CaptureRequest, CleanupStatus, CreateSessionInput, CreateSessionOutput, NextRecommendation,
    SessionCapabilities, StepInput, StepResult, StopResult,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use action_executor::ActionInput;
    use webagent_core_types::{CaptureProfile, DomainError, PolicyMode};
    use webagent_policy::UrlPolicy;

    fn manager(tmp: &std::path::Path) -> SessionManager {
        SessionManager::new(
            Arc::new(StubDriverFactory::default()),
            Arc::new(replay_store::ReplayStore::new(tmp)),
            UrlPolicy::default(),
            4,
            30 * 60 * 1_000,
            tmp.to_path_buf(),
        )
    }

    fn create_input(url: &str) -> CreateSessionInput {
        CreateSessionInput {
            target_url: url.to_string(),
            viewport: None,
            capture_profile: Some(CaptureProfile::DomOnly),
            policy_mode: Some(PolicyMode::ModelOwnsAction),
            max_steps: Some(10),
            max_duration_ms: Some(60_000),
            capture: None,
        }
    }

    #[tokio::test]
    async fn create_step_snapshot_stop_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(dir.path());

        let created = mgr.create(create_input("https://example.com")).await.unwrap();
        assert_eq!(created.initial_state_snapshot.change_tokens, vec!["INIT".to_string()]);

        let session_id = webagent_core_types::SessionId(created.session_id.clone());
        let session = mgr.get(&session_id).unwrap();

        let step = session
            .step(StepInput {
                action: ActionInput {
                    action: "click".to_string(),
                    x: Some(1.0),
                    y: Some(2.0),
                    ..Default::default()
                },
                capture: None,
            })
            .await
            .unwrap();
        assert!(step.action_result.success);
        assert_eq!(step.state.change_tokens, vec!["NO_CHANGE".to_string()]);

        let snap = session.snapshot(None).await.unwrap();
        assert!(snap.dom.is_none());

        let stop = mgr.stop(&session_id, false).await.unwrap();
        assert_eq!(stop.cleanup, CleanupStatus::Cleaned);
        assert!(mgr.get(&session_id).is_none());
    }

    #[tokio::test]
    async fn invariant_4_stopped_session_is_idempotent_and_inert() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(dir.path());
        let created = mgr.create(create_input("https://example.com")).await.unwrap();
        let session_id = webagent_core_types::SessionId(created.session_id.clone());
        let session = mgr.get(&session_id).unwrap();

        let first = session.stop(true).await;
        assert_eq!(first.cleanup, CleanupStatus::Retained);
        let second = session.stop(true).await;
        assert_eq!(second.cleanup, CleanupStatus::Noop);

        let err = session
            .step(StepInput {
                action: ActionInput {
                    action: "wait".to_string(),
                    ..Default::default()
                },
                capture: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "SESSION_NOT_ACTIVE");
    }

    #[tokio::test]
    async fn invariant_7_policy_denied_step_mutates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(dir.path());
        let mut input = create_input("https://example.com");
        input.policy_mode = Some(PolicyMode::Deterministic);
        let created = mgr.create(input).await.unwrap();
        let session_id = webagent_core_types::SessionId(created.session_id.clone());
        let session = mgr.get(&session_id).unwrap();

        let result = session
            .step(StepInput {
                action: ActionInput {
                    action: "navigate".to_string(),
                    url: Some("javascript:alert(1)".to_string()),
                    ..Default::default()
                },
                capture: None,
            })
            .await
            .unwrap();

        assert_eq!(result.action_result.status, "policy_denied");
        assert_eq!(result.error_codes, vec!["POLICY_DENIED".to_string()]);
        assert_eq!(result.next_recommendation, NextRecommendation::Halt);

        let trace_id = webagent_core_types::TraceId(created.trace_id.clone());
        let manifest = replay_store::ReplayStore::new(dir.path()).load(&trace_id).await.unwrap();
        assert_eq!(manifest.events.len(), 1, "only the create event should be recorded");
    }

    #[tokio::test]
    async fn max_steps_budget_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(dir.path());
        let mut input = create_input("https://example.com");
        input.max_steps = Some(1);
        let created = mgr.create(input).await.unwrap();
        let session_id = webagent_core_types::SessionId(created.session_id.clone());
        let session = mgr.get(&session_id).unwrap();

        let ok = session
            .step(StepInput {
                action: ActionInput { action: "wait".to_string(), timeout_ms: Some(100), ..Default::default() },
                capture: None,
            })
            .await
            .unwrap();
        assert!(ok.action_result.success);

        let err = session
            .step(StepInput {
                action: ActionInput { action: "wait".to_string(), timeout_ms: Some(100), ..Default::default() },
                capture: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "MAX_STEPS_REACHED");
    }

    #[tokio::test]
    async fn unknown_url_scheme_is_rejected_at_create() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(dir.path());
        let err = mgr.create(create_input("ftp://example.com")).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_SCHEME");
    }

    #[tokio::test]
    async fn gc_evicts_stale_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = SessionManager::new(
            Arc::new(StubDriverFactory::default()),
            Arc::new(replay_store::ReplayStore::new(dir.path())),
            UrlPolicy::default(),
            4,
            0,
            dir.path().to_path_buf(),
        );
        mgr.create(create_input("https://example.com")).await.unwrap();
        assert_eq!(mgr.len(), 1);

        let evicted = mgr.gc().await;
        assert_eq!(evicted, 1);
        assert!(mgr.is_empty());
    }
}
