use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{info, warn};
use webagent_core_types::{now_epoch_ms, CaptureProfile, PolicyMode, SessionId, TraceId};
use webagent_policy::UrlPolicy;

use crate::driver_factory::DriverFactory;
use crate::error::SessionError;
use crate::metrics;
use crate::session::{Session, SessionConfig};
use crate::types::{CreateSessionInput, CreateSessionOutput};
use replay_store::ReplayStore;

const DEFAULT_MAX_STEPS: u64 = 500;
const DEFAULT_MAX_DURATION_MS: u64 = 30 * 60 * 1_000;

/// Bounded, process-wide pool of admitted sessions. Mirrors the teacher's
/// `DashMap<Id, Arc<RwLock<Ctx>>>` registry shape, with `Session` owning its
/// own interior locking instead of wrapping it in an outer `RwLock`.
pub struct SessionManager {
    sessions: DashMap<SessionId, Arc<Session>>,
    driver_factory: Arc<dyn DriverFactory>,
    replay_store: Arc<ReplayStore>,
    url_policy: UrlPolicy,
    max_sessions: usize,
    session_max_age_ms: u64,
    traces_root: PathBuf,
}

impl SessionManager {
    pub fn new(
        driver_factory: Arc<dyn DriverFactory>,
        replay_store: Arc<ReplayStore>,
        url_policy: UrlPolicy,
        max_sessions: usize,
        session_max_age_ms: u64,
        traces_root: PathBuf,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            driver_factory,
            replay_store,
            url_policy,
            max_sessions,
            session_max_age_ms,
            traces_root,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn replay_store(&self) -> &Arc<ReplayStore> {
        &self.replay_store
    }

    pub async fn create(&self, input: CreateSessionInput) -> Result<CreateSessionOutput, SessionError> {
        self.url_policy.validate(&input.target_url)?;

        if self.sessions.len() >= self.max_sessions {
            if let Some(oldest) = self.oldest_session_id().await {
                warn!(session_id = %oldest.0, reason = "capacity", "evicting session");
                self.stop(&oldest, false).await;
                metrics::SESSIONS_EVICTED.with_label_values(&["capacity"]).inc();
            }
        }

        let session_id = SessionId::new();
        let trace_id = TraceId::new(&session_id, now_epoch_ms());

        let capture_profile = input.capture_profile.unwrap_or_default();
        let policy_mode = input.policy_mode.unwrap_or_default();
        let requested_max_frames = input.capture.and_then(|c| c.max_frames);

        let config = SessionConfig {
            target_url: input.target_url.clone(),
            viewport: input.viewport,
            capture_profile,
            policy_mode,
            max_steps: input.max_steps.unwrap_or(DEFAULT_MAX_STEPS),
            max_duration_ms: input.max_duration_ms.unwrap_or(DEFAULT_MAX_DURATION_MS),
            requested_max_frames,
            traces_root: self.traces_root.clone(),
        };
        let capabilities = config.capabilities();

        let session = Session::new(session_id.clone(), trace_id.clone(), config, Arc::clone(&self.replay_store));

        let driver = self.driver_factory.launch(input.viewport).await?;
        let (initial_state, frame_ref) = match session.start(driver).await {
            Ok(result) => result,
            Err(err) => return Err(err),
        };

        self.sessions.insert(session_id.clone(), Arc::clone(&session));
        metrics::SESSIONS_ACTIVE.set(self.sessions.len() as i64);
        info!(session_id = %session_id.0, trace_id = %trace_id.0, "session created");

        Ok(CreateSessionOutput {
            session_id: session_id.0,
            trace_id: trace_id.0,
            session_capabilities: capabilities,
            initial_state_snapshot: initial_state,
            frame_ref,
        })
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    pub async fn touch(&self, id: &SessionId) -> Result<(), SessionError> {
        let session = self
            .get(id)
            .ok_or_else(|| SessionError::UnknownSession(id.0.clone()))?;
        session.touch().await;
        Ok(())
    }

    /// No-op on an unknown id, matching the spec's `stop` failure semantics.
    pub async fn stop(&self, id: &SessionId, preserve: bool) -> Option<crate::types::StopResult> {
        let session = self.sessions.remove(id).map(|(_, session)| session)?;
        metrics::SESSIONS_ACTIVE.set(self.sessions.len() as i64);
        Some(session.stop(preserve).await)
    }

    /// Sweeps sessions idle longer than `session_max_age_ms`; per-session stop
    /// failures are swallowed so one stuck session cannot halt the sweep.
    pub async fn gc(&self) -> usize {
        let now = now_epoch_ms();
        let mut stale = Vec::new();
        for entry in self.sessions.iter() {
            let last_touch = entry.value().last_touch_ms().await;
            if now.saturating_sub(last_touch) > self.session_max_age_ms {
                stale.push(entry.key().clone());
            }
        }

        let mut evicted = 0;
        for id in stale {
            if self.stop(&id, false).await.is_some() {
                warn!(session_id = %id.0, reason = "age", "evicting session");
                metrics::SESSIONS_EVICTED.with_label_values(&["age"]).inc();
                evicted += 1;
            }
        }
        evicted
    }

    /// "Oldest" means least-recently-active: a session touched by a recent
    /// step/snapshot looks newer for eviction purposes even if it was created
    /// first.
    async fn oldest_session_id(&self) -> Option<SessionId> {
        let mut oldest: Option<(SessionId, u64)> = None;
        for entry in self.sessions.iter() {
            let last_touch = entry.value().last_touch_ms().await;
            if oldest.as_ref().map(|(_, ts)| last_touch < *ts).unwrap_or(true) {
                oldest = Some((entry.key().clone(), last_touch));
            }
        }
        oldest.map(|(id, _)| id)
    }
}

pub fn default_policy_mode() -> PolicyMode {
    PolicyMode::ModelOwnsAction
}

pub fn default_capture_profile() -> CaptureProfile {
    CaptureProfile::Adaptive
}
