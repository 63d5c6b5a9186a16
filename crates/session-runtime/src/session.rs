use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, instrument, warn};

use action_executor::execute;
use browser_driver::{Driver, NetworkEventKind, RawNetworkEvent};
use capture_coordinator::{resolve_frame_cap, CaptureConfig, CaptureCoordinator, FrameRef};
use replay_store::{ReplayEvent, ReplayEventType, ReplayStore};
use state_builder::{IncludeFlags, StateBuilder, StatePacket};
use webagent_core_types::{now_epoch_ms, CaptureProfile, EpochMs, NetworkEvent, NetworkRing, PolicyMode, SessionId, TraceId};
use webagent_policy::{ActionGate, PolicyDecision};

use crate::error::SessionError;
use crate::metrics;
use crate::types::{
    CaptureRequest, CleanupStatus, NextRecommendation, SessionCapabilities, StepInput, StepResult,
    StopResult,
};

const GENERAL_NETWORK_RING_CAPACITY: usize = 500;
const CAPTURE_QUALITY: u32 = 70;
const CAPTURE_MAX_WIDTH: u32 = 1280;
const CAPTURE_MAX_HEIGHT: u32 = 800;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionState {
    Created,
    Starting,
    Active,
    Stopping,
    Stopped,
}

/// What the Session Manager resolves at admission time and hands to a new
/// [`Session`]; everything here is immutable for the session's lifetime.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub target_url: String,
    pub viewport: Option<(u32, u32)>,
    pub capture_profile: CaptureProfile,
    pub policy_mode: PolicyMode,
    pub max_steps: u64,
    pub max_duration_ms: u64,
    pub requested_max_frames: Option<u32>,
    pub traces_root: PathBuf,
}

impl SessionConfig {
    pub fn capabilities(&self) -> SessionCapabilities {
        SessionCapabilities {
            capture_profile: self.capture_profile,
            max_steps: self.max_steps,
            max_duration_ms: self.max_duration_ms,
            policy: self.policy_mode,
            dom_first: true,
            frame_capture: self.capture_profile != CaptureProfile::DomOnly,
        }
    }
}

/// Mutable state guarded by one lock so the replay-index counter, the step
/// index, and the recency timestamp never diverge under a raced caller (the
/// session does not self-serialize; this lock is the seam that makes the
/// replay-index counter safe anyway — see the spec's resolution of the
/// replay indexing race).
struct Inner {
    state: SessionState,
    step_index: u64,
    last_touch_ms: EpochMs,
    next_replay_index: u64,
}

pub struct Session {
    pub id: SessionId,
    pub trace_id: TraceId,
    pub config: SessionConfig,
    created_at: EpochMs,
    inner: Mutex<Inner>,
    driver: Mutex<Option<Arc<dyn Driver>>>,
    capture: Mutex<Option<Arc<CaptureCoordinator>>>,
    network_ring: Mutex<NetworkRing>,
    network_seq: AtomicU64,
    state_builder: StateBuilder,
    replay_store: Arc<ReplayStore>,
    gate: ActionGate,
}

impl Session {
    pub fn new(
        id: SessionId,
        trace_id: TraceId,
        config: SessionConfig,
        replay_store: Arc<ReplayStore>,
    ) -> Arc<Self> {
        let gate = ActionGate::new(config.policy_mode);
        Arc::new(Self {
            id,
            trace_id,
            created_at: now_epoch_ms(),
            inner: Mutex::new(Inner {
                state: SessionState::Created,
                step_index: 0,
                last_touch_ms: now_epoch_ms(),
                next_replay_index: 1,
            }),
            driver: Mutex::new(None),
            capture: Mutex::new(None),
            network_ring: Mutex::new(NetworkRing::new(GENERAL_NETWORK_RING_CAPACITY)),
            network_seq: AtomicU64::new(0),
            state_builder: StateBuilder::new(),
            replay_store,
            gate,
            config,
        })
    }

    fn trace_dir(&self) -> PathBuf {
        self.config.traces_root.join(self.trace_id.sanitized())
    }

    /// Launch+navigate, wire up network/capture, append the `create` replay
    /// event. On any failure, attempts best-effort teardown of whatever was
    /// already acquired and returns the originating error.
    #[instrument(skip(self, driver), fields(session_id = %self.id.0))]
    pub async fn start(
        self: &Arc<Self>,
        driver: Arc<dyn Driver>,
    ) -> Result<(StatePacket, Option<FrameRef>), SessionError> {
        {
            let mut inner = self.inner.lock().await;
            if inner.state != SessionState::Created {
                return Err(SessionError::AlreadyStarted);
            }
            inner.state = SessionState::Starting;
        }

        if let Err(err) = self.start_inner(&driver).await {
            self.best_effort_teardown(&driver).await;
            let mut inner = self.inner.lock().await;
            inner.state = SessionState::Stopped;
            return Err(err);
        }

        let mut inner = self.inner.lock().await;
        inner.state = SessionState::Active;
        inner.last_touch_ms = now_epoch_ms();
        drop(inner);

        *self.driver.lock().await = Some(Arc::clone(&driver));

        let include = IncludeFlags {
            dom: self.config.capture_profile != CaptureProfile::FramesOnly,
            accessibility: true,
            network: true,
            frame: self.config.capture_profile != CaptureProfile::DomOnly,
        };
        let packet = self.build_state(&driver, include).await;
        let frame_ref = packet.frame_refs.last().cloned();

        self.append_replay(
            ReplayEventType::Create,
            serde_json::json!({
                "session_id": self.id.0,
                "trace_id": self.trace_id.0,
                "target_url": self.config.target_url,
            }),
        )
        .await;

        info!(session_id = %self.id.0, url = %self.config.target_url, "session started");
        Ok((packet, frame_ref))
    }

    async fn start_inner(self: &Arc<Self>, driver: &Arc<dyn Driver>) -> Result<(), SessionError> {
        driver
            .navigate(&self.config.target_url, Duration::from_millis(120_000))
            .await?;

        let (tx, rx) = mpsc::unbounded_channel();
        driver.subscribe_network(tx).await?;
        self.spawn_network_forwarder(rx);

        if self.config.capture_profile != CaptureProfile::DomOnly {
            let frame_cap = resolve_frame_cap(self.config.capture_profile, self.config.requested_max_frames);
            let capture = Arc::new(CaptureCoordinator::new(
                Arc::clone(driver),
                CaptureConfig {
                    enabled: true,
                    session_id: self.id.clone(),
                    trace_id: self.trace_id.clone(),
                    quality: CAPTURE_QUALITY,
                    max_width: CAPTURE_MAX_WIDTH,
                    max_height: CAPTURE_MAX_HEIGHT,
                    max_frames: frame_cap,
                    adaptive: self.config.capture_profile == CaptureProfile::Adaptive,
                    trace_dir: self.trace_dir(),
                },
            ));
            capture.start().await?;
            *self.capture.lock().await = Some(capture);
        }

        // Seed the replay index counter from whatever this trace already holds
        // on disk (normally empty for a brand new trace, but a restarted
        // process reusing a trace id picks up where it left off).
        let manifest = self
            .replay_store
            .load(&self.trace_id)
            .await
            .map_err(|err| SessionError::Internal(err.to_string()))?;
        let mut inner = self.inner.lock().await;
        inner.next_replay_index = manifest.events.len() as u64 + 1;

        Ok(())
    }

    fn spawn_network_forwarder(self: &Arc<Self>, mut rx: mpsc::UnboundedReceiver<RawNetworkEvent>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(raw) = rx.recv().await {
                let seq = this.network_seq.fetch_add(1, Ordering::SeqCst);
                let event = match raw.kind {
                    NetworkEventKind::Request => {
                        NetworkEvent::request(seq, raw.url, raw.method, raw.time_ms)
                    }
                    NetworkEventKind::Response => {
                        NetworkEvent::response(seq, raw.url, raw.status.unwrap_or(0), raw.time_ms)
                    }
                    NetworkEventKind::Failure => NetworkEvent::failure(
                        seq,
                        raw.url,
                        raw.failure_text.unwrap_or_default(),
                        raw.time_ms,
                    ),
                };
                this.network_ring.lock().await.push(event);
            }
        });
    }

    async fn best_effort_teardown(&self, driver: &Arc<dyn Driver>) {
        if let Some(capture) = self.capture.lock().await.take() {
            capture.stop().await;
        }
        if let Err(err) = driver.close().await {
            debug!(%err, "best-effort driver close failed during start teardown");
        }
    }

    fn normalize_capture(&self, requested: Option<CaptureRequest>) -> (IncludeFlags, Option<u32>) {
        let profile = self.config.capture_profile;
        let defaults = IncludeFlags {
            dom: profile != CaptureProfile::FramesOnly,
            accessibility: profile != CaptureProfile::FramesOnly,
            network: true,
            frame: profile != CaptureProfile::DomOnly,
        };
        match requested {
            None => (defaults, None),
            Some(req) if !req.any_flag_set() => (defaults, req.max_frames),
            Some(req) => (
                IncludeFlags {
                    dom: req.dom.unwrap_or(false),
                    accessibility: req.accessibility.unwrap_or(false),
                    network: req.network.unwrap_or(false),
                    frame: req.frame.unwrap_or(false),
                },
                req.max_frames,
            ),
        }
    }

    async fn build_state(&self, driver: &Arc<dyn Driver>, include: IncludeFlags) -> StatePacket {
        self.build_state_with_frames(driver, include, None).await
    }

    async fn build_state_with_frames(
        &self,
        driver: &Arc<dyn Driver>,
        include: IncludeFlags,
        max_frames: Option<u32>,
    ) -> StatePacket {
        let capture = self.capture.lock().await.clone();

        // Snapshot the ring and release the lock before any further driver
        // suspension point (DOM/AX evaluation) runs, so the network-event
        // forwarder is never blocked on a page evaluation.
        let events = self.network_ring.lock().await.snapshot();
        let mut ring_snapshot = NetworkRing::new(GENERAL_NETWORK_RING_CAPACITY);
        for event in events {
            ring_snapshot.push(event);
        }

        self.state_builder
            .build(
                driver.as_ref(),
                &self.id.0,
                include,
                &ring_snapshot,
                capture.as_deref(),
                max_frames,
            )
            .await
    }

    async fn append_replay(&self, event_type: ReplayEventType, payload: serde_json::Value) {
        let index = {
            let mut inner = self.inner.lock().await;
            let index = inner.next_replay_index;
            inner.next_replay_index += 1;
            index
        };
        let event = ReplayEvent {
            event_type,
            index,
            at: now_epoch_ms(),
            payload,
        };
        if let Err(err) = self.replay_store.append(&self.trace_id, &event).await {
            warn!(%err, session_id = %self.id.0, "failed to append replay event");
            return;
        }
        if let Err(err) = self.replay_store.persist_trace_index(&self.trace_id, index).await {
            warn!(%err, session_id = %self.id.0, "failed to persist trace index");
        }
    }

    #[instrument(skip(self, input), fields(session_id = %self.id.0, action = %input.action.action))]
    pub async fn step(self: &Arc<Self>, input: StepInput) -> Result<StepResult, SessionError> {
        let started = std::time::Instant::now();

        let driver = {
            let inner = self.inner.lock().await;
            if inner.state != SessionState::Active {
                return Err(SessionError::NotActive);
            }
            if inner.step_index >= self.config.max_steps {
                return Err(SessionError::MaxStepsReached);
            }
            if now_epoch_ms().saturating_sub(self.created_at) > self.config.max_duration_ms {
                return Err(SessionError::DurationExceeded);
            }
            self.driver.lock().await.clone().ok_or(SessionError::NotActive)?
        };

        let (include, max_frames) = self.normalize_capture(input.capture);
        let pre_state = self.build_state_with_frames(&driver, include, max_frames).await;

        let decision = self
            .gate
            .evaluate(&input.action.action, input.action.url.as_deref());
        if decision == PolicyDecision::Deny {
            let elapsed = started.elapsed().as_millis() as u64;
            let mut action_result = action_executor::ActionResult::failure(
                &input.action.action,
                "policy denied".to_string(),
                elapsed,
            );
            action_result.status = "policy_denied".to_string();
            let frame_refs = pre_state.frame_refs.clone();
            let queue_health = pre_state.queue_health.clone();
            return Ok(StepResult {
                state: pre_state,
                frame_refs,
                action_result,
                error_codes: vec!["POLICY_DENIED".to_string()],
                next_recommendation: NextRecommendation::Halt,
                latency_ms: elapsed,
                queue_health,
            });
        }

        // Run the action against a private ring so the shared one is never
        // locked across the action's own suspension points (driver calls can
        // run for up to the clamped timeout); merge what the executor
        // recorded back in afterward under a brief, non-suspending lock.
        let action_kind = input.action.action.clone();
        let mut action_ring = NetworkRing::new(GENERAL_NETWORK_RING_CAPACITY);
        let action_result = execute(driver.as_ref(), &input.action, &mut action_ring).await;
        if !action_ring.is_empty() {
            let mut ring = self.network_ring.lock().await;
            for event in action_ring.snapshot() {
                ring.push(event);
            }
        }

        if matches!(action_kind.as_str(), "wait" | "wait_for") {
            if let Some(capture) = self.capture.lock().await.as_ref() {
                capture.signal_visual_drift();
            }
        }

        let post_state = self.build_state_with_frames(&driver, include, max_frames).await;

        let (step_index, latency_ms) = {
            let mut inner = self.inner.lock().await;
            inner.step_index += 1;
            inner.last_touch_ms = now_epoch_ms();
            (inner.step_index, started.elapsed().as_millis() as u64)
        };
        debug!(step_index, success = action_result.success, "step executed");
        metrics::STEPS_TOTAL
            .with_label_values(&[if action_result.success { "success" } else { "failure" }])
            .inc();

        let mut error_codes = Vec::new();
        let next_recommendation = if action_result.success {
            NextRecommendation::Continue
        } else {
            let detail = action_result.detail.clone().unwrap_or_default();
            error_codes.push("ACTION_FAILED".to_string());
            if action_executor::is_retryable_failure(&detail) {
                NextRecommendation::Retry
            } else {
                NextRecommendation::FallbackOrAbandon
            }
        };
        if post_state.network_events.is_empty() {
            error_codes.push("NO_NETWORK_EVENT".to_string());
        }

        let result = StepResult {
            frame_refs: post_state.frame_refs.clone(),
            queue_health: post_state.queue_health.clone(),
            state: post_state,
            action_result: action_result.clone(),
            error_codes,
            next_recommendation,
            latency_ms,
        };

        self.append_replay(
            ReplayEventType::Step,
            serde_json::json!({
                "action": action_kind,
                "success": action_result.success,
                "step_index": step_index,
            }),
        )
        .await;

        Ok(result)
    }

    #[instrument(skip(self), fields(session_id = %self.id.0))]
    pub async fn snapshot(&self, capture: Option<CaptureRequest>) -> Result<StatePacket, SessionError> {
        let driver = {
            let inner = self.inner.lock().await;
            if inner.state != SessionState::Active {
                return Err(SessionError::NotActive);
            }
            self.driver.lock().await.clone().ok_or(SessionError::NotActive)?
        };

        let req = capture.unwrap_or_default();
        let include = IncludeFlags {
            dom: req.dom.unwrap_or(false),
            accessibility: req.accessibility.unwrap_or(false),
            network: req.network.unwrap_or(false),
            frame: req.frame.unwrap_or(false),
        };
        let packet = self.build_state_with_frames(&driver, include, req.max_frames).await;

        self.append_replay(
            ReplayEventType::Snapshot,
            serde_json::json!({ "include": {
                "dom": include.dom,
                "accessibility": include.accessibility,
                "network": include.network,
                "frame": include.frame,
            }}),
        )
        .await;

        Ok(packet)
    }

    #[instrument(skip(self), fields(session_id = %self.id.0))]
    pub async fn stop(&self, preserve: bool) -> StopResult {
        let trace_path = self
            .replay_store
            .traces_root()
            .join(format!("{}.jsonl", self.trace_id.sanitized()));

        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Active && inner.state != SessionState::Starting {
            return StopResult {
                status: "stopped".to_string(),
                cleanup: CleanupStatus::Noop,
                trace_path: trace_path.to_string_lossy().into_owned(),
            };
        }
        inner.state = SessionState::Stopping;
        drop(inner);

        if let Some(capture) = self.capture.lock().await.take() {
            capture.stop().await;
        }
        if let Some(driver) = self.driver.lock().await.take() {
            if let Err(err) = driver.close().await {
                debug!(%err, "best-effort driver close failed during stop");
            }
        }

        self.append_replay(ReplayEventType::Stop, serde_json::json!({ "preserve": preserve }))
            .await;

        let cleanup = if preserve {
            CleanupStatus::Retained
        } else {
            self.replay_store.cleanup(&self.trace_id).await;
            CleanupStatus::Cleaned
        };

        let mut inner = self.inner.lock().await;
        inner.state = SessionState::Stopped;

        info!(session_id = %self.id.0, preserve, "session stopped");
        StopResult {
            status: "stopped".to_string(),
            cleanup,
            trace_path: trace_path.to_string_lossy().into_owned(),
        }
    }

    pub async fn touch(&self) {
        self.inner.lock().await.last_touch_ms = now_epoch_ms();
    }

    pub async fn last_touch_ms(&self) -> EpochMs {
        self.inner.lock().await.last_touch_ms
    }

    pub fn created_at(&self) -> EpochMs {
        self.created_at
    }

    pub async fn is_active(&self) -> bool {
        self.inner.lock().await.state == SessionState::Active
    }
}
