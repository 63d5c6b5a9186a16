use serde::{Deserialize, Serialize};
use webagent_core_types::{CaptureProfile, EpochMs, PolicyMode};

use action_executor::{ActionInput, ActionResult};
use capture_coordinator::{FrameRef, QueueHealth};
use state_builder::StatePacket;

/// Caller-supplied include flags for `step`/`snapshot`. `None` on an individual
/// flag means "use the profile default" for `step`'s normalization rule; for
/// `snapshot`, absence is honored literally as `false` (see
/// [`crate::session::Session::snapshot`]).
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureRequest {
    pub dom: Option<bool>,
    pub accessibility: Option<bool>,
    pub network: Option<bool>,
    pub frame: Option<bool>,
    pub max_frames: Option<u32>,
}

impl CaptureRequest {
    pub fn any_flag_set(&self) -> bool {
        self.dom.is_some() || self.accessibility.is_some() || self.network.is_some() || self.frame.is_some()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateSessionInput {
    pub target_url: String,
    pub viewport: Option<(u32, u32)>,
    pub capture_profile: Option<CaptureProfile>,
    pub policy_mode: Option<PolicyMode>,
    pub max_steps: Option<u64>,
    pub max_duration_ms: Option<u64>,
    pub capture: Option<CaptureRequest>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionCapabilities {
    pub capture_profile: CaptureProfile,
    pub max_steps: u64,
    pub max_duration_ms: u64,
    pub policy: PolicyMode,
    pub dom_first: bool,
    pub frame_capture: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateSessionOutput {
    pub session_id: String,
    pub trace_id: String,
    pub session_capabilities: SessionCapabilities,
    pub initial_state_snapshot: StatePacket,
    pub frame_ref: Option<FrameRef>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextRecommendation {
    Continue,
    Retry,
    FallbackOrAbandon,
    Halt,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StepInput {
    pub action: ActionInput,
    pub capture: Option<CaptureRequest>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepResult {
    pub state: StatePacket,
    pub frame_refs: Vec<FrameRef>,
    pub action_result: ActionResult,
    pub error_codes: Vec<String>,
    pub next_recommendation: NextRecommendation,
    pub latency_ms: u64,
    pub queue_health: QueueHealth,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupStatus {
    Cleaned,
    Retained,
    Noop,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StopResult {
    pub status: String,
    pub cleanup: CleanupStatus,
    pub trace_path: String,
}

pub type EpochMillis = EpochMs;
