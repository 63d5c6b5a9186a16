use serde::{Deserialize, Serialize};
use webagent_core_types::EpochMs;

/// The four points in a session's lifecycle that get a replay event.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayEventType {
    Create,
    Step,
    Snapshot,
    Stop,
}

/// One line of a trace's JSONL log. `index` is dense and 1-based within one
/// trace, assigned by the session (not recomputed here) from a session-local
/// monotonic counter — see `session-runtime`'s resolution of the replay
/// indexing race.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplayEvent {
    #[serde(rename = "type")]
    pub event_type: ReplayEventType,
    pub index: u64,
    pub at: EpochMs,
    pub payload: serde_json::Value,
}

/// Reconstructed view of one trace, built by replaying its JSONL file in order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TraceManifest {
    pub trace_id: String,
    pub created_at: EpochMs,
    pub session_id: Option<String>,
    pub events: Vec<ReplayEvent>,
}

/// Sidecar summary written next to the JSONL file so a caller can check the
/// event count without reading and parsing the whole trace.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TraceIndex {
    #[serde(rename = "traceId")]
    pub trace_id: String,
    pub total: u64,
    pub updated_at: EpochMs,
}
