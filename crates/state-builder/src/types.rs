use serde::{Deserialize, Serialize};
use webagent_core_types::{EpochMs, NetworkEvent};

use capture_coordinator::{FrameRef, QueueHealth};

/// One of the top 12 interactive elements captured in a DOM summary.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InteractiveElement {
    pub tag: String,
    pub id: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub text: String,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DomSummary {
    pub interactive_count: u32,
    pub text_inputs: u32,
    pub buttons: u32,
    pub links: u32,
    pub iframes: u32,
    pub canvas_nodes: u32,
    pub elements: Vec<InteractiveElement>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegionDetection {
    pub label: String,
    pub confidence: f64,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

/// Which observations a caller wants included in a built [`StatePacket`].
/// Absence means `false` for [`crate::Builder::build`] (the literal-honoring
/// `snapshot` path); the session runtime applies capture-profile defaults
/// before constructing this for `step`.
#[derive(Clone, Copy, Debug, Default)]
pub struct IncludeFlags {
    pub dom: bool,
    pub accessibility: bool,
    pub network: bool,
    pub frame: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatePacket {
    pub state_token: String,
    pub timestamp: EpochMs,
    pub session_id: String,
    pub url: String,
    pub title: String,
    pub dom: Option<DomSummary>,
    pub accessibility: Option<serde_json::Value>,
    pub network_events: Vec<NetworkEvent>,
    pub frame_refs: Vec<FrameRef>,
    pub region_detections: Option<Vec<RegionDetection>>,
    pub change_tokens: Vec<String>,
    pub queue_health: QueueHealth,
}

impl StatePacket {
    /// Structural copy with `session_id` set and a fresh `queue_health` copy,
    /// used when a packet built before the session id was known (there is
    /// none in this runtime, but kept as the seam the spec names) needs
    /// stamping.
    pub fn with_session_id(&self, session_id: &str) -> Self {
        let mut copy = self.clone();
        copy.session_id = session_id.to_string();
        copy.queue_health = self.queue_health.clone();
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(session_id: &str) -> StatePacket {
        StatePacket {
            state_token: "tok".to_string(),
            timestamp: 0,
            session_id: session_id.to_string(),
            url: "https://x.test".to_string(),
            title: "X".to_string(),
            dom: None,
            accessibility: None,
            network_events: Vec::new(),
            frame_refs: Vec::new(),
            region_detections: None,
            change_tokens: vec!["INIT".to_string()],
            queue_health: QueueHealth::default(),
        }
    }

    #[test]
    fn with_session_id_stamps_the_given_id_and_leaves_the_rest() {
        let original = packet("");
        let stamped = original.with_session_id("sess-1");

        assert_eq!(stamped.session_id, "sess-1");
        assert_eq!(stamped.state_token, original.state_token);
        assert_eq!(stamped.url, original.url);
        assert_eq!(stamped.change_tokens, original.change_tokens);
    }

    #[test]
    fn with_session_id_does_not_mutate_the_original() {
        let original = packet("sess-0");
        let _ = original.with_session_id("sess-1");
        assert_eq!(original.session_id, "sess-0");
    }
}
