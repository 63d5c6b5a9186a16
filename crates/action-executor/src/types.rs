use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Navigate,
    Click,
    Hover,
    Type,
    Press,
    Scroll,
    Drag,
    Wait,
    WaitFor,
}

impl ActionKind {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "navigate" => ActionKind::Navigate,
            "click" => ActionKind::Click,
            "hover" => ActionKind::Hover,
            "type" => ActionKind::Type,
            "press" => ActionKind::Press,
            "scroll" => ActionKind::Scroll,
            "drag" => ActionKind::Drag,
            "wait" => ActionKind::Wait,
            "wait_for" => ActionKind::WaitFor,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Navigate => "navigate",
            ActionKind::Click => "click",
            ActionKind::Hover => "hover",
            ActionKind::Type => "type",
            ActionKind::Press => "press",
            ActionKind::Scroll => "scroll",
            ActionKind::Drag => "drag",
            ActionKind::Wait => "wait",
            ActionKind::WaitFor => "wait_for",
        }
    }
}

/// One action invocation, as it arrives from the step tool call. Field presence
/// varies by `action`; `validate_action` enumerates exactly which combinations
/// are required.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionInput {
    pub action: String,
    pub url: Option<String>,
    pub selector: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub text: Option<String>,
    pub key: Option<String>,
    pub delta_x: Option<f64>,
    pub delta_y: Option<f64>,
    pub timeout_ms: Option<u64>,
    pub max_actions_per_step: Option<u32>,
    /// For `wait_for`: one of `networkidle`/`network_idle`, `stable`/`domstable`,
    /// or a selector string to wait for.
    pub wait_condition: Option<String>,
}

impl ActionInput {
    pub fn has_coords(&self) -> bool {
        self.x.is_some() && self.y.is_some()
    }

    pub fn has_selector(&self) -> bool {
        self.selector.as_deref().map(|s| !s.is_empty()).unwrap_or(false)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub action: String,
    pub success: bool,
    pub status: String,
    pub target: Option<String>,
    pub selector: Option<String>,
    pub coordinates: Option<(f64, f64)>,
    pub detail: Option<String>,
    pub elapsed_ms: u64,
}

impl ActionResult {
    pub fn success(action: &str, target: String, elapsed_ms: u64) -> Self {
        Self {
            action: action.to_string(),
            success: true,
            status: "completed".to_string(),
            target: Some(target),
            selector: None,
            coordinates: None,
            detail: None,
            elapsed_ms,
        }
    }

    pub fn failure(action: &str, detail: String, elapsed_ms: u64) -> Self {
        Self {
            action: action.to_string(),
            success: false,
            status: "failed".to_string(),
            target: None,
            selector: None,
            coordinates: None,
            detail: Some(detail),
            elapsed_ms,
        }
    }

    pub fn with_selector(mut self, selector: Option<String>) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_coordinates(mut self, coords: Option<(f64, f64)>) -> Self {
        self.coordinates = coords;
        self
    }
}
