use thiserror::Error;
use webagent_core_types::DomainError;

/// Structural validation failure on an [`crate::types::ActionInput`], before any
/// browser work happens. Each variant's `code()` matches the taxonomy in the spec.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ValidationError {
    #[error("unknown action")]
    InvalidAction,
    #[error("url is required")]
    MissingUrl,
    #[error("text is required")]
    MissingText,
    #[error("key is required")]
    MissingKey,
    #[error("selector or coordinates are required")]
    MissingTarget,
    #[error("selector must not be empty")]
    InvalidSelector,
    #[error("timeout_ms must be in [50, 120000]")]
    InvalidTimeout,
    #[error("max_actions_per_step must be 1 in phase 1")]
    InvalidActionLimit,
}

impl DomainError for ValidationError {
    fn code(&self) -> &'static str {
        match self {
            ValidationError::InvalidAction => "INVALID_ACTION",
            ValidationError::MissingUrl => "MISSING_URL",
            ValidationError::MissingText => "MISSING_TEXT",
            ValidationError::MissingKey => "MISSING_KEY",
            ValidationError::MissingTarget => "MISSING_TARGET",
            ValidationError::InvalidSelector => "INVALID_SELECTOR",
            ValidationError::InvalidTimeout => "INVALID_TIMEOUT",
            ValidationError::InvalidActionLimit => "INVALID_ACTION_LIMIT",
        }
    }
}

/// Failure while actually dispatching an action to the driver. Never crosses the
/// tool boundary directly — the session runtime folds these into a structural
/// `ActionResult { success: false, .. }` so a step always returns a complete
/// state packet.
#[derive(Debug, Error, Clone)]
pub enum ActionError {
    #[error("action timeout after {0}ms")]
    Timeout(u64),
    #[error("selector not found and coordinates missing")]
    SelectorNotFoundAndCoordinatesMissing,
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("driver error: {0}")]
    Driver(#[from] browser_driver::DriverError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ActionError {
    /// `true` when the message should route `next_recommendation` to
    /// `fallback_or_abandon` rather than `retry` (the message contains "timeout").
    pub fn is_timeout_like(&self) -> bool {
        self.to_string().to_lowercase().contains("timeout")
    }
}
