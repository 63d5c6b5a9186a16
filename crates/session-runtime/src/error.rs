use thiserror::Error;
use webagent_core_types::DomainError;
use webagent_policy::UrlPolicyError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is not active")]
    NotActive,
    #[error("session already started")]
    AlreadyStarted,
    #[error("max_steps reached")]
    MaxStepsReached,
    #[error("session exceeded max_duration_ms")]
    DurationExceeded,
    #[error("unknown session id: {0}")]
    UnknownSession(String),
    #[error(transparent)]
    UrlPolicy(#[from] UrlPolicyError),
    #[error(transparent)]
    Driver(#[from] browser_driver::DriverError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError for SessionError {
    fn code(&self) -> &'static str {
        match self {
            SessionError::NotActive => "SESSION_NOT_ACTIVE",
            SessionError::AlreadyStarted => "ALREADY_STARTED",
            SessionError::MaxStepsReached => "MAX_STEPS_REACHED",
            SessionError::DurationExceeded => "DURATION_EXCEEDED",
            SessionError::UnknownSession(_) => "UNKNOWN_SESSION",
            SessionError::UrlPolicy(inner) => inner.code(),
            SessionError::Driver(_) => "DRIVER_ERROR",
            SessionError::Internal(_) => "INTERNAL",
        }
    }
}
