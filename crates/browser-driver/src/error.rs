use thiserror::Error;
use webagent_core_types::DomainError;

/// Failures surfaced by the browser driver. These sit below the Action Executor's
/// own `ActionError` and the Session Manager's lifecycle errors; the driver only
/// knows about the browser, not about sessions or policy.
#[derive(Debug, Error, Clone)]
pub enum DriverError {
    #[error("navigation timed out after {0}ms")]
    NavTimeout(u64),

    #[error("cdp io error: {0}")]
    CdpIo(String),

    #[error("target not found: {0}")]
    TargetNotFound(String),

    #[error("element not found for selector: {0}")]
    ElementNotFound(String),

    #[error("chrome executable not found; set chrome_executable or install a Chromium build")]
    ExecutableNotFound,

    #[error("internal driver error: {0}")]
    Internal(String),
}

impl DomainError for DriverError {
    fn code(&self) -> &'static str {
        match self {
            DriverError::NavTimeout(_) => "NAV_TIMEOUT",
            DriverError::CdpIo(_) => "CDP_IO",
            DriverError::TargetNotFound(_) => "TARGET_NOT_FOUND",
            DriverError::ElementNotFound(_) => "ELEMENT_NOT_FOUND",
            DriverError::ExecutableNotFound => "EXECUTABLE_NOT_FOUND",
            DriverError::Internal(_) => "INTERNAL",
        }
    }
}

impl From<chromiumoxide::error::CdpError> for DriverError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        DriverError::CdpIo(err.to_string())
    }
}
