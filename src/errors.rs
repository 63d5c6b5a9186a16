//! Unified error taxonomy for the process boundary: every error that can
//! reach a tool caller or an HTTP response carries a stable `code()` and a
//! matching HTTP status, independent of which crate raised it.

use thiserror::Error;
use webagent_core_types::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Session(#[from] session_runtime::SessionError),
}

impl AppError {
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UnknownTool(_) => 404,
            AppError::Validation(_) => 400,
            AppError::Session(err) => match err.code() {
                "UNKNOWN_SESSION" => 404,
                "SESSION_NOT_ACTIVE" | "ALREADY_STARTED" | "MAX_STEPS_REACHED" | "DURATION_EXCEEDED" => 409,
                "INVALID_URL" | "INVALID_SCHEME" | "DISALLOWED_SCHEME" | "DOMAIN_NOT_ALLOWED" | "DOMAIN_DENIED" => 400,
                _ => 500,
            },
        }
    }

    pub fn to_response(&self) -> serde_json::Value {
        serde_json::json!({
            "error_code": self.code(),
            "message": self.to_string(),
        })
    }
}

impl DomainError for AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::UnknownTool(_) => "UNKNOWN_TOOL",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Session(err) => err.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tool_maps_to_404() {
        let err = AppError::UnknownTool("bogus".to_string());
        assert_eq!(err.code(), "UNKNOWN_TOOL");
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn validation_maps_to_400() {
        let err = AppError::Validation("target_url too long".to_string());
        assert_eq!(err.http_status(), 400);
    }
}
