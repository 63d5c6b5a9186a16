use thiserror::Error;
use webagent_core_types::DomainError;

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum UrlPolicyError {
    #[error("invalid url")]
    InvalidUrl,
    #[error("url scheme is not http or https")]
    InvalidScheme,
    #[error("url scheme is disallowed")]
    DisallowedScheme,
    #[error("domain is not on the allowlist")]
    DomainNotAllowed,
    #[error("domain is on the denylist")]
    DomainDenied,
}

impl DomainError for UrlPolicyError {
    fn code(&self) -> &'static str {
        match self {
            UrlPolicyError::InvalidUrl => "INVALID_URL",
            UrlPolicyError::InvalidScheme => "INVALID_SCHEME",
            UrlPolicyError::DisallowedScheme => "DISALLOWED_SCHEME",
            UrlPolicyError::DomainNotAllowed => "DOMAIN_NOT_ALLOWED",
            UrlPolicyError::DomainDenied => "DOMAIN_DENIED",
        }
    }
}
