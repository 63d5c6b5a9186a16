use thiserror::Error;
use webagent_core_types::DomainError;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize replay event: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl DomainError for ReplayError {
    fn code(&self) -> &'static str {
        match self {
            ReplayError::Io(_) => "REPLAY_IO",
            ReplayError::Serialize(_) => "REPLAY_SERIALIZE",
        }
    }
}
