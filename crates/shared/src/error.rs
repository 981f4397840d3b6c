use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid chat id '{0}': expected 32 hex characters")]
    InvalidChatId(String),
}

/// Outcome reported by the backend when a running chat is asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminateResult {
    Terminated,
    NotFound,
}
