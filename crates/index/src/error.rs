use std::time::Duration;

use thiserror::Error;

/// Failure of a single adapter call.
///
/// Never fatal to a search: the engine records it and treats the call as
/// having returned zero candidates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("backend rejected the request: {0}")]
    Rejected(String),
}

impl BackendError {
    pub fn unavailable<E: std::fmt::Display>(err: E) -> Self {
        Self::Unavailable(err.to_string())
    }

    pub fn transport<E: std::fmt::Display>(err: E) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn rejected<E: std::fmt::Display>(err: E) -> Self {
        Self::Rejected(err.to_string())
    }

    /// Transient failures worth another attempt. A rejected request fails
    /// the same way every time.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, BackendError::Rejected(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, BackendError::Timeout(_))
    }
}

/// Errors raised while building an in-memory store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read record file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse food records: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate record id `{0}`")]
    DuplicateId(String),
    #[error("record `{0}` has an empty display name")]
    EmptyName(String),
    #[error("record store lock poisoned")]
    Poisoned,
}
