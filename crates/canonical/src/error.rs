use thiserror::Error;

/// Errors that can occur while normalizing a food descriptor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid normalizer configuration: {0}")]
    InvalidConfig(String),
    #[error("food descriptor is empty after normalization")]
    Empty,
}
