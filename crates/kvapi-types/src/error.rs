use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
