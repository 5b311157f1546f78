//! Error types for tenantgate

use thiserror::Error;

use crate::guard::Denial;

/// The main error type for tenantgate operations
#[derive(Debug, Error)]
pub enum GateError {
    #[error("storage: {0}")]
    Storage(#[from] heed::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not initialized")]
    NotInitialized,
    #[error("Already init at {0}")]
    AlreadyInitialized(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("invalid: {0}")]
    Invalid(String),
    #[error("denied: {0}")]
    Denied(#[from] Denial),
}

/// Result type alias for tenantgate operations
pub type Result<T> = std::result::Result<T, GateError>;

pub(crate) fn invalid(msg: impl Into<String>) -> GateError {
    GateError::Invalid(msg.into())
}
