//! Shared error type across churnserve crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Malformed or out-of-range input.
    ValidationFailed,
    /// Prediction store could not be reached or refused the write.
    StorageUnavailable,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::ValidationFailed => "VALIDATION_FAILED",
            ClientCode::StorageUnavailable => "STORAGE_UNAVAILABLE",
            ClientCode::Internal => "INTERNAL",
        }
    }

    /// Whether the caller caused the failure.
    pub fn is_client_error(self) -> bool {
        matches!(self, ClientCode::ValidationFailed)
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, ChurnError>;

/// Unified error type used by core and api.
#[derive(Debug, Error)]
pub enum ChurnError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    /// Fatal at boot: config, connection, or schema setup failed.
    #[error("startup failed: {0}")]
    Startup(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl ChurnError {
    /// Map internal error to a stable client-facing code.
    ///
    /// `Startup` never reaches a client; it maps to `Internal` for completeness.
    pub fn client_code(&self) -> ClientCode {
        match self {
            ChurnError::Validation(_) => ClientCode::ValidationFailed,
            ChurnError::StorageUnavailable(_) => ClientCode::StorageUnavailable,
            ChurnError::Startup(_) | ChurnError::Internal(_) => ClientCode::Internal,
        }
    }
}
