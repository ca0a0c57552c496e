//! Crate-wide error type for the storage engine.
//!
//! RPC-facing errors (`crate::auth::AuthError`) are kept separate so that an
//! authn/authz denial can short-circuit a request before any `LogError` is
//! even possible.

use thiserror::Error;
use tonic_types::{ErrorDetails, StatusExt};

#[derive(Debug, Error)]
pub enum LogError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("segment is full")]
    OutOfSpace,

    #[error("no booking found for offset: {0}")]
    OffsetOutOfRange(u64),

    #[error("no booking found for UUID: {0}")]
    BookingNotFound(String),

    #[error("corrupt data: {0}")]
    Corrupt(&'static str),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, LogError>;

impl From<LogError> for tonic::Status {
    fn from(err: LogError) -> Self {
        match err {
            LogError::OffsetOutOfRange(_) | LogError::BookingNotFound(_) => {
                localized_status(tonic::Code::NotFound, err.to_string())
            }
            LogError::OutOfSpace => tonic::Status::resource_exhausted(err.to_string()),
            LogError::InvalidConfig(_) => tonic::Status::invalid_argument(err.to_string()),
            LogError::Corrupt(_) | LogError::Io(_) => tonic::Status::internal(err.to_string()),
        }
    }
}

/// Wraps a status with an `en-US` localized-message detail, so clients get
/// a human-readable message alongside the status code.
pub fn localized_status(code: tonic::Code, message: impl Into<String>) -> tonic::Status {
    let message = message.into();
    let details = ErrorDetails::with_localized_message("en-US", message.clone());
    tonic::Status::with_error_details(code, message, details)
}
