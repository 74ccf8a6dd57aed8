//! Error types for the toast manager.
//!
//! Manager operations never fail: unknown ids are no-ops or upserts. Errors
//! only come from construction and from (de)serializing config and events.

use thiserror::Error;

/// Main error type for toastkit.
#[derive(Debug, Error)]
pub enum ToastError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl From<serde_json::Error> for ToastError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            ToastError::Deserialization(e.to_string())
        } else {
            ToastError::Serialization(e.to_string())
        }
    }
}

/// Result type for toastkit.
pub type Result<T> = std::result::Result<T, ToastError>;
