//! Error types and handling
//!
//! Common error types used across the recorder, capture and messaging layers.

use crate::container::ContainerError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("No stream id")]
    NoStreamId,

    #[error("No supported type found for the media encoder")]
    UnsupportedCodec,

    #[error("Unknown message type")]
    UnknownMessageType,

    #[error("Invalid recorder state: {0}")]
    InvalidState(String),

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("{0}")]
    Runtime(String),
}

impl AppError {
    /// Stable machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::PermissionDenied(_) => "PERMISSION_DENIED",
            AppError::DeviceUnavailable(_) => "DEVICE_UNAVAILABLE",
            AppError::NoStreamId => "NO_STREAM_ID",
            AppError::UnsupportedCodec => "UNSUPPORTED_CODEC",
            AppError::UnknownMessageType => "UNKNOWN_MESSAGE_TYPE",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::Container(_) => "CONTAINER_ERROR",
            AppError::Runtime(_) => "RUNTIME_ERROR",
        }
    }
}

/// Error payload attached to failed message responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(error: &AppError) -> Self {
        ErrorResponse {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
