//! Top-level error type for embedding applications.

use thiserror::Error;

use crate::auth::SessionError;
use crate::config::ConfigError;
use crate::http::ApiError;
use crate::realtime::RealtimeError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Realtime error: {0}")]
    Realtime(#[from] RealtimeError),
}

/// Result type alias for client operations.
pub type Result<T, E = ClientError> = std::result::Result<T, E>;
