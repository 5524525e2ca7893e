//! Subcommand implementations.

pub mod account;
pub mod listen;
pub mod role;
pub mod route;
pub mod theme;

use talent_ops_client::{ApiError, ClientError, SessionError, StorageError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Login rejected (code {code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Invalid {field}: {value}")]
    InvalidArgument { field: &'static str, value: String },

    #[error("Failed to wait for shutdown signal: {0}")]
    Signal(#[from] std::io::Error),
}
