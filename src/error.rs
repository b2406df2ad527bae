//! Error types for Murmur.

use thiserror::Error;

use crate::chat::ConnectionId;

/// Common error type for Murmur.
#[derive(Error, Debug)]
pub enum MurmurError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A connection handle was registered twice.
    ///
    /// The transport hands out unique handles, so this indicates a bug in the
    /// caller rather than a runtime condition.
    #[error("connection {0} is already registered")]
    DuplicateConnection(ConnectionId),
}

/// Result type alias for Murmur operations.
pub type Result<T> = std::result::Result<T, MurmurError>;
