// ABOUTME: Chat client error types for comprehensive error handling across all client operations
// ABOUTME: Provides structured error reporting with automatic conversion from underlying I/O errors

use std::io;
use thiserror::Error;

/// Comprehensive error type for chat client operations
///
/// Covers connection management, the identification gate and call
/// completion. Business outcomes the server reports as reply tags
/// (`no_room`, `no_client`) are *not* errors; see
/// [`SendOutcome`](crate::client::SendOutcome).
#[derive(Debug, Error)]
pub enum ClientError {
    /// I/O error during network operations (connection, write)
    #[error("connection error: {0}")]
    Connection(#[from] io::Error),

    /// The stream went away while a call was in flight, or before it started
    #[error("connection reset by peer")]
    ConnectionReset,

    /// A gated verb was called before `identify` completed; nothing was
    /// written to the wire
    #[error("not identified; call identify first")]
    NotIdentified,

    /// The server refused the requested name
    #[error("name already taken: {0}")]
    NameTaken(String),
}

/// Result type alias for chat client operations
pub type ClientResult<T> = Result<T, ClientError>;
