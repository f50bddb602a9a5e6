//! Session error type.

use eva_core::{ConfigError, ProtocolError};

use crate::SessionPhase;

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors that end a session.
///
/// Apart from [`SessionError::InvalidState`], every variant returned from a
/// live exchange has already torn the connection down. Reconnecting is left
/// to the caller.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The socket could not be opened or failed mid-exchange
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The server closed the connection while a reply was expected
    #[error("connection closed by optimizer")]
    ConnectionClosed,

    /// The server broke the protocol
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The server reported an application-level error
    #[error("optimizer error: {0}")]
    Remote(String),

    /// The session could not be configured
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The request document could not be serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An operation was called in a phase that does not allow it
    #[error("cannot {operation} while session is {phase}")]
    InvalidState {
        /// Attempted operation
        operation: &'static str,
        /// Phase at the time of the call
        phase: SessionPhase,
    },
}
