//! Error types shared by every layer of the client.

use crate::wire::MessageKind;

/// Violations of the optimizer wire protocol.
///
/// Every variant is fatal for the session that observed it: the connection
/// is torn down and no resynchronization is attempted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    /// A frame carried no bytes at all
    #[error("empty frame")]
    EmptyFrame,

    /// The kind tag is not part of the vocabulary
    #[error("unknown message kind: {0}")]
    UnknownMessageKind(u8),

    /// The body does not have the size its kind requires
    #[error("malformed {kind} payload: {len} bytes")]
    MalformedPayload {
        /// Kind announced by the tag
        kind: MessageKind,
        /// Body length in bytes
        len: usize,
    },

    /// A frame length prefix exceeds the configured limit
    #[error("frame of {len} bytes exceeds limit of {max} bytes")]
    FrameTooLarge {
        /// Announced frame length
        len: usize,
        /// Configured maximum
        max: usize,
    },

    /// The server sent a message kind that is not valid at this point
    #[error("unexpected message: expected {expected}, got {actual}")]
    UnexpectedMessage {
        /// What the exchange required
        expected: &'static str,
        /// What actually arrived
        actual: MessageKind,
    },

    /// A parameter vector does not match the expanded slot layout
    #[error("number of parameters is wrong: got {actual}, expected {expected}")]
    SlotCountMismatch {
        /// Slots in the parameter space
        expected: usize,
        /// Values received
        actual: usize,
    },

    /// A chromosome buffer is shorter than the parameter space needs
    #[error("not enough bits: {available} available, {needed} needed")]
    InsufficientBits {
        /// Bits carried by the buffer
        available: usize,
        /// Bits required by the descriptors
        needed: usize,
    },
}

/// Invalid configuration detected before a session ever starts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Bounds or step of a descriptor are unusable
    #[error("invalid parameter '{name}': {reason}")]
    InvalidDescriptor {
        /// Descriptor name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// Two descriptors share a name
    #[error("duplicate parameter name: {0}")]
    DuplicateParameter(String),

    /// The parameter space is empty
    #[error("no parameters to optimize")]
    NoParameters,

    /// The chosen method cannot encode a descriptor kind
    #[error("method {method} does not support parameter '{name}'")]
    UnsupportedKind {
        /// Optimizer method name
        method: String,
        /// Offending descriptor
        name: String,
    },

    /// The method name does not map to a known strategy
    #[error("unknown optimization method: {0}")]
    UnknownMethod(String),

    /// No server host was given
    #[error("missing server host")]
    MissingHost,

    /// The server port is unusable
    #[error("invalid server port: {0}")]
    InvalidPort(u16),

    /// Population sizes must be positive
    #[error("invalid population size: {0}")]
    InvalidPopulation(String),

    /// Generation cap is neither -1 nor within `1..=1024`
    #[error("invalid generation count: {0}")]
    InvalidGenerations(i64),

    /// A configuration file could not be read or parsed
    #[error("failed to load configuration: {0}")]
    Unreadable(String),
}
