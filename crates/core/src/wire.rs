//! Message vocabulary of the optimizer socket and its byte encoding.
//!
//! An encoded message is a one-byte kind tag followed by the body:
//!
//! ```text
//! tag | body
//! 0   | (empty)                     Welcome
//! 1   | utf-8 text                  Error
//! 2   | raw bytes                   Text
//! 3   | f64 little-endian           Scalar
//! 4   | n x f64 little-endian       Vector
//! ```
//!
//! Message boundaries are carried by the transport, so bodies have no
//! length field and text has no terminator.

use std::fmt;

use crate::ProtocolError;

/// Token the server sends to ask whether another generation should run,
/// and the affirmative answer.
pub const CONTINUE_TOKEN: &str = "continue";

/// Answer that stops the run.
pub const TERMINATE_TOKEN: &str = "terminate";

const F64_SIZE: usize = std::mem::size_of::<f64>();

/// Kind tag of a wire message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    /// Greeting sent by the server right after connect
    Welcome = 0,
    /// Application-level failure reported by the server
    Error = 1,
    /// Raw bytes: tokens or chromosome buffers
    Text = 2,
    /// Single double
    Scalar = 3,
    /// Vector of doubles
    Vector = 4,
}

impl MessageKind {
    /// Resolve a tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Welcome),
            1 => Some(Self::Error),
            2 => Some(Self::Text),
            3 => Some(Self::Scalar),
            4 => Some(Self::Vector),
            _ => None,
        }
    }

    /// Tag byte on the wire.
    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Welcome => write!(f, "welcome"),
            MessageKind::Error => write!(f, "error"),
            MessageKind::Text => write!(f, "text"),
            MessageKind::Scalar => write!(f, "scalar"),
            MessageKind::Vector => write!(f, "vector"),
        }
    }
}

/// One message exchanged with the remote optimizer.
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    /// Greeting
    Welcome,
    /// Server-side failure
    Error(String),
    /// Raw bytes
    Text(Vec<u8>),
    /// Single value
    Scalar(f64),
    /// Value vector
    Vector(Vec<f64>),
}

impl WireMessage {
    /// Text message from a string.
    pub fn text(text: impl AsRef<str>) -> Self {
        Self::Text(text.as_ref().as_bytes().to_vec())
    }

    /// Kind tag of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Welcome => MessageKind::Welcome,
            Self::Error(_) => MessageKind::Error,
            Self::Text(_) => MessageKind::Text,
            Self::Scalar(_) => MessageKind::Scalar,
            Self::Vector(_) => MessageKind::Vector,
        }
    }

    /// Whether this is a text message equal to `token`.
    pub fn is_token(&self, token: &str) -> bool {
        matches!(self, Self::Text(bytes) if bytes.as_slice() == token.as_bytes())
    }

    /// Size of the body in bytes.
    pub fn body_len(&self) -> usize {
        match self {
            Self::Welcome => 0,
            Self::Error(text) => text.len(),
            Self::Text(bytes) => bytes.len(),
            Self::Scalar(_) => F64_SIZE,
            Self::Vector(values) => values.len() * F64_SIZE,
        }
    }

    /// Encode into tag + body.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.body_len());
        out.push(self.kind().tag());

        match self {
            Self::Welcome => {}
            Self::Error(text) => out.extend_from_slice(text.as_bytes()),
            Self::Text(bytes) => out.extend_from_slice(bytes),
            Self::Scalar(value) => out.extend_from_slice(&value.to_le_bytes()),
            Self::Vector(values) => {
                for value in values {
                    out.extend_from_slice(&value.to_le_bytes());
                }
            }
        }

        out
    }

    /// Decode a tag + body buffer.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let (&tag, body) = bytes.split_first().ok_or(ProtocolError::EmptyFrame)?;
        let kind = MessageKind::from_tag(tag).ok_or(ProtocolError::UnknownMessageKind(tag))?;

        let malformed = || ProtocolError::MalformedPayload {
            kind,
            len: body.len(),
        };

        match kind {
            MessageKind::Welcome => {
                if !body.is_empty() {
                    return Err(malformed());
                }
                Ok(Self::Welcome)
            }
            MessageKind::Error => Ok(Self::Error(String::from_utf8_lossy(body).into_owned())),
            MessageKind::Text => Ok(Self::Text(body.to_vec())),
            MessageKind::Scalar => {
                if body.len() != F64_SIZE {
                    return Err(malformed());
                }
                Ok(Self::Scalar(read_f64_le(body, 0)))
            }
            MessageKind::Vector => {
                if body.len() % F64_SIZE != 0 {
                    return Err(malformed());
                }
                let values = (0..body.len() / F64_SIZE)
                    .map(|i| read_f64_le(body, i * F64_SIZE))
                    .collect();
                Ok(Self::Vector(values))
            }
        }
    }
}

#[inline]
fn read_f64_le(bytes: &[u8], offset: usize) -> f64 {
    let mut raw = [0u8; F64_SIZE];
    raw.copy_from_slice(&bytes[offset..offset + F64_SIZE]);
    f64::from_le_bytes(raw)
}
