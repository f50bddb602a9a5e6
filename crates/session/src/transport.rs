//! Framed byte-stream transport to the optimizer.
//!
//! Each message travels as a `u32` little-endian length prefix followed by
//! the encoded message (kind tag + body).

use async_trait::async_trait;
use eva_core::{ProtocolError, WireMessage};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::Result;

/// Largest frame accepted by default (64 MiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// A connection that exchanges whole messages.
#[async_trait]
pub trait Transport: Send {
    /// Write one message.
    async fn send(&mut self, message: &WireMessage) -> Result<()>;

    /// Read one message. `None` when the peer closed the connection
    /// between frames.
    async fn recv(&mut self) -> Result<Option<WireMessage>>;
}

/// Opens transports to the optimizer.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Transport produced by this connector.
    type Transport: Transport;

    /// Open a new connection.
    async fn connect(&self) -> Result<Self::Transport>;
}

/// Length-prefixed framing over any byte stream.
pub struct FramedTransport<S> {
    stream: S,
    max_frame_len: usize,
}

impl<S> FramedTransport<S> {
    /// Wrap a stream.
    pub fn new(stream: S, max_frame_len: usize) -> Self {
        Self {
            stream,
            max_frame_len,
        }
    }
}

#[async_trait]
impl<S> Transport for FramedTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, message: &WireMessage) -> Result<()> {
        let frame = message.encode();
        let len = u32::try_from(frame.len()).map_err(|_| ProtocolError::FrameTooLarge {
            len: frame.len(),
            max: u32::MAX as usize,
        })?;

        self.stream.write_u32_le(len).await?;
        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;

        debug!("Sent {} message ({} bytes)", message.kind(), frame.len());
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<WireMessage>> {
        let len = match self.stream.read_u32_le().await {
            Ok(len) => len as usize,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if len > self.max_frame_len {
            return Err(ProtocolError::FrameTooLarge {
                len,
                max: self.max_frame_len,
            }
            .into());
        }

        let mut frame = vec![0u8; len];
        self.stream.read_exact(&mut frame).await?;

        let message = WireMessage::decode(&frame)?;
        debug!("Received {} message ({} bytes)", message.kind(), len);
        Ok(Some(message))
    }
}

/// Connects to the optimizer over TCP.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    host: String,
    port: u16,
    max_frame_len: usize,
}

impl TcpConnector {
    /// Create a connector for `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Set the frame size limit.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Transport = FramedTransport<TcpStream>;

    async fn connect(&self) -> Result<Self::Transport> {
        info!("Connecting to optimizer at {}:{}", self.host, self.port);
        let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        stream.set_nodelay(true)?;
        Ok(FramedTransport::new(stream, self.max_frame_len))
    }
}
