//! Frame encoding and decoding for the HWIO protocol.
//!
//! Every message on the wire is one frame:
//! ```text
//! ┌──────────┬──────────────┬─────────────────┐
//! │ command  │ length (LE)  │      body       │
//! │  1 byte  │   2 bytes    │  length bytes   │
//! └──────────┴──────────────┴─────────────────┘
//! ```
//!
//! The length is trusted: the reader blocks until that many body bytes
//! arrive or the stream ends.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{FrameError, Result};
use crate::protocol::Command;

/// Maximum frame body size (64KB - 1).
pub const MAX_BODY_SIZE: usize = 65535;

/// Header size (command + 2-byte length).
pub const HEADER_SIZE: usize = 3;

/// One protocol message.
///
/// The length is always derived from the body, so a frame can never
/// claim more or fewer bytes than it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    command: u8,
    body: Bytes,
}

impl Frame {
    /// Creates a frame from a raw command byte and a body.
    ///
    /// # Errors
    ///
    /// Returns `FrameError::TooLarge` if the body does not fit the 16-bit
    /// length field.
    pub fn new(command: impl Into<u8>, body: impl Into<Bytes>) -> Result<Self, FrameError> {
        let body = body.into();
        if body.len() > MAX_BODY_SIZE {
            return Err(FrameError::TooLarge {
                size: body.len(),
                max: MAX_BODY_SIZE,
            });
        }
        Ok(Self {
            command: command.into(),
            body,
        })
    }

    /// Creates a frame with an empty body.
    #[must_use]
    pub fn empty(command: Command) -> Self {
        Self {
            command: command.into(),
            body: Bytes::new(),
        }
    }

    /// Raw command byte.
    #[must_use]
    pub const fn command(&self) -> u8 {
        self.command
    }

    /// Known command, or `None` for codes outside the protocol.
    #[must_use]
    pub const fn kind(&self) -> Option<Command> {
        Command::from_byte(self.command)
    }

    /// Body length as carried in the header.
    #[must_use]
    pub fn length(&self) -> u16 {
        // Bounded by MAX_BODY_SIZE at construction.
        self.body.len() as u16
    }

    /// Frame body.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns true if this frame has `command` and an empty body.
    #[must_use]
    pub fn is_empty_of(&self, command: Command) -> bool {
        self.command == u8::from(command) && self.body.is_empty()
    }

    /// Serializes header and body into one buffer.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.body.len());
        buf.put_u8(self.command);
        buf.put_u16_le(self.length());
        buf.put_slice(&self.body);
        buf.freeze()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Frame cmd:{}, len:{}, body:{}>",
            self.command,
            self.body.len(),
            hex::encode(&self.body)
        )
    }
}

/// Encodes a command and body into wire bytes.
///
/// # Errors
///
/// Returns `FrameError::TooLarge` if the body exceeds `MAX_BODY_SIZE`.
pub fn encode(command: Command, body: &[u8]) -> Result<Bytes, FrameError> {
    Ok(Frame::new(command, Bytes::copy_from_slice(body))?.encode())
}

/// Reads exactly one frame from the stream.
///
/// Reads the 3-byte header, then exactly `length` body bytes. Never reads
/// past the end of the frame.
///
/// # Errors
///
/// Returns `Error::Transport` if the stream fails or ends before the
/// header or the declared body is complete.
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header).await?;

    let command = header[0];
    let length = u16::from_le_bytes([header[1], header[2]]) as usize;

    let body = if length > 0 {
        let mut body = vec![0u8; length];
        reader.read_exact(&mut body).await?;
        Bytes::from(body)
    } else {
        Bytes::new()
    };

    tracing::trace!("received frame cmd {command}, {length} bytes");
    Ok(Frame { command, body })
}

/// Writes one frame to the stream and flushes it.
///
/// # Errors
///
/// Returns `Error::Transport` if the stream fails.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    tracing::trace!(
        "sending frame cmd {}, {} bytes",
        frame.command,
        frame.body.len()
    );
    writer.write_all(&frame.encode()).await?;
    writer.flush().await?;
    Ok(())
}
