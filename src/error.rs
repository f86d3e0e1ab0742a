//! Error types for the hwio-remote library.

use thiserror::Error;

use crate::protocol::Frame;

/// The main error type for hwio-remote operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Byte stream failure: write error, short read, peer closed or read timeout.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Frame encoding error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A well-formed frame arrived but broke the expected command/body contract.
    #[error("protocol error: {message}")]
    Protocol {
        message: String,
        /// The offending frame, kept for diagnostics.
        frame: Option<Box<Frame>>,
    },

    /// Echo check or device query failed while binding a session.
    #[error("handshake error: {message}")]
    Handshake { message: String },

    /// Caller-supplied data violates a fixed-width contract.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },
}

impl Error {
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
            frame: None,
        }
    }

    pub(crate) fn handshake(message: impl Into<String>) -> Self {
        Self::Handshake {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Returns true for byte stream failures.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true for contract violations on a received or encoded frame.
    #[must_use]
    pub const fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol { .. } | Self::Frame(_))
    }

    /// Returns true when a session could not be bound.
    #[must_use]
    pub const fn is_handshake(&self) -> bool {
        matches!(self, Self::Handshake { .. })
    }

    /// Returns true when the caller passed malformed data.
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    /// Returns the raw frame attached to a protocol error, if any.
    #[must_use]
    pub fn frame(&self) -> Option<&Frame> {
        match self {
            Self::Protocol { frame, .. } => frame.as_deref(),
            _ => None,
        }
    }
}

/// Frame-specific errors.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Frame body exceeds what the 16-bit length field can describe.
    #[error("frame too large: {size} bytes exceeds maximum {max}")]
    TooLarge { size: usize, max: usize },
}

/// Result type alias for hwio-remote operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
