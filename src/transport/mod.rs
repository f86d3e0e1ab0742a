//! Transport layer for HWIO communication.
//!
//! A session runs over any connected, ordered, reliable byte stream.
//! Connection setup lives outside the session; [`tcp`] offers a helper
//! for the common case.

pub mod tcp;

use tokio::io::{AsyncRead, AsyncWrite};

/// Byte stream a session can run over.
pub trait ByteStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + ?Sized> ByteStream for T {}

pub use tcp::{TcpConfig, connect};
