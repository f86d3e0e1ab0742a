//! # hwio-remote
//!
//! A Rust client library for the HWIO remote register access protocol.
//!
//! An HWIO server exposes hardware devices (FPGA cores, peripherals) over a
//! byte stream, usually TCP. A client identifies the device it wants by
//! compatibility descriptors and then reads and writes its registers.
//!
//! ## Features
//!
//! - Async/await based API using Tokio
//! - Works over any `AsyncRead + AsyncWrite` stream
//! - Type-safe frame and message encoding
//! - Comprehensive error handling
//!
//! ## Quick Start
//!
//! ```no_run
//! use hwio_remote::{CompatSpec, DeviceSession, TcpConfig, Version};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hwio_remote::Error> {
//!     // Connect to an HWIO server
//!     let stream = hwio_remote::connect(&TcpConfig::new("127.0.0.1:8896")).await?;
//!
//!     // Bind to the first device matching the descriptor
//!     let spec = CompatSpec::new("xilinx", "axi_gpio", Version::new(1, 0, 0));
//!     let mut device = DeviceSession::connect(stream, &[spec]).await?;
//!     println!("Bound to device {}", device.device_id());
//!
//!     device.write32(0x04, 0x0000_00FF).await?;
//!     let value = device.read32(0x00).await?;
//!     println!("Register 0x00: {value:#010x}");
//!
//!     // Close the conversation
//!     device.bye().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`protocol`] - Wire level: frames, commands and message bodies
//! - [`types`] - Version numbers and compatibility descriptors
//! - [`transport`] - Stream abstraction and the TCP connection helper
//! - [`session`] - Handshake and register access for one bound device

pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use error::{Error, FrameError, Result};
pub use protocol::{Command, DeviceMatch, ErrorMessage, Frame, ServerErrorCode};
pub use session::{DeviceSession, SessionConfig};
pub use transport::{ByteStream, TcpConfig, connect};
pub use types::{CompatSpec, VERSION_NA, Version};
