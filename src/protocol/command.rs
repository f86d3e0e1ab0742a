//! Command codes for the HWIO protocol.
//!
//! Every frame starts with a command byte. Requests and responses share
//! the same code space.

/// Command codes carried in the first header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Read from a device register.
    Read = 1,
    /// Read response, always a 32-bit word.
    ReadResp = 2,
    /// Write to a device register. Never acknowledged.
    Write = 3,
    /// Liveness probe with an empty body.
    EchoRequest = 4,
    /// Reply to `EchoRequest` with an empty body.
    EchoReply = 5,
    /// Resolve compatibility descriptors to device ids.
    Query = 6,
    /// Device id pairs matching a `Query`.
    QueryResp = 7,
    /// Client ends the conversation. Never answered.
    Bye = 8,
    /// Server error report.
    ErrorMsg = 9,
}

impl Command {
    /// Converts a raw command byte, if it is a known code.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Read),
            2 => Some(Self::ReadResp),
            3 => Some(Self::Write),
            4 => Some(Self::EchoRequest),
            5 => Some(Self::EchoReply),
            6 => Some(Self::Query),
            7 => Some(Self::QueryResp),
            8 => Some(Self::Bye),
            9 => Some(Self::ErrorMsg),
            _ => None,
        }
    }
}

impl From<Command> for u8 {
    fn from(cmd: Command) -> Self {
        cmd as Self
    }
}

/// Error codes a server reports in an `ErrorMsg` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ServerErrorCode {
    /// Command byte not understood.
    UnknownCommand = 1,
    /// Body did not match the command layout.
    MalformedPacket = 2,
    /// Client asked for more devices than the server allows.
    DeviceCountExceeded = 3,
    /// Device is not associated with this client.
    AccessDenied = 4,
    /// Register access failed on the server.
    IoError = 5,
}

impl ServerErrorCode {
    /// Converts a raw error code, if it is a known one.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::UnknownCommand),
            2 => Some(Self::MalformedPacket),
            3 => Some(Self::DeviceCountExceeded),
            4 => Some(Self::AccessDenied),
            5 => Some(Self::IoError),
            _ => None,
        }
    }
}
