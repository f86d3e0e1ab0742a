//! Body layouts for each HWIO command.
//!
//! All multi-byte integers are little-endian.
//!
//! ```text
//! QueryReq   := SpecItem*                      (396 bytes each)
//! QueryResp  := (typeIdx:u8, deviceId:u8)*
//! ReadReq    := deviceId:u8 | addr:u32 | size:u16
//! ReadResp   := value:u32
//! WriteReq   := deviceId:u8 | addr:u32 | size:u16 | data:byte[size]
//! ErrorMsg   := code:i32 | message:byte[<=1024]
//! ```

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::protocol::ServerErrorCode;
use crate::protocol::frame::MAX_BODY_SIZE;
use crate::types::CompatSpec;

/// Size of the fixed part of read and write requests.
pub const ACCESS_HEADER_SIZE: usize = 7;

/// Size of a read response body.
pub const READ_RESP_SIZE: usize = 4;

/// Largest payload a single write can carry.
pub const MAX_WRITE_DATA: usize = MAX_BODY_SIZE - ACCESS_HEADER_SIZE;

/// Longest message text in an error frame.
pub const MAX_ERROR_MSG_LEN: usize = 1024;

/// Register read request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    /// Server-assigned device id.
    pub device_id: u8,
    /// Register offset within the device.
    pub addr: u32,
    /// Requested access width in bytes.
    pub size: u16,
}

impl ReadRequest {
    /// Encodes the 7-byte request body.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(ACCESS_HEADER_SIZE);
        buf.put_u8(self.device_id);
        buf.put_u32_le(self.addr);
        buf.put_u16_le(self.size);
        buf.freeze()
    }

    /// Decodes a request body.
    pub fn decode(mut body: &[u8]) -> Result<Self> {
        if body.len() != ACCESS_HEADER_SIZE {
            return Err(Error::protocol(format!(
                "read request must be {ACCESS_HEADER_SIZE} bytes, got {}",
                body.len()
            )));
        }
        Ok(Self {
            device_id: body.get_u8(),
            addr: body.get_u32_le(),
            size: body.get_u16_le(),
        })
    }
}

/// Register write request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    /// Server-assigned device id.
    pub device_id: u8,
    /// Register offset within the device.
    pub addr: u32,
    /// Raw bytes to store.
    pub data: Bytes,
}

impl WriteRequest {
    /// Encodes the request body: fixed header followed by the data.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if the data exceeds
    /// [`MAX_WRITE_DATA`] bytes.
    pub fn encode(&self) -> Result<Bytes> {
        if self.data.len() > MAX_WRITE_DATA {
            return Err(Error::invalid_argument(format!(
                "write payload is {} bytes, limit is {MAX_WRITE_DATA}",
                self.data.len()
            )));
        }
        let mut buf = BytesMut::with_capacity(ACCESS_HEADER_SIZE + self.data.len());
        buf.put_u8(self.device_id);
        buf.put_u32_le(self.addr);
        buf.put_u16_le(self.data.len() as u16);
        buf.put_slice(&self.data);
        Ok(buf.freeze())
    }

    /// Decodes a request body. The size field must match the data length.
    pub fn decode(body: &[u8]) -> Result<Self> {
        if body.len() < ACCESS_HEADER_SIZE {
            return Err(Error::protocol(format!(
                "write request too short: {} bytes",
                body.len()
            )));
        }
        let mut header = &body[..ACCESS_HEADER_SIZE];
        let device_id = header.get_u8();
        let addr = header.get_u32_le();
        let size = header.get_u16_le() as usize;
        let data = &body[ACCESS_HEADER_SIZE..];
        if data.len() != size {
            return Err(Error::protocol(format!(
                "write request declares {size} bytes, carries {}",
                data.len()
            )));
        }
        Ok(Self {
            device_id,
            addr,
            data: Bytes::copy_from_slice(data),
        })
    }
}

/// Decodes a read response into its 32-bit value.
///
/// The response is always one 32-bit word, whatever width was requested.
pub fn decode_read_response(body: &[u8]) -> Result<u32> {
    let raw: [u8; READ_RESP_SIZE] = body.try_into().map_err(|_| {
        Error::protocol(format!(
            "read response must be {READ_RESP_SIZE} bytes, got {}",
            body.len()
        ))
    })?;
    Ok(u32::from_le_bytes(raw))
}

/// Encodes a query body: one fixed-size item per descriptor, no count.
///
/// # Errors
///
/// Returns `Error::InvalidArgument` if a descriptor has an oversized field
/// or the list does not fit in one frame.
pub fn encode_query(specs: &[CompatSpec]) -> Result<Bytes> {
    let size = specs.len() * CompatSpec::SIZE;
    if size > MAX_BODY_SIZE {
        return Err(Error::invalid_argument(format!(
            "{} descriptors do not fit in one query",
            specs.len()
        )));
    }
    let mut buf = BytesMut::with_capacity(size);
    for spec in specs {
        spec.encode(&mut buf)?;
    }
    Ok(buf.freeze())
}

/// Decodes a query body. Item count is inferred from the body length.
pub fn decode_query(mut body: &[u8]) -> Result<Vec<CompatSpec>> {
    if body.len() % CompatSpec::SIZE != 0 {
        return Err(Error::protocol(format!(
            "query body of {} bytes is not a whole number of items",
            body.len()
        )));
    }
    let mut specs = Vec::with_capacity(body.len() / CompatSpec::SIZE);
    while body.has_remaining() {
        specs.push(CompatSpec::decode(&mut body)?);
    }
    Ok(specs)
}

/// One device the server found for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceMatch {
    /// Index of the device type on the server.
    pub type_index: u8,
    /// Device id to address in reads and writes.
    pub device_id: u8,
}

/// Decodes a query response into its `(type_index, device_id)` pairs,
/// in server order.
pub fn decode_query_response(body: &[u8]) -> Result<Vec<DeviceMatch>> {
    if body.len() % 2 != 0 {
        return Err(Error::protocol(format!(
            "query response of {} bytes is not a whole number of pairs",
            body.len()
        )));
    }
    Ok(body
        .chunks_exact(2)
        .map(|pair| DeviceMatch {
            type_index: pair[0],
            device_id: pair[1],
        })
        .collect())
}

/// Encodes a query response body.
#[must_use]
pub fn encode_query_response(matches: &[DeviceMatch]) -> Bytes {
    let mut buf = BytesMut::with_capacity(matches.len() * 2);
    for m in matches {
        buf.put_u8(m.type_index);
        buf.put_u8(m.device_id);
    }
    buf.freeze()
}

/// Error report sent by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    /// Raw error code.
    pub code: i32,
    /// Message text.
    pub message: String,
}

impl ErrorMessage {
    /// Known error code, if any.
    #[must_use]
    pub const fn kind(&self) -> Option<ServerErrorCode> {
        ServerErrorCode::from_code(self.code)
    }

    /// Decodes an error frame body. The text ends at the first NUL or
    /// after [`MAX_ERROR_MSG_LEN`] bytes.
    pub fn decode(mut body: &[u8]) -> Result<Self> {
        if body.len() < 4 {
            return Err(Error::protocol(format!(
                "error message too short: {} bytes",
                body.len()
            )));
        }
        let code = body.get_i32_le();
        let text = &body[..body.len().min(MAX_ERROR_MSG_LEN)];
        let len = text.iter().position(|&b| b == 0).unwrap_or(text.len());
        Ok(Self {
            code,
            message: String::from_utf8_lossy(&text[..len]).into_owned(),
        })
    }

    /// Encodes an error frame body.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let text = self.message.as_bytes();
        let text = &text[..text.len().min(MAX_ERROR_MSG_LEN)];
        let mut buf = BytesMut::with_capacity(4 + text.len());
        buf.put_i32_le(self.code);
        buf.put_slice(text);
        buf.freeze()
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => write!(f, "{kind:?} ({}): {}", self.code, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}
