//! Protocol definitions for HWIO communication.
//!
//! This module contains the low-level protocol types including:
//! - Frame encoding/decoding
//! - Command codes
//! - Request and response body layouts

pub mod command;
pub mod frame;
pub mod message;

pub use command::{Command, ServerErrorCode};
pub use frame::{Frame, HEADER_SIZE, MAX_BODY_SIZE, encode as encode_frame, read_frame, write_frame};
pub use message::{
    DeviceMatch, ErrorMessage, ReadRequest, WriteRequest, decode_query, decode_query_response,
    decode_read_response, encode_query, encode_query_response,
};
