//! Device compatibility descriptors.
//!
//! A [`CompatSpec`] names a device by vendor, type and version, optionally
//! by instance name. Clients send a list of them in a `Query` frame.

use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BufMut};

use crate::error::{Error, Result};
use crate::types::Version;

/// Fixed width of each string field on the wire.
pub const NAME_WIDTH: usize = 128;

/// Device compatibility descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CompatSpec {
    /// Device instance name. Empty when unspecified.
    pub name: String,
    /// Vendor name.
    pub vendor: String,
    /// Device type name.
    pub device_type: String,
    /// Version, possibly with wildcard fields.
    pub version: Version,
}

impl CompatSpec {
    /// Encoded size of one query item in bytes.
    pub const SIZE: usize = 3 * NAME_WIDTH + Version::SIZE;

    /// Creates a descriptor with an empty name.
    #[must_use]
    pub fn new(vendor: impl Into<String>, device_type: impl Into<String>, version: Version) -> Self {
        Self {
            name: String::new(),
            vendor: vendor.into(),
            device_type: device_type.into(),
            version,
        }
    }

    /// Sets the instance name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns true if this descriptor satisfies `pattern`.
    ///
    /// When both sides carry a name, the names alone decide. Otherwise
    /// vendor and type must agree wherever both are set, and the version
    /// must fit the pattern's version.
    #[must_use]
    pub fn matches(&self, pattern: &Self) -> bool {
        if !self.name.is_empty() && !pattern.name.is_empty() {
            return self.name == pattern.name;
        }
        let field = |a: &str, b: &str| a.is_empty() || b.is_empty() || a == b;
        field(&self.vendor, &pattern.vendor)
            && field(&self.device_type, &pattern.device_type)
            && self.version.matches(&pattern.version)
    }

    /// Appends the query item: name, vendor and type each NUL-padded to
    /// [`NAME_WIDTH`] bytes, followed by the version.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if a string field is longer than
    /// [`NAME_WIDTH`] bytes.
    pub fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        for (field, value) in [
            ("name", &self.name),
            ("vendor", &self.vendor),
            ("type", &self.device_type),
        ] {
            if value.len() > NAME_WIDTH {
                return Err(Error::invalid_argument(format!(
                    "{field} is {} bytes, limit is {NAME_WIDTH}",
                    value.len()
                )));
            }
        }
        put_padded(buf, &self.name);
        put_padded(buf, &self.vendor);
        put_padded(buf, &self.device_type);
        self.version.encode(buf);
        Ok(())
    }

    /// Reads one query item from the front of `buf`.
    pub fn decode(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < Self::SIZE {
            return Err(Error::protocol(format!(
                "query item too short: {} bytes",
                buf.remaining()
            )));
        }
        let name = get_padded(buf);
        let vendor = get_padded(buf);
        let device_type = get_padded(buf);
        let version = Version::decode(buf)?;
        Ok(Self {
            name,
            vendor,
            device_type,
            version,
        })
    }
}

fn put_padded(buf: &mut impl BufMut, value: &str) {
    buf.put_slice(value.as_bytes());
    buf.put_bytes(0, NAME_WIDTH - value.len());
}

fn get_padded(buf: &mut impl Buf) -> String {
    let mut raw = [0u8; NAME_WIDTH];
    buf.copy_to_slice(&mut raw);
    let len = raw.iter().position(|&b| b == 0).unwrap_or(NAME_WIDTH);
    String::from_utf8_lossy(&raw[..len]).into_owned()
}

impl fmt::Display for CompatSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{},{}-{}",
            self.name, self.vendor, self.device_type, self.version
        )
    }
}

impl FromStr for CompatSpec {
    type Err = Error;

    /// Parses `<vendor>,<type>-<version>`, `<vendor>,<type>`,
    /// `<type>-<version>` or `<type>`.
    ///
    /// A hyphen only splits off the version if the rest parses as one;
    /// otherwise it is part of the type name.
    fn from_str(s: &str) -> Result<Self> {
        let (vendor, rest) = match s.rfind(',') {
            Some(comma) => (&s[..comma], &s[comma + 1..]),
            None => ("", s),
        };

        let (device_type, version) = match rest.rfind('-') {
            Some(hyphen) => match rest[hyphen + 1..].parse::<Version>() {
                Ok(version) => (&rest[..hyphen], version),
                Err(_) => (rest, Version::ANY),
            },
            None => (rest, Version::ANY),
        };

        Ok(Self::new(vendor, device_type, version))
    }
}
