//! Version triples.

use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BufMut};

use crate::error::{Error, Result};

/// Version component not available. Matches anything in a pattern.
pub const VERSION_NA: i32 = -1;

/// Major/minor/subminor version of a device.
///
/// On the wire this is three little-endian `i32`s, unpadded, 12 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version {
    /// Major version.
    pub major: i32,
    /// Minor version.
    pub minor: i32,
    /// Subminor version. Letter revisions are stored as their ASCII code.
    pub subminor: i32,
}

impl Version {
    /// Encoded size in bytes.
    pub const SIZE: usize = 12;

    /// Pattern matching any version.
    pub const ANY: Self = Self::new(VERSION_NA, VERSION_NA, VERSION_NA);

    /// Creates a version from its components.
    #[must_use]
    pub const fn new(major: i32, minor: i32, subminor: i32) -> Self {
        Self {
            major,
            minor,
            subminor,
        }
    }

    /// Returns true if this version fits `pattern`.
    ///
    /// Fields of `pattern` set to [`VERSION_NA`] match any value.
    #[must_use]
    pub const fn matches(&self, pattern: &Self) -> bool {
        const fn field(value: i32, pattern: i32) -> bool {
            pattern == VERSION_NA || pattern == value
        }
        field(self.major, pattern.major)
            && field(self.minor, pattern.minor)
            && field(self.subminor, pattern.subminor)
    }

    /// Appends the 12-byte wire form.
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_i32_le(self.major);
        buf.put_i32_le(self.minor);
        buf.put_i32_le(self.subminor);
    }

    /// Reads a version from the front of `buf`.
    pub fn decode(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < Self::SIZE {
            return Err(Error::protocol(format!(
                "version too short: {} bytes",
                buf.remaining()
            )));
        }
        Ok(Self {
            major: buf.get_i32_le(),
            minor: buf.get_i32_le(),
            subminor: buf.get_i32_le(),
        })
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::ANY
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [self.major, self.minor, self.subminor];
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            if part == VERSION_NA {
                f.write_str("<NA>")?;
            } else {
                write!(f, "{part}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = Error;

    /// Parses `a.b` or `a.b.c`, where `c` is a number or a single letter.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::invalid_argument(format!("wrong version format: {s:?}"));
        let number = |part: &str| -> Result<i32> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };

        let mut parts = s.splitn(3, '.');
        let major = number(parts.next().unwrap_or_default())?;
        let minor = number(parts.next().ok_or_else(invalid)?)?;
        let subminor = match parts.next() {
            None => VERSION_NA,
            Some(part) => match part.as_bytes() {
                [c] if c.is_ascii_alphabetic() => i32::from(*c),
                _ => number(part)?,
            },
        };

        Ok(Self::new(major, minor, subminor))
    }
}
