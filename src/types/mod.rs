//! Value types exchanged with an HWIO server.
//!
//! - Version triples with wildcard fields
//! - Device compatibility descriptors

pub mod spec;
pub mod version;

pub use spec::{CompatSpec, NAME_WIDTH};
pub use version::{VERSION_NA, Version};
