//! Structure version tags
//!
//! Every versioned SDK structure starts with a 32-bit tag packing the
//! structure's byte size into the low 24 bits and the structure version into
//! the high 8 bits (`MAKE_FM_PARAM_VERSION` in the vendor header). The daemon
//! rejects callers whose tag does not match its own layout.

use core::fmt;

/// Bit position of the version byte.
pub const VERSION_SHIFT: u32 = 24;
/// Largest version number that fits the tag.
pub const MAX_VERSION: u32 = 0xFF;
/// Largest structure size that fits the tag.
pub const MAX_STRUCT_SIZE: usize = (1 << VERSION_SHIFT) - 1;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VersionTagError {
    /// Version number does not fit in 8 bits.
    VersionOverflow(u32),
    /// Structure size would spill into the version byte.
    SizeOverflow(usize),
}

impl fmt::Display for VersionTagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionTagError::VersionOverflow(v) => {
                write!(f, "version {} exceeds maximum {}", v, MAX_VERSION)
            }
            VersionTagError::SizeOverflow(s) => {
                write!(f, "structure size {} exceeds maximum {}", s, MAX_STRUCT_SIZE)
            }
        }
    }
}

/// Compute `size | (version << 24)`.
pub const fn make_version(size: usize, version: u32) -> Result<u32, VersionTagError> {
    if version > MAX_VERSION {
        return Err(VersionTagError::VersionOverflow(version));
    }
    if size > MAX_STRUCT_SIZE {
        return Err(VersionTagError::SizeOverflow(size));
    }
    Ok(size as u32 | (version << VERSION_SHIFT))
}

/// Split a tag back into `(size, version)`.
pub const fn split_version(tag: u32) -> (usize, u32) {
    ((tag & MAX_STRUCT_SIZE as u32) as usize, tag >> VERSION_SHIFT)
}
