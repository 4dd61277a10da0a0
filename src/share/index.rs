//! Share-Index Codec
//!
//! Share indices appear in the virtual tree as two-character hex directory
//! names (`00`, `01`, … `ff`), short enough to keep virtual paths close to
//! their source paths.

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Index of one share view, in [0, N).
pub type ShareIndex = u8;

/// Directory-entry name for a share index.
pub fn encode_share_index(index: ShareIndex) -> String {
    format!("{:02x}", index)
}

/// Parse a directory-entry name back to a share index.
///
/// Exactly two hex digits; case-insensitive. Anything else is `NotFound`,
/// since the name came from a path lookup.
pub fn decode_share_index(name: &str) -> Result<ShareIndex> {
    if name.len() != 2 || !name.is_ascii() {
        return Err(Error::NotFound(PathBuf::from(name)));
    }
    u8::from_str_radix(name, 16).map_err(|_| Error::NotFound(PathBuf::from(name)))
}
