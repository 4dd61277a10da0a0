//! Share Header Codec
//!
//! Every share file begins with a fixed 3-byte header that makes the share
//! self-describing: the K it was produced with, this share's index, and how
//! many trailing bytes of the final original block were zero padding. The
//! layout is the reference library's, so headers written here are readable
//! by existing tooling and vice versa.

use crate::error::{Error, Result};

/// Fixed per-share header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareMetadata {
    /// K used when the share was produced
    pub required: u8,
    /// This share's index in [0, N)
    pub index: u8,
    /// Trailing padding bytes in the final original block, in [0, K)
    pub excess_bytes: u8,
}

impl ShareMetadata {
    /// Header length in bytes; a share file is exactly
    /// `SIZE + ceil(original_size / K)` bytes long.
    pub const SIZE: usize = 3;

    /// Header for share `index` of a file of `original_size` bytes.
    ///
    /// `required` must be nonzero; a zero K has no header representation
    /// and is rejected when the codec is constructed.
    pub fn for_file(required: u8, index: u8, original_size: u64) -> Self {
        debug_assert!(required > 0, "required must be nonzero");
        let k = u64::from(required).max(1);
        let excess_bytes = ((k - original_size % k) % k) as u8;
        Self {
            required,
            index,
            excess_bytes,
        }
    }

    /// Render the fixed byte layout.
    pub fn encode(&self) -> [u8; Self::SIZE] {
        [self.required, self.index, self.excess_bytes]
    }

    /// Parse and validate a header.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(Error::CorruptMetadata(format!(
                "header truncated to {} bytes",
                buf.len()
            )));
        }
        let meta = Self {
            required: buf[0],
            index: buf[1],
            excess_bytes: buf[2],
        };
        if meta.required == 0 {
            return Err(Error::CorruptMetadata(
                "'required' field is zero".to_string(),
            ));
        }
        if meta.excess_bytes >= meta.required {
            return Err(Error::CorruptMetadata(format!(
                "excess bytes ({}) not below required ({})",
                meta.excess_bytes, meta.required
            )));
        }
        Ok(meta)
    }

    /// Original file size recovered from an encoded file's total length.
    ///
    /// Zero when the encoded file holds no data bytes at all.
    pub fn original_size(&self, encoded_size: u64) -> u64 {
        let header = Self::SIZE as u64;
        if encoded_size <= header {
            return 0;
        }
        (encoded_size - header) * u64::from(self.required) - u64::from(self.excess_bytes)
    }
}
