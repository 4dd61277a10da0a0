//! Encoded-File Reader
//!
//! Serves byte ranges of one share view of one source file. Nothing is
//! precomputed: each read materialises its bytes by emitting header bytes
//! for offsets inside the 3-byte metadata prefix and, past it, reading the
//! corresponding window of original bytes and running the FEC transform
//! for this handle's share index. Systematic shares (index < K) skip the
//! arithmetic entirely and copy a strided column.
//!
//! The descriptor is shared across threads via positional reads; the
//! original size is stat'ed once, under a mutex, on first use.

use crate::error::{Error, Result};
use crate::fec::FecCodec;
use crate::reader::read_full_at;
use crate::reader::scratch::{ScratchBuffers, ScratchPool};
use crate::share::{ShareIndex, ShareMetadata};
use parking_lot::Mutex;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

/// One open share view of one source file.
///
/// Read-only; owns the descriptor exclusively and releases it on drop.
pub struct EncodedFile {
    file: File,
    share_index: ShareIndex,
    codec: Arc<FecCodec>,
    /// Memoised source length; single-flight under the mutex so concurrent
    /// first readers agree on the value.
    original_size: Mutex<Option<u64>>,
    scratch: ScratchPool,
}

impl EncodedFile {
    /// Open `source_path` read-only as share `share_index`.
    #[instrument(skip(codec), err)]
    pub fn open(
        source_path: &Path,
        share_index: ShareIndex,
        codec: Arc<FecCodec>,
    ) -> Result<Self> {
        if usize::from(share_index) >= codec.num_shares() {
            return Err(Error::Internal(format!(
                "share index {} out of range for {} shares",
                share_index,
                codec.num_shares()
            )));
        }
        let file = File::open(source_path).map_err(|e| Error::from_io_at(e, source_path))?;
        debug!(share_index, "opened encoded view");
        Ok(Self {
            file,
            share_index,
            codec,
            original_size: Mutex::new(None),
            scratch: ScratchPool::new(),
        })
    }

    /// Length of any share of a file of `original_size` bytes:
    /// `ceil(original_size / K)` data bytes behind the fixed header.
    pub fn encoded_size(original_size: u64, shares_required: usize) -> u64 {
        original_size.div_ceil(shares_required as u64) + ShareMetadata::SIZE as u64
    }

    /// This view's share index.
    pub fn share_index(&self) -> ShareIndex {
        self.share_index
    }

    /// Current length of this share view.
    pub fn size(&self) -> Result<u64> {
        Ok(Self::encoded_size(
            self.original_size()?,
            self.codec.shares_required(),
        ))
    }

    fn original_size(&self) -> Result<u64> {
        let mut guard = self.original_size.lock();
        if let Some(size) = *guard {
            return Ok(size);
        }
        let size = self.file.metadata()?.len();
        *guard = Some(size);
        Ok(size)
    }

    /// Read up to `out.len()` bytes of the share view at `offset`.
    ///
    /// Returns the number of bytes written; 0 at or past end of view.
    /// On error nothing useful is in `out`.
    pub fn read_at(&self, out: &mut [u8], offset: u64) -> Result<usize> {
        let shares_required = self.codec.shares_required();
        let original_size = self.original_size()?;
        let encoded_size = Self::encoded_size(original_size, shares_required);
        if offset >= encoded_size || out.is_empty() {
            return Ok(0);
        }
        let len = (out.len() as u64).min(encoded_size - offset) as usize;

        let header = ShareMetadata::SIZE as u64;
        let mut written = 0;
        let mut offset = offset;

        if offset < header {
            let meta = ShareMetadata::for_file(
                shares_required as u8,
                self.share_index,
                original_size,
            )
            .encode();
            let take = len.min((header - offset) as usize);
            out[..take].copy_from_slice(&meta[offset as usize..offset as usize + take]);
            written += take;
            offset += take as u64;
        }

        if written < len {
            written += self.fill_data(&mut out[written..len], offset - header)?;
        }
        Ok(written)
    }

    /// Materialise share data bytes starting at `data_offset` (offset past
    /// the header). Returns fewer bytes than requested only at end of file.
    fn fill_data(&self, out: &mut [u8], data_offset: u64) -> Result<usize> {
        let k = self.codec.shares_required();
        let wanted = out.len();

        let mut scratch = self.scratch.lease();
        scratch.ensure_read_bufs(1);
        let ScratchBuffers {
            read_bufs,
            work_buf,
        } = &mut *scratch;

        // Each share data byte covers one K-tuple of original bytes.
        let read_buf = &mut read_bufs[0];
        read_buf.resize(wanted * k, 0);
        let got = read_full_at(&self.file, &mut read_buf[..wanted * k], data_offset * k as u64)?;
        let blocks = got.div_ceil(k);
        if blocks == 0 {
            return Ok(0);
        }
        // Zero-pad the final short tuple; these bytes are the header's
        // excess_bytes at original EOF.
        read_buf[got..blocks * k].fill(0);

        let share = usize::from(self.share_index);
        if share < k {
            // Systematic: this share is a plain column of the original.
            for p in 0..blocks {
                out[p] = read_buf[p * k + share];
            }
        } else {
            // De-interleave the window into K contiguous columns, then run
            // the FEC transform for this share index.
            work_buf.resize(k * blocks, 0);
            for col in 0..k {
                for p in 0..blocks {
                    work_buf[col * blocks + p] = read_buf[p * k + col];
                }
            }
            let columns: Vec<&[u8]> = (0..k)
                .map(|col| &work_buf[col * blocks..(col + 1) * blocks])
                .collect();
            self.codec.encode(&columns, share, &mut out[..blocks])?;
        }
        Ok(blocks)
    }
}

impl std::fmt::Debug for EncodedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedFile")
            .field("share_index", &self.share_index)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
