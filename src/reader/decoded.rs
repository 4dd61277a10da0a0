//! Decoded-File Reader
//!
//! Reconstructs byte ranges of an original file from any K of its share
//! files. Open validates that the shares belong together (same `required`,
//! same padding, same length, distinct indices); each read then pulls one
//! aligned window from every share, permutes systematic shares into their
//! canonical FEC slots, recovers the missing columns, and interleaves the
//! K columns back into original byte order.
//!
//! A handle never substitutes alternate shares mid-stream; if one share
//! starts failing, the caller reopens with a different K-subset.

use crate::error::{Error, Result};
use crate::fec::FecCodec;
use crate::reader::read_full_at;
use crate::reader::scratch::{ScratchBuffers, ScratchPool};
use crate::share::{ShareIndex, ShareMetadata};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

/// An original file viewed through K of its share files.
pub struct DecodedFile {
    /// The K share files actually read, with their parsed indices.
    files: Vec<File>,
    indices: Vec<ShareIndex>,
    required: usize,
    excess_bytes: u8,
    encoded_size: u64,
    codec: Arc<FecCodec>,
    scratch: ScratchPool,
}

impl DecodedFile {
    /// Open a set of share files of the same original.
    ///
    /// At least K files are required; all supplied files are validated and
    /// the first K are used for reads.
    #[instrument(skip(paths, codec), fields(share_count = paths.len()), err)]
    pub fn open<P: AsRef<Path>>(paths: &[P], codec: Arc<FecCodec>) -> Result<Self> {
        let required = codec.shares_required();
        if paths.len() < required {
            return Err(Error::InsufficientShares {
                available: paths.len(),
                required,
            });
        }

        let mut files = Vec::with_capacity(paths.len());
        let mut indices = Vec::with_capacity(paths.len());
        let mut excess_bytes = 0u8;
        let mut encoded_size = 0u64;

        for (i, p) in paths.iter().enumerate() {
            let path = p.as_ref();
            let file = File::open(path).map_err(|e| Error::from_io_at(e, path))?;

            let mut header = [0u8; ShareMetadata::SIZE];
            let got = read_full_at(&file, &mut header, 0)?;
            if got != ShareMetadata::SIZE {
                return Err(Error::CorruptMetadata(format!(
                    "share file {} too short for a header",
                    path.display()
                )));
            }
            let meta = ShareMetadata::decode(&header)?;
            let file_size = file.metadata()?.len();

            if usize::from(meta.required) != required {
                return Err(Error::InconsistentShares(format!(
                    "share {} was produced with required={}, expected {}",
                    path.display(),
                    meta.required,
                    required
                )));
            }
            if usize::from(meta.index) >= codec.num_shares() {
                return Err(Error::InconsistentShares(format!(
                    "share index {} out of range for {} shares",
                    meta.index,
                    codec.num_shares()
                )));
            }
            if i == 0 {
                excess_bytes = meta.excess_bytes;
                encoded_size = file_size;
            } else {
                if meta.excess_bytes != excess_bytes {
                    return Err(Error::InconsistentShares(format!(
                        "padding disagrees: {} vs {}",
                        meta.excess_bytes, excess_bytes
                    )));
                }
                if file_size != encoded_size {
                    return Err(Error::InconsistentShares(format!(
                        "share sizes disagree: {} vs {}",
                        file_size, encoded_size
                    )));
                }
            }
            if indices.contains(&meta.index) {
                return Err(Error::InconsistentShares(format!(
                    "duplicate share index {}",
                    meta.index
                )));
            }

            files.push(file);
            indices.push(meta.index);
        }

        files.truncate(required);
        indices.truncate(required);
        debug!(?indices, encoded_size, "opened decoded view");

        Ok(Self {
            files,
            indices,
            required,
            excess_bytes,
            encoded_size,
            codec,
            scratch: ScratchPool::new(),
        })
    }

    /// Size of the reconstructed original.
    pub fn size(&self) -> u64 {
        let header = ShareMetadata::SIZE as u64;
        if self.encoded_size <= header {
            return 0;
        }
        (self.encoded_size - header) * self.required as u64 - u64::from(self.excess_bytes)
    }

    /// Read up to `out.len()` original bytes at `offset`.
    pub fn read_at(&self, out: &mut [u8], offset: u64) -> Result<usize> {
        let k = self.required;
        let total = self.size();
        if offset >= total || out.is_empty() {
            return Ok(0);
        }
        let size = (out.len() as u64).min(total - offset) as usize;

        // One more encoded byte than size/K so a misaligned window still
        // covers its last partial K-tuple.
        let bytes_to_read = size.div_ceil(k) + 1;
        let enc_offset = offset / k as u64 + ShareMetadata::SIZE as u64;
        let offset_correction = (offset % k as u64) as usize;

        let mut scratch = self.scratch.lease();
        scratch.ensure_read_bufs(k);
        let ScratchBuffers {
            read_bufs,
            work_buf,
        } = &mut *scratch;

        let mut min_read = bytes_to_read;
        for (buf, file) in read_bufs.iter_mut().zip(self.files.iter()) {
            buf.resize(bytes_to_read, 0);
            let got = read_full_at(file, &mut buf[..bytes_to_read], enc_offset)?;
            min_read = min_read.min(got);
        }
        if min_read == 0 {
            return Ok(0);
        }

        // Put every systematic share at its canonical FEC input slot.
        let mut indices: Vec<usize> = self.indices.iter().map(|&i| usize::from(i)).collect();
        let mut slots: Vec<usize> = (0..k).collect();
        normalize_indices(&mut indices, &mut slots);

        let inputs: Vec<&[u8]> = slots.iter().map(|&s| &read_bufs[s][..min_read]).collect();
        work_buf.resize(k * min_read, 0);
        self.codec
            .decode_missing(&inputs, &indices, &mut work_buf[..])?;

        let usable = size.min(min_read * k - offset_correction);

        // Interleave the K columns back into original byte order. The first
        // `offset_correction` columns drop their leading byte; it belongs to
        // the K-tuple before `offset`.
        for slot in 0..k {
            let column: &[u8] = if indices[slot] < k {
                inputs[slot]
            } else {
                &work_buf[slot * min_read..(slot + 1) * min_read]
            };
            let (mut dst, mut src) = if slot < offset_correction {
                (slot + k - offset_correction, 1)
            } else {
                (slot - offset_correction, 0)
            };
            while dst < usable {
                out[dst] = column[src];
                src += 1;
                dst += k;
            }
        }
        Ok(usable)
    }
}

impl std::fmt::Debug for DecodedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedFile")
            .field("indices", &self.indices)
            .field("encoded_size", &self.encoded_size)
            .finish_non_exhaustive()
    }
}

/// Permute (index, slot) pairs so each systematic index sits at its own
/// slot. The `indices[indices[i]] != indices[i]` guard refuses to swap into
/// a cycle on duplicate indices (rejected at open, so purely defensive
/// here); such slots are skipped instead of looping.
fn normalize_indices(indices: &mut [usize], slots: &mut [usize]) {
    let k = indices.len();
    let mut i = 0;
    while i < k {
        let index = indices[i];
        if index < k && index != i && indices[index] != index {
            indices.swap(i, index);
            slots.swap(i, index);
        } else {
            i += 1;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fec::gf::GfTables;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_share(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::File::create(&path).unwrap().write_all(bytes).unwrap();
        path
    }

    /// Hand-built k=2,n=3 shares of "abcde". The share-2 row of the encode
    /// matrix is [3, 2], so its data byte over (x, y) is 3·x ⊕ 2·y.
    fn abcde_shares(dir: &tempfile::TempDir) -> [PathBuf; 3] {
        let gf = GfTables::new();
        let parity = |x: u8, y: u8| gf.mul(3, x) ^ gf.mul(2, y);

        let share0 = write_share(dir, "s0", b"\x02\x00\x01ace");
        let share1 = write_share(dir, "s1", b"\x02\x01\x01bd\x00");
        let share2 = write_share(
            dir,
            "s2",
            &[
                2,
                2,
                1,
                parity(b'a', b'b'),
                parity(b'c', b'd'),
                parity(b'e', 0),
            ],
        );
        [share0, share1, share2]
    }

    #[test]
    fn test_open_requires_k_shares() {
        let dir = tempfile::tempdir().unwrap();
        let shares = abcde_shares(&dir);
        let codec = Arc::new(FecCodec::new(2, 3).unwrap());
        let err = DecodedFile::open(&shares[..1], codec).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientShares {
                available: 1,
                required: 2
            }
        ));
    }

    #[test]
    fn test_open_rejects_required_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let shares = abcde_shares(&dir);
        let other = write_share(&dir, "bad", b"\x03\x01\x01xxx");
        let codec = Arc::new(FecCodec::new(2, 3).unwrap());
        let err = DecodedFile::open(&[shares[0].clone(), other], codec).unwrap_err();
        assert!(matches!(err, Error::InconsistentShares(_)));
    }

    #[test]
    fn test_open_rejects_excess_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let shares = abcde_shares(&dir);
        let other = write_share(&dir, "bad", b"\x02\x01\x00ace");
        let codec = Arc::new(FecCodec::new(2, 3).unwrap());
        let err = DecodedFile::open(&[shares[0].clone(), other], codec).unwrap_err();
        assert!(matches!(err, Error::InconsistentShares(_)));
    }

    #[test]
    fn test_open_rejects_size_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let shares = abcde_shares(&dir);
        let other = write_share(&dir, "bad", b"\x02\x01\x01bd\x00\x00");
        let codec = Arc::new(FecCodec::new(2, 3).unwrap());
        let err = DecodedFile::open(&[shares[0].clone(), other], codec).unwrap_err();
        assert!(matches!(err, Error::InconsistentShares(_)));
    }

    #[test]
    fn test_open_rejects_duplicate_indices() {
        let dir = tempfile::tempdir().unwrap();
        let shares = abcde_shares(&dir);
        let codec = Arc::new(FecCodec::new(2, 3).unwrap());
        let err =
            DecodedFile::open(&[shares[0].clone(), shares[0].clone()], codec).unwrap_err();
        assert!(matches!(err, Error::InconsistentShares(_)));
    }

    #[test]
    fn test_open_rejects_corrupt_header() {
        let dir = tempfile::tempdir().unwrap();
        let shares = abcde_shares(&dir);
        let zero_required = write_share(&dir, "bad", b"\x00\x01\x00abc");
        let codec = Arc::new(FecCodec::new(2, 3).unwrap());
        let err = DecodedFile::open(&[shares[0].clone(), zero_required], codec).unwrap_err();
        assert!(matches!(err, Error::CorruptMetadata(_)));

        let truncated = write_share(&dir, "tiny", b"\x02");
        let codec = Arc::new(FecCodec::new(2, 3).unwrap());
        let err = DecodedFile::open(&[shares[0].clone(), truncated], codec).unwrap_err();
        assert!(matches!(err, Error::CorruptMetadata(_)));
    }

    #[test]
    fn test_reconstruct_from_each_pair() {
        let dir = tempfile::tempdir().unwrap();
        let shares = abcde_shares(&dir);
        let codec = Arc::new(FecCodec::new(2, 3).unwrap());

        for pair in [[0, 1], [0, 2], [1, 2], [2, 0], [1, 0]] {
            let paths = [shares[pair[0]].clone(), shares[pair[1]].clone()];
            let decoded = DecodedFile::open(&paths, Arc::clone(&codec)).unwrap();
            assert_eq!(decoded.size(), 5);

            let mut out = [0u8; 5];
            let n = decoded.read_at(&mut out, 0).unwrap();
            assert_eq!(n, 5, "pair {:?}", pair);
            assert_eq!(&out, b"abcde", "pair {:?}", pair);
        }
    }

    #[test]
    fn test_read_at_misaligned_offset() {
        let dir = tempfile::tempdir().unwrap();
        let shares = abcde_shares(&dir);
        let codec = Arc::new(FecCodec::new(2, 3).unwrap());
        let decoded =
            DecodedFile::open(&[shares[0].clone(), shares[1].clone()], codec).unwrap();

        let mut out = [0u8; 2];
        let n = decoded.read_at(&mut out, 3).unwrap();
        assert_eq!(n, 2);
        assert_eq!(&out, b"de");
    }

    #[test]
    fn test_every_offset_and_length() {
        let dir = tempfile::tempdir().unwrap();
        let shares = abcde_shares(&dir);
        let codec = Arc::new(FecCodec::new(2, 3).unwrap());
        let decoded =
            DecodedFile::open(&[shares[2].clone(), shares[1].clone()], codec).unwrap();

        let original = b"abcde";
        for offset in 0..=5u64 {
            for len in 0..=5usize {
                let mut out = vec![0u8; len];
                let n = decoded.read_at(&mut out, offset).unwrap();
                let expect = len.min(5usize.saturating_sub(offset as usize));
                assert_eq!(n, expect, "offset {} len {}", offset, len);
                assert_eq!(
                    &out[..n],
                    &original[offset as usize..offset as usize + n],
                    "offset {} len {}",
                    offset,
                    len
                );
            }
        }
    }

    #[test]
    fn test_read_past_end_returns_zero() {
        let dir = tempfile::tempdir().unwrap();
        let shares = abcde_shares(&dir);
        let codec = Arc::new(FecCodec::new(2, 3).unwrap());
        let decoded =
            DecodedFile::open(&[shares[0].clone(), shares[1].clone()], codec).unwrap();

        let mut out = [0u8; 4];
        assert_eq!(decoded.read_at(&mut out, 5).unwrap(), 0);
        assert_eq!(decoded.read_at(&mut out, 99).unwrap(), 0);
    }

    #[test]
    fn test_empty_original() {
        let dir = tempfile::tempdir().unwrap();
        let s0 = write_share(&dir, "e0", &[2, 0, 0]);
        let s2 = write_share(&dir, "e2", &[2, 2, 0]);
        let codec = Arc::new(FecCodec::new(2, 3).unwrap());
        let decoded = DecodedFile::open(&[s0, s2], codec).unwrap();

        assert_eq!(decoded.size(), 0);
        let mut out = [0u8; 4];
        assert_eq!(decoded.read_at(&mut out, 0).unwrap(), 0);
    }

    #[test]
    fn test_normalize_places_systematic_shares() {
        let mut indices = vec![2usize, 0, 1];
        let mut slots = vec![0usize, 1, 2];
        normalize_indices(&mut indices, &mut slots);
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(slots, vec![1, 2, 0]);

        // Parity shares fill whatever slots remain.
        let mut indices = vec![4usize, 1, 3];
        let mut slots = vec![0usize, 1, 2];
        normalize_indices(&mut indices, &mut slots);
        assert_eq!(indices, vec![4, 1, 3]);
        assert_eq!(slots, vec![0, 1, 2]);

        let mut indices = vec![1usize, 4, 0];
        let mut slots = vec![0usize, 1, 2];
        normalize_indices(&mut indices, &mut slots);
        assert_eq!(indices, vec![0, 1, 4]);
        assert_eq!(slots, vec![2, 0, 1]);
    }

    #[test]
    fn test_normalize_survives_duplicate_indices() {
        // Duplicates are rejected at open; the guard just has to terminate
        // and keep each index somewhere.
        let mut indices = vec![1usize, 1];
        let mut slots = vec![0usize, 1];
        normalize_indices(&mut indices, &mut slots);
        assert_eq!(indices, vec![1, 1]);

        let mut indices = vec![0usize, 0, 2];
        let mut slots = vec![0usize, 1, 2];
        normalize_indices(&mut indices, &mut slots);
        assert_eq!(indices.iter().filter(|&&i| i == 0).count(), 2);
    }
}
