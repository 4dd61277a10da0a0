//! FEC Codec
//!
//! Systematic K-of-N Reed-Solomon coding over GF(2⁸), byte-compatible with
//! the reference `fec` library's share format. The encode matrix is an n×k
//! Vandermonde matrix over the evaluation points {0, α⁰, α¹, …} with its top
//! k×k block inverted out, so the first K shares are verbatim copies of the
//! input columns and any K distinct output rows determine the inputs.

use crate::error::{Error, Result};
use crate::fec::gf::GfTables;
use tracing::debug;

/// Upper bound on N (and K): one byte of share index.
pub const MAX_SHARES: usize = 256;

/// Maximum number of bytes per column processed by one encode pass.
pub const BATCH: usize = 8192;

// =============================================================================
// Codec
// =============================================================================

/// Encoder/decoder for one (K, N) configuration.
///
/// Immutable after construction; shared across all open handles.
pub struct FecCodec {
    tables: GfTables,
    /// n×k encode matrix, row-major. Rows < K form the identity.
    enc_matrix: Vec<u8>,
    shares_required: usize,
    num_shares: usize,
}

impl FecCodec {
    /// Build a codec for `shares_required`-of-`num_shares` coding.
    ///
    /// Bounds: 1 ≤ K ≤ 255 and K ≤ N ≤ 256. N may use the full field
    /// (share indices stay below N and fit a byte), but K itself is
    /// stored in the one-byte `required` header field, so 256 is
    /// unrepresentable in the share format.
    pub fn new(shares_required: usize, num_shares: usize) -> Result<Self> {
        if shares_required == 0 {
            return Err(Error::Internal(
                "shares_required must be at least 1".to_string(),
            ));
        }
        if shares_required > MAX_SHARES - 1 {
            return Err(Error::Internal(format!(
                "shares_required ({}) cannot be represented in a share header; the limit is {}",
                shares_required,
                MAX_SHARES - 1
            )));
        }
        if shares_required > num_shares {
            return Err(Error::Internal(format!(
                "shares_required ({}) exceeds num_shares ({})",
                shares_required, num_shares
            )));
        }
        if num_shares > MAX_SHARES {
            return Err(Error::Internal(format!(
                "num_shares ({}) exceeds the GF(2^8) limit of {}",
                num_shares, MAX_SHARES
            )));
        }

        let tables = GfTables::new();
        let enc_matrix = build_encode_matrix(&tables, shares_required, num_shares)?;

        debug!(
            shares_required,
            num_shares, "built systematic FEC encode matrix"
        );

        Ok(Self {
            tables,
            enc_matrix,
            shares_required,
            num_shares,
        })
    }

    /// K: the reconstruction threshold.
    pub fn shares_required(&self) -> usize {
        self.shares_required
    }

    /// N: the total number of share views.
    pub fn num_shares(&self) -> usize {
        self.num_shares
    }

    /// Encode one output block for `share_index`.
    ///
    /// `inputs` are the K column blocks, all the same length as `out`.
    /// For `share_index < K` the output is input `share_index` unchanged;
    /// parity rows are accumulated in BATCH-sized column chunks.
    pub fn encode(&self, inputs: &[&[u8]], share_index: usize, out: &mut [u8]) -> Result<()> {
        let k = self.shares_required;
        if share_index >= self.num_shares {
            return Err(Error::Internal(format!(
                "share index {} out of range for {} shares",
                share_index, self.num_shares
            )));
        }
        if inputs.len() != k {
            return Err(Error::Internal(format!(
                "expected {} input blocks, got {}",
                k,
                inputs.len()
            )));
        }
        let len = out.len();
        if inputs.iter().any(|block| block.len() != len) {
            return Err(Error::Internal(
                "input blocks must match the output block length".to_string(),
            ));
        }

        // Systematic fast path: no field arithmetic.
        if share_index < k {
            out.copy_from_slice(inputs[share_index]);
            return Ok(());
        }

        let row = &self.enc_matrix[share_index * k..(share_index + 1) * k];
        let mut pos = 0;
        while pos < len {
            let end = (pos + BATCH).min(len);
            out[pos..end].fill(0);
            for (input, &coef) in inputs.iter().zip(row.iter()) {
                self.tables.addmul(&mut out[pos..end], &input[pos..end], coef);
            }
            pos = end;
        }
        Ok(())
    }

    /// Recover the original column blocks that are missing from `inputs`.
    ///
    /// `inputs[slot]` carries the share labelled `indices[slot]`; the caller
    /// must have normalised the pairs so every systematic share (index < K)
    /// sits in its canonical slot. Rows of `out` (K rows of the common block
    /// length) are written only for slots whose input was non-systematic;
    /// systematic slots keep their input as the source of truth.
    pub fn decode_missing(
        &self,
        inputs: &[&[u8]],
        indices: &[usize],
        out: &mut [u8],
    ) -> Result<()> {
        let k = self.shares_required;
        if inputs.len() != k || indices.len() != k {
            return Err(Error::Internal(format!(
                "decode requires exactly {} labelled blocks",
                k
            )));
        }
        let block_len = inputs[0].len();
        if inputs.iter().any(|block| block.len() != block_len) {
            return Err(Error::Internal(
                "decode input blocks must have equal length".to_string(),
            ));
        }
        if out.len() != k * block_len {
            return Err(Error::Internal(
                "decode output buffer must hold K blocks".to_string(),
            ));
        }
        let mut any_missing = false;
        for (slot, &index) in indices.iter().enumerate() {
            if index >= self.num_shares {
                return Err(Error::Internal(format!(
                    "share index {} out of range for {} shares",
                    index, self.num_shares
                )));
            }
            if index < k {
                if index != slot {
                    return Err(Error::Internal(format!(
                        "systematic share {} not in its canonical slot",
                        index
                    )));
                }
            } else {
                any_missing = true;
            }
        }
        if !any_missing {
            return Ok(());
        }

        // Rows of the matrix that produced the inputs; inverting it maps
        // share blocks back to original columns.
        let mut matrix = vec![0u8; k * k];
        for (slot, &index) in indices.iter().enumerate() {
            if index < k {
                matrix[slot * k + index] = 1;
            } else {
                matrix[slot * k..(slot + 1) * k]
                    .copy_from_slice(&self.enc_matrix[index * k..(index + 1) * k]);
            }
        }
        invert_matrix(&self.tables, &mut matrix, k)?;

        for (slot, &index) in indices.iter().enumerate() {
            if index < k {
                continue;
            }
            let out_row = &mut out[slot * block_len..(slot + 1) * block_len];
            out_row.fill(0);
            let row = &matrix[slot * k..(slot + 1) * k];
            for (input, &coef) in inputs.iter().zip(row.iter()) {
                self.tables.addmul(out_row, input, coef);
            }
        }
        Ok(())
    }
}

// =============================================================================
// Matrix construction
// =============================================================================

/// Build the systematic n×k encode matrix the reference library uses.
fn build_encode_matrix(gf: &GfTables, k: usize, n: usize) -> Result<Vec<u8>> {
    // Vandermonde rows over the points {0, alpha^0, alpha^1, ...}: row 0 is
    // [1, 0, ..., 0] (powers of zero), row r >= 1 holds the powers of
    // alpha^(r-1).
    let mut vdm = vec![0u8; n * k];
    vdm[0] = 1;
    for row in 1..n {
        for col in 0..k {
            vdm[row * k + col] = gf.exp((row - 1) * col % 255);
        }
    }

    let mut top = vdm[..k * k].to_vec();
    invert_matrix(gf, &mut top, k)?;

    // enc = [ I_k ; bottom · top⁻¹ ]
    let mut enc = vec![0u8; n * k];
    for i in 0..k {
        enc[i * k + i] = 1;
    }
    for row in k..n {
        for col in 0..k {
            let mut acc = 0u8;
            for j in 0..k {
                acc ^= gf.mul(vdm[row * k + j], top[j * k + col]);
            }
            enc[row * k + col] = acc;
        }
    }
    Ok(enc)
}

/// In-place Gauss-Jordan inversion of a k×k matrix over GF(2⁸).
///
/// The inverse is unique, so this reproduces the reference library's decode
/// matrices regardless of its pivoting order.
fn invert_matrix(gf: &GfTables, m: &mut [u8], k: usize) -> Result<()> {
    let mut aug = vec![0u8; k * k];
    for i in 0..k {
        aug[i * k + i] = 1;
    }

    for col in 0..k {
        let pivot = (col..k)
            .find(|&row| m[row * k + col] != 0)
            .ok_or_else(|| Error::Internal("singular matrix in FEC decode".to_string()))?;
        if pivot != col {
            for j in 0..k {
                m.swap(pivot * k + j, col * k + j);
                aug.swap(pivot * k + j, col * k + j);
            }
        }

        let inv = gf.inverse(m[col * k + col]);
        if inv != 1 {
            for j in 0..k {
                m[col * k + j] = gf.mul(m[col * k + j], inv);
                aug[col * k + j] = gf.mul(aug[col * k + j], inv);
            }
        }

        for row in 0..k {
            if row == col {
                continue;
            }
            let coef = m[row * k + col];
            if coef == 0 {
                continue;
            }
            for j in 0..k {
                let t = gf.mul(m[col * k + j], coef);
                m[row * k + j] ^= t;
                let t = gf.mul(aug[col * k + j], coef);
                aug[row * k + j] ^= t;
            }
        }
    }

    m.copy_from_slice(&aug);
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
