//! Forward Error Correction
//!
//! K-of-N systematic Reed-Solomon coding over GF(2⁸), byte-compatible with
//! the reference `fec` library so shares produced here interoperate with
//! previously produced share files.
//!
//! # Components
//!
//! - **Field tables** (`gf.rs`): exp/log/inverse/multiplication tables for
//!   GF(2⁸) with primitive polynomial 0x11d.
//! - **Codec** (`codec.rs`): systematic Vandermonde encode matrix, parity
//!   generation in BATCH-sized column chunks, and decode of missing
//!   original columns from any K distinct shares.

pub mod codec;
pub mod gf;

#[cfg(test)]
mod proptest;

pub use codec::{FecCodec, BATCH, MAX_SHARES};
