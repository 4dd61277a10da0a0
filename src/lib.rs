//! shardfs - Erasure-Coded Share View Filesystem
//!
//! Presents a source directory tree as N virtual "share" sub-trees such
//! that reading any K of them suffices to reconstruct the originals. Files
//! appear once per share index, each share carrying ≈1/K of the original
//! bytes plus redundancy, so losing up to N−K shares is tolerable. Shares
//! are materialised on demand by reads; nothing is written to disk.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         FUSE adapter (fuse)                      │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                     Virtual tree facade (vfs)                    │
//! │        path decoder · share names · attrs · dir listings         │
//! ├──────────────────────────┬───────────────────────────────────────┤
//! │   Encoded-file reader    │        Decoded-file reader            │
//! │   (one share of a file)  │   (original from K share files)       │
//! ├──────────────────────────┴───────────────────────────────────────┤
//! │          FEC codec (systematic K-of-N over GF(2⁸))               │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Share format
//!
//! Each share file is `[3-byte header | ceil(|F|/K) data bytes]`; the data
//! byte at position p is the FEC output for this share's index over the
//! original block `[p·K, (p+1)·K)`, zero-padded past EOF. The coding is
//! byte-compatible with the reference `fec` library, so shares produced by
//! existing tooling decode here and vice versa.
//!
//! # Modules
//!
//! - [`error`] - Error taxonomy and errno mapping
//! - [`fec`] - GF(2⁸) tables and the systematic K-of-N codec
//! - [`share`] - Share header, share-index names, virtual-path decoding
//! - [`reader`] - Encoded and decoded byte-range readers
//! - [`vfs`] - Host-agnostic virtual tree facade
//! - [`fuse`] - FUSE adapter and mount helper (feature `fuse`)

pub mod error;
pub mod fec;
pub mod reader;
pub mod share;
pub mod vfs;

#[cfg(feature = "fuse")]
pub mod fuse;

// Re-export primary types
pub use error::{Error, Result};
pub use fec::{FecCodec, BATCH, MAX_SHARES};
pub use reader::{DecodedFile, EncodedFile};
pub use share::{DecodedPath, ShareIndex, ShareMetadata};
pub use vfs::{ShareTree, ShareTreeConfig};
