//! Share Format
//!
//! The on-disk/on-wire identity of a share: the fixed header that makes a
//! share file self-describing (`metadata.rs`), the rendering of share
//! indices as directory names (`index.rs`), and the decoding of virtual
//! paths into (share index, source path) pairs (`path.rs`).
//!
//! Share file layout:
//!
//! ```text
//! [ 3-byte header | ceil(original_size / K) bytes of share data ]
//! ```

pub mod index;
pub mod metadata;
pub mod path;

pub use index::{decode_share_index, encode_share_index, ShareIndex};
pub use metadata::ShareMetadata;
pub use path::DecodedPath;
