//! Virtual Path Decoder
//!
//! Virtual paths have the form `/XX/relative/path`, where `XX` is a
//! share-index directory name. The decoder splits a virtual path into the
//! share index and the corresponding path under the source tree; the bare
//! root `/` carries no index (it lists the share directories themselves).

use crate::error::{Error, Result};
use crate::share::index::{decode_share_index, ShareIndex};
use std::path::{Path, PathBuf};

/// A virtual path resolved against the source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPath {
    /// Share index, or `None` for the virtual root.
    pub share_index: Option<ShareIndex>,
    /// Path of the underlying source entry.
    pub path: PathBuf,
}

impl DecodedPath {
    /// Split `virtual_path` into (share index, source path).
    ///
    /// Fails with `NotFound` for relative paths and malformed share
    /// prefixes; the caller is responsible for range-checking the index
    /// against N.
    pub fn decode(virtual_path: &str, source_root: &Path) -> Result<Self> {
        let rest = virtual_path
            .strip_prefix('/')
            .ok_or_else(|| Error::NotFound(PathBuf::from(virtual_path)))?;

        if rest.is_empty() {
            return Ok(Self {
                share_index: None,
                path: source_root.to_path_buf(),
            });
        }

        let (share_name, relative) = match rest.split_once('/') {
            Some((name, tail)) => (name, tail),
            None => (rest, ""),
        };
        let share_index = decode_share_index(share_name)
            .map_err(|_| Error::NotFound(PathBuf::from(virtual_path)))?;

        let path = if relative.is_empty() {
            source_root.to_path_buf()
        } else {
            source_root.join(relative)
        };
        Ok(Self {
            share_index: Some(share_index),
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_has_no_index() {
        let decoded = DecodedPath::decode("/", Path::new("/data")).unwrap();
        assert_eq!(decoded.share_index, None);
        assert_eq!(decoded.path, PathBuf::from("/data"));
    }

    #[test]
    fn test_share_root_maps_to_source_root() {
        let decoded = DecodedPath::decode("/0a", Path::new("/data")).unwrap();
        assert_eq!(decoded.share_index, Some(10));
        assert_eq!(decoded.path, PathBuf::from("/data"));
    }

    #[test]
    fn test_nested_path_joins_source_root() {
        let decoded = DecodedPath::decode("/01/dir/file.txt", Path::new("/data")).unwrap();
        assert_eq!(decoded.share_index, Some(1));
        assert_eq!(decoded.path, PathBuf::from("/data/dir/file.txt"));
    }

    #[test]
    fn test_malformed_prefixes_are_not_found() {
        let src = Path::new("/data");
        for bad in ["", "00", "/0", "/000", "/zz/file", "/0g"] {
            assert!(
                matches!(DecodedPath::decode(bad, src), Err(Error::NotFound(_))),
                "{:?} should not decode",
                bad
            );
        }
    }

    #[test]
    fn test_trailing_slash_on_share_root() {
        let decoded = DecodedPath::decode("/02/", Path::new("/data")).unwrap();
        assert_eq!(decoded.share_index, Some(2));
        assert_eq!(decoded.path, PathBuf::from("/data"));
    }
}
