//! Virtual Tree Facade
//!
//! The read-only virtual layout over a source tree:
//!
//! ```text
//! /            -> N synthetic share directories (00, 01, ...)
//! /XX          -> mirror of the source root, viewed as share XX
//! /XX/dir/file -> share XX of source/dir/file, size ceil(|F|/K) + 3
//! ```
//!
//! `ShareTree` is host-agnostic: it resolves virtual paths, serves
//! attributes and directory listings, and opens `EncodedFile` handles.
//! The FUSE adapter (`fuse` module) is a thin shim over it.

use crate::error::{Error, Result};
use crate::fec::FecCodec;
use crate::reader::EncodedFile;
use crate::share::{encode_share_index, DecodedPath};
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

// =============================================================================
// Attributes
// =============================================================================

/// Entry type as presented by the virtual tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Directory,
    RegularFile,
    Symlink,
}

/// Attributes of one virtual entry.
///
/// Everything passes through from the source entry except regular-file
/// sizes, which become encoded-share sizes.
#[derive(Clone, Debug)]
pub struct FileAttr {
    pub kind: FileKind,
    pub size: u64,
    pub perm: u16,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub mtime: SystemTime,
}

/// One directory-listing entry.
#[derive(Clone, Debug)]
pub struct DirEntry {
    pub name: String,
    pub kind: FileKind,
}

fn kind_of(file_type: fs::FileType) -> FileKind {
    if file_type.is_dir() {
        FileKind::Directory
    } else if file_type.is_symlink() {
        FileKind::Symlink
    } else {
        FileKind::RegularFile
    }
}

// =============================================================================
// Share tree
// =============================================================================

/// Configuration handed to the facade at construction time.
#[derive(Clone, Debug)]
pub struct ShareTreeConfig {
    /// Minimum shares for reconstruction (K), 1..=255
    pub shares_required: usize,
    /// Total shares presented (N), K..=256
    pub num_shares: usize,
    /// Root of the source tree
    pub source: PathBuf,
}

/// The virtual share view over one source tree.
pub struct ShareTree {
    codec: Arc<FecCodec>,
    source: PathBuf,
}

impl ShareTree {
    pub fn new(config: ShareTreeConfig) -> Result<Self> {
        let codec = Arc::new(FecCodec::new(config.shares_required, config.num_shares)?);
        debug!(
            shares_required = config.shares_required,
            num_shares = config.num_shares,
            source = %config.source.display(),
            "share tree ready"
        );
        Ok(Self {
            codec,
            source: config.source,
        })
    }

    pub fn codec(&self) -> Arc<FecCodec> {
        Arc::clone(&self.codec)
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn num_shares(&self) -> usize {
        self.codec.num_shares()
    }

    /// Resolve a virtual path, rejecting share indices beyond N.
    fn decode(&self, vpath: &str) -> Result<DecodedPath> {
        let decoded = DecodedPath::decode(vpath, &self.source)?;
        if let Some(index) = decoded.share_index {
            if usize::from(index) >= self.codec.num_shares() {
                return Err(Error::NotFound(PathBuf::from(vpath)));
            }
        }
        Ok(decoded)
    }

    /// Attributes of a virtual entry.
    pub fn getattr(&self, vpath: &str) -> Result<FileAttr> {
        let decoded = self.decode(vpath)?;
        match decoded.share_index {
            // The virtual root exists only in this view.
            None => Ok(FileAttr {
                kind: FileKind::Directory,
                size: 0,
                perm: 0o755,
                nlink: self.codec.num_shares() as u32 + 2,
                uid: unsafe { libc::getuid() },
                gid: unsafe { libc::getgid() },
                mtime: SystemTime::UNIX_EPOCH,
            }),
            Some(_) => {
                let meta = fs::symlink_metadata(&decoded.path)
                    .map_err(|e| Error::from_io_at(e, &decoded.path))?;
                Ok(self.attr_from_source(&meta))
            }
        }
    }

    fn attr_from_source(&self, meta: &fs::Metadata) -> FileAttr {
        let kind = kind_of(meta.file_type());
        let size = if meta.is_file() {
            EncodedFile::encoded_size(meta.len(), self.codec.shares_required())
        } else {
            meta.len()
        };
        FileAttr {
            kind,
            size,
            perm: (meta.mode() & 0o7777) as u16,
            nlink: meta.nlink() as u32,
            uid: meta.uid(),
            gid: meta.gid(),
            mtime: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        }
    }

    /// List a virtual directory.
    pub fn read_dir(&self, vpath: &str) -> Result<Vec<DirEntry>> {
        let decoded = self.decode(vpath)?;
        match decoded.share_index {
            None => Ok((0..self.codec.num_shares())
                .map(|index| DirEntry {
                    name: encode_share_index(index as u8),
                    kind: FileKind::Directory,
                })
                .collect()),
            Some(_) => {
                let reader = fs::read_dir(&decoded.path)
                    .map_err(|e| Error::from_io_at(e, &decoded.path))?;
                let mut entries = Vec::new();
                for entry in reader {
                    let entry = entry?;
                    let kind = entry
                        .file_type()
                        .map(kind_of)
                        .unwrap_or(FileKind::RegularFile);
                    entries.push(DirEntry {
                        name: entry.file_name().to_string_lossy().into_owned(),
                        kind,
                    });
                }
                Ok(entries)
            }
        }
    }

    /// Open a virtual file for reading.
    pub fn open(&self, vpath: &str) -> Result<EncodedFile> {
        let decoded = self.decode(vpath)?;
        let index = decoded
            .share_index
            .ok_or_else(|| Error::NotFound(PathBuf::from(vpath)))?;
        EncodedFile::open(&decoded.path, index, Arc::clone(&self.codec))
    }
}

// =============================================================================
// Tests
// =============================================================================
