//! FUSE Adapter
//!
//! Bridges `vfs::ShareTree` to the kernel through the `fuser` crate. The
//! adapter owns the inode-number and file-handle tables; all filesystem
//! semantics live in the facade and the readers. Strictly read-only: any
//! write-mode open is refused with EACCES.

use crate::reader::EncodedFile;
use crate::vfs::{FileAttr, FileKind, ShareTree};
use dashmap::DashMap;
use fuser::{
    Filesystem, KernelConfig, MountOption, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyStatfs, Request,
};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// FUSE convention: inode 1 is the mount root.
const ROOT_INO: u64 = 1;

/// TTL for cached attributes and entries.
const TTL: Duration = Duration::from_secs(1);

// =============================================================================
// Filesystem
// =============================================================================

/// The mounted share view.
pub struct ShareFs {
    tree: ShareTree,
    /// ino -> virtual path, and the reverse. Inode numbers are allocated
    /// lazily on first lookup and never recycled.
    inode_paths: DashMap<u64, String>,
    path_inodes: DashMap<String, u64>,
    next_ino: AtomicU64,
    /// fh -> open encoded view
    handles: DashMap<u64, EncodedFile>,
    next_fh: AtomicU64,
}

impl ShareFs {
    pub fn new(tree: ShareTree) -> Self {
        let fs = Self {
            tree,
            inode_paths: DashMap::new(),
            path_inodes: DashMap::new(),
            next_ino: AtomicU64::new(ROOT_INO + 1),
            handles: DashMap::new(),
            next_fh: AtomicU64::new(1),
        };
        fs.inode_paths.insert(ROOT_INO, "/".to_string());
        fs.path_inodes.insert("/".to_string(), ROOT_INO);
        fs
    }

    fn ino_of(&self, vpath: &str) -> u64 {
        let ino = *self
            .path_inodes
            .entry(vpath.to_string())
            .or_insert_with(|| self.next_ino.fetch_add(1, Ordering::SeqCst));
        self.inode_paths.entry(ino).or_insert_with(|| vpath.to_string());
        ino
    }

    fn vpath_of(&self, ino: u64) -> Option<String> {
        self.inode_paths.get(&ino).map(|entry| entry.clone())
    }

    fn child_path(parent: &str, name: &str) -> String {
        if parent == "/" {
            format!("/{}", name)
        } else {
            format!("{}/{}", parent, name)
        }
    }

    fn parent_path(vpath: &str) -> &str {
        match vpath.rsplit_once('/') {
            Some(("", _)) | None => "/",
            Some((parent, _)) => parent,
        }
    }

    fn fuser_attr(attr: &FileAttr, ino: u64) -> fuser::FileAttr {
        fuser::FileAttr {
            ino,
            size: attr.size,
            blocks: attr.size.div_ceil(512),
            atime: attr.mtime,
            mtime: attr.mtime,
            ctime: attr.mtime,
            crtime: attr.mtime,
            kind: fuser_kind(attr.kind),
            perm: attr.perm,
            nlink: attr.nlink,
            uid: attr.uid,
            gid: attr.gid,
            rdev: 0,
            blksize: 4096,
            flags: 0,
        }
    }
}

fn fuser_kind(kind: FileKind) -> fuser::FileType {
    match kind {
        FileKind::Directory => fuser::FileType::Directory,
        FileKind::RegularFile => fuser::FileType::RegularFile,
        FileKind::Symlink => fuser::FileType::Symlink,
    }
}

impl Filesystem for ShareFs {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), libc::c_int> {
        info!(
            num_shares = self.tree.num_shares(),
            source = %self.tree.source().display(),
            "share view mounted"
        );
        Ok(())
    }

    fn destroy(&mut self) {
        info!("share view unmounted");
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(parent_path) = self.vpath_of(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Some(name) = name.to_str() else {
            reply.error(libc::ENOENT);
            return;
        };
        let vpath = Self::child_path(&parent_path, name);
        match self.tree.getattr(&vpath) {
            Ok(attr) => {
                let ino = self.ino_of(&vpath);
                reply.entry(&TTL, &Self::fuser_attr(&attr, ino), 0);
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let Some(vpath) = self.vpath_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.tree.getattr(&vpath) {
            Ok(attr) => reply.attr(&TTL, &Self::fuser_attr(&attr, ino)),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        if flags & libc::O_ACCMODE != libc::O_RDONLY {
            reply.error(libc::EACCES);
            return;
        }
        let Some(vpath) = self.vpath_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.tree.open(&vpath) {
            Ok(view) => {
                let fh = self.next_fh.fetch_add(1, Ordering::SeqCst);
                self.handles.insert(fh, view);
                debug!(vpath, fh, "opened share view");
                reply.opened(fh, fuser::consts::FOPEN_KEEP_CACHE);
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Some(handle) = self.handles.get(&fh) else {
            reply.error(libc::EBADF);
            return;
        };
        let mut buf = vec![0u8; size as usize];
        match handle.read_at(&mut buf, offset.max(0) as u64) {
            Ok(n) => reply.data(&buf[..n]),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        self.handles.remove(&fh);
        reply.ok();
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let Some(vpath) = self.vpath_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.tree.getattr(&vpath) {
            Ok(attr) if attr.kind == FileKind::Directory => {
                reply.opened(0, fuser::consts::FOPEN_KEEP_CACHE)
            }
            Ok(_) => reply.error(libc::ENOTDIR),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let Some(vpath) = self.vpath_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let listing = match self.tree.read_dir(&vpath) {
            Ok(listing) => listing,
            Err(e) => {
                reply.error(e.errno());
                return;
            }
        };

        let parent_ino = if ino == ROOT_INO {
            ROOT_INO
        } else {
            self.ino_of(Self::parent_path(&vpath))
        };
        let mut entries: Vec<(u64, fuser::FileType, String)> = vec![
            (ino, fuser::FileType::Directory, ".".to_string()),
            (parent_ino, fuser::FileType::Directory, "..".to_string()),
        ];
        for entry in listing {
            let child_ino = self.ino_of(&Self::child_path(&vpath, &entry.name));
            entries.push((child_ino, fuser_kind(entry.kind), entry.name));
        }

        for (i, (ino, kind, name)) in entries.into_iter().enumerate().skip(offset.max(0) as usize)
        {
            // add returns true when the reply buffer is full
            if reply.add(ino, (i + 1) as i64, kind, &name) {
                break;
            }
        }
        reply.ok();
    }

    fn releasedir(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _flags: i32, reply: ReplyEmpty) {
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        // Synthetic numbers; the view has no capacity of its own.
        reply.statfs(0, 0, 0, 0, 0, 4096, 255, 4096);
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty) {
        let Some(vpath) = self.vpath_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        if mask & libc::W_OK != 0 {
            reply.error(libc::EACCES);
            return;
        }
        match self.tree.getattr(&vpath) {
            Ok(_) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }
}

// =============================================================================
// Mounting
// =============================================================================

/// Mount options for the share view.
#[derive(Clone, Debug)]
pub struct MountOptions {
    /// Allow other users to access the mount
    pub allow_other: bool,
    /// Filesystem name shown in mount output
    pub fsname: String,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            allow_other: false,
            fsname: "shardfs".to_string(),
        }
    }
}

/// Mount the share view and block until it is unmounted.
pub fn mount(tree: ShareTree, mountpoint: &Path, options: &MountOptions) -> std::io::Result<()> {
    let mut mount_options = vec![
        MountOption::RO,
        MountOption::FSName(options.fsname.clone()),
        MountOption::DefaultPermissions,
        MountOption::AutoUnmount,
    ];
    if options.allow_other {
        mount_options.push(MountOption::AllowOther);
    }
    fuser::mount2(ShareFs::new(tree), mountpoint, &mount_options)
}
