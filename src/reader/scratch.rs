//! Scratch Buffers
//!
//! Each in-flight read needs transient buffers: one or more read buffers
//! for positional I/O and a work buffer for FEC columns. Allocating them
//! per call would dominate small reads, so handles keep a pool of buffer
//! sets that calls lease and return. The pool mutex is held only for the
//! pop/push, never across I/O or FEC work, and the pool population is
//! bounded by the number of concurrently reading threads.

use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};

/// One set of reusable buffers, private to a single read call at a time.
#[derive(Default)]
pub struct ScratchBuffers {
    /// Positional-read landing zones; encoded reads use one, decoded
    /// reads use K.
    pub read_bufs: Vec<Vec<u8>>,
    /// Column/transform space for FEC input or output.
    pub work_buf: Vec<u8>,
}

impl ScratchBuffers {
    /// Grow the read-buffer list to at least `count` entries.
    pub fn ensure_read_bufs(&mut self, count: usize) {
        while self.read_bufs.len() < count {
            self.read_bufs.push(Vec::new());
        }
    }
}

/// Pool of scratch sets leased around each read.
#[derive(Default)]
pub struct ScratchPool {
    idle: Mutex<Vec<ScratchBuffers>>,
}

impl ScratchPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a scratch set, allocating a fresh one if none is idle.
    /// The set returns to the pool when the lease drops.
    pub fn lease(&self) -> ScratchLease<'_> {
        let buffers = self.idle.lock().pop().unwrap_or_default();
        ScratchLease {
            pool: self,
            buffers: Some(buffers),
        }
    }
}

/// RAII lease of one `ScratchBuffers` set.
pub struct ScratchLease<'a> {
    pool: &'a ScratchPool,
    buffers: Option<ScratchBuffers>,
}

impl Deref for ScratchLease<'_> {
    type Target = ScratchBuffers;

    fn deref(&self) -> &ScratchBuffers {
        self.buffers.as_ref().expect("lease holds buffers until drop")
    }
}

impl DerefMut for ScratchLease<'_> {
    fn deref_mut(&mut self) -> &mut ScratchBuffers {
        self.buffers.as_mut().expect("lease holds buffers until drop")
    }
}

impl Drop for ScratchLease<'_> {
    fn drop(&mut self) {
        if let Some(buffers) = self.buffers.take() {
            self.pool.idle.lock().push(buffers);
        }
    }
}
