//! Share Readers
//!
//! The two read paths of the view layer:
//!
//! - **Encoded** (`encoded.rs`): serve byte ranges of one share of one
//!   logical file, materialised on demand from the source file.
//! - **Decoded** (`decoded.rs`): serve byte ranges of the original file,
//!   reconstructed from any K share files.
//!
//! Both issue positional reads against shared descriptors (no seek state,
//! no I/O lock) and lease scratch buffers around each call.

pub mod decoded;
pub mod encoded;
pub mod scratch;

pub use decoded::DecodedFile;
pub use encoded::EncodedFile;

use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;

/// Positional read that retries until `buf` is full or EOF.
///
/// Short reads mid-file are continued; only end-of-file shortens the
/// result. Interrupted syscalls are retried.
pub(crate) fn read_full_at(file: &File, buf: &mut [u8], mut offset: u64) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match file.read_at(&mut buf[total..], offset) {
            Ok(0) => break,
            Ok(n) => {
                total += n;
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}
