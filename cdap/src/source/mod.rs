//! Block source abstraction
//!
//! A block source is a seekable, sector-addressed byte source: a raw disc
//! image file, or anything else that can hand the engine whole 2352-byte
//! sectors. The engine owns exactly one bound source at a time and is the
//! only component that touches it.

pub mod file;

pub use file::FileBlockSource;

use crate::error::Result;

/// A seekable byte source addressed in raw sectors.
///
/// Reads and seeks are synchronous, bounded-latency calls; no async contract
/// is assumed of implementations. A short read (fewer bytes than the buffer
/// requested) signals exhaustion or error and is always fatal to the current
/// playback run.
pub trait BlockSource: Send {
    /// Reposition to an absolute byte offset, returning the resulting offset.
    fn seek(&mut self, byte_offset: u64) -> Result<u64>;

    /// Read up to `buf.len()` bytes, returning how many were read.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}
