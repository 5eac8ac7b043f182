//! Disc image file source
//!
//! `BlockSource` implementation over a raw image file (e.g. a CD `.bin`
//! dump). The file is plain 2352-byte sectors back to back; there is no
//! container to parse.

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Result;
use crate::source::BlockSource;

/// Block source backed by a raw disc image file.
pub struct FileBlockSource {
    file: File,
    path: PathBuf,
}

impl FileBlockSource {
    /// Open an image file for streaming.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        info!("Opened disc image: {}", path.display());
        Ok(Self { file, path })
    }

    /// Image size in bytes.
    pub fn len_bytes(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Path of the backing image file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlockSource for FileBlockSource {
    fn seek(&mut self, byte_offset: u64) -> Result<u64> {
        let offset = self.file.seek(SeekFrom::Start(byte_offset))?;
        debug!("Seeked {} to byte offset {}", self.path.display(), offset);
        Ok(offset)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        // A single File::read may return less than requested without being at
        // EOF; keep filling so a short return really means exhaustion.
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::geometry::SECTOR_SIZE;
    use std::io::Write;

    /// Write `sectors` sectors where every byte of sector `i` is `i as u8`.
    fn write_test_image(sectors: usize) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..sectors {
            file.write_all(&[i as u8; SECTOR_SIZE]).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_open_missing_file_fails() {
        assert!(FileBlockSource::open("/nonexistent/image.bin").is_err());
    }

    #[test]
    fn test_read_full_sectors() {
        let image = write_test_image(3);
        let mut source = FileBlockSource::open(image.path()).unwrap();

        let mut buf = vec![0u8; SECTOR_SIZE * 2];
        let n = source.read(&mut buf).unwrap();
        assert_eq!(n, SECTOR_SIZE * 2);
        assert!(buf[..SECTOR_SIZE].iter().all(|&b| b == 0));
        assert!(buf[SECTOR_SIZE..].iter().all(|&b| b == 1));
    }

    #[test]
    fn test_seek_then_read() {
        let image = write_test_image(3);
        let mut source = FileBlockSource::open(image.path()).unwrap();

        let offset = source.seek(SECTOR_SIZE as u64 * 2).unwrap();
        assert_eq!(offset, SECTOR_SIZE as u64 * 2);

        let mut buf = vec![0u8; SECTOR_SIZE];
        let n = source.read(&mut buf).unwrap();
        assert_eq!(n, SECTOR_SIZE);
        assert!(buf.iter().all(|&b| b == 2));
    }

    #[test]
    fn test_short_read_at_end_of_image() {
        let image = write_test_image(1);
        let mut source = FileBlockSource::open(image.path()).unwrap();

        let mut buf = vec![0u8; SECTOR_SIZE * 2];
        let n = source.read(&mut buf).unwrap();
        // Exhaustion surfaces as a short read, which the engine treats as fatal
        assert_eq!(n, SECTOR_SIZE);
    }

    #[test]
    fn test_seek_past_end_reads_nothing() {
        // Seeking past EOF succeeds on a regular file; the failure shows up
        // as a zero-byte read on the next transfer.
        let image = write_test_image(1);
        let mut source = FileBlockSource::open(image.path()).unwrap();

        source.seek(SECTOR_SIZE as u64 * 10).unwrap();
        let mut buf = vec![0u8; SECTOR_SIZE];
        assert_eq!(source.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_len_bytes() {
        let image = write_test_image(4);
        let source = FileBlockSource::open(image.path()).unwrap();
        assert_eq!(source.len_bytes().unwrap(), SECTOR_SIZE as u64 * 4);
    }
}
