//! Sector geometry for raw CD audio images
//!
//! All pacing arithmetic is done in these fixed units: the source is addressed
//! in 2352-byte raw sectors, the sink in 16-bit stereo frames. Reads are
//! always issued in whole sectors, so every transfer size derived here is an
//! exact multiple of `SECTOR_SIZE`.

/// Raw CD sector size in bytes.
pub const SECTOR_SIZE: usize = 2352;

/// One stereo frame: two 16-bit samples.
pub const BYTES_PER_FRAME: usize = 4;

/// Stereo frames per raw sector (2352 / 4 = 588).
pub const FRAMES_PER_SECTOR: usize = SECTOR_SIZE / BYTES_PER_FRAME;

/// Largest number of sectors transferred in a single batched read.
pub const SECTOR_BATCH: usize = 16;

/// Sink buffer capacity in frames, sized to hold one full batch (9408).
pub const BUFFER_FRAMES: usize = FRAMES_PER_SECTOR * SECTOR_BATCH;

/// Scratch chunk size in bytes for one full batch (37632).
pub const CHUNK_BYTES: usize = SECTOR_SIZE * SECTOR_BATCH;

/// Whole sectors that fit into `free_frames` of sink capacity.
///
/// Sectors are never split, so this rounds down.
pub fn sectors_fitting(free_frames: usize) -> usize {
    free_frames / FRAMES_PER_SECTOR
}

/// Byte size of a run of whole sectors.
pub fn sector_run_bytes(sectors: usize) -> usize {
    sectors * SECTOR_SIZE
}

/// Byte offset of a logical block address within the image.
pub fn byte_offset(lba: u32) -> u64 {
    lba as u64 * SECTOR_SIZE as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_constants() {
        assert_eq!(FRAMES_PER_SECTOR, 588);
        assert_eq!(BUFFER_FRAMES, 9408);
        assert_eq!(CHUNK_BYTES, 37632);
    }

    #[test]
    fn test_full_buffer_fits_one_batch() {
        // A fully drained sink accepts exactly one maximum batch
        let sectors = sectors_fitting(BUFFER_FRAMES);
        assert_eq!(sectors, 16);
        assert_eq!(sector_run_bytes(sectors), 37632);
    }

    #[test]
    fn test_sub_sector_capacity_reads_nothing() {
        // Less than one sector of free space means no transfer this iteration
        assert_eq!(sectors_fitting(500), 0);
        assert_eq!(sectors_fitting(587), 0);
        assert_eq!(sectors_fitting(588), 1);
    }

    #[test]
    fn test_run_bytes_are_sector_multiples_and_fit() {
        for free_frames in [0, 1, 587, 588, 589, 1000, 4704, 9407, 9408, 20000] {
            let sectors = sectors_fitting(free_frames);
            let bytes = sector_run_bytes(sectors);
            assert_eq!(bytes % SECTOR_SIZE, 0);
            // The transfer never exceeds the free space it was computed from
            assert!(bytes <= free_frames * BYTES_PER_FRAME);
        }
    }

    #[test]
    fn test_byte_offset() {
        assert_eq!(byte_offset(0), 0);
        assert_eq!(byte_offset(1), 2352);
        assert_eq!(byte_offset(100), 235_200);
        // No overflow at the top of the LBA range
        assert_eq!(byte_offset(u32::MAX), u32::MAX as u64 * 2352);
    }
}
