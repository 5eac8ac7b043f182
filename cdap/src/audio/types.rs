//! Core audio data types
//!
//! CD audio payload is passed through unchanged, so frames keep the source's
//! native format: one 16-bit signed little-endian sample per channel, stereo.

use crate::playback::geometry::BYTES_PER_FRAME;

/// One stereo sample period in the source's native 16-bit format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFrame {
    /// Left channel sample
    pub left: i16,

    /// Right channel sample
    pub right: i16,
}

impl AudioFrame {
    /// Create a silent frame.
    pub fn zero() -> Self {
        AudioFrame { left: 0, right: 0 }
    }

    /// Decode one frame from 4 little-endian payload bytes.
    pub fn from_le_bytes(bytes: [u8; BYTES_PER_FRAME]) -> Self {
        AudioFrame {
            left: i16::from_le_bytes([bytes[0], bytes[1]]),
            right: i16::from_le_bytes([bytes[2], bytes[3]]),
        }
    }

    /// Convert to normalized f32 samples for output devices that want floats.
    pub fn to_f32(self) -> (f32, f32) {
        (
            self.left as f32 / -(i16::MIN as f32),
            self.right as f32 / -(i16::MIN as f32),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_frame() {
        let frame = AudioFrame::zero();
        assert_eq!(frame.left, 0);
        assert_eq!(frame.right, 0);
    }

    #[test]
    fn test_from_le_bytes() {
        // left = 0x0201, right = 0xFCFF (-4 as i16 LE)
        let frame = AudioFrame::from_le_bytes([0x01, 0x02, 0xFC, 0xFF]);
        assert_eq!(frame.left, 0x0201);
        assert_eq!(frame.right, -4);
    }

    #[test]
    fn test_to_f32_range() {
        let (l, r) = AudioFrame { left: i16::MIN, right: i16::MAX }.to_f32();
        assert_eq!(l, -1.0);
        assert!(r < 1.0 && r > 0.999);

        let (l, r) = AudioFrame::zero().to_f32();
        assert_eq!(l, 0.0);
        assert_eq!(r, 0.0);
    }
}
