//! Lock-free ring buffer between the engine and the audio callback
//!
//! Single-producer single-consumer: the engine's play phase fills the ring
//! through the `AudioSink` contract, and the real-time audio callback drains
//! it without taking any locks. The ring's occupancy is exactly the sink
//! occupancy the pacing arithmetic works from.
//!
//! Underruns on the consumer side are expected while stopped or seeking (the
//! callback keeps running and outputs silence); they are counted and logged
//! sparsely rather than treated as errors.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ringbuf::{traits::*, HeapRb};
use tracing::{debug, trace};

use crate::audio::sink::AudioSink;
use crate::audio::types::AudioFrame;
use crate::playback::geometry::BYTES_PER_FRAME;

/// Lock-free frame queue, split into an engine-side sink and a
/// callback-side consumer.
pub struct SinkRing {
    buffer: HeapRb<AudioFrame>,
    underruns: Arc<AtomicU64>,
}

impl SinkRing {
    /// Create a ring holding `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        debug!("Creating sink ring with capacity {} frames", capacity);
        Self {
            buffer: HeapRb::new(capacity),
            underruns: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Split into the producer half (engine side) and consumer half
    /// (audio callback side). Each half can move to its own thread.
    pub fn split(self) -> (RingBufferSink, SinkConsumer) {
        let (producer, consumer) = self.buffer.split();

        (
            RingBufferSink { producer },
            SinkConsumer {
                consumer,
                underruns: self.underruns,
            },
        )
    }
}

/// Producer half: the engine's `AudioSink`.
pub struct RingBufferSink {
    producer: ringbuf::HeapProd<AudioFrame>,
}

impl AudioSink for RingBufferSink {
    fn capacity_frames(&self) -> usize {
        self.producer.capacity().into()
    }

    fn queued_frames(&self) -> usize {
        self.producer.occupied_len()
    }

    fn write(&mut self, buf: &[u8]) -> usize {
        let mut accepted = 0;
        for chunk in buf.chunks_exact(BYTES_PER_FRAME) {
            let frame = AudioFrame::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            if self.producer.try_push(frame).is_err() {
                break;
            }
            accepted += BYTES_PER_FRAME;
        }
        accepted
    }
}

/// Consumer half, drained by the audio output callback.
pub struct SinkConsumer {
    consumer: ringbuf::HeapCons<AudioFrame>,
    underruns: Arc<AtomicU64>,
}

impl SinkConsumer {
    /// Pop one frame; `None` means underrun and the caller should output
    /// silence. Lock-free, safe on the real-time audio thread.
    pub fn pop(&mut self) -> Option<AudioFrame> {
        match self.consumer.try_pop() {
            Some(frame) => Some(frame),
            None => {
                let count = self.underruns.fetch_add(1, Ordering::Relaxed) + 1;
                // Idle underruns are normal; log sparsely to avoid spam
                if count % 100_000 == 0 {
                    trace!("Sink ring underrun (total: {})", count);
                }
                None
            }
        }
    }

    /// Frames currently queued.
    pub fn occupied_len(&self) -> usize {
        self.consumer.occupied_len()
    }

    /// Total underruns observed since creation.
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::geometry::{BUFFER_FRAMES, FRAMES_PER_SECTOR, SECTOR_SIZE};

    #[test]
    fn test_capacity_and_occupancy() {
        let (mut sink, _cons) = SinkRing::new(BUFFER_FRAMES).split();

        assert_eq!(sink.capacity_frames(), 9408);
        assert_eq!(sink.queued_frames(), 0);
        assert_eq!(sink.free_frames(), 9408);

        let one_sector = vec![0u8; SECTOR_SIZE];
        assert_eq!(sink.write(&one_sector), SECTOR_SIZE);
        assert_eq!(sink.queued_frames(), FRAMES_PER_SECTOR);
        assert_eq!(sink.free_frames(), 9408 - 588);
    }

    #[test]
    fn test_write_decodes_le_frames_in_order() {
        let (mut sink, mut cons) = SinkRing::new(16).split();

        let bytes = [0x01, 0x00, 0x02, 0x00, 0xFF, 0xFF, 0x00, 0x80];
        assert_eq!(sink.write(&bytes), 8);

        let first = cons.pop().unwrap();
        assert_eq!(first.left, 1);
        assert_eq!(first.right, 2);

        let second = cons.pop().unwrap();
        assert_eq!(second.left, -1);
        assert_eq!(second.right, i16::MIN);
    }

    #[test]
    fn test_short_write_when_full() {
        let (mut sink, _cons) = SinkRing::new(2).split();

        // 3 frames offered, 2 fit
        let bytes = vec![0u8; 3 * BYTES_PER_FRAME];
        assert_eq!(sink.write(&bytes), 2 * BYTES_PER_FRAME);
        assert_eq!(sink.queued_frames(), 2);
    }

    #[test]
    fn test_underrun_returns_none_and_counts() {
        let (_sink, mut cons) = SinkRing::new(4).split();

        assert!(cons.pop().is_none());
        assert!(cons.pop().is_none());
        assert_eq!(cons.underruns(), 2);
    }

    #[test]
    fn test_draining_frees_capacity() {
        let (mut sink, mut cons) = SinkRing::new(FRAMES_PER_SECTOR).split();

        let one_sector = vec![0u8; SECTOR_SIZE];
        assert_eq!(sink.write(&one_sector), SECTOR_SIZE);
        assert_eq!(sink.free_frames(), 0);

        for _ in 0..FRAMES_PER_SECTOR {
            assert!(cons.pop().is_some());
        }
        assert_eq!(sink.free_frames(), FRAMES_PER_SECTOR);
    }
}
