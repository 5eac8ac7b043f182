//! Audio sink contract
//!
//! The engine paces its reads against the sink's free capacity, so the
//! contract is small: total capacity, current occupancy, and a byte write.
//! The sink drains asynchronously on the audio device side, freeing capacity
//! that feeds back into the next pacing decision.

/// A fixed-capacity frame queue the engine streams into.
pub trait AudioSink: Send {
    /// Total queue capacity in frames.
    fn capacity_frames(&self) -> usize;

    /// Frames currently queued and not yet consumed.
    fn queued_frames(&self) -> usize;

    /// Additional frames the sink can currently accept.
    fn free_frames(&self) -> usize {
        self.capacity_frames().saturating_sub(self.queued_frames())
    }

    /// Write raw 16-bit stereo little-endian payload, returning how many
    /// bytes were accepted. Accepting fewer bytes than given is always
    /// treated as fatal by the engine.
    fn write(&mut self, buf: &[u8]) -> usize;
}
