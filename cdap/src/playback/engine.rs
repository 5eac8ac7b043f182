//! Stream engine: the buffer-pacing playback loop
//!
//! The engine runs as one long-lived task alternating between a seek phase
//! and a play phase. Each play iteration reads exactly as many whole sectors
//! from the block source as currently fit in the sink's free capacity,
//! forwards them, advances the logical position, and yields cooperatively.
//! The sink drains on the audio device side, freeing capacity that feeds the
//! next iteration's read size.
//!
//! Commands mutate `SharedState` from other contexts and are observed by the
//! loop no later than its next iteration boundary; nothing interrupts an
//! in-flight read or write. I/O failures follow one policy: log, stop with a
//! recorded reason, never retry.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, trace, warn};

use crate::audio::AudioSink;
use crate::events::PlayerEvent;
use crate::playback::geometry;
use crate::playback::types::{PlayRequest, PlaybackMode, StopReason};
use crate::source::BlockSource;
use crate::state::SharedState;

/// Poll interval between outer-loop passes while nothing is runnable.
const DEFAULT_IDLE_POLL: Duration = Duration::from_millis(50);

/// Wait applied when the sink has less than one sector of free space. The
/// device drains a sector's worth of frames in ~13ms at 44.1kHz, so a short
/// wait is enough for capacity to reappear.
const PACE_WAIT: Duration = Duration::from_millis(5);

/// The pacing loop. Owns the bound block source, the audio sink, and a
/// scratch buffer sized to the maximum single batch, allocated once.
///
/// Exactly one engine exists per sink; constructing it hands back the
/// cloneable [`PlayerHandle`] used to command it.
pub struct StreamEngine {
    state: Arc<SharedState>,
    sink: Box<dyn AudioSink>,
    source: Option<Box<dyn BlockSource>>,
    bind_rx: mpsc::UnboundedReceiver<Box<dyn BlockSource>>,
    /// Reusable read buffer for one full sector batch
    chunk: Vec<u8>,
    idle_poll: Duration,
}

impl StreamEngine {
    /// Create an engine around an audio sink.
    ///
    /// A block source is not required until playback is requested; bind one
    /// through the returned handle.
    pub fn new(sink: Box<dyn AudioSink>) -> (Self, PlayerHandle) {
        let state = Arc::new(SharedState::new());
        let (bind_tx, bind_rx) = mpsc::unbounded_channel();

        let engine = Self {
            state: Arc::clone(&state),
            sink,
            source: None,
            bind_rx,
            chunk: vec![0u8; geometry::CHUNK_BYTES],
            idle_poll: DEFAULT_IDLE_POLL,
        };

        (engine, PlayerHandle { state, bind_tx })
    }

    /// Override the idle poll interval (mainly for tests).
    pub fn set_idle_poll(&mut self, idle_poll: Duration) {
        self.idle_poll = idle_poll;
    }

    /// Spawn the engine loop as a background task.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// The outer loop. Re-evaluates the mode every pass and never exits on
    /// its own; only a shutdown request ends the task.
    pub async fn run(mut self) {
        info!("Stream engine starting");

        loop {
            if self.state.is_shutdown() {
                break;
            }

            // Take ownership of any newly bound source before acting on the
            // mode, so a bind followed by a play command is seen in order.
            while let Ok(source) = self.bind_rx.try_recv() {
                debug!("Block source bound");
                self.source = Some(source);
            }

            if matches!(
                self.state.mode(),
                PlaybackMode::Seeking | PlaybackMode::SeekThenPlay
            ) {
                self.seek_phase();
            }

            self.play_phase().await;

            tokio::time::sleep(self.idle_poll).await;
        }

        info!("Stream engine stopped");
    }

    /// Reposition the source to the current block. On success a pending
    /// `SeekThenPlay` becomes `Playing`; plain `Seeking` stays seeking (and
    /// re-seeks on later passes) until paired with a play command. Failure
    /// stops playback, retaining the attempted target position.
    fn seek_phase(&mut self) {
        let lba = self.state.position();
        let offset = geometry::byte_offset(lba);

        // A bind handed to the channel may not have been taken yet; leave the
        // mode pending and retry on the next pass rather than failing.
        let Some(source) = self.source.as_mut() else {
            debug!("Seek pending, no block source bound yet");
            return;
        };

        match source.seek(offset) {
            Ok(_) => {
                debug!("Seeked to block {} (byte offset {})", lba, offset);
                self.state.seek_succeeded();
            }
            Err(e) => {
                error!("Error seeking to byte offset {}: {}", offset, e);
                self.state.stop(StopReason::SeekFailed);
            }
        }
    }

    /// Pace sectors into the sink while `Playing`.
    ///
    /// Each iteration: size the read to the sink's free capacity in whole
    /// sectors, read one batch, advance, then write. The end-of-run check
    /// deliberately happens after advancing but before the write, so data
    /// read across the end boundary is dropped rather than played.
    async fn play_phase(&mut self) {
        while self.state.mode() == PlaybackMode::Playing {
            if self.state.is_shutdown() {
                return;
            }

            let free_frames = self.sink.free_frames();
            // A sink may report more free space than one batch; the transfer
            // is bounded by the scratch buffer regardless
            let sectors = geometry::sectors_fitting(free_frames).min(geometry::SECTOR_BATCH);
            let bytes_to_read = geometry::sector_run_bytes(sectors);

            if bytes_to_read == 0 {
                // Sink is full or nearly full; let it drain
                tokio::time::sleep(PACE_WAIT).await;
                continue;
            }

            let Some(source) = self.source.as_mut() else {
                debug!("Playing pending, no block source bound yet");
                return;
            };

            let bytes_read = match source.read(&mut self.chunk[..bytes_to_read]) {
                Ok(n) => n,
                Err(e) => {
                    error!("Error reading from source: {}", e);
                    self.state.stop(StopReason::PartialRead);
                    return;
                }
            };

            if bytes_read < bytes_to_read {
                error!("Partial read: {} of {} bytes", bytes_read, bytes_to_read);
                self.state.stop(StopReason::PartialRead);
                return;
            }

            trace!("Read {} sectors ({} bytes) in batch", sectors, bytes_read);

            // Reads are exact sector multiples, so this division is exact
            let Some((current, end_reached)) =
                self.state.advance((bytes_read / geometry::SECTOR_SIZE) as u32)
            else {
                // A seek or play landed while the batch was being read; the
                // pending seek repositions the source, so the batch is stale
                debug!("Retarget during batch, dropping {} sectors", sectors);
                return;
            };

            if end_reached {
                info!("Finished playing at block {}", current);
                self.state.stop(StopReason::NormalCompletion);
                return;
            }

            let bytes_written = self.sink.write(&self.chunk[..bytes_read]);
            if bytes_written < bytes_read {
                error!(
                    "Partial write: sink accepted {} of {} bytes",
                    bytes_written, bytes_read
                );
                self.state.stop(StopReason::PartialWrite);
                return;
            }

            // Let other tasks have cpu time
            tokio::task::yield_now().await;
        }
    }
}

/// Command surface for a running [`StreamEngine`].
///
/// Cloneable and cheap; all commands are synchronous state transitions whose
/// effects (the actual seek and the audio) happen asynchronously in the
/// engine's loop. Every command returns a success flag, and all of them
/// currently always succeed; failures during playback are reported through
/// [`PlayerHandle::last_stop_reason`] and the event stream instead.
#[derive(Clone)]
pub struct PlayerHandle {
    state: Arc<SharedState>,
    bind_tx: mpsc::UnboundedSender<Box<dyn BlockSource>>,
}

impl PlayerHandle {
    /// Bind a new block source, discarding any prior binding.
    ///
    /// Resets the mode to `Stopped` and the position to 0. The source is
    /// handed to the engine task, which takes ownership of it at its next
    /// pass; the caller never blocks on the device.
    pub fn bind(&self, source: Box<dyn BlockSource>) -> bool {
        info!("Binding new block source");
        self.state.reset();
        if self.bind_tx.send(source).is_err() {
            warn!("Engine task is gone; dropping source");
        }
        self.state.broadcast_event(PlayerEvent::source_bound());
        true
    }

    /// Retarget the position and enter `Seeking`. The seek itself happens in
    /// the loop; seeking alone produces no audio.
    pub fn seek(&self, lba: u32) -> bool {
        info!("Seek to block {}", lba);
        self.state.begin_seek(lba);
        true
    }

    /// Raw play command with the wire sentinels: LBA 0 is a tolerated no-op
    /// and LBA `0xFFFF_FFFF` resumes. Prefer [`PlayerHandle::play_request`]
    /// unless protocol compatibility requires this form.
    pub fn play(&self, lba: u32, num_blocks: u32) -> bool {
        self.play_request(PlayRequest::from_raw(lba, num_blocks))
    }

    /// Typed play command.
    pub fn play_request(&self, request: PlayRequest) -> bool {
        match request {
            PlayRequest::NoOp => {
                debug!("Play no-op");
            }
            PlayRequest::Resume => return self.resume(),
            PlayRequest::FromBlock { lba, num_blocks } => {
                info!("Play from block {} for {} blocks", lba, num_blocks);
                self.state.begin_run(lba, num_blocks);
            }
        }
        true
    }

    /// Stop streaming, retaining position and end block for a later resume.
    pub fn pause(&self) -> bool {
        info!("Pausing");
        self.state.pause();
        true
    }

    /// Continue from the retained position and end block.
    ///
    /// Callers should have issued at least one play command first: with no
    /// prior run the end block is 0, so the engine stops with
    /// `NormalCompletion` on its first advance without playing anything.
    pub fn resume(&self) -> bool {
        info!("Resuming");
        self.state.resume();
        true
    }

    /// Current playback mode.
    pub fn mode(&self) -> PlaybackMode {
        self.state.mode()
    }

    /// Current logical block address (stale while `Stopped`).
    pub fn position(&self) -> u32 {
        self.state.position()
    }

    /// Why the engine last entered `Stopped`: distinguishes a normal end of
    /// run from an I/O failure.
    pub fn last_stop_reason(&self) -> Option<StopReason> {
        self.state.last_stop_reason()
    }

    /// Subscribe to player events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.state.subscribe_events()
    }

    /// Request graceful termination of the engine task.
    pub fn shutdown(&self) {
        self.state.request_shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullSink;

    impl AudioSink for NullSink {
        fn capacity_frames(&self) -> usize {
            geometry::BUFFER_FRAMES
        }
        fn queued_frames(&self) -> usize {
            0
        }
        fn write(&mut self, buf: &[u8]) -> usize {
            buf.len()
        }
    }

    // Command semantics are synchronous on shared state, so these tests need
    // no running loop; the loop itself is covered by the integration tests.

    #[test]
    fn test_engine_allocates_full_batch_chunk() {
        let (engine, _handle) = StreamEngine::new(Box::new(NullSink));
        assert_eq!(engine.chunk.len(), 37632);
    }

    #[test]
    fn test_play_sentinel_zero_is_noop() {
        let (_engine, handle) = StreamEngine::new(Box::new(NullSink));

        handle.seek(7);
        assert!(handle.play(0, 500));

        // Mode and position unchanged by the no-op
        assert_eq!(handle.mode(), PlaybackMode::Seeking);
        assert_eq!(handle.position(), 7);
    }

    #[test]
    fn test_play_sentinel_all_ones_resumes() {
        let (_engine, handle) = StreamEngine::new(Box::new(NullSink));

        handle.seek(42);
        assert!(handle.play(u32::MAX, 99));

        assert_eq!(handle.mode(), PlaybackMode::Playing);
        // Resume keeps the retained position
        assert_eq!(handle.position(), 42);
    }

    #[test]
    fn test_play_enters_seek_then_play_never_playing_directly() {
        let (_engine, handle) = StreamEngine::new(Box::new(NullSink));

        assert!(handle.play(200, 10));
        assert_eq!(handle.mode(), PlaybackMode::SeekThenPlay);
        assert_eq!(handle.position(), 200);
    }

    #[test]
    fn test_seek_then_play_overwrites_pending_seek() {
        let (_engine, handle) = StreamEngine::new(Box::new(NullSink));

        handle.seek(100);
        assert_eq!(handle.mode(), PlaybackMode::Seeking);

        handle.play(200, 10);
        assert_eq!(handle.mode(), PlaybackMode::SeekThenPlay);
        assert_eq!(handle.position(), 200);
    }

    #[test]
    fn test_pause_and_resume_are_immediate() {
        let (_engine, handle) = StreamEngine::new(Box::new(NullSink));

        handle.play(10, 5);
        handle.pause();
        assert_eq!(handle.mode(), PlaybackMode::Stopped);
        assert_eq!(handle.position(), 10);

        handle.resume();
        assert_eq!(handle.mode(), PlaybackMode::Playing);
        assert_eq!(handle.position(), 10);
    }
}
