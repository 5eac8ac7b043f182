//! Shared playback state
//!
//! Thread-safe control state shared between the command surface and the
//! stream engine's loop. Mode, position, and the end-of-run bound live behind
//! one narrow mutex: the lock is held only across field access, never across
//! a source read or sink write, so command callers never block on device
//! latency.
//!
//! Transitions follow the four-state machine: any command can move the mode,
//! and the loop itself moves it on seek success, end of run, and I/O failure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio::sync::broadcast;

use crate::events::PlayerEvent;
use crate::playback::types::{PlaybackMode, StopReason};

/// Control fields guarded together by a single lock.
#[derive(Debug)]
struct ControlBlock {
    mode: PlaybackMode,
    /// Current logical block address; stale while `Stopped`
    current_block: u32,
    /// Exclusive upper bound of the current run; set once per play command
    end_block: u32,
    /// Why the engine last entered `Stopped`
    last_stop_reason: Option<StopReason>,
}

/// Shared state accessible by the engine loop and all command callers.
pub struct SharedState {
    control: Mutex<ControlBlock>,

    /// Event broadcaster (lossy; no subscribers is fine)
    event_tx: broadcast::Sender<PlayerEvent>,

    /// Graceful-termination flag for the engine task
    shutdown: AtomicBool,
}

impl SharedState {
    /// Create new shared state: `Stopped` at block 0, no stop reason.
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            control: Mutex::new(ControlBlock {
                mode: PlaybackMode::Stopped,
                current_block: 0,
                end_block: 0,
                last_stop_reason: None,
            }),
            event_tx,
            shutdown: AtomicBool::new(false),
        }
    }

    /// Get the current playback mode.
    pub fn mode(&self) -> PlaybackMode {
        self.control.lock().unwrap().mode
    }

    /// Get the current logical block address.
    pub fn position(&self) -> u32 {
        self.control.lock().unwrap().current_block
    }

    /// Get the exclusive end block of the current run.
    pub fn end_block(&self) -> u32 {
        self.control.lock().unwrap().end_block
    }

    /// Get the reason the engine last entered `Stopped`.
    pub fn last_stop_reason(&self) -> Option<StopReason> {
        self.control.lock().unwrap().last_stop_reason
    }

    /// `seek(lba)`: retarget the position and enter `Seeking`.
    pub fn begin_seek(&self, lba: u32) {
        {
            let mut control = self.control.lock().unwrap();
            control.current_block = lba;
            control.mode = PlaybackMode::Seeking;
        }
        self.broadcast_event(PlayerEvent::mode_changed(PlaybackMode::Seeking));
    }

    /// Start a bounded run: position moves to `lba`, the end block is fixed
    /// at `lba + num_blocks`, and the mode becomes `SeekThenPlay`. The end
    /// block is never recomputed while the run plays.
    pub fn begin_run(&self, lba: u32, num_blocks: u32) {
        {
            let mut control = self.control.lock().unwrap();
            control.current_block = lba;
            control.end_block = lba.saturating_add(num_blocks);
            control.mode = PlaybackMode::SeekThenPlay;
        }
        self.broadcast_event(PlayerEvent::mode_changed(PlaybackMode::SeekThenPlay));
    }

    /// `pause()`: enter `Stopped`, retaining position and end block.
    pub fn pause(&self) {
        self.control.lock().unwrap().mode = PlaybackMode::Stopped;
        self.broadcast_event(PlayerEvent::mode_changed(PlaybackMode::Stopped));
    }

    /// `resume()`: enter `Playing` from the retained position and end block.
    pub fn resume(&self) {
        self.control.lock().unwrap().mode = PlaybackMode::Playing;
        self.broadcast_event(PlayerEvent::mode_changed(PlaybackMode::Playing));
    }

    /// The loop observed a successful seek. Promotes `SeekThenPlay` to
    /// `Playing`; plain `Seeking` stays as it is, pending a play command.
    pub fn seek_succeeded(&self) {
        let promoted = {
            let mut control = self.control.lock().unwrap();
            if control.mode == PlaybackMode::SeekThenPlay {
                control.mode = PlaybackMode::Playing;
                true
            } else {
                false
            }
        };
        if promoted {
            self.broadcast_event(PlayerEvent::mode_changed(PlaybackMode::Playing));
        }
    }

    /// Enter `Stopped` and record why. Used for normal completion and for
    /// every I/O failure; failures are never retried.
    pub fn stop(&self, reason: StopReason) {
        let lba = {
            let mut control = self.control.lock().unwrap();
            control.mode = PlaybackMode::Stopped;
            control.last_stop_reason = Some(reason);
            control.current_block
        };
        self.broadcast_event(PlayerEvent::mode_changed(PlaybackMode::Stopped));
        self.broadcast_event(PlayerEvent::playback_stopped(reason, lba));
    }

    /// Advance the position by a whole number of sectors.
    ///
    /// Returns the new position and whether the run's end block has been
    /// reached. Both come from one lock acquisition so the end-of-run
    /// decision is made against a consistent pair.
    ///
    /// Returns `None` when a retarget (`seek` or `play`) landed since the
    /// batch was read: the freshly set position must not be bumped by the
    /// in-flight batch, and the pending seek repositions the source, so the
    /// caller drops the batch. A pause or resume landing mid-batch still
    /// advances; the iteration completes and position stays consistent with
    /// the source offset.
    pub fn advance(&self, sectors: u32) -> Option<(u32, bool)> {
        let mut control = self.control.lock().unwrap();
        if matches!(
            control.mode,
            PlaybackMode::Seeking | PlaybackMode::SeekThenPlay
        ) {
            return None;
        }
        control.current_block = control.current_block.saturating_add(sectors);
        Some((control.current_block, control.current_block >= control.end_block))
    }

    /// Rebind reset: mode to `Stopped`, position to 0.
    pub fn reset(&self) {
        let mut control = self.control.lock().unwrap();
        control.mode = PlaybackMode::Stopped;
        control.current_block = 0;
        control.end_block = 0;
    }

    /// Broadcast an event to all listeners (no receivers is OK).
    pub fn broadcast_event(&self, event: PlayerEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to the event stream.
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }

    /// Request graceful termination of the engine task.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Check whether shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
