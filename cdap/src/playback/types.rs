//! Playback mode, stop reasons, and the typed play request

use serde::Serialize;

/// Playback mode of the stream engine.
///
/// `Stopped` is the initial state, the normal end-of-run state, and the
/// landing state for every I/O failure. The engine's outer loop re-evaluates
/// the mode on every pass, so any mode is re-enterable indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    /// Idle; position is stale and no I/O is issued
    Stopped,
    /// A seek is pending; the loop repositions the source but produces no audio
    Seeking,
    /// A seek is pending and playback starts as soon as it succeeds
    SeekThenPlay,
    /// The pacing loop is actively streaming sectors into the sink
    Playing,
}

impl std::fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackMode::Stopped => write!(f, "stopped"),
            PlaybackMode::Seeking => write!(f, "seeking"),
            PlaybackMode::SeekThenPlay => write!(f, "seek-then-play"),
            PlaybackMode::Playing => write!(f, "playing"),
        }
    }
}

/// Why the engine last entered `Stopped`.
///
/// Failures stop playback without retrying and without a synchronous error to
/// the command caller; this is the queryable channel that distinguishes a
/// normal end of run from an I/O failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The run reached its end block
    NormalCompletion,
    /// The source could not honor the requested byte offset
    SeekFailed,
    /// The source returned fewer bytes than requested
    PartialRead,
    /// The sink accepted fewer bytes than given
    PartialWrite,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::NormalCompletion => write!(f, "normal completion"),
            StopReason::SeekFailed => write!(f, "seek failed"),
            StopReason::PartialRead => write!(f, "partial read"),
            StopReason::PartialWrite => write!(f, "partial write"),
        }
    }
}

/// A decoded play command.
///
/// The external command surface carries two magic LBA values inherited from
/// the SCSI PLAY AUDIO command: `0` means "do nothing" and `0xFFFF_FFFF`
/// means "resume". Those sentinels are decoded here, at the boundary, and do
/// not appear anywhere else in the crate. `FromBlock { lba: 0, .. }` built
/// directly through this type is an ordinary play from block zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayRequest {
    /// Start a bounded run of `num_blocks` blocks at `lba`
    FromBlock { lba: u32, num_blocks: u32 },
    /// Resume from the retained position and end block
    Resume,
    /// Tolerated no-op
    NoOp,
}

impl PlayRequest {
    /// LBA sentinel meaning "resume playback".
    pub const RESUME_LBA: u32 = 0xFFFF_FFFF;

    /// Decode the raw `(lba, num_blocks)` wire form.
    pub fn from_raw(lba: u32, num_blocks: u32) -> Self {
        match lba {
            0 => PlayRequest::NoOp,
            Self::RESUME_LBA => PlayRequest::Resume,
            _ => PlayRequest::FromBlock { lba, num_blocks },
        }
    }
}
