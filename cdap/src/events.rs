//! Player event broadcasting
//!
//! One-to-many event notification over `tokio::sync::broadcast`. Emission is
//! lossy: events are dropped silently when there are no subscribers, so the
//! engine never blocks or fails on observers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::playback::types::{PlaybackMode, StopReason};

/// Events emitted by the player.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// The playback mode changed (command or loop transition)
    ModeChanged {
        mode: PlaybackMode,
        timestamp: DateTime<Utc>,
    },

    /// The engine entered `Stopped`, normally or on failure
    PlaybackStopped {
        reason: StopReason,
        /// Logical block position when the run stopped
        lba: u32,
        timestamp: DateTime<Utc>,
    },

    /// A new block source was bound, resetting mode and position
    SourceBound { timestamp: DateTime<Utc> },
}

impl PlayerEvent {
    pub fn mode_changed(mode: PlaybackMode) -> Self {
        PlayerEvent::ModeChanged { mode, timestamp: Utc::now() }
    }

    pub fn playback_stopped(reason: StopReason, lba: u32) -> Self {
        PlayerEvent::PlaybackStopped { reason, lba, timestamp: Utc::now() }
    }

    pub fn source_bound() -> Self {
        PlayerEvent::SourceBound { timestamp: Utc::now() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_changed_constructor() {
        match PlayerEvent::mode_changed(PlaybackMode::Playing) {
            PlayerEvent::ModeChanged { mode, .. } => assert_eq!(mode, PlaybackMode::Playing),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_playback_stopped_constructor() {
        match PlayerEvent::playback_stopped(StopReason::PartialRead, 42) {
            PlayerEvent::PlaybackStopped { reason, lba, .. } => {
                assert_eq!(reason, StopReason::PartialRead);
                assert_eq!(lba, 42);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
