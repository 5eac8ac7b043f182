//! Pacing engine and playback state machine

pub mod engine;
pub mod geometry;
pub mod types;

pub use engine::{PlayerHandle, StreamEngine};
pub use types::{PlayRequest, PlaybackMode, StopReason};
