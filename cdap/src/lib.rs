//! # cdap — CD Audio Player
//!
//! Streams a sector-addressed disc image into a bounded audio output buffer,
//! pacing reads to the buffer's free capacity so playback never underruns
//! and never overfills.
//!
//! **Architecture:** a single long-lived pacing loop ([`playback::StreamEngine`])
//! drives a four-state playback machine (stopped / seeking / seek-then-play /
//! playing) held in [`state::SharedState`]. Commands arrive through the
//! cloneable [`playback::PlayerHandle`] and take effect at the loop's next
//! iteration boundary. Audio flows source → engine → lock-free ring → cpal
//! callback, with samples passed through undecoded.

pub mod audio;
pub mod config;
pub mod error;
pub mod events;
pub mod playback;
pub mod source;
pub mod state;

pub use error::{Error, Result};
pub use playback::{PlayerHandle, StreamEngine};
pub use state::SharedState;
