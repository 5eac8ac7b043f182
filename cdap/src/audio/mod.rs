//! Audio sink contract, ring buffer, and device output

pub mod output;
pub mod ring_buffer;
pub mod sink;
pub mod types;

pub use output::AudioOutput;
pub use ring_buffer::{RingBufferSink, SinkConsumer, SinkRing};
pub use sink::AudioSink;
pub use types::AudioFrame;
