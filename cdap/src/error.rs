//! Error types for cdap
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation.

use thiserror::Error;

/// Main error type for cdap
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Block source I/O errors
    #[error("Source I/O error: {0}")]
    Source(#[from] std::io::Error),

    /// Playback engine errors
    #[error("Playback error: {0}")]
    Playback(String),
}

/// Convenience Result type using the cdap Error
pub type Result<T> = std::result::Result<T, Error>;
