// src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VidcmpError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(#[from] ffmpeg_next::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Frame size mismatch at frame {index}: {original:?} vs {processed:?}")]
    FrameSizeMismatch {
        index: u64,
        original: (u32, u32),
        processed: (u32, u32),
    },

    #[error("No frames processed: both inputs empty or comparison aborted before the first pair")]
    NoFramesProcessed,

    #[error("JSON processing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Input error: {0}")]
    Input(String),
}

// Define a standard Result type for the crate
pub type Result<T> = std::result::Result<T, VidcmpError>;
