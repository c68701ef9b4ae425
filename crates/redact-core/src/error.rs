//! The error taxonomy shared by every crate in this workspace.
//!
//! One variant per failure class named in the error-handling design: bad input, storage/schema
//! problems, per-frame engine failures, muxer failures, lost tracking, and operator cancellation.
//! `redact-engine` and `redact-tracking` convert their own error types into this one at the job
//! boundary, so a `Job`'s terminal message is always produced by a single `Display` impl.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RedactError {
    #[error("input error: {0}")]
    Input(String),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("schema error: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("engine error: {0}")]
    Engine(String),

    #[error("muxer error: {0}")]
    Muxer(String),

    #[error("tracking lost at frame {frame}")]
    TrackingLost { frame: u64 },

    #[error("cancelled")]
    Cancelled,
}

impl RedactError {
    pub fn input(msg: impl Into<String>) -> Self {
        RedactError::Input(msg.into())
    }

    pub fn engine(msg: impl Into<String>) -> Self {
        RedactError::Engine(msg.into())
    }

    pub fn muxer(msg: impl Into<String>) -> Self {
        RedactError::Muxer(msg.into())
    }

    /// True for stderr text that should trigger the audio-less mux retry (§4.G step 5).
    pub fn is_audio_related_muxer_failure(stderr: &str) -> bool {
        let lower = stderr.to_lowercase();
        lower.contains("audio") || lower.contains("stream")
    }
}

pub type Result<T> = std::result::Result<T, RedactError>;
