//! Frame-store/engine/muxer-local error type. Converts into `redact_core::RedactError` at the
//! orchestrator boundary so a `Job`'s terminal message always comes from one `Display` impl.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("frame not found: {0}")]
    FrameNotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image decode/encode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("bad trim window: start {start} >= end {end}")]
    BadTrim { start: u64, end: u64 },

    #[error("engine error: {0}")]
    Frame(String),

    #[error("muxer error: {0}")]
    Muxer(String),

    #[error("cancelled")]
    Cancelled,
}

impl From<EngineError> for redact_core::RedactError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::FrameNotFound(msg) => redact_core::RedactError::input(msg),
            EngineError::Io(io) => redact_core::RedactError::Storage(io),
            EngineError::Image(img) => redact_core::RedactError::engine(img.to_string()),
            EngineError::BadTrim { start, end } => {
                redact_core::RedactError::input(format!("bad trim window: start {start} >= end {end}"))
            }
            EngineError::Frame(msg) => redact_core::RedactError::engine(msg),
            EngineError::Muxer(msg) => redact_core::RedactError::muxer(msg),
            EngineError::Cancelled => redact_core::RedactError::Cancelled,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
