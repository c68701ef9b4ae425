use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("frame not found: {0}")]
    FrameNotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("ocr engine error: {0}")]
    Ocr(String),

    #[error("tracking lost at frame {frame}")]
    TrackingLost { frame: u64 },

    #[error("cancelled")]
    Cancelled,
}

impl From<TrackingError> for redact_core::RedactError {
    fn from(e: TrackingError) -> Self {
        match e {
            TrackingError::FrameNotFound(msg) => redact_core::RedactError::input(msg),
            TrackingError::Io(io) => redact_core::RedactError::Storage(io),
            TrackingError::Image(img) => redact_core::RedactError::engine(img.to_string()),
            TrackingError::Ocr(msg) => redact_core::RedactError::engine(msg),
            TrackingError::TrackingLost { frame } => redact_core::RedactError::TrackingLost { frame },
            TrackingError::Cancelled => redact_core::RedactError::Cancelled,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackingError>;
