use homestead_core::{Classify, ErrorClass, LogLevel};
use thiserror::Error;

/// Transform failures. All are retried uniformly by the ingestion job; the variant
/// only changes how the failure is logged.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Image has zero width or height")]
    EmptyImage,

    #[error("Transform worker failed: {0}")]
    Worker(String),
}

impl Classify for TransformError {
    fn class(&self) -> ErrorClass {
        match self {
            TransformError::Decode(_) | TransformError::EmptyImage => ErrorClass::SourceMissing,
            TransformError::Encode(_) | TransformError::Worker(_) => ErrorClass::TransientIo,
        }
    }

    // Bad input is retried like anything else, so it is not an error yet.
    fn log_level(&self) -> LogLevel {
        match self {
            TransformError::Decode(_) | TransformError::EmptyImage => LogLevel::Warn,
            _ => self.class().log_level(),
        }
    }
}
