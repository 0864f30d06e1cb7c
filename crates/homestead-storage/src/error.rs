use homestead_core::{Classify, ErrorClass};
use thiserror::Error;

use crate::cdn::CdnError;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage path: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("CDN error: {0}")]
    Cdn(#[from] CdnError),

    /// The CDN upload and the local fallback both failed; nothing durable exists.
    #[error("No durable copy written (cdn: {cdn}; local: {local})")]
    AllTiersFailed { cdn: String, local: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl Classify for StorageError {
    fn class(&self) -> ErrorClass {
        match self {
            StorageError::NotFound(_) => ErrorClass::SourceMissing,
            StorageError::InvalidKey(_) => ErrorClass::UpstreamRejected,
            StorageError::ConfigError(_) => ErrorClass::ConfigurationMissing,
            StorageError::Cdn(e) => e.class(),
            StorageError::WriteFailed(_)
            | StorageError::DeleteFailed(_)
            | StorageError::IoError(_)
            | StorageError::AllTiersFailed { .. } => ErrorClass::TransientIo,
        }
    }
}
