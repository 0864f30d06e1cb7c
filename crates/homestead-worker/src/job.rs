//! A single ingestion job: read the upload, transform it, place it.

use bytes::Bytes;
use homestead_core::models::{StoredAsset, UploadTask};
use homestead_core::{Classify, ErrorClass, LogLevel, QueueConfig};
use homestead_infra::{Backoff, RetryState, Sleeper};
use homestead_processing::{TransformEngine, TransformError};
use homestead_storage::StorageError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::sink::AssetSink;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to read upload {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Attempt timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Ingestion failed after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<IngestError>,
    },

    #[error("Ingestion queue is closed")]
    QueueClosed,
}

impl Classify for IngestError {
    fn class(&self) -> ErrorClass {
        match self {
            IngestError::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                ErrorClass::SourceMissing
            }
            IngestError::Read { .. } | IngestError::TimedOut(_) | IngestError::QueueClosed => {
                ErrorClass::TransientIo
            }
            IngestError::Transform(e) => e.class(),
            IngestError::Storage(e) => e.class(),
            IngestError::Exhausted { last, .. } => last.class(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            IngestError::Transform(e) => e.log_level(),
            IngestError::Storage(e) => e.log_level(),
            _ => self.class().log_level(),
        }
    }
}

#[derive(Debug)]
pub enum JobOutcome {
    Stored(StoredAsset),
    /// The temp file was already gone when the job started.
    SourceMissing,
}

/// Attempt limits for one job execution.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Failed attempts (errors, not timeouts) after which the job gives up.
    pub max_exceptions: u32,
    pub backoff: Duration,
    pub attempt_timeout: Duration,
}

impl From<&QueueConfig> for RetryPolicy {
    fn from(config: &QueueConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            max_exceptions: config.max_exceptions,
            backoff: config.backoff,
            attempt_timeout: config.job_timeout,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&QueueConfig::default())
    }
}

/// Owns an upload's temp file and deletes it exactly once.
///
/// Call [`TempUpload::remove`] on every terminal path; dropping the guard removes the
/// file if nobody did.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
    removed: bool,
}

impl TempUpload {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            removed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        !self.removed && self.path.exists()
    }

    /// Delete the file. Later calls are no-ops. Failures are logged, never returned.
    pub fn remove(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;

        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Temp upload removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove temp upload"
            ),
        }
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        self.remove();
    }
}

pub struct IngestionJob {
    task: UploadTask,
    engine: TransformEngine,
    sink: Arc<dyn AssetSink>,
    policy: RetryPolicy,
}

impl IngestionJob {
    pub fn new(
        task: UploadTask,
        engine: TransformEngine,
        sink: Arc<dyn AssetSink>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            task,
            engine,
            sink,
            policy,
        }
    }

    pub fn task(&self) -> &UploadTask {
        &self.task
    }

    /// Run the job to a terminal state.
    ///
    /// Retries with a fixed backoff until the attempt or exception cap is hit. The temp
    /// file is gone when this returns, whatever the result.
    #[tracing::instrument(
        skip(self, sleeper),
        fields(task.id = %self.task.id, property_id = ?self.task.target_property_id)
    )]
    pub async fn run(&self, sleeper: &dyn Sleeper) -> Result<JobOutcome, IngestError> {
        let mut upload = TempUpload::new(&self.task.temp_path);

        if !upload.exists() {
            tracing::warn!(
                path = %upload.path().display(),
                "Temp upload missing; nothing to ingest"
            );
            upload.remove();
            return Ok(JobOutcome::SourceMissing);
        }

        let mut state = RetryState::new(
            self.policy.max_attempts,
            Backoff::Fixed(self.policy.backoff),
        );
        let mut exceptions = 0u32;

        let last_error = loop {
            let attempt = state.begin_attempt();

            let error = match tokio::time::timeout(
                self.policy.attempt_timeout,
                self.attempt(upload.path()),
            )
            .await
            {
                Ok(Ok(asset)) => {
                    upload.remove();
                    tracing::info!(
                        attempt = attempt,
                        remote_path = %asset.remote_path,
                        storage_tier = %asset.storage_tier,
                        "Ingestion completed"
                    );
                    return Ok(JobOutcome::Stored(asset));
                }
                Ok(Err(e)) => {
                    exceptions += 1;
                    e
                }
                Err(_) => IngestError::TimedOut(self.policy.attempt_timeout),
            };

            log_attempt_failure(&error, attempt, state.max_attempts);

            if state.exhausted() || exceptions >= self.policy.max_exceptions {
                break error;
            }

            let delay = state.next_delay();
            tracing::info!(
                attempt = attempt,
                backoff_secs = delay.as_secs(),
                "Scheduling ingestion retry"
            );
            sleeper.sleep(delay).await;
        };

        Err(self.fail(&mut upload, state.attempt, last_error))
    }

    /// One attempt: read, transform, place.
    async fn attempt(&self, path: &Path) -> Result<StoredAsset, IngestError> {
        let raw = tokio::fs::read(path).await.map_err(|source| IngestError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let image = self.engine.transform_blocking(Bytes::from(raw)).await?;
        let target_path = self.task.target_path(image.format);

        tracing::debug!(
            width = image.width,
            height = image.height,
            size_bytes = image.bytes.len(),
            target_path = %target_path,
            "Placing transformed image"
        );

        Ok(self.sink.place(image.bytes, &target_path).await?)
    }

    /// Terminal failure handler. Cleanup here must not mask the job error.
    fn fail(&self, upload: &mut TempUpload, attempts: u32, last: IngestError) -> IngestError {
        upload.remove();
        let error = IngestError::Exhausted {
            attempts,
            last: Box::new(last),
        };
        tracing::error!(
            error = %error,
            error_code = error.class().code(),
            callback_ref = ?self.task.callback_ref,
            "Ingestion failed permanently"
        );
        error
    }
}

fn log_attempt_failure(error: &IngestError, attempt: u32, max_attempts: u32) {
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(error = %error, attempt, max_attempts, "Ingestion attempt failed"),
        LogLevel::Warn => tracing::warn!(error = %error, attempt, max_attempts, "Ingestion attempt failed"),
        LogLevel::Error => tracing::error!(error = %error, attempt, max_attempts, "Ingestion attempt failed"),
    }
}
