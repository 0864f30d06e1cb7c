//! Background image ingestion.
//!
//! An [`IngestionJob`] turns one accepted upload into a stored WebP asset, retrying
//! transient failures and always removing the upload's temp file. The
//! [`IngestionQueue`] runs jobs on a bounded worker pool.

pub mod job;
pub mod queue;
pub mod sink;

pub use job::{IngestError, IngestionJob, JobOutcome, RetryPolicy, TempUpload};
pub use queue::{IngestionEvent, IngestionEventSender, IngestionQueue, IngestionStatus};
pub use sink::AssetSink;
