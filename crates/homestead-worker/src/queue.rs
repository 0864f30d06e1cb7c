//! Ingestion queue: bounded worker pool over an in-process channel.
//!
//! Shutdown: [`IngestionQueue::shutdown`] stops intake before it returns; it does not
//! wait for in-flight jobs. Jobs already running finish (and clean up their temp files)
//! on their own.

use homestead_core::models::{StoredAsset, UploadTask};
use homestead_core::QueueConfig;
use homestead_infra::{Sleeper, TokioSleeper};
use homestead_processing::TransformEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use uuid::Uuid;

use crate::job::{IngestError, IngestionJob, JobOutcome, RetryPolicy};
use crate::sink::AssetSink;

const SUBMIT_BUFFER: usize = 256;

#[derive(Debug, Clone)]
pub enum IngestionStatus {
    Stored(StoredAsset),
    SourceMissing,
    Failed { error: String },
}

/// Terminal notification for one task.
#[derive(Debug, Clone)]
pub struct IngestionEvent {
    pub task_id: Uuid,
    pub property_id: Option<i64>,
    pub callback_ref: Option<String>,
    pub status: IngestionStatus,
}

/// Optional sender notified when a job reaches a terminal state.
pub type IngestionEventSender = mpsc::Sender<IngestionEvent>;

#[derive(Clone)]
struct WorkerContext {
    engine: TransformEngine,
    sink: Arc<dyn AssetSink>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    events: Option<IngestionEventSender>,
}

#[derive(Clone)]
pub struct IngestionQueue {
    submit_tx: mpsc::Sender<UploadTask>,
    shutdown_tx: mpsc::Sender<()>,
    closed: Arc<AtomicBool>,
}

impl IngestionQueue {
    pub fn new(
        config: &QueueConfig,
        engine: TransformEngine,
        sink: Arc<dyn AssetSink>,
        events: Option<IngestionEventSender>,
    ) -> Self {
        Self::with_sleeper(config, engine, sink, events, Arc::new(TokioSleeper))
    }

    /// Like [`new`](Self::new) with a custom backoff sleeper.
    pub fn with_sleeper(
        config: &QueueConfig,
        engine: TransformEngine,
        sink: Arc<dyn AssetSink>,
        events: Option<IngestionEventSender>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let (submit_tx, submit_rx) = mpsc::channel(SUBMIT_BUFFER);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let context = WorkerContext {
            engine,
            sink,
            policy: RetryPolicy::from(config),
            sleeper,
            events,
        };
        let max_workers = config.max_workers.max(1);

        tokio::spawn(async move {
            Self::worker_pool(context, max_workers, submit_rx, shutdown_rx).await;
        });

        Self {
            submit_tx,
            shutdown_tx,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Queue an upload for ingestion.
    #[tracing::instrument(skip(self, task), fields(task.id = %task.id))]
    pub async fn submit(&self, task: UploadTask) -> Result<Uuid, IngestError> {
        let task_id = task.id;
        if self.closed.load(Ordering::SeqCst) {
            return Err(IngestError::QueueClosed);
        }
        self.submit_tx
            .send(task)
            .await
            .map_err(|_| IngestError::QueueClosed)?;

        tracing::info!(task_id = %task_id, "Upload submitted to ingestion queue");
        Ok(task_id)
    }

    async fn worker_pool(
        context: WorkerContext,
        max_workers: usize,
        mut submit_rx: mpsc::Receiver<UploadTask>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(max_workers = max_workers, "Ingestion worker pool started");

        let semaphore = Arc::new(Semaphore::new(max_workers));

        loop {
            let task = tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                task = submit_rx.recv() => match task {
                    Some(task) => task,
                    None => break,
                },
            };

            let Some(permit) = Self::acquire(&semaphore, &mut shutdown_rx).await else {
                Self::drop_queued(&task);
                break;
            };
            let context = context.clone();
            tokio::spawn(async move {
                let _permit = permit;
                Self::process_task(task, context).await;
            });
        }

        tracing::info!("Ingestion worker pool shutting down");
        submit_rx.close();
        while let Ok(task) = submit_rx.try_recv() {
            Self::drop_queued(&task);
        }

        tracing::info!("Ingestion worker pool stopped");
    }

    /// Wait for a free worker; `None` once shutdown is signalled.
    async fn acquire(
        semaphore: &Arc<Semaphore>,
        shutdown_rx: &mut mpsc::Receiver<()>,
    ) -> Option<OwnedSemaphorePermit> {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => None,
            permit = semaphore.clone().acquire_owned() => permit.ok(),
        }
    }

    // Queued uploads were never started; their temp files belong to no job.
    fn drop_queued(task: &UploadTask) {
        tracing::warn!(task_id = %task.id, "Dropping queued upload at shutdown");
        crate::job::TempUpload::new(&task.temp_path).remove();
    }

    async fn process_task(task: UploadTask, context: WorkerContext) {
        let task_id = task.id;
        let property_id = task.target_property_id;
        let callback_ref = task.callback_ref.clone();

        let job = IngestionJob::new(task, context.engine, context.sink, context.policy);
        let status = match job.run(context.sleeper.as_ref()).await {
            Ok(JobOutcome::Stored(asset)) => IngestionStatus::Stored(asset),
            Ok(JobOutcome::SourceMissing) => IngestionStatus::SourceMissing,
            Err(e) => IngestionStatus::Failed {
                error: e.to_string(),
            },
        };

        if let Some(tx) = context.events {
            let event = IngestionEvent {
                task_id,
                property_id,
                callback_ref,
                status,
            };
            if tx.send(event).await.is_err() {
                tracing::debug!(task_id = %task_id, "Ingestion event receiver dropped");
            }
        }
    }

    /// Stop accepting uploads. Later [`submit`](Self::submit) calls fail with
    /// `QueueClosed`; running jobs are not interrupted.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating ingestion queue shutdown");
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(()).await;
    }
}
