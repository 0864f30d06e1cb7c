use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use homestead_core::models::{StorageTier, StoredAsset, UploadTask};
use homestead_core::{CdnConfig, QueueConfig};
use homestead_infra::RecordingSleeper;
use homestead_processing::TransformEngine;
use homestead_storage::cdn::memory::MemoryFtp;
use homestead_storage::{LocalStorage, StorageError, StoragePolicy, StorageResult};
use homestead_worker::{
    AssetSink, IngestError, IngestionEvent, IngestionJob, IngestionQueue, IngestionStatus,
    JobOutcome, RetryPolicy,
};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::collections::VecDeque;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy)]
enum Step {
    Store,
    Fail,
    Hang,
}

#[derive(Default)]
struct ScriptedSink {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    store_delay: Duration,
}

impl ScriptedSink {
    fn new(steps: &[Step]) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.iter().copied().collect()),
            ..Default::default()
        })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            store_delay: delay,
            ..Default::default()
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetSink for ScriptedSink {
    async fn place(&self, _bytes: Bytes, target_path: &str) -> StorageResult<StoredAsset> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Store);

        match step {
            Step::Fail => Err(StorageError::WriteFailed("disk full".to_string())),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(StorageError::WriteFailed("unreachable".to_string()))
            }
            Step::Store => {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(self.store_delay).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(StoredAsset {
                    remote_path: target_path.to_string(),
                    cdn_url: None,
                    local_url: Some(format!("/storage/{}", target_path)),
                    storage_tier: StorageTier::Local,
                    stored_at: Utc::now(),
                })
            }
        }
    }
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([9, 99, 199, 255])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn upload(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        max_exceptions: 2,
        backoff: Duration::from_secs(10),
        attempt_timeout: Duration::from_secs(30),
    }
}

fn job(path: &Path, sink: Arc<dyn AssetSink>, policy: RetryPolicy) -> IngestionJob {
    let task = UploadTask::new(path, "porch.jpg", "properties/42").with_property(42);
    IngestionJob::new(task, TransformEngine::new(), sink, policy)
}

#[tokio::test]
async fn success_stores_asset_and_removes_temp_file() {
    let tmp = TempDir::new().unwrap();
    let path = upload(tmp.path(), "u1", &png_bytes(64, 48));
    let sink = ScriptedSink::new(&[Step::Store]);
    let sleeper = RecordingSleeper::new();

    let outcome = job(&path, sink.clone(), fast_policy())
        .run(&sleeper)
        .await
        .unwrap();

    let JobOutcome::Stored(asset) = outcome else {
        panic!("expected a stored asset");
    };
    assert!(asset.remote_path.starts_with("properties/42/porch-"));
    assert!(asset.remote_path.ends_with(".webp"));
    assert!(!path.exists());
    assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn missing_source_is_a_quiet_no_op() {
    let tmp = TempDir::new().unwrap();
    let sink = ScriptedSink::new(&[]);

    let outcome = job(&tmp.path().join("gone"), sink.clone(), fast_policy())
        .run(&RecordingSleeper::new())
        .await
        .unwrap();

    assert!(matches!(outcome, JobOutcome::SourceMissing));
    assert_eq!(sink.calls(), 0);
}

#[tokio::test]
async fn corrupt_upload_stops_at_exception_cap_and_cleans_up() {
    let tmp = TempDir::new().unwrap();
    let path = upload(tmp.path(), "u1", b"this is not an image");
    let sink = ScriptedSink::new(&[]);
    let sleeper = RecordingSleeper::new();

    let err = job(&path, sink.clone(), fast_policy())
        .run(&sleeper)
        .await
        .unwrap_err();

    match err {
        IngestError::Exhausted { attempts, last } => {
            assert_eq!(attempts, 2);
            assert!(matches!(*last, IngestError::Transform(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(sink.calls(), 0);
    assert_eq!(sleeper.delays(), vec![Duration::from_secs(10)]);
    assert!(!path.exists());
}

#[tokio::test]
async fn storage_failure_is_retried_after_fixed_backoff() {
    let tmp = TempDir::new().unwrap();
    let path = upload(tmp.path(), "u1", &png_bytes(10, 10));
    let sink = ScriptedSink::new(&[Step::Fail, Step::Store]);
    let sleeper = RecordingSleeper::new();

    let outcome = job(&path, sink.clone(), fast_policy())
        .run(&sleeper)
        .await
        .unwrap();

    assert!(matches!(outcome, JobOutcome::Stored(_)));
    assert_eq!(sink.calls(), 2);
    assert_eq!(sleeper.delays(), vec![Duration::from_secs(10)]);
    assert!(!path.exists());
}

#[tokio::test]
async fn persistent_storage_failure_cleans_up() {
    let tmp = TempDir::new().unwrap();
    let path = upload(tmp.path(), "u1", &png_bytes(10, 10));
    let sink = ScriptedSink::new(&[Step::Fail, Step::Fail, Step::Fail]);

    let err = job(&path, sink.clone(), fast_policy())
        .run(&RecordingSleeper::new())
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Exhausted { attempts: 2, .. }));
    assert_eq!(sink.calls(), 2);
    assert!(!path.exists());
}

#[tokio::test]
async fn attempt_cap_applies_when_exception_cap_is_higher() {
    let tmp = TempDir::new().unwrap();
    let path = upload(tmp.path(), "u1", &png_bytes(10, 10));
    let sink = ScriptedSink::new(&[Step::Fail, Step::Fail, Step::Fail, Step::Store]);
    let sleeper = RecordingSleeper::new();
    let policy = RetryPolicy {
        max_exceptions: 10,
        ..fast_policy()
    };

    let err = job(&path, sink.clone(), policy).run(&sleeper).await.unwrap_err();

    assert!(matches!(err, IngestError::Exhausted { attempts: 3, .. }));
    assert_eq!(sink.calls(), 3);
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_secs(10), Duration::from_secs(10)]
    );
    assert!(!path.exists());
}

#[tokio::test]
async fn timeouts_use_attempts_but_not_exceptions() {
    let tmp = TempDir::new().unwrap();
    let path = upload(tmp.path(), "u1", &png_bytes(10, 10));
    let sink = ScriptedSink::new(&[Step::Hang, Step::Hang, Step::Fail]);
    let policy = RetryPolicy {
        attempt_timeout: Duration::from_millis(200),
        ..fast_policy()
    };

    let err = job(&path, sink.clone(), policy)
        .run(&RecordingSleeper::new())
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Exhausted { attempts: 3, .. }));
    assert_eq!(sink.calls(), 3);
    assert!(!path.exists());
}

#[tokio::test]
async fn timeout_then_success() {
    let tmp = TempDir::new().unwrap();
    let path = upload(tmp.path(), "u1", &png_bytes(10, 10));
    let sink = ScriptedSink::new(&[Step::Hang, Step::Store]);
    let policy = RetryPolicy {
        attempt_timeout: Duration::from_millis(200),
        ..fast_policy()
    };

    let outcome = job(&path, sink.clone(), policy)
        .run(&RecordingSleeper::new())
        .await
        .unwrap();

    assert!(matches!(outcome, JobOutcome::Stored(_)));
    assert!(!path.exists());
}

#[tokio::test]
async fn real_policy_falls_back_to_local_when_cdn_fails() {
    let tmp = TempDir::new().unwrap();
    let storage_root = TempDir::new().unwrap();
    let path = upload(tmp.path(), "u1", &png_bytes(2400, 1200));

    let server = MemoryFtp::new();
    server.state().fail_transfers = true;
    let cdn = CdnConfig {
        host: Some("ftp.test".to_string()),
        port: 21,
        username: Some("user".to_string()),
        password: Some("secret".to_string()),
        pull_zone: Some("cdn.example.com".to_string()),
        local_backup: false,
        timeout: Duration::from_secs(5),
    };
    let local = LocalStorage::new(storage_root.path(), "/storage").await.unwrap();
    let policy = Arc::new(StoragePolicy::new(cdn, local, Arc::new(server.clone())));

    let outcome = job(&path, policy, fast_policy())
        .run(&RecordingSleeper::new())
        .await
        .unwrap();

    let JobOutcome::Stored(asset) = outcome else {
        panic!("expected a stored asset");
    };
    assert_eq!(asset.storage_tier, StorageTier::Local);
    let stored = std::fs::read(storage_root.path().join(&asset.remote_path)).unwrap();
    assert_eq!(&stored[0..4], b"RIFF");
    let decoded = image::load_from_memory(&stored).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (1920, 960));
    assert!(!path.exists());
}

#[tokio::test]
async fn queue_publishes_events_and_bounds_parallelism() {
    let tmp = TempDir::new().unwrap();
    let sink = ScriptedSink::slow(Duration::from_millis(50));
    let (events_tx, mut events_rx) = mpsc::channel::<IngestionEvent>(16);
    let config = QueueConfig {
        max_workers: 2,
        ..QueueConfig::default()
    };
    let queue = IngestionQueue::with_sleeper(
        &config,
        TransformEngine::new(),
        sink.clone(),
        Some(events_tx),
        Arc::new(RecordingSleeper::new()),
    );

    let mut paths = Vec::new();
    for i in 0..5 {
        let path = upload(tmp.path(), &format!("u{i}"), &png_bytes(8, 8));
        let task = UploadTask::new(&path, "photo.png", "properties/7")
            .with_property(7)
            .with_callback(format!("cb-{i}"));
        queue.submit(task).await.unwrap();
        paths.push(path);
    }
    let missing = UploadTask::new(tmp.path().join("never-written"), "x.png", "properties/7");
    let missing_id = queue.submit(missing).await.unwrap();

    let mut stored = 0;
    for _ in 0..6 {
        let event = tokio::time::timeout(Duration::from_secs(30), events_rx.recv())
            .await
            .unwrap()
            .unwrap();
        match event.status {
            IngestionStatus::Stored(_) => {
                stored += 1;
                assert_eq!(event.property_id, Some(7));
                assert!(event.callback_ref.unwrap().starts_with("cb-"));
            }
            IngestionStatus::SourceMissing => assert_eq!(event.task_id, missing_id),
            IngestionStatus::Failed { error } => panic!("unexpected failure: {error}"),
        }
    }

    assert_eq!(stored, 5);
    assert!(sink.max_in_flight.load(Ordering::SeqCst) <= 2);
    assert!(paths.iter().all(|p| !p.exists()));
}

#[tokio::test]
async fn failed_jobs_publish_failure_events() {
    let tmp = TempDir::new().unwrap();
    let (events_tx, mut events_rx) = mpsc::channel(4);
    let queue = IngestionQueue::with_sleeper(
        &QueueConfig::default(),
        TransformEngine::new(),
        ScriptedSink::new(&[]),
        Some(events_tx),
        Arc::new(RecordingSleeper::new()),
    );

    let path = upload(tmp.path(), "bad", b"garbage");
    queue
        .submit(UploadTask::new(&path, "bad.jpg", "properties/1"))
        .await
        .unwrap();

    let event = events_rx.recv().await.unwrap();
    assert!(matches!(event.status, IngestionStatus::Failed { .. }));
    assert!(!path.exists());
}

#[tokio::test]
async fn submit_after_shutdown_is_rejected() {
    let tmp = TempDir::new().unwrap();

    for round in 0..20 {
        let sink = ScriptedSink::new(&[]);
        let queue = IngestionQueue::with_sleeper(
            &QueueConfig::default(),
            TransformEngine::new(),
            sink.clone(),
            None,
            Arc::new(RecordingSleeper::new()),
        );

        queue.shutdown().await;

        let path = upload(tmp.path(), &format!("late-{round}"), &png_bytes(8, 8));
        let result = queue
            .submit(UploadTask::new(&path, "late.png", "properties/1"))
            .await;

        assert!(matches!(result, Err(IngestError::QueueClosed)));
        // a rejected upload still belongs to the caller
        assert!(path.exists());
        assert_eq!(sink.calls(), 0);
    }
}

#[tokio::test]
async fn shutdown_with_busy_pool_drops_waiting_uploads() {
    let tmp = TempDir::new().unwrap();
    let sink = ScriptedSink::slow(Duration::from_millis(300));
    let (events_tx, mut events_rx) = mpsc::channel::<IngestionEvent>(4);
    let config = QueueConfig {
        max_workers: 1,
        ..QueueConfig::default()
    };
    let queue = IngestionQueue::with_sleeper(
        &config,
        TransformEngine::new(),
        sink.clone(),
        Some(events_tx),
        Arc::new(RecordingSleeper::new()),
    );

    let running = upload(tmp.path(), "running", &png_bytes(16, 16));
    let waiting = upload(tmp.path(), "waiting", &png_bytes(16, 16));
    let running_id = queue
        .submit(UploadTask::new(&running, "a.png", "properties/1"))
        .await
        .unwrap();
    queue
        .submit(UploadTask::new(&waiting, "b.png", "properties/1"))
        .await
        .unwrap();

    for _ in 0..200 {
        if sink.calls() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(sink.calls(), 1);

    queue.shutdown().await;

    let event = events_rx.recv().await.unwrap();
    assert_eq!(event.task_id, running_id);
    assert!(matches!(event.status, IngestionStatus::Stored(_)));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sink.calls(), 1);
    assert!(!running.exists());
    assert!(!waiting.exists());
    assert!(events_rx.recv().await.is_none());
}
