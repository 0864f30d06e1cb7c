//! Where a job hands its transcoded bytes.

use async_trait::async_trait;
use bytes::Bytes;
use homestead_core::models::StoredAsset;
use homestead_storage::{StoragePolicy, StorageResult};

/// Durable placement for a transcoded image.
///
/// Implemented by [`StoragePolicy`]; tests substitute scripted sinks.
#[async_trait]
pub trait AssetSink: Send + Sync {
    async fn place(&self, bytes: Bytes, target_path: &str) -> StorageResult<StoredAsset>;
}

#[async_trait]
impl AssetSink for StoragePolicy {
    async fn place(&self, bytes: Bytes, target_path: &str) -> StorageResult<StoredAsset> {
        StoragePolicy::place(self, bytes, target_path).await
    }
}
