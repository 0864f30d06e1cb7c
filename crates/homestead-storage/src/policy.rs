//! Storage decision policy: where a transcoded image ends up.
//!
//! CDN first when configured, local filesystem otherwise or on CDN failure, with an
//! optional local backup next to a successful CDN upload.

use bytes::Bytes;
use chrono::Utc;
use homestead_core::models::{StorageTier, StoredAsset};
use homestead_core::CdnConfig;
use std::sync::Arc;

use crate::cdn::{CdnClient, CdnError, Connector, FtpConnector};
use crate::error::{StorageError, StorageResult};
use crate::keys::normalize_key;
use crate::local::LocalStorage;

#[derive(Clone)]
pub struct StoragePolicy {
    cdn: CdnConfig,
    local: LocalStorage,
    connector: Arc<dyn Connector>,
}

impl StoragePolicy {
    pub fn new(cdn: CdnConfig, local: LocalStorage, connector: Arc<dyn Connector>) -> Self {
        Self {
            cdn,
            local,
            connector,
        }
    }

    /// Policy backed by a real FTP connection.
    pub fn with_ftp(cdn: CdnConfig, local: LocalStorage) -> Self {
        Self::new(cdn, local, Arc::new(FtpConnector))
    }

    pub fn cdn_enabled(&self) -> bool {
        self.cdn.is_configured()
    }

    pub fn local(&self) -> &LocalStorage {
        &self.local
    }

    /// Place `bytes` at `target_path` and report which tiers hold it.
    ///
    /// Returns an error only when no durable copy was written.
    #[tracing::instrument(skip(self, bytes), fields(size_bytes = bytes.len()))]
    pub async fn place(&self, bytes: Bytes, target_path: &str) -> StorageResult<StoredAsset> {
        let key = normalize_key(target_path)?;

        let cdn_failure = if self.cdn_enabled() {
            match self.upload_to_cdn(bytes.clone(), key.clone()).await {
                Ok(cdn_url) => return Ok(self.with_backup(&bytes, key, cdn_url).await),
                Err(e) => {
                    tracing::warn!(
                        remote_path = %key,
                        error = %e,
                        "CDN upload failed, falling back to local storage"
                    );
                    Some(e)
                }
            }
        } else {
            tracing::debug!(remote_path = %key, "CDN not configured, storing locally");
            None
        };

        let local_url = match (self.local.write(&key, &bytes).await, cdn_failure) {
            (Ok(url), _) => url,
            (Err(local), Some(cdn)) => {
                return Err(StorageError::AllTiersFailed {
                    cdn: cdn.to_string(),
                    local: local.to_string(),
                })
            }
            (Err(local), None) => return Err(local),
        };

        Ok(StoredAsset {
            remote_path: key,
            cdn_url: None,
            local_url: Some(local_url),
            storage_tier: StorageTier::Local,
            stored_at: Utc::now(),
        })
    }

    /// After a CDN success: optionally write the local backup. A failed backup
    /// leaves the asset on the CDN tier alone.
    async fn with_backup(&self, bytes: &[u8], key: String, cdn_url: String) -> StoredAsset {
        let mut asset = StoredAsset {
            remote_path: key,
            cdn_url: Some(cdn_url),
            local_url: None,
            storage_tier: StorageTier::Cdn,
            stored_at: Utc::now(),
        };

        if self.cdn.local_backup {
            match self.local.write(&asset.remote_path, bytes).await {
                Ok(url) => {
                    asset.local_url = Some(url);
                    asset.storage_tier = StorageTier::Both;
                }
                Err(e) => tracing::warn!(
                    remote_path = %asset.remote_path,
                    error = %e,
                    "Local backup write failed; asset stays CDN-only"
                ),
            }
        }

        asset
    }

    async fn upload_to_cdn(&self, bytes: Bytes, key: String) -> Result<String, CdnError> {
        let config = self.cdn.clone();
        let connector = Arc::clone(&self.connector);
        tokio::task::spawn_blocking(move || {
            let mut client = CdnClient::new(config, connector);
            client.upload(&bytes, &key)
        })
        .await
        .map_err(|e| CdnError::Worker(e.to_string()))?
    }

    /// Delete the asset from every tier that holds it.
    ///
    /// The CDN side is best-effort and only logged; a local delete failure is returned.
    pub async fn remove(&self, asset: &StoredAsset) -> StorageResult<()> {
        if asset.storage_tier.on_cdn() && self.cdn_enabled() {
            let config = self.cdn.clone();
            let connector = Arc::clone(&self.connector);
            let key = asset.remote_path.clone();
            let removed = tokio::task::spawn_blocking(move || {
                CdnClient::new(config, connector).delete(&key)
            })
            .await
            .unwrap_or(false);
            if !removed {
                tracing::warn!(remote_path = %asset.remote_path, "CDN copy not removed");
            }
        }

        if asset.storage_tier.on_local() {
            self.local.delete(&asset.remote_path).await?;
        }

        Ok(())
    }
}
