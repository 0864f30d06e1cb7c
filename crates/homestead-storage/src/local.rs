use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{StorageError, StorageResult};
use crate::keys::normalize_key;

/// Local filesystem tier, served by the web tier under `base_url`.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Opens the tier rooted at `base_path` (e.g. `storage/app/public`), creating the
    /// directory if needed. Files are served from `base_url` (e.g. `/storage`).
    pub async fn new(base_path: impl Into<PathBuf>, base_url: impl Into<String>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url: base_url.into(),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert a storage path to a filesystem path inside `base_path`.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        let key = normalize_key(storage_key)?;
        let path = self.base_path.join(&key);

        if let (Ok(base), Ok(canonical)) = (self.base_path.canonicalize(), path.canonicalize()) {
            if canonical.strip_prefix(&base).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage path resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Public URL for a stored path.
    pub fn url(&self, storage_key: &str) -> StorageResult<String> {
        let key = normalize_key(storage_key)?;
        Ok(format!("{}/{}", self.base_url.trim_end_matches('/'), key))
    }

    /// Write `data` at `storage_key`, replacing any existing file. Returns the public URL.
    pub async fn write(&self, storage_key: &str, data: &[u8]) -> StorageResult<String> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        let url = self.url(storage_key)?;

        tracing::info!(
            path = %path.display(),
            url = %url,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage write successful"
        );

        Ok(url)
    }

    pub async fn read(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(storage_key)?;
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }
        Ok(fs::read(&path).await?)
    }

    /// Remove the file. Missing files are not an error.
    pub async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(path = %path.display(), "Local storage delete successful");

        Ok(())
    }

    pub async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(storage_key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }
}
