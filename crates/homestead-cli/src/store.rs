//! Append-only JSON lines property log used by `homestead import`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use homestead_core::models::{Coordinates, NewProperty};
use homestead_services::PropertyStore;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Entry<'a> {
    Insert { id: i64, property: &'a NewProperty },
    SetCoordinates { id: i64, latitude: f64, longitude: f64 },
}

pub struct JsonLinesStore {
    path: PathBuf,
    next_id: Mutex<i64>,
}

impl JsonLinesStore {
    /// Ids continue after the entries already present in `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let existing = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents
                .lines()
                .filter(|l| l.contains(r#""op":"insert""#))
                .count() as i64,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };

        Ok(Self {
            path,
            next_id: Mutex::new(existing + 1),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, entry: &Entry<'_>) -> Result<()> {
        let mut line = serde_json::to_string(entry).context("Failed to serialize entry")?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl PropertyStore for JsonLinesStore {
    async fn insert(&self, property: &NewProperty) -> Result<i64> {
        let mut next_id = self.next_id.lock().await;
        let id = *next_id;
        self.append(&Entry::Insert { id, property }).await?;
        *next_id += 1;
        Ok(id)
    }

    async fn set_coordinates(&self, id: i64, coordinates: Coordinates) -> Result<()> {
        self.append(&Entry::SetCoordinates {
            id,
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
        })
        .await
    }
}
