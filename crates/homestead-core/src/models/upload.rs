use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// A file accepted by the web tier and waiting to be ingested.
///
/// Owned by exactly one ingestion job execution. The job deletes `temp_path` when it
/// reaches a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadTask {
    pub id: Uuid,
    pub temp_path: PathBuf,
    pub original_name: String,
    /// Remote directory the asset is placed under, e.g. `properties/42`.
    pub target_directory: String,
    pub target_property_id: Option<i64>,
    pub callback_ref: Option<String>,
}

impl UploadTask {
    pub fn new(
        temp_path: impl Into<PathBuf>,
        original_name: impl Into<String>,
        target_directory: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            temp_path: temp_path.into(),
            original_name: original_name.into(),
            target_directory: target_directory.into(),
            target_property_id: None,
            callback_ref: None,
        }
    }

    pub fn with_property(mut self, property_id: i64) -> Self {
        self.target_property_id = Some(property_id);
        self
    }

    pub fn with_callback(mut self, callback_ref: impl Into<String>) -> Self {
        self.callback_ref = Some(callback_ref.into());
        self
    }

    /// Relative storage path for the transcoded asset: `{target_directory}/{stem}-{id}.webp`.
    ///
    /// The stem is reduced to `[a-z0-9-]` so remote and local paths stay portable.
    pub fn target_path(&self, extension: &str) -> String {
        let stem = std::path::Path::new(&self.original_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image");
        let slug = slugify(stem);
        let slug = if slug.is_empty() { "image".to_string() } else { slug };
        let short_id = &self.id.simple().to_string()[..12];
        let dir = self.target_directory.trim_matches('/');

        if dir.is_empty() {
            format!("{}-{}.{}", slug, short_id, extension)
        } else {
            format!("{}/{}-{}.{}", dir, slug, short_id, extension)
        }
    }
}

fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash && !out.is_empty() {
            out.push('-');
            last_dash = true;
        }
    }
    out.trim_end_matches('-').to_string()
}
