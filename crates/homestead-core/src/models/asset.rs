use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Which durable locations hold an asset after placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StorageTier {
    Cdn,
    Local,
    Both,
}

impl StorageTier {
    pub fn on_cdn(self) -> bool {
        matches!(self, StorageTier::Cdn | StorageTier::Both)
    }

    pub fn on_local(self) -> bool {
        matches!(self, StorageTier::Local | StorageTier::Both)
    }
}

impl Display for StorageTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageTier::Cdn => write!(f, "CDN"),
            StorageTier::Local => write!(f, "LOCAL"),
            StorageTier::Both => write!(f, "BOTH"),
        }
    }
}

/// A successfully placed image. Immutable except for deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAsset {
    /// Relative path shared by every tier, e.g. `properties/42/porch-1a2b.webp`.
    pub remote_path: String,
    pub cdn_url: Option<String>,
    pub local_url: Option<String>,
    pub storage_tier: StorageTier,
    pub stored_at: DateTime<Utc>,
}

impl StoredAsset {
    /// URL to hand to page rendering: CDN first, local otherwise.
    pub fn public_url(&self) -> Option<&str> {
        self.cdn_url.as_deref().or(self.local_url.as_deref())
    }
}

/// Output of the transform engine. Never persisted on its own.
#[derive(Debug, Clone)]
pub struct TransformedImage {
    pub bytes: bytes::Bytes,
    pub width: u32,
    pub height: u32,
    pub format: &'static str,
    pub quality: u8,
}
