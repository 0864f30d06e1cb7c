//! Shared path handling for storage tiers.

use crate::error::{StorageError, StorageResult};

/// Public prefix under which the local tier is served.
pub const LOCAL_PUBLIC_PREFIX: &str = "/storage/";

/// Reduce a caller-supplied path to the relative form every tier shares.
///
/// Strips a leading `/storage/` or `/` and rejects traversal or empty paths.
pub fn normalize_key(path: &str) -> StorageResult<String> {
    let trimmed = path.trim();
    let relative = trimmed
        .strip_prefix(LOCAL_PUBLIC_PREFIX)
        .unwrap_or(trimmed)
        .trim_start_matches('/');

    if relative.is_empty() || relative.ends_with('/') {
        return Err(StorageError::InvalidKey(format!(
            "Storage path '{}' does not name a file",
            path
        )));
    }

    if relative.split('/').any(|seg| seg == ".." || seg.is_empty()) || relative.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "Storage path '{}' contains invalid segments",
            path
        )));
    }

    Ok(relative.to_string())
}

/// Split `a/b/c.webp` into (`a/b`, `c.webp`).
pub fn split_parent(key: &str) -> (&str, &str) {
    match key.rsplit_once('/') {
        Some((dir, name)) => (dir, name),
        None => ("", key),
    }
}

/// Public CDN URL for a stored path.
///
/// `/storage/properties/x.webp` and `properties/x.webp` both map to
/// `https://{pull_zone}/properties/x.webp`. Absolute `http(s)://` URLs are returned
/// unchanged.
pub fn cdn_url(pull_zone: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }

    let relative = path
        .strip_prefix(LOCAL_PUBLIC_PREFIX)
        .unwrap_or(path)
        .trim_start_matches('/');
    let zone = pull_zone
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');

    format!("https://{}/{}", zone, relative)
}
