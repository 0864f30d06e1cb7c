//! Normalization of upstream listing payloads.
//!
//! The upstream API returns the same information under several keys and shapes
//! depending on the endpoint and listing type. Each extractor tries the known shapes
//! in a fixed order and takes the first that yields something.

pub mod contact;
pub mod photos;
pub mod records;

pub use contact::extract_contact;
pub use photos::{extract_photos, PhotoShape};
pub use records::{extract_records, normalize_record};

use serde_json::Value;

/// Follow a dotted path (`a.b.0.c`) through objects and arrays.
pub(crate) fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, key| match current {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// String form of a scalar; numbers are rendered, blanks are `None`.
pub(crate) fn as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

pub(crate) fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .chars()
            .filter(|c| !matches!(c, '$' | ',' | ' '))
            .collect::<String>()
            .parse()
            .ok(),
        _ => None,
    }
}

/// First non-blank text among `paths`.
pub(crate) fn first_text(value: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .find_map(|p| lookup(value, p).and_then(as_text))
}

pub(crate) fn first_f64(value: &Value, paths: &[&str]) -> Option<f64> {
    paths.iter().find_map(|p| lookup(value, p).and_then(as_f64))
}

/// Detail payloads are sometimes wrapped in `data` or `property`.
pub(crate) fn unwrap_property(payload: &Value) -> &Value {
    ["property", "data"]
        .iter()
        .filter_map(|k| payload.get(*k))
        .find(|v| v.is_object())
        .unwrap_or(payload)
}
