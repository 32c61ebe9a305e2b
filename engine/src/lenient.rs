//! FILENAME: engine/src/lenient.rs
//! PURPOSE: Serde helpers for host-supplied configuration.
//! CONTEXT: Table configuration is authored by hand and often carries values
//! of the wrong shape (a string where an object belongs, `1` for `true`).
//! A malformed optional section is treated as absent instead of failing the
//! whole configuration.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// Deserializes an optional value, mapping any shape mismatch to `None`.
pub fn optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    if raw.is_null() {
        return Ok(None);
    }
    Ok(serde_json::from_value(raw).ok())
}

/// Accepts a boolean or anything truthy-looking; `null` is absent.
pub fn optional_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(b),
        other => Some(crate::value::Value::from_json(&other).is_truthy()),
    })
}

/// Accepts a string, a number, or a path array (`["order", "total"]`,
/// joined with `.`).
pub fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(json_to_text(&raw))
}

pub(crate) fn json_to_text(raw: &serde_json::Value) -> Option<String> {
    match raw {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Array(parts) => {
            let segments: Vec<String> = parts.iter().filter_map(json_to_text).collect();
            if segments.is_empty() {
                None
            } else {
                Some(segments.join("."))
            }
        }
        serde_json::Value::Null | serde_json::Value::Object(_) => None,
    }
}
