//! FILENAME: column-engine/src/snapshot.rs
//! Column Customization Snapshot - The serializable customization state.
//!
//! A snapshot records, per column key, whether the column is visible, which
//! edge it is pinned to, and whether sorting and filtering are enabled, plus
//! the display order. Snapshots are:
//! - Serializable (persisted as JSON between sessions)
//! - Rebuilt against the current column set on every transition, so stale
//!   keys drop out and new columns appear
//! - Plain owned values; cloning never shares state

use engine::{ColumnDefinition, FixedSide};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnCustomSnapshot {
    #[serde(default, deserialize_with = "lenient_order")]
    pub order: Vec<String>,
    #[serde(default, deserialize_with = "lenient_flags")]
    pub visible: BTreeMap<String, bool>,
    #[serde(default, deserialize_with = "lenient_fixed")]
    pub fixed: BTreeMap<String, FixedSide>,
    #[serde(default, deserialize_with = "lenient_flags")]
    pub sortable: BTreeMap<String, bool>,
    #[serde(default, deserialize_with = "lenient_flags")]
    pub filterable: BTreeMap<String, bool>,
}

impl ColumnCustomSnapshot {
    /// True when any map or the order carries an entry.
    pub fn has_any(&self) -> bool {
        !self.order.is_empty()
            || !self.visible.is_empty()
            || !self.fixed.is_empty()
            || !self.sortable.is_empty()
            || !self.filterable.is_empty()
    }

    pub fn is_visible(&self, key: &str) -> bool {
        self.visible.get(key).copied().unwrap_or(true)
    }

    pub fn fixed_side(&self, key: &str) -> FixedSide {
        self.fixed.get(key).copied().unwrap_or_default()
    }

    pub fn is_sortable(&self, key: &str) -> bool {
        self.sortable.get(key).copied().unwrap_or(false)
    }

    pub fn is_filterable(&self, key: &str) -> bool {
        self.filterable.get(key).copied().unwrap_or(false)
    }
}

/// Stable key of a column: key, then dataIndex, then field, else
/// `column-<index>` from its position in the definition list.
pub fn resolve_column_key(column: &ColumnDefinition, index: usize) -> String {
    match column.declared_key() {
        Some(key) => key.to_string(),
        None => format!("column-{}", index),
    }
}

/// Resolved keys in definition order. A repeated key is kept once.
pub fn resolve_column_keys(columns: &[ColumnDefinition]) -> Vec<String> {
    let mut seen = HashSet::new();
    columns
        .iter()
        .enumerate()
        .map(|(i, column)| resolve_column_key(column, i))
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

/// Reconciles a preferred order with the current column set. Known keys keep
/// their preferred position; the rest follow, sequence columns first.
pub fn normalize_order(columns: &[ColumnDefinition], preferred: &[String]) -> Vec<String> {
    let keys = resolve_column_keys(columns);
    if preferred.is_empty() {
        return keys;
    }

    let known: HashSet<&str> = keys.iter().map(String::as_str).collect();
    let mut placed: HashSet<&str> = HashSet::new();
    let mut order: Vec<String> = Vec::with_capacity(keys.len());
    for key in preferred {
        if known.contains(key.as_str()) && placed.insert(key.as_str()) {
            order.push(key.clone());
        }
    }

    let mut seq_missing = Vec::new();
    let mut other_missing = Vec::new();
    for (i, column) in columns.iter().enumerate() {
        let key = resolve_column_key(column, i);
        if placed.contains(key.as_str()) || seq_missing.contains(&key) || other_missing.contains(&key) {
            continue;
        }
        if column.is_seq() {
            seq_missing.push(key);
        } else {
            other_missing.push(key);
        }
    }
    order.extend(seq_missing);
    order.extend(other_missing);
    order
}

/// Builds a snapshot covering exactly `columns`.
///
/// Each flag comes from `source` when it has the key, else from the column's
/// own declaration when `prefer_column_default`, else a neutral default
/// (visible, unpinned, not sortable, not filterable).
pub fn create_column_custom_snapshot(
    columns: &[ColumnDefinition],
    source: Option<&ColumnCustomSnapshot>,
    prefer_column_default: bool,
) -> ColumnCustomSnapshot {
    let mut snapshot = ColumnCustomSnapshot {
        order: normalize_order(columns, source.map(|s| s.order.as_slice()).unwrap_or(&[])),
        ..Default::default()
    };

    for (i, column) in columns.iter().enumerate() {
        let key = resolve_column_key(column, i);
        if snapshot.visible.contains_key(&key) {
            continue;
        }

        let visible = source
            .and_then(|s| s.visible.get(&key).copied())
            .unwrap_or(!prefer_column_default || column.default_visible());
        let fixed = source
            .and_then(|s| s.fixed.get(&key).copied())
            .unwrap_or(if prefer_column_default {
                column.default_fixed()
            } else {
                FixedSide::None
            });
        let sortable = source
            .and_then(|s| s.sortable.get(&key).copied())
            .unwrap_or(prefer_column_default && column.default_sortable());
        let filterable = source
            .and_then(|s| s.filterable.get(&key).copied())
            .unwrap_or(prefer_column_default && column.default_filterable());

        snapshot.visible.insert(key.clone(), visible);
        snapshot.fixed.insert(key.clone(), fixed);
        snapshot.sortable.insert(key.clone(), sortable);
        snapshot.filterable.insert(key, filterable);
    }

    snapshot
}

/// Independent deep copy.
pub fn clone_column_custom_snapshot(snapshot: &ColumnCustomSnapshot) -> ColumnCustomSnapshot {
    snapshot.clone()
}

// ============================================================================
// LENIENT DESERIALIZATION
// ============================================================================

fn lenient_order<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let raw = serde_json::Value::deserialize(deserializer)?;
    let Some(items) = raw.as_array() else {
        return Ok(Vec::new());
    };
    Ok(items
        .iter()
        .filter_map(|item| match item {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect())
}

/// Anything but an explicit `false` reads as `true`.
fn lenient_flags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeMap<String, bool>, D::Error> {
    let raw = serde_json::Value::deserialize(deserializer)?;
    let Some(map) = raw.as_object() else {
        return Ok(BTreeMap::new());
    };
    Ok(map
        .iter()
        .map(|(key, value)| (key.clone(), !matches!(value, serde_json::Value::Bool(false))))
        .collect())
}

fn lenient_fixed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeMap<String, FixedSide>, D::Error> {
    let raw = serde_json::Value::deserialize(deserializer)?;
    let Some(map) = raw.as_object() else {
        return Ok(BTreeMap::new());
    };
    Ok(map
        .iter()
        .map(|(key, value)| (key.clone(), FixedSide::from_json(value)))
        .collect())
}
