//! FILENAME: column-engine/src/controls.rs
//! Panel Controls & Runtime Items - What the panel lists and what the grid renders.
//!
//! Controls are the rows of the customization panel, one per column in draft
//! order. Runtime items are the column definitions the grid renders: copies of
//! the declared definitions, reordered by the snapshot, with every customized
//! flag written back as an explicit attribute.

use crate::snapshot::{normalize_order, resolve_column_key, ColumnCustomSnapshot};
use engine::{ColumnDefinition, FixedSide};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnCustomControl {
    pub key: String,
    pub title: String,
    pub checked: bool,
    pub fixed: FixedSide,
    pub sortable: bool,
    pub filterable: bool,
    pub seq: bool,
}

/// Column definitions indexed by resolved key. The first definition wins a
/// duplicated key.
fn index_columns(columns: &[ColumnDefinition]) -> HashMap<String, &ColumnDefinition> {
    let mut by_key = HashMap::with_capacity(columns.len());
    for (i, column) in columns.iter().enumerate() {
        by_key.entry(resolve_column_key(column, i)).or_insert(column);
    }
    by_key
}

/// Panel rows in draft order. Titles fall back to the column key.
pub fn build_column_custom_controls(
    columns: &[ColumnDefinition],
    draft: &ColumnCustomSnapshot,
) -> Vec<ColumnCustomControl> {
    let by_key = index_columns(columns);
    normalize_order(columns, &draft.order)
        .into_iter()
        .filter_map(|key| {
            let column = by_key.get(&key)?;
            let title = column
                .title
                .as_deref()
                .filter(|t| !t.is_empty())
                .unwrap_or(&key)
                .to_string();
            Some(ColumnCustomControl {
                checked: draft.is_visible(&key),
                fixed: draft.fixed_side(&key),
                sortable: draft.is_sortable(&key),
                filterable: draft.is_filterable(&key),
                seq: column.is_seq(),
                title,
                key,
            })
        })
        .collect()
}

/// Column definitions for rendering, in snapshot order.
///
/// Every column is returned, hidden ones included, with `key`, `visible`,
/// `hidden`, `fixed`, `sortable` and `filterable` set explicitly. Building a
/// snapshot from the result reproduces `snapshot`.
pub fn build_column_runtime_items(
    columns: &[ColumnDefinition],
    snapshot: &ColumnCustomSnapshot,
) -> Vec<ColumnDefinition> {
    let by_key = index_columns(columns);
    normalize_order(columns, &snapshot.order)
        .into_iter()
        .filter_map(|key| {
            let mut item = (*by_key.get(&key)?).clone();
            let visible = snapshot.is_visible(&key);
            item.visible = Some(visible);
            item.hidden = Some(!visible);
            item.fixed = Some(snapshot.fixed_side(&key));
            item.sortable = Some(snapshot.is_sortable(&key));
            item.filterable = Some(snapshot.is_filterable(&key));
            item.key = Some(key);
            Some(item)
        })
        .collect()
}

/// Only the columns the grid should draw.
pub fn visible_runtime_items(columns: &[ColumnDefinition], snapshot: &ColumnCustomSnapshot) -> Vec<ColumnDefinition> {
    build_column_runtime_items(columns, snapshot)
        .into_iter()
        .filter(|item| item.visible == Some(true))
        .collect()
}
