//! FILENAME: engine/src/column.rs
//! PURPOSE: Column definitions as supplied by the host table configuration.
//! CONTEXT: A column is an open attribute bag. The engine reads the known
//! attributes (key, dataIndex, fixed, sortable, strategy, ...) and keeps the
//! rest in `extra` so derived copies render exactly like the original.
//! Definitions are never mutated in place; the column engine produces new
//! copies with customization flags baked in.

use crate::lenient;
use crate::strategy::StrategyConfig;
use crate::value::Value;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_COLUMN_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity handle for a column definition. Issued once per
/// constructed or deserialized definition; clones share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(u64);

impl ColumnId {
    pub fn next() -> Self {
        ColumnId(NEXT_COLUMN_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl Default for ColumnId {
    fn default() -> Self {
        ColumnId::next()
    }
}

// ============================================================================
// FIXED SIDE
// ============================================================================

/// Which edge a column is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum FixedSide {
    Left,
    Right,
    #[default]
    None,
}

impl FixedSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            FixedSide::Left => "left",
            FixedSide::Right => "right",
            FixedSide::None => "",
        }
    }

    /// `"left"`, `"right"`, or `true` (left). Anything else is unpinned.
    pub fn from_json(raw: &serde_json::Value) -> Self {
        match raw {
            serde_json::Value::String(s) => FixedSide::parse(s),
            serde_json::Value::Bool(true) => FixedSide::Left,
            _ => FixedSide::None,
        }
    }

    pub fn parse(text: &str) -> Self {
        match text.trim() {
            "left" => FixedSide::Left,
            "right" => FixedSide::Right,
            _ => FixedSide::None,
        }
    }

    pub fn is_fixed(&self) -> bool {
        !matches!(self, FixedSide::None)
    }
}

impl Serialize for FixedSide {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FixedSide {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(FixedSide::from_json(&raw))
    }
}

// ============================================================================
// COLUMN DEFINITION
// ============================================================================

/// Sequence-number column type names.
pub const SEQ_COLUMN_TYPES: [&str; 2] = ["seq", "index"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
    #[serde(skip)]
    pub id: ColumnId,

    #[serde(default, deserialize_with = "lenient::optional_text", skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Row path this column reads (`["order", "total"]` is joined as `order.total`).
    #[serde(default, deserialize_with = "lenient::optional_text", skip_serializing_if = "Option::is_none")]
    pub data_index: Option<String>,

    #[serde(default, deserialize_with = "lenient::optional_text", skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    #[serde(default, deserialize_with = "lenient::optional_text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub column_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed: Option<FixedSide>,

    #[serde(default, deserialize_with = "lenient::optional_bool", skip_serializing_if = "Option::is_none")]
    pub sortable: Option<bool>,

    /// Sort comparator descriptor. Only its presence matters here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sorter: Option<serde_json::Value>,

    #[serde(default, deserialize_with = "lenient::optional_bool", skip_serializing_if = "Option::is_none")]
    pub filterable: Option<bool>,

    #[serde(default, deserialize_with = "lenient::optional", skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<serde_json::Value>>,

    /// Filter handler descriptor. Only its presence matters here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_method: Option<serde_json::Value>,

    #[serde(default, deserialize_with = "lenient::optional_bool", skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,

    #[serde(default, deserialize_with = "lenient::optional_bool", skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,

    #[serde(default, deserialize_with = "lenient::optional", skip_serializing)]
    pub strategy: Option<Arc<StrategyConfig>>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ColumnDefinition {
    pub fn new(key: impl Into<String>) -> Self {
        ColumnDefinition {
            key: Some(key.into()),
            ..Default::default()
        }
    }

    /// A column without a declared key, addressed by its data path.
    pub fn from_data_index(data_index: impl Into<String>) -> Self {
        ColumnDefinition {
            data_index: Some(data_index.into()),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_data_index(mut self, data_index: impl Into<String>) -> Self {
        self.data_index = Some(data_index.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_type(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = Some(column_type.into());
        self
    }

    pub fn with_fixed(mut self, fixed: FixedSide) -> Self {
        self.fixed = Some(fixed);
        self
    }

    pub fn with_sortable(mut self, sortable: bool) -> Self {
        self.sortable = Some(sortable);
        self
    }

    pub fn with_sorter(mut self, sorter: serde_json::Value) -> Self {
        self.sorter = Some(sorter);
        self
    }

    pub fn with_filterable(mut self, filterable: bool) -> Self {
        self.filterable = Some(filterable);
        self
    }

    pub fn with_filters(mut self, filters: Vec<serde_json::Value>) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = Some(hidden);
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyConfig) -> Self {
        self.strategy = Some(Arc::new(strategy));
        self
    }

    pub fn with_extra(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(name.into(), value);
        self
    }

    /// True for sequence-number columns (`type: "seq"` or `"index"`).
    pub fn is_seq(&self) -> bool {
        self.column_type
            .as_deref()
            .map(|t| SEQ_COLUMN_TYPES.contains(&t.trim().to_lowercase().as_str()))
            .unwrap_or(false)
    }

    /// Declared identity: key, then dataIndex, then field.
    pub fn declared_key(&self) -> Option<&str> {
        [&self.key, &self.data_index, &self.field]
            .into_iter()
            .filter_map(|k| k.as_deref())
            .find(|k| !k.is_empty())
    }

    /// Names under which grid-level strategy maps may address this column,
    /// most specific first: the explicit field, then dataIndex, then key.
    pub fn strategy_lookup_keys<'a>(&'a self, field: Option<&'a str>) -> Vec<&'a str> {
        let mut keys: Vec<&str> = Vec::with_capacity(3);
        for candidate in [field, self.data_index.as_deref(), self.key.as_deref()]
            .into_iter()
            .flatten()
        {
            if !candidate.is_empty() && !keys.contains(&candidate) {
                keys.push(candidate);
            }
        }
        keys
    }

    // ------------------------------------------------------------------------
    // Column-declared defaults
    // ------------------------------------------------------------------------

    pub fn default_visible(&self) -> bool {
        self.visible != Some(false) && self.hidden != Some(true)
    }

    pub fn default_fixed(&self) -> FixedSide {
        self.fixed.unwrap_or_default()
    }

    /// Explicit flag, else whether a sorter is attached.
    pub fn default_sortable(&self) -> bool {
        match self.sortable {
            Some(flag) => flag,
            None => self
                .sorter
                .as_ref()
                .map(|s| Value::from_json(s).is_truthy())
                .unwrap_or(false),
        }
    }

    /// Explicit flag, else a non-empty filter list or a filter handler.
    pub fn default_filterable(&self) -> bool {
        if let Some(flag) = self.filterable {
            return flag;
        }
        let has_filters = self.filters.as_ref().is_some_and(|f| !f.is_empty());
        let has_handler = self
            .filter_method
            .as_ref()
            .is_some_and(|m| Value::from_json(m).is_truthy());
        has_filters || has_handler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_known_and_extra_attributes() {
        let column: ColumnDefinition = serde_json::from_value(json!({
            "key": "amount",
            "dataIndex": ["order", "total"],
            "title": "Amount",
            "type": "Seq",
            "fixed": true,
            "width": 120,
            "strategy": "not an object"
        }))
        .unwrap();
        assert_eq!(column.key.as_deref(), Some("amount"));
        assert_eq!(column.data_index.as_deref(), Some("order.total"));
        assert_eq!(column.fixed, Some(FixedSide::Left));
        assert!(column.is_seq());
        assert!(column.strategy.is_none());
        assert_eq!(column.extra.get("width"), Some(&json!(120)));
    }

    #[test]
    fn every_definition_gets_its_own_handle() {
        let a = ColumnDefinition::new("a");
        let b = ColumnDefinition::new("a");
        assert_ne!(a.id, b.id);
        assert_eq!(a.clone().id, a.id);
    }

    #[test]
    fn declared_defaults() {
        let plain = ColumnDefinition::new("a");
        assert!(plain.default_visible());
        assert!(!plain.default_sortable());
        assert!(!plain.default_filterable());
        assert_eq!(plain.default_fixed(), FixedSide::None);

        let rich = ColumnDefinition::new("b")
            .with_hidden(true)
            .with_sorter(json!("default"))
            .with_filters(vec![json!({"text": "x", "value": 1})])
            .with_fixed(FixedSide::Right);
        assert!(!rich.default_visible());
        assert!(rich.default_sortable());
        assert!(rich.default_filterable());
        assert_eq!(rich.default_fixed(), FixedSide::Right);

        let explicit = ColumnDefinition::new("c").with_sorter(json!(true)).with_sortable(false);
        assert!(!explicit.default_sortable());
    }

    #[test]
    fn lookup_keys_are_deduplicated() {
        let column = ColumnDefinition::new("amount").with_data_index("amount");
        assert_eq!(column.strategy_lookup_keys(Some("price")), vec!["price", "amount"]);
        assert_eq!(column.strategy_lookup_keys(None), vec!["amount"]);
    }

    #[test]
    fn fixed_side_serializes_as_text() {
        assert_eq!(serde_json::to_value(FixedSide::None).unwrap(), json!(""));
        assert_eq!(FixedSide::from_json(&json!("right")), FixedSide::Right);
        assert_eq!(FixedSide::from_json(&json!("middle")), FixedSide::None);
    }
}
