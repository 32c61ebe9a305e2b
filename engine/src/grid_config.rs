//! FILENAME: engine/src/grid_config.rs
//! PURPOSE: Grid-level configuration consumed by the strategy resolvers and
//! the column customization persistence glue.
//! CONTEXT: Every strategy source sits behind an `Arc`. Hosts "replace" a
//! source by assigning a new `Arc`; the strategy cache notices the new
//! pointer and recomputes. Mutating through a shared `Arc` is impossible,
//! which is what keeps cached results honest.

use crate::lenient;
use crate::strategy::{rules_from_json, StrategyConfig, StrategyRule};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_GRID_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity handle for a grid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridId(u64);

impl GridId {
    pub fn next() -> Self {
        GridId(NEXT_GRID_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl Default for GridId {
    fn default() -> Self {
        GridId::next()
    }
}

/// Strategies addressed by field name (field, dataIndex or key).
pub type FieldStrategyMap = BTreeMap<String, StrategyConfig>;

/// The structured `strategy` section: per-field cell strategies plus row rules.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GridStrategy {
    #[serde(default, deserialize_with = "deserialize_field_map")]
    pub columns: FieldStrategyMap,
    #[serde(default, deserialize_with = "crate::strategy::deserialize_rules")]
    pub rows: Vec<StrategyRule>,
}

impl GridStrategy {
    pub fn with_column(mut self, field: impl Into<String>, strategy: StrategyConfig) -> Self {
        self.columns.insert(field.into(), strategy);
        self
    }

    pub fn with_row_rule(mut self, rule: StrategyRule) -> Self {
        self.rows.push(rule);
        self
    }
}

/// Where and whether the column customization snapshot is persisted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnCustomPersistence {
    #[serde(default = "default_enabled", deserialize_with = "deserialize_enabled")]
    pub enabled: bool,
    /// Explicit storage key. Overrides the derived signature key.
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub storage_key: Option<String>,
    /// Distinguishes grids that share a column set (page name, user, ...).
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub scope: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub key_prefix: Option<String>,
    /// Registered backend name; the caller's fallback backend when unset.
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub storage: Option<String>,
}

fn default_enabled() -> bool {
    true
}

fn deserialize_enabled<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient::optional_bool(deserializer)?.unwrap_or(true))
}

impl Default for ColumnCustomPersistence {
    fn default() -> Self {
        ColumnCustomPersistence {
            enabled: true,
            storage_key: None,
            scope: None,
            key_prefix: None,
            storage: None,
        }
    }
}

impl ColumnCustomPersistence {
    pub fn disabled() -> Self {
        ColumnCustomPersistence {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = Some(key.into());
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_storage(mut self, backend: impl Into<String>) -> Self {
        self.storage = Some(backend.into());
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridConfig {
    #[serde(skip)]
    pub id: GridId,

    /// Legacy per-field cell strategies. Lowest precedence.
    #[serde(default, deserialize_with = "deserialize_shared_field_map")]
    pub cell_strategy: Option<Arc<FieldStrategyMap>>,

    #[serde(default, deserialize_with = "lenient::optional")]
    pub strategy: Option<Arc<GridStrategy>>,

    /// Legacy row rules, applied after `strategy.rows`.
    #[serde(default, deserialize_with = "deserialize_shared_rules")]
    pub row_strategy: Option<Arc<Vec<StrategyRule>>>,

    #[serde(default, deserialize_with = "deserialize_column_custom")]
    pub column_custom: Option<ColumnCustomPersistence>,
}

impl GridConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cell_strategy(mut self, strategies: FieldStrategyMap) -> Self {
        self.cell_strategy = Some(Arc::new(strategies));
        self
    }

    pub fn with_strategy(mut self, strategy: GridStrategy) -> Self {
        self.strategy = Some(Arc::new(strategy));
        self
    }

    pub fn with_row_strategy(mut self, rules: Vec<StrategyRule>) -> Self {
        self.row_strategy = Some(Arc::new(rules));
        self
    }

    pub fn with_column_custom(mut self, persistence: ColumnCustomPersistence) -> Self {
        self.column_custom = Some(persistence);
        self
    }
}

// ============================================================================
// DESERIALIZATION HELPERS
// ============================================================================

/// Keeps every entry that is a well-formed strategy object.
fn field_map_from_json(raw: &serde_json::Value) -> Option<FieldStrategyMap> {
    let map = raw.as_object()?;
    let mut strategies = FieldStrategyMap::new();
    for (field, value) in map {
        if !value.is_object() {
            continue;
        }
        match serde_json::from_value::<StrategyConfig>(value.clone()) {
            Ok(config) => {
                strategies.insert(field.clone(), config);
            }
            Err(e) => crate::log_debug!("STRATEGY", "ignoring strategy for '{}': {}", field, e),
        }
    }
    Some(strategies)
}

fn deserialize_field_map<'de, D>(deserializer: D) -> Result<FieldStrategyMap, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(field_map_from_json(&raw).unwrap_or_default())
}

fn deserialize_shared_field_map<'de, D>(deserializer: D) -> Result<Option<Arc<FieldStrategyMap>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(field_map_from_json(&raw).map(Arc::new))
}

fn deserialize_shared_rules<'de, D>(deserializer: D) -> Result<Option<Arc<Vec<StrategyRule>>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    if !raw.is_array() {
        return Ok(None);
    }
    Ok(Some(Arc::new(rules_from_json(&raw))))
}

/// `true` / `false` toggle the defaults; an object configures them.
fn deserialize_column_custom<'de, D>(deserializer: D) -> Result<Option<ColumnCustomPersistence>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw {
        serde_json::Value::Bool(true) => Some(ColumnCustomPersistence::default()),
        serde_json::Value::Bool(false) => Some(ColumnCustomPersistence::disabled()),
        serde_json::Value::Object(_) => serde_json::from_value(raw).ok(),
        _ => None,
    })
}
