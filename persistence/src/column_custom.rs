//! FILENAME: persistence/src/column_custom.rs
//! Column customization persistence - load and save the snapshot.
//!
//! Failures never reach the caller as errors. A missing backend, a storage
//! error, corrupt JSON or a payload that is not a JSON object all read as
//! "nothing persisted"; a failed write reports `false`. Each case is logged
//! under the "STORAGE" category.

use crate::error::PersistenceError;
use crate::key::column_custom_storage_key;
use crate::storage::{StorageBackend, StorageRegistry};
use column_engine::ColumnCustomSnapshot;
use engine::{log_debug, log_info, log_warn, ColumnDefinition, GridConfig};
use std::sync::Arc;

/// Where a grid's customization state lives.
#[derive(Clone)]
pub struct PersistenceTarget {
    pub key: String,
    pub backend: Arc<dyn StorageBackend>,
}

impl std::fmt::Debug for PersistenceTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceTarget").field("key", &self.key).finish()
    }
}

/// Resolves key and backend from `grid.columnCustom`.
///
/// Returns `None` when the grid has no persistence configuration, when it is
/// disabled, or when no backend is available. A configured backend name that
/// is not registered falls back to the registry's fallback.
pub fn resolve_persistence_target(
    grid: Option<&GridConfig>,
    columns: &[ColumnDefinition],
    storages: &StorageRegistry,
) -> Option<PersistenceTarget> {
    let config = grid?.column_custom.as_ref()?;
    if !config.enabled {
        return None;
    }

    let backend = match config.storage.as_deref() {
        Some(name) => storages.get(name).or_else(|| {
            log_warn!("STORAGE", "unknown storage backend '{}', using fallback", name);
            storages.fallback()
        }),
        None => storages.fallback(),
    }?;

    let key = match config.storage_key.as_deref().filter(|k| !k.is_empty()) {
        Some(explicit) => explicit.to_string(),
        None => column_custom_storage_key(config.key_prefix.as_deref(), config.scope.as_deref(), columns),
    };
    Some(PersistenceTarget { key, backend })
}

/// Reads and decodes the snapshot, propagating every failure.
pub fn read_column_custom_snapshot(
    target: &PersistenceTarget,
) -> Result<Option<ColumnCustomSnapshot>, PersistenceError> {
    let Some(text) = target.backend.get(&target.key)? else {
        return Ok(None);
    };
    let raw: serde_json::Value = serde_json::from_str(&text)?;
    if !raw.is_object() {
        return Err(PersistenceError::InvalidPayload {
            key: target.key.clone(),
            message: "expected a JSON object".to_string(),
        });
    }
    Ok(Some(serde_json::from_value(raw)?))
}

pub fn write_column_custom_snapshot(
    target: &PersistenceTarget,
    snapshot: &ColumnCustomSnapshot,
) -> Result<(), PersistenceError> {
    let text = serde_json::to_string(snapshot)?;
    target.backend.set(&target.key, &text)
}

/// The persisted snapshot, or `None` when there is none or it is unreadable.
pub fn load_column_custom_snapshot(target: Option<&PersistenceTarget>) -> Option<ColumnCustomSnapshot> {
    let target = target?;
    match read_column_custom_snapshot(target) {
        Ok(Some(snapshot)) => {
            log_info!("STORAGE", "loaded column state '{}'", target.key);
            Some(snapshot)
        }
        Ok(None) => {
            log_debug!("STORAGE", "no column state under '{}'", target.key);
            None
        }
        Err(e) => {
            log_warn!("STORAGE", "load '{}' failed: {}", target.key, e);
            None
        }
    }
}

/// Writes the snapshot. `false` when there is no target or the write failed.
pub fn save_column_custom_snapshot(target: Option<&PersistenceTarget>, snapshot: &ColumnCustomSnapshot) -> bool {
    let Some(target) = target else {
        return false;
    };
    match write_column_custom_snapshot(target, snapshot) {
        Ok(()) => {
            log_info!("STORAGE", "saved column state '{}'", target.key);
            true
        }
        Err(e) => {
            log_warn!("STORAGE", "save '{}' failed: {}", target.key, e);
            false
        }
    }
}

/// Removes persisted state, as after a reset the host chooses not to keep.
pub fn clear_column_custom_snapshot(target: Option<&PersistenceTarget>) -> bool {
    let Some(target) = target else {
        return false;
    };
    match target.backend.remove(&target.key) {
        Ok(()) => true,
        Err(e) => {
            log_warn!("STORAGE", "clear '{}' failed: {}", target.key, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use engine::ColumnCustomPersistence;

    fn setup() -> (Arc<MemoryStorage>, StorageRegistry, Vec<ColumnDefinition>) {
        let memory = Arc::new(MemoryStorage::new());
        let registry = StorageRegistry::with_fallback(memory.clone());
        let columns = vec![ColumnDefinition::new("id"), ColumnDefinition::new("name")];
        (memory, registry, columns)
    }

    #[test]
    fn no_config_or_disabled_means_no_target() {
        let (_, registry, columns) = setup();
        assert!(resolve_persistence_target(None, &columns, &registry).is_none());
        assert!(resolve_persistence_target(Some(&GridConfig::new()), &columns, &registry).is_none());

        let disabled = GridConfig::new().with_column_custom(ColumnCustomPersistence::disabled());
        assert!(resolve_persistence_target(Some(&disabled), &columns, &registry).is_none());

        let enabled = GridConfig::new().with_column_custom(ColumnCustomPersistence::default());
        assert!(resolve_persistence_target(Some(&enabled), &columns, &StorageRegistry::new()).is_none());
    }

    #[test]
    fn explicit_key_wins() {
        let (_, registry, columns) = setup();
        let grid = GridConfig::new().with_column_custom(
            ColumnCustomPersistence::default()
                .with_storage_key("orders-columns")
                .with_scope("ignored"),
        );
        let target = resolve_persistence_target(Some(&grid), &columns, &registry).unwrap();
        assert_eq!(target.key, "orders-columns");
    }

    #[test]
    fn corrupt_and_non_object_payloads_load_as_none() {
        let (memory, registry, columns) = setup();
        let grid = GridConfig::new().with_column_custom(ColumnCustomPersistence::default());
        let target = resolve_persistence_target(Some(&grid), &columns, &registry).unwrap();

        memory.set(&target.key, "{not json").unwrap();
        assert!(load_column_custom_snapshot(Some(&target)).is_none());
        memory.set(&target.key, "[1, 2]").unwrap();
        assert!(load_column_custom_snapshot(Some(&target)).is_none());
        memory.set(&target.key, "null").unwrap();
        assert!(matches!(
            read_column_custom_snapshot(&target),
            Err(PersistenceError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn save_then_load_returns_snapshot() {
        let (memory, registry, columns) = setup();
        let grid = GridConfig::new().with_column_custom(ColumnCustomPersistence::default());
        let target = resolve_persistence_target(Some(&grid), &columns, &registry).unwrap();
        let snapshot = ColumnCustomSnapshot {
            order: vec!["name".into(), "id".into()],
            ..Default::default()
        };

        assert!(load_column_custom_snapshot(Some(&target)).is_none());
        assert!(save_column_custom_snapshot(Some(&target), &snapshot));
        assert_eq!(memory.len(), 1);
        assert_eq!(load_column_custom_snapshot(Some(&target)), Some(snapshot));
    }

    #[test]
    fn save_without_target_reports_false() {
        assert!(!save_column_custom_snapshot(None, &ColumnCustomSnapshot::default()));
        assert!(load_column_custom_snapshot(None).is_none());
        assert!(!clear_column_custom_snapshot(None));
    }
}
