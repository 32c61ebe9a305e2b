//! FILENAME: persistence/src/storage.rs
//! Key-value storage backends.
//!
//! A backend stores opaque strings under string keys. Two are provided:
//! - `MemoryStorage`: process-local map, optionally with a byte quota
//! - `FileStorage`: one file per key under a directory
//!
//! `StorageRegistry` names backends so grid configuration can pick one.

use crate::error::PersistenceError;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

// ============================================================================
// MEMORY STORAGE
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    /// Total bytes of keys and values the store accepts.
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        MemoryStorage {
            entries: Mutex::new(HashMap::new()),
            quota: Some(quota),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, PersistenceError> {
        self.entries
            .lock()
            .map_err(|_| PersistenceError::Unavailable("memory storage lock poisoned".to_string()))
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut entries = self.lock()?;
        if let Some(limit) = self.quota {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = used + key.len() + value.len();
            if needed > limit {
                return Err(PersistenceError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

// ============================================================================
// FILE STORAGE
// ============================================================================

/// Stores each key as `<sanitized>-<hash>.json` under `dir`. The hash suffix
/// keeps keys that sanitize to the same name apart.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStorage { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let sanitized: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .take(64)
            .collect();
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        self.dir.join(format!("{}-{}.json", sanitized, &digest[..8]))
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Named backends plus the fallback used when configuration names none.
#[derive(Clone, Default)]
pub struct StorageRegistry {
    backends: HashMap<String, Arc<dyn StorageBackend>>,
    fallback: Option<Arc<dyn StorageBackend>>,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(backend: Arc<dyn StorageBackend>) -> Self {
        StorageRegistry {
            backends: HashMap::new(),
            fallback: Some(backend),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, backend: Arc<dyn StorageBackend>) {
        self.backends.insert(name.into(), backend);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn StorageBackend>> {
        self.backends.get(name).cloned()
    }

    pub fn fallback(&self) -> Option<Arc<dyn StorageBackend>> {
        self.fallback.clone()
    }
}

impl std::fmt::Debug for StorageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.backends.keys().collect();
        names.sort();
        f.debug_struct("StorageRegistry")
            .field("backends", &names)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_round_trip_and_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("k").unwrap(), None);
        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
        storage.remove("k").unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn memory_quota_counts_replaced_value_once() {
        let storage = MemoryStorage::with_quota(10);
        storage.set("k", "12345").unwrap();
        storage.set("k", "123456789").unwrap();
        let err = storage.set("j", "x").unwrap_err();
        assert!(matches!(err, PersistenceError::QuotaExceeded { limit: 10, .. }));
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("123456789"));
    }

    #[test]
    fn file_names_are_sanitized_and_distinct() {
        let storage = FileStorage::new("/tmp/store");
        let a = storage.path_for("grid:orders/v1");
        let b = storage.path_for("grid_orders_v1");
        assert_ne!(a, b);
        let name = a.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("grid_orders_v1-"));
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        // A directory at the target path makes the rename fail
        let target = storage.path_for("grid:orders");
        fs::create_dir_all(&target).unwrap();

        assert!(matches!(storage.set("grid:orders", "{}"), Err(PersistenceError::Io(_))));
        assert!(!target.with_extension("json.tmp").exists());
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn registry_lookup() {
        let mut registry = StorageRegistry::with_fallback(Arc::new(MemoryStorage::new()));
        registry.register("session", Arc::new(MemoryStorage::new()));
        assert!(registry.get("session").is_some());
        assert!(registry.get("local").is_none());
        assert!(registry.fallback().is_some());
        assert!(StorageRegistry::new().fallback().is_none());
    }
}
