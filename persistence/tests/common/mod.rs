//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for persistence integration tests.

#![allow(dead_code)]

use engine::{ColumnCustomPersistence, ColumnDefinition, FixedSide, GridConfig};
use persistence::{
    resolve_persistence_target, FileStorage, MemoryStorage, PersistenceTarget, StorageRegistry,
};
use std::sync::Arc;
use tempfile::TempDir;

/// Test harness with a memory fallback backend and a file backend registered
/// as "file" in a temporary directory.
pub struct TestHarness {
    pub memory: Arc<MemoryStorage>,
    pub files: Arc<FileStorage>,
    pub registry: StorageRegistry,
    pub columns: Vec<ColumnDefinition>,
    _dir: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_memory(MemoryStorage::new())
    }

    /// Create a harness whose fallback backend rejects writes past `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self::with_memory(MemoryStorage::with_quota(quota))
    }

    fn with_memory(memory: MemoryStorage) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let memory = Arc::new(memory);
        let files = Arc::new(FileStorage::new(dir.path().join("columns")));
        let mut registry = StorageRegistry::with_fallback(memory.clone());
        registry.register("file", files.clone());
        TestHarness {
            memory,
            files,
            registry,
            columns: sample_columns(),
            _dir: dir,
        }
    }

    pub fn target(&self, persistence: ColumnCustomPersistence) -> Option<PersistenceTarget> {
        let grid = GridConfig::new().with_column_custom(persistence);
        resolve_persistence_target(Some(&grid), &self.columns, &self.registry)
    }

    pub fn default_target(&self) -> PersistenceTarget {
        self.target(ColumnCustomPersistence::default()).unwrap()
    }
}

pub fn sample_columns() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::new("index").with_type("seq"),
        ColumnDefinition::new("name").with_title("Name").with_sortable(true),
        ColumnDefinition::new("amount").with_title("Amount"),
        ColumnDefinition::new("actions").with_fixed(FixedSide::Right),
    ]
}
