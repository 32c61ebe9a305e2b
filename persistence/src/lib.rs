//! FILENAME: persistence/src/lib.rs
//! Table Runtime Persistence Module
//!
//! Saves and loads column customization state through pluggable key-value
//! storage backends. Persisted state is the JSON form of
//! `ColumnCustomSnapshot`, stored under a key derived from the column set.

mod column_custom;
mod error;
mod key;
mod storage;

pub use column_custom::{
    clear_column_custom_snapshot, load_column_custom_snapshot, read_column_custom_snapshot,
    resolve_persistence_target, save_column_custom_snapshot, write_column_custom_snapshot,
    PersistenceTarget,
};
pub use error::PersistenceError;
pub use key::{column_custom_storage_key, column_signature, DEFAULT_KEY_PREFIX, SIGNATURE_LEN};
pub use storage::{FileStorage, MemoryStorage, StorageBackend, StorageRegistry};
