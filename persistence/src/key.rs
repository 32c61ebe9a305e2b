//! FILENAME: persistence/src/key.rs
//! Storage key derivation for column customization state.
//!
//! The key is stable across reloads as long as the column set keeps the same
//! keys in the same declaration order; adding, removing or reordering
//! declared columns produces a new key so stale state is never applied.

use column_engine::resolve_column_keys;
use engine::ColumnDefinition;
use sha2::{Digest, Sha256};

pub const DEFAULT_KEY_PREFIX: &str = "table-column-custom";

/// Hex characters of the digest kept in the signature.
pub const SIGNATURE_LEN: usize = 16;

/// SHA-256 over the resolved column keys, truncated to `SIGNATURE_LEN`.
pub fn column_signature(columns: &[ColumnDefinition]) -> String {
    let mut hasher = Sha256::new();
    for key in resolve_column_keys(columns) {
        hasher.update(key.as_bytes());
        hasher.update([0x1f]);
    }
    let mut signature = hex::encode(hasher.finalize());
    signature.truncate(SIGNATURE_LEN);
    signature
}

/// `{prefix}:{scope}:{signature}`, or `{prefix}:{signature}` without a scope.
pub fn column_custom_storage_key(prefix: Option<&str>, scope: Option<&str>, columns: &[ColumnDefinition]) -> String {
    let prefix = prefix.filter(|p| !p.is_empty()).unwrap_or(DEFAULT_KEY_PREFIX);
    let signature = column_signature(columns);
    match scope.filter(|s| !s.is_empty()) {
        Some(scope) => format!("{}:{}:{}", prefix, scope, signature),
        None => format!("{}:{}", prefix, signature),
    }
}
