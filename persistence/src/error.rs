//! FILENAME: persistence/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage quota exceeded writing '{key}' ({needed} of {limit} bytes)")]
    QuotaExceeded { key: String, needed: usize, limit: usize },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid payload for '{key}': {message}")]
    InvalidPayload { key: String, message: String },
}
