//! Key-value persistence layer
//!
//! The session persists its state through a small key-value contract rather
//! than touching files directly: a JSON value per key, whole-value writes,
//! last-write-wins. Change notifications let an in-process observer react to
//! writes made by another component, which is how the one-shot trigger
//! channel is delivered.

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A single key change, delivered to subscribers after the write applied.
/// `value` is `None` for removals.
#[derive(Debug, Clone)]
pub struct StoreChange {
    pub key: String,
    pub value: Option<Value>,
}

/// Async key-value store with change notification
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Subscribe to change notifications. Lagging receivers miss changes;
    /// consumers that care re-read the key on reconnect.
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

/// Convenience accessor for string-typed keys
pub async fn get_string(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<String>, StoreError> {
    Ok(store
        .get(key)
        .await?
        .and_then(|value| value.as_str().map(|s| s.to_string())))
}
