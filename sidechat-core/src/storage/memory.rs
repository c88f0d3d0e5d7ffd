//! In-memory store used by tests and ephemeral sessions

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tokio::sync::broadcast;

use super::{KeyValueStore, StoreChange, StoreError};

const CHANGE_CHANNEL_CAPACITY: usize = 32;

pub struct MemoryStore {
    entries: RwLock<Map<String, Value>>,
    changes: broadcast::Sender<StoreChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            entries: RwLock::new(Map::new()),
            changes,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.clone());
        let _ = self.changes.send(StoreChange {
            key: key.to_string(),
            value: Some(value),
        });
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        let _ = self.changes.send(StoreChange {
            key: key.to_string(),
            value: None,
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}
