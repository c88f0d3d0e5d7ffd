//! File-backed store: one JSON document, rewritten whole on every change

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tokio::sync::broadcast;

use super::{KeyValueStore, StoreChange, StoreError};

const CHANGE_CHANNEL_CAPACITY: usize = 32;

pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<Map<String, Value>>,
    changes: broadcast::Sender<StoreChange>,
}

impl JsonFileStore {
    /// Open the store at `path`, loading existing contents. A missing file
    /// starts empty; a corrupt file is reset rather than failing the session.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<Map<String, Value>>(&content) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!("store file {} is corrupt, resetting: {}", path.display(), e);
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            path,
            entries: RwLock::new(entries),
            changes,
        })
    }

    async fn flush(&self, entries: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value.clone());
        self.flush(&entries).await?;
        drop(entries);

        let _ = self.changes.send(StoreChange {
            key: key.to_string(),
            value: Some(value),
        });
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        self.flush(&entries).await?;
        drop(entries);

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
