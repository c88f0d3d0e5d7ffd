//! One-shot trigger channel
//!
//! An out-of-process trigger (the context menu or keyboard shortcut in the
//! original extension; the `trigger` subcommand here) writes a pending
//! record to the shared store. The session observes it on load and through
//! store change notifications, and must clear it before acting so it fires
//! exactly once.

use serde::{Deserialize, Serialize};

use crate::config::constants::storage_keys;
use crate::storage::{KeyValueStore, StoreChange, StoreError};

/// What to do with the triggered text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerAction {
    /// Wrap the text in the explain prompt and submit it as a chat turn
    #[default]
    Explain,
    /// Send the text to the translation endpoint
    Translate,
}

/// Transient record written by the trigger side, consumed once by the
/// session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTrigger {
    pub text: String,
    #[serde(default)]
    pub action: TriggerAction,
}

/// Write a pending trigger for a running session to pick up
pub async fn write_trigger(
    store: &dyn KeyValueStore,
    trigger: &PendingTrigger,
) -> Result<(), StoreError> {
    store
        .set(
            storage_keys::PENDING_TRIGGER,
            serde_json::to_value(trigger)?,
        )
        .await
}

/// Read and clear the pending trigger. The removal happens before the value
/// is returned so a crash mid-consumption drops the trigger rather than
/// replaying it.
pub async fn take_pending(
    store: &dyn KeyValueStore,
) -> Result<Option<PendingTrigger>, StoreError> {
    let Some(value) = store.get(storage_keys::PENDING_TRIGGER).await? else {
        return Ok(None);
    };
    store.remove(storage_keys::PENDING_TRIGGER).await?;

    match serde_json::from_value(value) {
        Ok(trigger) => Ok(Some(trigger)),
        Err(e) => {
            tracing::warn!("dropping malformed pending trigger: {}", e);
            Ok(None)
        }
    }
}

/// Whether a store change is a freshly written trigger (removals are the
/// session's own consumption and are ignored)
pub fn is_trigger_write(change: &StoreChange) -> bool {
    change.key == storage_keys::PENDING_TRIGGER && change.value.is_some()
}
