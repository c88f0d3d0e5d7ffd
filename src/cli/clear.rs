//! Clear the persisted conversation log

use anyhow::{Context, Result};
use console::style;

use sidechat_core::config::SidechatConfig;
use sidechat_core::config::constants::storage_keys;
use sidechat_core::storage::{JsonFileStore, KeyValueStore};

pub async fn run(config: SidechatConfig) -> Result<()> {
    let store_path = config.store_path();
    let store = JsonFileStore::open(&store_path)
        .await
        .with_context(|| format!("Failed to open store at {}", store_path.display()))?;
    store
        .remove(storage_keys::CONVERSATION_LOG)
        .await
        .context("Failed to remove the conversation log")?;

    println!("{}", style("Conversation history cleared.").green());
    Ok(())
}
