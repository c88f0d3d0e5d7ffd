//! Store the chat API credential

use anyhow::{Context, Result};
use console::style;
use serde_json::Value;

use sidechat_core::config::SidechatConfig;
use sidechat_core::config::constants::storage_keys;
use sidechat_core::storage::{JsonFileStore, KeyValueStore};

pub async fn run(config: SidechatConfig, key: String) -> Result<()> {
    let key = key.trim().to_string();
    if key.is_empty() {
        anyhow::bail!("The key must not be empty");
    }

    let store_path = config.store_path();
    let store = JsonFileStore::open(&store_path)
        .await
        .with_context(|| format!("Failed to open store at {}", store_path.display()))?;
    store
        .set(storage_keys::API_KEY, Value::String(key))
        .await
        .context("Failed to save the API key")?;

    println!("{}", style("API key saved.").green());
    Ok(())
}
