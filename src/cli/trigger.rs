//! Write a one-shot trigger, playing the out-of-process role the
//! extension's background script had

use anyhow::{Context, Result};
use console::style;

use sidechat_core::config::SidechatConfig;
use sidechat_core::session::trigger::{PendingTrigger, write_trigger};
use sidechat_core::session::TriggerAction;
use sidechat_core::storage::JsonFileStore;

pub async fn run(config: SidechatConfig, action: TriggerAction, text: String) -> Result<()> {
    let text = text.trim().to_string();
    if text.is_empty() {
        anyhow::bail!("No text provided. Use: sidechat trigger \"selected text\"");
    }

    let store_path = config.store_path();
    let store = JsonFileStore::open(&store_path)
        .await
        .with_context(|| format!("Failed to open store at {}", store_path.display()))?;
    write_trigger(&store, &PendingTrigger { text, action })
        .await
        .context("Failed to write the trigger")?;

    println!(
        "{}",
        style("Trigger written; a running chat session will pick it up, or the next one on start.")
            .green()
    );
    Ok(())
}
