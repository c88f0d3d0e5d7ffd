//! Single-prompt command: one reply, nothing persisted

use anyhow::Result;
use std::sync::Arc;

use sidechat_core::config::SidechatConfig;
use sidechat_core::session::ConversationSession;
use sidechat_core::storage::MemoryStore;

use super::render::ConsoleObserver;

pub async fn run(config: SidechatConfig, prompt: String) -> Result<()> {
    if prompt.trim().is_empty() {
        anyhow::bail!("No prompt provided. Use: sidechat ask \"Your question here\"");
    }

    // An ephemeral store: the credential still resolves from the
    // environment or the config file
    let session = ConversationSession::new(
        config,
        Arc::new(MemoryStore::new()),
        Arc::new(ConsoleObserver::new()),
    );

    session.submit(&prompt).await?;
    Ok(())
}
