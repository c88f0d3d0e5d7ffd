//! Interactive chat command

use anyhow::{Context, Result};
use console::style;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use sidechat_core::config::SidechatConfig;
use sidechat_core::session::{ConversationSession, SessionError, trigger};
use sidechat_core::storage::JsonFileStore;

use super::render::ConsoleObserver;

pub async fn run(config: SidechatConfig) -> Result<()> {
    let store_path = config.store_path();
    let store = Arc::new(
        JsonFileStore::open(&store_path)
            .await
            .with_context(|| format!("Failed to open store at {}", store_path.display()))?,
    );

    let session = Arc::new(ConversationSession::new(
        config,
        store,
        Arc::new(ConsoleObserver::new()),
    ));

    println!(
        "{} {}",
        style("sidechat").green().bold(),
        style("type a message, 'clear' to reset, 'exit' to quit").dim()
    );

    session.load_history().await;
    let _watcher = spawn_trigger_watcher(session.clone());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", style("you>").cyan().bold());
        io::stdout().flush().ok();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        match input {
            "" => continue,
            "exit" | "quit" => break,
            "clear" => {
                session.clear().await;
                println!("{}", style("Conversation cleared.").dim());
                continue;
            }
            _ => {}
        }

        match session.submit(input).await {
            Ok(()) => {}
            Err(SessionError::Busy) => {
                println!("{}", style("Still replying, try again in a moment.").yellow());
            }
            Err(e) => {
                println!("{}", style(format!("Error: {}", e)).red());
            }
        }
    }

    Ok(())
}

/// React to trigger writes from another process observed through the store
/// change feed (the load-time poll already handled anything written while
/// no session was running)
fn spawn_trigger_watcher(session: Arc<ConversationSession>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut changes = session.subscribe_changes();
        loop {
            match changes.recv().await {
                Ok(change) if trigger::is_trigger_write(&change) => {
                    session.consume_pending_trigger().await;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    })
}
