use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use sidechat_core::session::TriggerAction;

#[derive(Parser, Debug)]
#[command(
    name = "sidechat",
    version,
    about = "Streaming chat assistant with a weather skill, persisted across sessions"
)]
pub struct Cli {
    /// Path to a sidechat.toml config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive chat session with streamed replies
    Chat,

    /// Single prompt; prints the reply and exits without persisting
    Ask { prompt: Vec<String> },

    /// Store the API key used for model calls
    Key { key: String },

    /// Clear the persisted conversation log
    Clear,

    /// Write a one-shot trigger for a running chat session to pick up
    Trigger {
        /// What the session should do with the text
        #[arg(long, value_enum, default_value = "explain")]
        action: TriggerActionArg,

        text: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TriggerActionArg {
    Explain,
    Translate,
}

impl From<TriggerActionArg> for TriggerAction {
    fn from(value: TriggerActionArg) -> Self {
        match value {
            TriggerActionArg::Explain => TriggerAction::Explain,
            TriggerActionArg::Translate => TriggerAction::Translate,
        }
    }
}
