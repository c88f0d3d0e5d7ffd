mod cli;

use anyhow::Result;
use clap::Parser;

use cli::args::{Cli, Commands};
use sidechat_core::config::{SidechatConfig, api_keys};

#[tokio::main]
async fn main() -> Result<()> {
    api_keys::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    let config = match &args.config {
        Some(path) => SidechatConfig::load_from_file(path)?,
        None => SidechatConfig::load()?,
    };

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => cli::chat::run(config).await,
        Commands::Ask { prompt } => cli::ask::run(config, prompt.join(" ")).await,
        Commands::Key { key } => cli::key::run(config, key).await,
        Commands::Clear => cli::clear::run(config).await,
        Commands::Trigger { action, text } => {
            cli::trigger::run(config, action.into(), text.join(" ")).await
        }
    }
}
