//! `neo daemon`: serve exchanges until the transport closes.

use neo_agent::AgentRunner;
use neo_channels::{StdinChannel, UnixSocketChannel};
use neo_config::AppConfig;
use neo_core::channel::Channel;
use std::path::PathBuf;

pub async fn run(
    config: &AppConfig,
    socket: Option<PathBuf>,
    debug: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let provider = neo_providers::build_from_config(config)?;
    let runner = AgentRunner::from_config(provider, config).with_debug(debug);

    let channel: Box<dyn Channel> = match socket {
        Some(path) => Box::new(UnixSocketChannel::new(path)),
        None => {
            eprintln!("neo daemon: stdin mode. Type 'exit' or 'quit' or EOF to stop.");
            Box::new(StdinChannel::new())
        }
    };

    tracing::info!(
        channel = channel.name(),
        model = %config.model.name,
        skills = config.skills.entries.len(),
        session_max_turns = runner.session_max_turns(),
        "Daemon starting"
    );

    let inbound = channel.start().await?;
    runner.serve(inbound).await?;
    Ok(())
}
