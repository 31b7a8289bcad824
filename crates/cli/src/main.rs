//! neo CLI, the main entry point.
//!
//! Modes:
//! - `neo <MESSAGE>...`  single-shot: one exchange, reply on stdout
//! - `neo daemon`        long-running: stdin lines or a Unix socket, with session history

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

#[derive(Parser)]
#[command(
    name = "neo",
    about = "neo: skill-aware chat agent for OpenAI-compatible models",
    version,
    subcommand_negates_reqs = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Message to send; words are joined with single spaces
    #[arg(required = true, num_args = 1..)]
    message: Vec<String>,

    /// Config file
    #[arg(
        short,
        long,
        global = true,
        env = neo_config::CONFIG_ENV,
        default_value = neo_config::DEFAULT_CONFIG_FILE
    )]
    config: PathBuf,

    /// Override the model name
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Print request params, system prompt and user message to stderr
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run as a daemon: read from stdin and reply on stdout, or serve a Unix socket
    Daemon {
        /// Listen on this Unix socket instead of stdin
        #[arg(long)]
        socket: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for replies
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("neo: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = neo_config::AppConfig::load(&cli.config)?;
    if let Some(model) = cli.model {
        config.override_model(model);
    }

    match cli.command {
        Some(Commands::Daemon { socket }) => commands::daemon::run(&config, socket, cli.debug).await,
        None => commands::ask::run(&config, &cli.message.join(" "), cli.debug).await,
    }
}
