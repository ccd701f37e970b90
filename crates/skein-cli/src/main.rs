mod cmd_config;
mod cmd_fold;
mod cmd_steps;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "skein",
    version,
    about = "Fold agent chunk streams into conversation transcripts"
)]
struct Cli {
    /// Fold config file (defaults to ./skein.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fold a chunk file (JSON array or JSON Lines) into a transcript
    Fold {
        /// Chunk file
        file: PathBuf,
        /// Pretty-print the transcript
        #[arg(long)]
        pretty: bool,
        /// Fold incrementally against this session's snapshot
        #[arg(long)]
        session: Option<String>,
        /// Directory for session snapshots (default: per-user state dir)
        #[arg(long)]
        state_dir: Option<PathBuf>,
    },
    /// Show the steps of the last turn's plan
    Steps {
        /// Chunk file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective fold configuration
    Config,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;
    let config = cmd_config::resolve(cli.config.as_deref(), &cwd)?;

    match cli.cmd {
        Command::Fold {
            file,
            pretty,
            session,
            state_dir,
        } => cmd_fold::execute(
            &file,
            &config,
            pretty,
            session.as_deref(),
            state_dir.as_deref(),
        ),
        Command::Steps { file, json } => cmd_steps::execute(&file, &config, json),
        Command::Config => cmd_config::show(&config),
    }
}
