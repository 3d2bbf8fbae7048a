use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod config;

use commands::{admin, ask};
use config::CliConfig;

#[derive(Parser)]
#[command(name = "graphrag-cli")]
#[command(about = "Command-line interface for the GraphRAG query pipeline")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file path (TOML). Defaults to the bundled fixture
    /// store in read-only mode when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question through the pipeline.
    Ask {
        /// The natural-language question.
        question: String,
    },
    /// Administrative operations, gated behind `mode = "admin"`.
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Refresh the schema allow-list and vector index from the graph store.
    RefreshSchema,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Ask { question } => ask::run(&question, &config).await,
        Commands::Admin { command } => match command {
            AdminCommands::RefreshSchema => admin::refresh_schema(&config).await,
        },
    }
}
