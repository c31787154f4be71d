//! Colloquy CLI — the main entry point.
//!
//! Commands:
//! - `run`   — Drive a team conversation on a task or learning script
//! - `check` — Verify the configured backend is reachable

use clap::{Args, Parser, Subcommand};
use colloquy_core::error::ProviderError;
use colloquy_providers::OpenAiCompatProvider;
use std::path::PathBuf;

mod commands;
mod console;
mod roster;
mod script;

#[derive(Parser)]
#[command(
    name = "colloquy",
    about = "Multi-agent conversation teams over OpenAI-compatible backends",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the teaching team on a task or learning script
    Run(RunArgs),

    /// Verify the configured backend is reachable
    Check(BackendArgs),
}

/// Backend selection, shared across commands.
#[derive(Args)]
struct BackendArgs {
    /// Model name
    #[arg(long, env = "COLLOQUY_MODEL", default_value = "qwen3:30b")]
    model: String,

    /// Base URL of an OpenAI-compatible API (defaults to local Ollama)
    #[arg(long, env = "COLLOQUY_BASE_URL")]
    base_url: Option<String>,

    /// API key for hosted backends; omit for Ollama
    #[arg(long, env = "COLLOQUY_API_KEY")]
    api_key: Option<String>,
}

impl BackendArgs {
    fn provider(&self) -> Result<OpenAiCompatProvider, ProviderError> {
        match (&self.base_url, &self.api_key) {
            (Some(url), Some(key)) => OpenAiCompatProvider::new("openai-compat", url, key),
            (None, Some(key)) => OpenAiCompatProvider::openai(key),
            (url, None) => OpenAiCompatProvider::ollama(url.as_deref()),
        }
    }
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    backend: BackendArgs,

    /// Single task for the team
    #[arg(long, conflicts_with = "script")]
    task: Option<String>,

    /// Markdown learning script; each "## " section becomes one task
    #[arg(long)]
    script: Option<PathBuf>,

    /// Directory the file tools are confined to
    #[arg(long, default_value = "workspace")]
    workspace: PathBuf,

    /// Turn budget per task
    #[arg(long, default_value_t = colloquy_team::DEFAULT_MAX_TURNS)]
    max_turns: u32,

    /// How the next speaker is chosen each turn
    #[arg(long, value_enum, default_value = "fixed")]
    selector: SelectorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum SelectorKind {
    /// Cycle through the roster in declaration order
    Fixed,
    /// Ask a selector model to pick from the roster each turn
    Model,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let completed = match cli.command {
        Commands::Run(args) => commands::run::run(args).await?,
        Commands::Check(args) => commands::check::run(args).await?,
    };

    if !completed {
        std::process::exit(2);
    }
    Ok(())
}
