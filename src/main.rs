//! Ponder - streaming chat with reasoning models
//!
//! Interactive REPL by default; `--prompt` answers once and exits.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ponder::cli;
use ponder::config::{AppConfig, ConfigOverrides, Settings};

/// Ponder - chat with models that think out loud
#[derive(Parser, Debug)]
#[command(name = "ponder")]
#[command(version, about, long_about = None)]
struct Args {
    /// Execute a single prompt and exit
    #[arg(short, long)]
    prompt: Option<String>,

    /// Resume a saved session by id
    #[arg(short, long)]
    session: Option<String>,

    /// Label stored with every turn of this run
    #[arg(long)]
    chat_id: Option<String>,

    /// List saved sessions and exit
    #[arg(long)]
    list_sessions: bool,

    /// Model to use
    #[arg(short, long, env = "PONDER_MODEL")]
    model: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint
    #[arg(long, env = "PONDER_API_BASE")]
    api_base: Option<String>,

    /// API key for the endpoint
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// History database file
    #[arg(long, env = "PONDER_DATABASE")]
    database: Option<PathBuf>,

    /// Show the model's thinking instead of collapsing it
    #[arg(long)]
    show_thinking: bool,

    /// Enable debug logging (equivalent to RUST_LOG=debug)
    #[arg(short = 'd', long)]
    debug: bool,

    /// Enable verbose logging (equivalent to RUST_LOG=trace)
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Determine log level from args or env
    let default_filter = if args.verbose {
        "trace"
    } else if args.debug {
        "debug"
    } else {
        "warn" // Quiet by default for normal use
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if args.debug || args.verbose {
        tracing::info!("Debug logging enabled");
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(args))
}

async fn run(args: Args) -> anyhow::Result<()> {
    let db = cli::open_database(args.database.clone());

    if args.list_sessions {
        return cli::list_sessions(db.as_ref());
    }

    let settings = db.as_ref().map(Settings::new);
    let overrides = ConfigOverrides {
        api_key: args.api_key,
        api_base: args.api_base,
        model: args.model,
        chat_id: args.chat_id,
        show_thinking: args.show_thinking,
    };
    let config = AppConfig::resolve(overrides, settings.as_ref());
    tracing::debug!(model = %config.model, api_base = %config.api_base, "Configuration resolved");

    match args.prompt {
        Some(prompt) => {
            cli::run_single_prompt(db.as_ref(), config, args.session.as_deref(), &prompt).await
        }
        None => cli::run_interactive(db.as_ref(), config, args.session.as_deref()).await,
    }
}
