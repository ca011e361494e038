use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use drillpad_corpus::{load_chunks, CorpusIndex};

mod config;
mod simulate;
mod store;
mod transcript;
mod turn;

use config::ProjectConfig;
use store::StateStore;

#[derive(Parser, Debug)]
#[command(
    name = "drillpad",
    about = "Interview dialogue engine for system design practice",
    version,
    author
)]
struct Cli {
    /// Working directory (default: current directory)
    #[arg(short = 'd', long)]
    working_dir: Option<PathBuf>,

    /// Corpus chunks file, overriding drillpad.toml
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatChoice,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process one interview turn: TurnInput JSON in, TurnOutput JSON out
    Turn {
        /// Session id whose memory the turn advances
        #[arg(short, long)]
        session: String,

        /// Turn input file (default: stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Run a scripted interview and print the dialogue
    Simulate {
        /// Script file: a JSON array of steps (default: built-in demo)
        #[arg(long)]
        script: Option<PathBuf>,

        /// Session label used for the transcript file
        #[arg(short, long, default_value = "practice")]
        session: String,
    },
    /// Discard a session's memory
    Reset {
        #[arg(short, long)]
        session: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

/// Initialize tracing. Logs go to stderr; stdout is reserved for command
/// output.
fn init_tracing(level: &str, format: LogFormatChoice) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormatChoice::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        LogFormatChoice::Pretty | LogFormatChoice::Compact => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .init();
        }
    }
}

fn load_index(corpus_override: Option<&PathBuf>, config: &ProjectConfig) -> Result<CorpusIndex> {
    let path = corpus_override
        .cloned()
        .or_else(|| config.corpus.as_ref().map(PathBuf::from));
    match path {
        Some(path) => {
            let chunks = load_chunks(&path)?;
            tracing::info!(chunks = chunks.len(), path = %path.display(), "Corpus loaded");
            Ok(CorpusIndex::build(chunks))
        }
        // No corpus is fine; the composer falls back to its templates.
        None => Ok(CorpusIndex::build(Vec::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);

    let working_dir = match cli.working_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let config = ProjectConfig::load(&working_dir)?.unwrap_or_default();
    let index = load_index(cli.corpus.as_ref(), &config)?;
    let store = StateStore::new()?;

    match &cli.command {
        Command::Turn { session, input } => {
            turn::run(session, input.as_ref(), &index, &config, &store).await
        }
        Command::Simulate { script, session } => {
            simulate::run(session, script.as_ref(), &index, &config).await
        }
        Command::Reset { session } => {
            store.reset(session)?;
            println!("Session '{session}' reset.");
            Ok(())
        }
    }
}
