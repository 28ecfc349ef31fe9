//! Mnemo CLI
//!
//! Command-line flashcard reviews backed by the FSRS-5 scheduler.

mod commands;
mod config;

use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use mnemo_core::Storage;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

/// Mnemo - spaced-repetition flashcards
#[derive(Parser)]
#[command(name = "mnemo")]
#[command(author = "Mnemo Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Review flashcards on an FSRS-5 schedule")]
#[command(long_about = "Mnemo schedules flashcard reviews with the FSRS-5 memory model.\n\n\
Each answer is rated Again (1), Hard (2), Good (3) or Easy (4); \
the rating decides when the card comes back.")]
struct Cli {
    /// Directory holding mnemo.db (default: platform data dir, or MNEMO_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Scheduler parameter JSON file (or MNEMO_PARAMS)
    #[arg(long, global = true)]
    params: Option<PathBuf>,

    /// Learner whose deck to use
    #[arg(long, global = true, default_value = "default")]
    user: String,

    /// Pretend the current time is this RFC 3339 timestamp
    #[arg(long, global = true)]
    at: Option<DateTime<Utc>>,

    /// Print JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Author a new card
    Add {
        /// Prompt side
        front: String,
        /// Answer side
        back: String,
    },

    /// List cards to study now
    Due {
        /// Most never-reviewed cards to include
        #[arg(long, default_value = "20")]
        new_quota: usize,
        /// Most cards to list
        #[arg(long, default_value = "100")]
        limit: usize,
    },

    /// Show when each rating would bring a card back
    Preview {
        /// Card ID
        id: String,
    },

    /// Record a rating for a card
    Review {
        /// Card ID
        id: String,
        /// 1-4 or again/hard/good/easy
        rating: String,
        /// Time taken to answer, in milliseconds
        #[arg(long)]
        duration_ms: Option<i64>,
    },

    /// Show deck statistics
    Stats,

    /// Show a card's review history
    History {
        /// Card ID
        id: String,
    },

    /// Soft-delete a card
    Delete {
        /// Card ID
        id: String,
    },

    /// Reset a card to new
    Reset {
        /// Card ID
        id: String,
    },

    /// Print the effective scheduler parameters
    Params,
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_env("MNEMO_LOG")
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

    // Logs go to stderr; stdout carries command output
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let settings = Settings::from_sources(cli.data_dir, cli.params, |key| std::env::var(key).ok())?;
    if let Commands::Params = cli.command {
        return commands::run_params(&settings);
    }

    let storage = Storage::with_parameters(settings.db_path.clone(), settings.params.clone())?;
    let now = cli.at.unwrap_or_else(Utc::now);
    if cli.at.is_some() {
        tracing::debug!(%now, "Using pinned review time");
    }
    let user = cli.user.as_str();
    let json = cli.json;

    match cli.command {
        Commands::Add { front, back } => commands::run_add(&storage, user, front, back, now, json),
        Commands::Due { new_quota, limit } => {
            commands::run_due(&storage, user, now, new_quota, limit, json)
        }
        Commands::Preview { id } => commands::run_preview(&storage, &id, now, json),
        Commands::Review {
            id,
            rating,
            duration_ms,
        } => commands::run_review(&storage, &id, &rating, now, duration_ms, json),
        Commands::Stats => commands::run_stats(&storage, user, now, json),
        Commands::History { id } => commands::run_history(&storage, &id, json),
        Commands::Delete { id } => commands::run_delete(&storage, &id, now),
        Commands::Reset { id } => commands::run_reset(&storage, &id, now),
        Commands::Params => commands::run_params(&settings),
    }
}
