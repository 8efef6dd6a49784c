//! # Rulesheet CLI (`rulesheet`)
//!
//! ## Usage
//!
//! ```bash
//! rulesheet --config ./config/rulesheet.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rulesheet init` | Create the SQLite database and run schema migrations |
//! | `rulesheet serve` | Start the web app |
//! | `rulesheet list` | List summaries, newest first |
//! | `rulesheet get <id>` | Print one summary |
//! | `rulesheet summarize <pdf>...` | Summarize rulebook PDFs |
//! | `rulesheet duplicates` | Look up existing summaries by filename or link |
//! | `rulesheet delete <id>` | Delete a summary |
//!
//! ## Examples
//!
//! ```bash
//! rulesheet init
//! OPENAI_API_KEY=sk-... rulesheet summarize ./Catan.pdf --bgg-link https://boardgamegeek.com/boardgame/13/catan
//! rulesheet get 3f2a... --raw > catan.md
//! rulesheet serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use rulesheet::{config, get, migrate, server, summarize};

/// Rulesheet: board game rulebook summaries.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/rulesheet.example.toml`. When the file is missing,
/// defaults and environment overrides are used.
#[derive(Parser)]
#[command(
    name = "rulesheet",
    about = "Turn board game rulebook PDFs into concise, searchable rules summaries",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/rulesheet.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Start the web app on `[server].bind`.
    ///
    /// Requires `OPENAI_API_KEY`.
    Serve,

    /// List summaries, newest first.
    List {
        /// Only show summaries whose title contains this text.
        #[arg(long)]
        query: Option<String>,
    },

    /// Print a summary by id.
    Get {
        id: String,

        /// Print only the markdown.
        #[arg(long)]
        raw: bool,
    },

    /// Summarize one or more rulebook PDFs into a new summary.
    ///
    /// Existing summaries built from the same filenames, or carrying the same
    /// BoardGameGeek link, are reported before the new one is created.
    Summarize {
        /// PDF files, in the order they should be presented to the model.
        #[arg(required = true)]
        pdfs: Vec<PathBuf>,

        /// BoardGameGeek page for the game.
        #[arg(long)]
        bgg_link: Option<String>,
    },

    /// Look up existing summaries by source filename or BGG link.
    Duplicates {
        #[arg(long)]
        filename: Option<String>,

        #[arg(long)]
        link: Option<String>,
    },

    /// Delete a summary by id.
    Delete { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rulesheet=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config_or_minimal(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::List { query } => {
            get::run_list(&cfg, query.as_deref()).await?;
        }
        Commands::Get { id, raw } => {
            get::run_get(&cfg, &id, raw).await?;
        }
        Commands::Summarize { pdfs, bgg_link } => {
            summarize::run_summarize(&cfg, &pdfs, bgg_link).await?;
        }
        Commands::Duplicates { filename, link } => {
            summarize::run_duplicates(&cfg, filename.as_deref(), link.as_deref()).await?;
        }
        Commands::Delete { id } => {
            get::run_delete(&cfg, &id).await?;
        }
    }

    Ok(())
}
