//! # tender-rag CLI (`trag`)
//!
//! Command-line front end for the retrieval core: load documents, keep
//! their chunks indexed, search, ask questions, and serve the HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! trag --config ./config/trag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `trag init` | Create the SQLite database and schema |
//! | `trag add <paths…>` | Load text files as documents and index them |
//! | `trag index <id>` | Reindex one document |
//! | `trag reindex` | Reindex every document |
//! | `trag search "<query>"` | Ranked chunks with score breakdown |
//! | `trag query "<question>"` | Cited answer |
//! | `trag delete <id>` | Delete a document and its chunks |
//! | `trag stats` | Corpus totals |
//! | `trag serve` | Start the HTTP API |
//!
//! Logs go to stderr; set `RUST_LOG` (e.g. `RUST_LOG=tender_rag=debug`) to
//! change verbosity.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tender_rag::{commands, config, ingest, migrate, server, stats};

/// tender-rag: chunking, embeddings, hybrid search, and cited answers over
/// a document store.
#[derive(Parser)]
#[command(
    name = "trag",
    about = "tender-rag: retrieval-augmented search over your documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/trag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Load files (or directories, recursively) as documents and index them.
    ///
    /// Files already loaded under the same path are refreshed and
    /// reindexed. Non-UTF-8 files are skipped.
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Reindex a single document.
    Index { id: i64 },

    /// Reindex every document. Per-document failures are counted, not fatal.
    Reindex,

    /// Search indexed chunks.
    Search {
        query: String,

        /// Maximum number of results (1–50). Defaults to `retrieval.default_limit`.
        #[arg(long)]
        limit: Option<usize>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Answer a question from the indexed documents, with citations.
    Query {
        query: String,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Delete a document and all of its chunks.
    Delete { id: i64 },

    /// Show document and chunk totals.
    Stats,

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Add { paths } => {
            ingest::run_add(&cfg, &paths).await?;
        }
        Commands::Index { id } => {
            commands::run_index(&cfg, id).await?;
        }
        Commands::Reindex => {
            commands::run_reindex(&cfg).await?;
        }
        Commands::Search { query, limit, json } => {
            commands::run_search(&cfg, &query, limit, json).await?;
        }
        Commands::Query { query, limit, json } => {
            commands::run_query(&cfg, &query, limit, json).await?;
        }
        Commands::Delete { id } => {
            commands::run_delete(&cfg, id).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
