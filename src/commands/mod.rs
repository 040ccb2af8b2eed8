//! Command handlers module.
//!
//! - `io.rs`: Snapshot commands (collections, export, analyze, restore)
//! - `config.rs`: Configuration display command

mod config;
mod io;

use std::path::PathBuf;
use std::sync::Arc;

use snapvault::SnapvaultConfig;
use snapvault::io::{CancelFlag, SnapshotEngine};
use snapvault::storage::SqliteDocumentStore;

// Re-export command functions
pub use config::cmd_config;
pub use io::{cmd_analyze, cmd_collections, cmd_export, cmd_restore};

/// Result type shared by command handlers.
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Export selection flags.
#[derive(Debug, clap::Args)]
pub struct ExportArgs {
    /// Collections to export (comma-separated).
    #[arg(long, value_delimiter = ',', required_unless_present = "all")]
    pub collections: Vec<String>,

    /// Export every exportable collection.
    #[arg(long, conflicts_with = "collections")]
    pub all: bool,

    /// Directory to write the snapshot into (overrides config).
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

/// Opens the configured store and builds an engine over it.
pub fn open_engine(
    config: &SnapvaultConfig,
    cancel: Option<CancelFlag>,
) -> Result<SnapshotEngine<SqliteDocumentStore>, Box<dyn std::error::Error>> {
    let store = Arc::new(SqliteDocumentStore::open(&config.database_path)?);
    let engine = SnapshotEngine::new(store, config.registry()?, config.max_batch_size)?
        .with_max_snapshot_bytes(config.max_snapshot_bytes);
    Ok(match cancel {
        Some(flag) => engine.with_cancel_flag(flag),
        None => engine,
    })
}
