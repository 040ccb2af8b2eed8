//! Binary entry point for snapvault.
//!
//! This binary provides the CLI interface for snapshot export and restore.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use commands::{ExportArgs, cmd_analyze, cmd_collections, cmd_config, cmd_export, cmd_restore};
use snapvault::SnapvaultConfig;
use snapvault::observability::{self, InitOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Snapvault - snapshot export and restore for document collections.
#[derive(Parser)]
#[command(name = "snapvault")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// List exportable collections.
    Collections,

    /// Export collections to a snapshot file.
    Export(ExportArgs),

    /// Show the per-collection record counts of a snapshot file.
    Analyze {
        /// Snapshot file.
        file: PathBuf,
    },

    /// Restore a snapshot file into the database.
    Restore {
        /// Snapshot file.
        file: PathBuf,

        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Manage configuration.
    Config {
        /// Show current configuration.
        #[arg(long)]
        show: bool,
    },
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let _observability = match observability::init_from_config(
        &config.observability,
        InitOptions {
            verbose: cli.verbose,
        },
    ) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize observability: {e}");
            return ExitCode::FAILURE;
        },
    };

    match run_command(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(command: Commands, config: &SnapvaultConfig) -> commands::CommandResult {
    match command {
        Commands::Collections => cmd_collections(config),
        Commands::Export(args) => cmd_export(config, args).await,
        Commands::Analyze { file } => cmd_analyze(config, file),
        Commands::Restore { file, yes } => cmd_restore(config, file, yes).await,
        Commands::Config { show } => cmd_config(config, show),
    }
}

/// Loads configuration and applies environment overrides.
fn load_config(path: Option<&str>) -> snapvault::Result<SnapvaultConfig> {
    let config = match path {
        Some(config_path) => SnapvaultConfig::load_from_file(Path::new(config_path))?,
        None => SnapvaultConfig::load_default()?,
    };
    config.apply_env_overrides()
}
