//! Snapshot command handlers.

use std::collections::BTreeSet;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use snapvault::SnapvaultConfig;
use snapvault::io::{CancelFlag, ProgressReporter, RestoreAnalyzer, RestorePlan};
use snapvault::transfer::{FilesystemTransfer, TransferSurface};

use super::{CommandResult, ExportArgs, open_engine};

/// Console progress line on stderr.
struct ConsoleProgress;

impl ProgressReporter for ConsoleProgress {
    fn report(&self, percent: u8, message: &str) {
        eprint!("\r\x1b[2K[{percent:>3}%] {message}");
        if percent == 100 {
            eprintln!();
        }
        let _ = std::io::stderr().flush();
    }
}

/// Lists exportable collections.
pub fn cmd_collections(config: &SnapvaultConfig) -> CommandResult {
    let registry = config.registry()?;
    println!("Exportable collections:");
    for entry in registry.list_exportable() {
        match entry.child.as_deref() {
            Some(child) => println!("  {:<16} {} (with {child})", entry.name, entry.label),
            None => println!("  {:<16} {}", entry.name, entry.label),
        }
    }
    Ok(())
}

/// Exports the selected collections to a snapshot file.
pub async fn cmd_export(config: &SnapvaultConfig, args: ExportArgs) -> CommandResult {
    let engine = open_engine(config, None)?;
    let selection: BTreeSet<String> = if args.all {
        engine
            .list_exportable()
            .iter()
            .map(|entry| entry.name.clone())
            .collect()
    } else {
        args.collections.into_iter().collect()
    };

    let output_dir = args.output_dir.unwrap_or_else(|| config.output_dir.clone());
    let transfer = FilesystemTransfer::new(output_dir);
    let (exported, location) = engine
        .export_to(&transfer, &selection, &ConsoleProgress)
        .await?;

    println!("Export completed: {location}");
    print_counts(exported.manifest.iter());
    println!("  Size: {} bytes", exported.bytes.len());
    Ok(())
}

/// Shows what a snapshot file would restore.
pub fn cmd_analyze(config: &SnapvaultConfig, file: PathBuf) -> CommandResult {
    let plan = analyze(config, &file)?;
    print_plan(&file, &plan);
    Ok(())
}

/// Restores a snapshot file after confirmation.
pub async fn cmd_restore(config: &SnapvaultConfig, file: PathBuf, yes: bool) -> CommandResult {
    let plan = analyze(config, &file)?;
    print_plan(&file, &plan);

    if plan.manifest().is_empty() {
        println!("Nothing to restore.");
        return Ok(());
    }
    if !yes
        && !confirm(
            "Existing documents with the same ids will be overwritten. Type 'yes' to continue: ",
        )?
    {
        println!("Restore cancelled.");
        return Ok(());
    }

    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nCancelling after the current batch...");
        handler_flag.cancel();
    })?;

    let engine = open_engine(config, Some(cancel))?;
    let summary = engine.restore(plan, &ConsoleProgress).await?;

    println!("Restore completed:");
    println!("  Operations committed: {}", summary.operations_committed);
    println!("  Batches:              {}", summary.batches);
    println!("  Skipped records:      {}", summary.skipped_records);
    print_counts(summary.per_collection.iter().map(|(k, v)| (k.as_str(), *v)));

    if !summary.warnings.is_empty() {
        println!();
        println!("Warnings ({}):", summary.warnings.len());
        for warning in summary.warnings.iter().take(10) {
            println!("  - {}: {}", warning.collection, warning.message);
        }
        if summary.warnings.len() > 10 {
            println!("  ... and {} more", summary.warnings.len() - 10);
        }
    }
    Ok(())
}

fn analyze(config: &SnapvaultConfig, file: &Path) -> Result<RestorePlan, Box<dyn std::error::Error>> {
    let transfer =
        FilesystemTransfer::new(&config.output_dir).with_max_bytes(config.max_snapshot_bytes);
    let bytes = transfer.pick_file(&file.to_string_lossy())?;
    Ok(RestoreAnalyzer::new(config.max_snapshot_bytes).plan(&bytes)?)
}

fn print_plan(file: &Path, plan: &RestorePlan) {
    println!("Snapshot: {}", file.display());
    if let Some(at) = plan.snapshot().exported_at() {
        println!("  Exported at: {}", at.to_rfc3339());
    }
    print_counts(plan.manifest().iter());
    println!("  Total: {} records", plan.manifest().total_records());
}

fn print_counts<'a>(counts: impl Iterator<Item = (&'a str, usize)>) {
    for (collection, count) in counts {
        println!("  {collection:<16} {count:>8}");
    }
}

fn confirm(prompt: &str) -> std::io::Result<bool> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}
