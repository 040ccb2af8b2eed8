//! Config command handler.

use snapvault::SnapvaultConfig;

use super::CommandResult;

/// Config command.
pub fn cmd_config(config: &SnapvaultConfig, show: bool) -> CommandResult {
    if !show {
        println!("Use 'snapvault config --show' to display the current configuration");
        return Ok(());
    }

    println!("Current Configuration");
    println!("=====================");
    println!();

    println!("Config File Loaded:");
    match &config.source {
        Some(source) => println!("  - {}", source.display()),
        None => println!("  (none - using defaults)"),
    }
    println!();
    println!("Config File Search Path:");
    for source in SnapvaultConfig::config_sources() {
        println!("  - {}", source.display());
    }
    println!();

    println!("Effective Settings:");
    for line in config.to_toml()?.lines() {
        println!("  {line}");
    }
    Ok(())
}
