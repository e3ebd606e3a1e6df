//! Config command - configuration utilities.

use anyhow::Result;
use std::path::Path;

use crate::cli::ConfigAction;
use crate::config::Config;

/// Run the config command against the config file at `config_path`.
pub fn run(config_path: &Path, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Validate => validate_config(config_path),
        ConfigAction::Show => show_config(config_path),
        ConfigAction::Path => show_path(config_path),
    }
}

fn validate_config(config_path: &Path) -> Result<()> {
    println!();
    println!("Validating configuration...");
    println!("Path: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!("ERROR: Configuration file not found");
        println!();
        println!("Create a configuration file at:");
        println!("  {}", config_path.display());
        println!();
        println!("Or specify a custom path with --config-path");
        return Ok(());
    }

    match Config::load_from(config_path) {
        Ok(config) => {
            println!("Configuration is valid.");
            println!();
            println!("Summary:");
            println!("  Store: {}", config.store.root.display());
            println!("  Plate pattern: {}", config.batch.plate_glob);
            println!("  Default system version: {}", config.engine.default_system_version);
            println!("  Reprocess configs: {}", config.reprocess_configs.len());
            for rc in &config.reprocess_configs {
                println!("    - {} ({}): {}", rc.code, rc.id, rc.name);
            }
            println!("  Limit tables: {}", config.limits.len());
            for key in config.limits.keys() {
                println!("    - {}", key);
            }
        }
        Err(e) => {
            println!("ERROR: Configuration is invalid");
            println!();
            println!("Details: {:#}", e);
            println!();
            println!("Fix the configuration and run 'ddqc config validate' again.");
        }
    }

    println!();
    Ok(())
}

fn show_config(config_path: &Path) -> Result<()> {
    if !config_path.exists() {
        println!("Configuration file not found at: {}", config_path.display());
        return Ok(());
    }

    let content = std::fs::read_to_string(config_path)?;
    println!("{}", content);

    Ok(())
}

fn show_path(config_path: &Path) -> Result<()> {
    println!("{}", config_path.display());
    Ok(())
}
