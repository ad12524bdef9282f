//! Configuration view and validation commands: `stagesync config`.

use anyhow::Result;
use stagesync::config::{StagesyncConfig, StagesyncToml};

use super::super::ConfigCommands;

pub fn cmd_config(config: &StagesyncConfig, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = config.config_file();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Stagesync Configuration");
            println!("=======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
                println!();
                print_toml(&StagesyncToml::load(&config_path)?);
            } else {
                println!("No stagesync.toml found at {}", config_path.display());
                println!();
                println!("Using default configuration:");
                print_toml(&StagesyncToml::default());
                println!("Run 'stagesync init' to create a stagesync.toml file.");
                println!();
            }

            println!("Effective values (with env/CLI overrides):");
            println!("  interval_secs = {}", config.sync_interval().as_secs());
            println!(
                "  title_max_chars = {}",
                config.reconcile_options().title_max_chars
            );
            println!("  sessions_file = \"{}\"", config.sessions_file().display());
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let warnings = config.validate();
            if warnings.is_empty() {
                if config_path.exists() {
                    println!("Configuration is valid.");
                } else {
                    println!("No stagesync.toml found. Using defaults (valid).");
                }
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", console::style(warning).yellow());
                }
            }
            println!();
        }
    }

    Ok(())
}

fn print_toml(toml: &StagesyncToml) {
    println!("[sync]");
    println!("  interval_secs = {}", toml.sync.interval_secs);
    println!("  title_max_chars = {}", toml.sync.title_max_chars);
    println!();
    println!("[storage]");
    println!(
        "  sessions_file = \"{}\"",
        toml.storage.sessions_file.display()
    );
    println!();
}
