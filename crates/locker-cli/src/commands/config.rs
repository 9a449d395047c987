//! Config command handlers

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use locker_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: &Path, output: &Output) -> Result<()> {
    let config = Config::load_from_path(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "backup_dir": config.backup_dir(),
                    "log_file": config.log_file,
                    "database": config.sqlite_path(),
                    "config_file": config_path,
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:   {}", config.data_dir.display());
            println!(
                "  backup_dir: {}{}",
                config.backup_dir().display(),
                if config.backup_dir.is_none() {
                    " (default)"
                } else {
                    ""
                }
            );
            println!("  log_file:   {}", display_optional(config.log_file.as_ref()));
            println!();
            println!("Config file: {}", config_path.display());
        }
    }

    Ok(())
}

/// Print the config file path
pub fn path(config_path: &Path, output: &Output) -> Result<()> {
    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "path": config_path,
                    "exists": config_path.exists(),
                })
            );
        }
        _ => println!("{}", config_path.display()),
    }
    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, config_path: &Path, output: &Output) -> Result<()> {
    let mut config = Config::load_from_path(config_path).context("Failed to load configuration")?;

    match key.as_str() {
        "data_dir" => {
            if value.is_empty() {
                bail!("data_dir cannot be empty");
            }
            config.data_dir = value.clone().into();
        }
        "backup_dir" => {
            config.backup_dir = optional_path(&value);
        }
        "log_file" => {
            config.log_file = optional_path(&value);
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, backup_dir, log_file",
                key
            );
        }
    }

    config
        .save_to_path(config_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn optional_path(value: &str) -> Option<PathBuf> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

fn display_optional(path: Option<&PathBuf>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not set)".to_string())
}
