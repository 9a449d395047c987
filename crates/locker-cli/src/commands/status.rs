//! Status command handler

use std::path::Path;

use anyhow::Result;

use locker_core::Store;

use crate::output::{Output, OutputFormat};

/// Show store location, size and record counts
pub async fn show(store: &Store, config_path: &Path, output: &Output) -> Result<()> {
    let stats = store.stats().await?;
    let config = store.config();
    let database = config.sqlite_path();
    let database_size = std::fs::metadata(&database).map(|m| m.len()).unwrap_or(0);
    let latest_backup = store.list_backups()?.into_iter().next();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "config_file": config_path,
                    "database": database,
                    "database_size": database_size,
                    "backup_dir": config.backup_dir(),
                    "latest_backup": latest_backup,
                    "counts": stats,
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{} {} {}", stats.bookmarks, stats.collections, stats.tags);
        }
        OutputFormat::Human => {
            println!("Bookmark Locker Status");
            println!("======================");
            println!();
            println!("Storage:");
            println!("  Database: {}", database.display());
            println!("  Size:     {}", human_size(database_size));
            println!("  Config:   {}", config_path.display());
            println!();
            println!("Backups:");
            println!("  Directory: {}", config.backup_dir().display());
            match latest_backup {
                Some(path) => println!("  Latest:    {}", path.display()),
                None => println!("  Latest:    (none)"),
            }
            println!();
            println!("Contents:");
            println!("  Bookmarks:   {}", stats.bookmarks);
            println!("  Collections: {}", stats.collections);
            println!("  Tags:        {}", stats.tags);
        }
    }

    Ok(())
}

fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
