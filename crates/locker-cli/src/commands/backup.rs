//! Backup and restore command handlers

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use locker_core::storage::persistence::read_backup;
use locker_core::{Store, StoreError};

use crate::editor::confirm;
use crate::output::{Output, OutputFormat};

/// Write a backup of the whole store
///
/// Without a path the backup goes to the configured backup directory under a
/// timestamped name.
pub async fn backup(store: &Store, path: Option<PathBuf>, output: &Output) -> Result<()> {
    let written = match path {
        Some(path) => store
            .backup_to_file(&path)
            .await
            .map(|_| path)
            .map_err(with_suggestion)?,
        None => store
            .backup_to_default_dir()
            .await
            .map_err(with_suggestion)?,
    };
    let stats = store.stats().await?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "path": written,
                    "bookmarks": stats.bookmarks,
                    "collections": stats.collections,
                    "tags": stats.tags,
                })
            );
        }
        OutputFormat::Quiet => println!("{}", written.display()),
        OutputFormat::Human => output.success(&format!(
            "Backed up {} bookmark(s) and {} collection(s) to {}",
            stats.bookmarks,
            stats.collections,
            written.display()
        )),
    }

    Ok(())
}

/// List backups in the backup directory, newest first
pub fn list(store: &Store, output: &Output) -> Result<()> {
    let backups = store.list_backups().map_err(with_suggestion)?;

    match output.format {
        OutputFormat::Json => println!("{}", serde_json::json!(backups)),
        OutputFormat::Quiet => {
            for path in &backups {
                println!("{}", path.display());
            }
        }
        OutputFormat::Human => {
            if backups.is_empty() {
                println!("No backups in {}", store.config().backup_dir().display());
                return Ok(());
            }
            for path in &backups {
                println!("{}", path.display());
            }
            println!("\n{} backup(s)", backups.len());
        }
    }

    Ok(())
}

/// Replace everything in the store with the contents of a backup file
///
/// The file is read and parsed before anything is asked or changed, so a
/// broken backup never touches the store.
pub async fn restore(store: &Store, path: &Path, yes: bool, output: &Output) -> Result<()> {
    let snapshot = read_backup(path).map_err(with_suggestion)?;

    if !yes && output.should_prompt() {
        let current = store.stats().await?;
        println!("Backup {} contains:", path.display());
        println!("  Bookmarks:   {}", snapshot.bookmarks.len());
        println!("  Collections: {}", snapshot.collections.len());
        println!();
        println!(
            "This replaces the {} bookmark(s) and {} collection(s) currently stored.",
            current.bookmarks, current.collections
        );
        if !confirm("Restore?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let summary = store
        .restore(snapshot)
        .await
        .map_err(with_suggestion)
        .context("Restore failed, nothing was changed")?;

    output.print_restore_summary(path, &summary);
    Ok(())
}

fn with_suggestion(error: StoreError) -> anyhow::Error {
    match error.recovery_suggestion() {
        Some(hint) => anyhow::Error::new(error).context(hint),
        None => error.into(),
    }
}
