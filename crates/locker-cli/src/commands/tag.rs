//! Tag command handlers

use anyhow::{Context, Result};

use locker_core::Store;

use crate::editor::confirm;
use crate::output::Output;

/// Create a tag without tagging anything
pub async fn add(store: &Store, name: String, output: &Output) -> Result<()> {
    store
        .tags()
        .create(&name)
        .await
        .context("Failed to create tag")?;
    output.success(&format!("Created tag: {}", name.trim()));
    Ok(())
}

/// List all tags with usage counts
pub async fn list(store: &Store, output: &Output) -> Result<()> {
    let tags = store.tags().with_counts().await?;
    output.print_tags(&tags);
    Ok(())
}

/// Rename a tag on every bookmark
pub async fn rename(store: &Store, from: String, to: String, output: &Output) -> Result<()> {
    let count = store
        .tags()
        .rename(&from, &to)
        .await
        .context("Failed to rename tag")?;
    output.success(&format!(
        "Renamed tag '{}' to '{}' on {} bookmark(s)",
        from.trim(),
        to.trim(),
        count
    ));
    Ok(())
}

/// Remove a tag from every bookmark and delete it
pub async fn delete(store: &Store, name: String, output: &Output) -> Result<()> {
    if output.should_prompt() {
        println!("Delete tag '{}' from every bookmark", name.trim());
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let count = store
        .tags()
        .delete(&name)
        .await
        .context("Failed to delete tag")?;
    output.success(&format!(
        "Deleted tag '{}' from {} bookmark(s)",
        name.trim(),
        count
    ));
    Ok(())
}
