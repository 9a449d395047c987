//! Collection command handlers

use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};

use locker_core::{Collection, Store};

use crate::output::Output;

/// Create a collection
pub async fn add(
    store: &Store,
    name: String,
    color: Option<String>,
    output: &Output,
) -> Result<()> {
    let mut collection = Collection::new(name);
    if let Some(color) = color {
        collection = collection.with_color(color);
    }

    let id = store
        .collections()
        .insert(&collection)
        .await
        .context("Failed to create collection")?;

    output.success(&format!("Created collection: {}", id));
    Ok(())
}

/// List collections with the number of bookmarks in each
pub async fn list(store: &Store, output: &Output) -> Result<()> {
    let collections = store.collections().all().await?;

    let mut counts: HashMap<i64, usize> = HashMap::new();
    for bookmark in store.bookmarks().all().await? {
        if let Some(id) = bookmark.collection_id {
            *counts.entry(id).or_default() += 1;
        }
    }

    let rows: Vec<(Collection, usize)> = collections
        .into_iter()
        .map(|c| {
            let count = counts.get(&c.id).copied().unwrap_or(0);
            (c, count)
        })
        .collect();

    output.print_collections(&rows);
    Ok(())
}

/// Rename or recolor a collection
pub async fn edit(
    store: &Store,
    id: i64,
    name: Option<String>,
    color: Option<String>,
    output: &Output,
) -> Result<()> {
    if name.is_none() && color.is_none() {
        bail!("Nothing to change. Pass --name and/or --color.");
    }

    let mut collection = store
        .collections()
        .get(id)
        .await?
        .ok_or_else(|| anyhow!("Collection not found: {}", id))?;

    if let Some(name) = name {
        collection.name = name;
    }
    if let Some(color) = color {
        collection.color = color;
    }

    store
        .collections()
        .update(&collection)
        .await
        .context("Failed to update collection")?;

    output.success(&format!("Collection updated: {}", id));
    Ok(())
}
