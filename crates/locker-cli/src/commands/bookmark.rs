//! Bookmark command handlers

use anyhow::{anyhow, bail, Context, Result};

use locker_core::{Bookmark, BookmarkFilter, Collection, Store};

use crate::editor::{confirm, edit_text, parse_tag_list, prompt_optional, prompt_with_default};
use crate::output::Output;

/// Typed at a prompt to clear an optional field
const CLEAR: &str = "-";

/// Fields of a bookmark to create
pub struct NewBookmark {
    pub url: String,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub collection: Option<i64>,
}

/// Field changes given on the command line
#[derive(Debug, Default)]
pub struct BookmarkEdits {
    pub url: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
    /// `Some(None)` moves the bookmark out of its collection
    pub collection: Option<Option<i64>>,
}

impl BookmarkEdits {
    fn is_empty(&self) -> bool {
        self.url.is_none()
            && self.title.is_none()
            && self.notes.is_none()
            && self.tags.is_none()
            && self.collection.is_none()
    }

    fn apply(self, bookmark: &mut Bookmark) {
        if let Some(url) = self.url {
            bookmark.url = url;
        }
        if let Some(title) = self.title {
            bookmark.set_title(Some(title));
        }
        if let Some(notes) = self.notes {
            bookmark.set_notes(Some(notes));
        }
        if let Some(tags) = self.tags {
            bookmark.set_tags(tags);
        }
        if let Some(collection) = self.collection {
            bookmark.set_collection(collection);
        }
    }
}

/// Build the list filter from the `list` flags
pub fn filter_from_flags(
    tag: Option<String>,
    collection: Option<i64>,
    uncategorized: bool,
) -> BookmarkFilter {
    match (tag, collection) {
        (Some(tag), _) => BookmarkFilter::Tag(tag),
        (None, Some(id)) => BookmarkFilter::Collection(Some(id)),
        (None, None) if uncategorized => BookmarkFilter::Collection(None),
        (None, None) => BookmarkFilter::All,
    }
}

/// Save a new bookmark
pub async fn add(store: &Store, new: NewBookmark, output: &Output) -> Result<()> {
    let collection = match new.collection {
        Some(id) => Some(find_collection(store, id).await?),
        None => None,
    };

    let mut bookmark = Bookmark::new(new.url);
    bookmark.set_title(new.title);
    bookmark.set_notes(new.notes);
    for tag in new.tags {
        bookmark.add_tag(tag);
    }
    bookmark.set_collection(new.collection);

    let id = store
        .bookmarks()
        .insert(&bookmark)
        .await
        .context("Failed to save bookmark")?;
    let saved = find_bookmark(store, id).await?;

    output.success(&format!("Saved bookmark: {}", id));
    output.print_bookmark(&saved, collection.as_ref());

    Ok(())
}

/// List bookmarks, hiding tag placeholders unless asked for
pub async fn list(
    store: &Store,
    filter: BookmarkFilter,
    include_placeholders: bool,
    output: &Output,
) -> Result<()> {
    let mut bookmarks = store.bookmarks().query(filter).await?;
    if !include_placeholders {
        bookmarks.retain(|b| !b.is_template());
    }

    output.print_bookmarks(&bookmarks);
    Ok(())
}

/// Show a single bookmark
pub async fn show(store: &Store, id: i64, output: &Output) -> Result<()> {
    let bookmark = find_bookmark(store, id).await?;
    let collection = collection_of(store, &bookmark).await?;

    output.print_bookmark(&bookmark, collection.as_ref());
    Ok(())
}

/// Edit a bookmark from flags, or interactively when none are given
pub async fn edit(store: &Store, id: i64, edits: BookmarkEdits, output: &Output) -> Result<()> {
    let mut bookmark = find_bookmark(store, id).await?;
    let previous_collection = bookmark.collection_id;

    if edits.is_empty() {
        if !output.should_prompt() {
            bail!("Nothing to change. Pass field flags such as --title, or run without --json/--quiet to edit interactively.");
        }
        prompt_edits(&mut bookmark)?;
    } else {
        edits.apply(&mut bookmark);
    }

    // Only a newly chosen collection has to exist
    let collection = match bookmark.collection_id {
        Some(cid) if bookmark.collection_id != previous_collection => {
            Some(find_collection(store, cid).await?)
        }
        _ => collection_of(store, &bookmark).await?,
    };

    store
        .bookmarks()
        .update(&bookmark)
        .await
        .context("Failed to update bookmark")?;
    let saved = find_bookmark(store, id).await?;

    output.success("Bookmark updated");
    output.print_bookmark(&saved, collection.as_ref());

    Ok(())
}

/// Delete a bookmark
pub async fn delete(store: &Store, id: i64, output: &Output) -> Result<()> {
    let bookmark = find_bookmark(store, id).await?;

    // Confirm deletion
    if output.should_prompt() {
        println!(
            "Delete bookmark: {} - {}",
            bookmark.id,
            bookmark.title.as_deref().unwrap_or(&bookmark.url)
        );
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store
        .bookmarks()
        .delete(id)
        .await
        .context("Failed to delete bookmark")?;

    output.success(&format!("Deleted bookmark: {}", id));

    Ok(())
}

/// Open a bookmark in the default browser
pub async fn open(store: &Store, id: i64, output: &Output) -> Result<()> {
    let bookmark = find_bookmark(store, id).await?;
    if bookmark.is_template() {
        bail!("'{}' is a tag placeholder, not a web page", bookmark.url);
    }

    open::that(&bookmark.url).with_context(|| format!("Failed to open {}", bookmark.url))?;

    output.success(&format!("Opened {}", bookmark.url));
    Ok(())
}

async fn find_bookmark(store: &Store, id: i64) -> Result<Bookmark> {
    store
        .bookmarks()
        .get(id)
        .await?
        .ok_or_else(|| anyhow!("Bookmark not found: {}", id))
}

async fn find_collection(store: &Store, id: i64) -> Result<Collection> {
    store
        .collections()
        .get(id)
        .await?
        .ok_or_else(|| anyhow!("Collection not found: {}", id))
}

async fn collection_of(store: &Store, bookmark: &Bookmark) -> Result<Option<Collection>> {
    match bookmark.collection_id {
        Some(id) => Ok(store.collections().get(id).await?),
        None => Ok(None),
    }
}

/// Interactive editing
fn prompt_edits(bookmark: &mut Bookmark) -> Result<()> {
    println!("Editing bookmark: {}", bookmark.id);
    println!(
        "Press Enter to keep current value, type new value, or '{}' to clear.\n",
        CLEAR
    );

    if let Some(url) = prompt_with_default("URL", &bookmark.url)? {
        bookmark.url = url;
    }

    let current_title = bookmark.title.clone().unwrap_or_default();
    if let Some(title) = prompt_with_default("Title", &current_title)? {
        bookmark.set_title(if title == CLEAR { None } else { Some(title) });
    }

    // Tags
    let current_tags = bookmark.tags.join(", ");
    println!(
        "Current tags: {}",
        if current_tags.is_empty() {
            "(none)"
        } else {
            &current_tags
        }
    );
    if let Some(tags) = prompt_optional("New tags (comma-separated)")? {
        bookmark.set_tags(if tags == CLEAR {
            Vec::new()
        } else {
            parse_tag_list(&tags)
        });
    }

    let current_collection = bookmark
        .collection_id
        .map(|id| id.to_string())
        .unwrap_or_default();
    if let Some(collection) = prompt_with_default("Collection ID", &current_collection)? {
        let collection = if collection == CLEAR {
            None
        } else {
            Some(
                collection
                    .parse::<i64>()
                    .with_context(|| format!("Invalid collection ID: {}", collection))?,
            )
        };
        bookmark.set_collection(collection);
    }

    if confirm("Edit notes in $EDITOR?")? {
        let notes = edit_text(bookmark.notes.as_deref().unwrap_or(""))?;
        bookmark.set_notes(Some(notes));
    }

    Ok(())
}
