//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use std::path::Path;

use serde::Serialize;

use locker_core::{Bookmark, Collection, RestoreSummary};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single bookmark
    ///
    /// `collection` is the bookmark's collection when it still exists.
    pub fn print_bookmark(&self, bookmark: &Bookmark, collection: Option<&Collection>) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:         {}", bookmark.id);
                if let Some(ref title) = bookmark.title {
                    println!("Title:      {}", title);
                }
                println!("URL:        {}", bookmark.url);
                if !bookmark.tags.is_empty() {
                    println!("Tags:       {}", bookmark.tags.join(", "));
                }
                match (bookmark.collection_id, collection) {
                    (Some(_), Some(c)) => println!("Collection: {} ({})", c.name, c.id),
                    (Some(id), None) => println!("Collection: {} (missing)", id),
                    (None, _) => {}
                }
                println!(
                    "Saved:      {}",
                    bookmark.timestamp.format("%Y-%m-%d %H:%M")
                );

                if let Some(ref notes) = bookmark.notes {
                    println!();
                    println!("── Notes ──");
                    println!("{}", notes);
                }
            }
            OutputFormat::Json => print_json(bookmark),
            OutputFormat::Quiet => {
                println!("{}", bookmark.id);
            }
        }
    }

    /// Print a list of bookmarks
    pub fn print_bookmarks(&self, bookmarks: &[Bookmark]) {
        match self.format {
            OutputFormat::Human => {
                if bookmarks.is_empty() {
                    println!("No bookmarks found.");
                    return;
                }
                for bookmark in bookmarks {
                    let tags = if bookmark.tags.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", bookmark.tags.join(", "))
                    };
                    println!(
                        "{:>5} | {}{} | {}",
                        bookmark.id,
                        truncate(bookmark.title.as_deref().unwrap_or("(untitled)"), 35),
                        tags,
                        truncate(&bookmark.url, 45)
                    );
                }
                println!("\n{} bookmark(s)", bookmarks.len());
            }
            OutputFormat::Json => print_json(&bookmarks),
            OutputFormat::Quiet => {
                for bookmark in bookmarks {
                    println!("{}", bookmark.id);
                }
            }
        }
    }

    /// Print collections with the number of bookmarks in each
    pub fn print_collections(&self, collections: &[(Collection, usize)]) {
        match self.format {
            OutputFormat::Human => {
                if collections.is_empty() {
                    println!("No collections found.");
                    return;
                }
                for (collection, count) in collections {
                    println!(
                        "{:>5} | {} | {} ({})",
                        collection.id,
                        collection.display_color(),
                        collection.name,
                        count
                    );
                }
                println!("\n{} collection(s)", collections.len());
            }
            OutputFormat::Json => {
                let json: Vec<_> = collections
                    .iter()
                    .map(|(collection, count)| {
                        serde_json::json!({
                            "id": collection.id,
                            "name": collection.name,
                            "color": collection.color,
                            "createdAt": collection.created_at.timestamp_millis(),
                            "bookmarks": count,
                        })
                    })
                    .collect();
                print_json(&json);
            }
            OutputFormat::Quiet => {
                for (collection, _) in collections {
                    println!("{}", collection.id);
                }
            }
        }
    }

    /// Print a list of tags
    pub fn print_tags(&self, tags: &[(String, i64)]) {
        match self.format {
            OutputFormat::Human => {
                if tags.is_empty() {
                    println!("No tags found.");
                    return;
                }
                for (name, count) in tags {
                    println!("{} ({})", name, count);
                }
                println!("\n{} tag(s)", tags.len());
            }
            OutputFormat::Json => {
                let json_tags: Vec<_> = tags
                    .iter()
                    .map(|(name, count)| serde_json::json!({"name": name, "count": count}))
                    .collect();
                print_json(&json_tags);
            }
            OutputFormat::Quiet => {
                for (name, _) in tags {
                    println!("{}", name);
                }
            }
        }
    }

    /// Print the outcome of a restore
    pub fn print_restore_summary(&self, path: &Path, summary: &RestoreSummary) {
        match self.format {
            OutputFormat::Human => {
                println!("✓ Restored from {}", path.display());
                println!("  Bookmarks:   {}", summary.bookmarks);
                println!("  Collections: {}", summary.collections);
                println!("  Tags:        {}", summary.tags);
                if summary.cleared_references > 0 {
                    println!(
                        "  {} bookmark(s) referenced a collection missing from the backup and are now uncategorized",
                        summary.cleared_references
                    );
                }
            }
            OutputFormat::Json => print_json(summary),
            OutputFormat::Quiet => {}
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to format JSON output: {}", e),
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
