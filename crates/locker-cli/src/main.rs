//! Bookmark Locker CLI
//!
//! Command-line interface for Bookmark Locker - bookmarks, collections,
//! tags and JSON backups.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use locker_core::{Config, Store};

mod commands;
mod editor;
mod output;

use commands::bookmark::{filter_from_flags, BookmarkEdits, NewBookmark};
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "locker")]
#[command(about = "Bookmark Locker - bookmarks, collections and JSON backups")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage bookmarks
    #[command(alias = "b")]
    Bookmark {
        #[command(subcommand)]
        command: BookmarkCommands,
    },
    /// Manage collections
    #[command(alias = "c")]
    Collection {
        #[command(subcommand)]
        command: CollectionCommands,
    },
    /// Manage tags
    #[command(alias = "t")]
    Tag {
        #[command(subcommand)]
        command: TagCommands,
    },
    /// Write a backup of everything to a JSON file
    Backup {
        /// Destination file (default: a timestamped file in the backup directory)
        path: Option<PathBuf>,
        /// List existing backups instead of writing one
        #[arg(long, conflicts_with = "path")]
        list: bool,
    },
    /// Replace everything with the contents of a backup file
    Restore {
        /// Backup file to restore
        path: PathBuf,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show store location and record counts
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum BookmarkCommands {
    /// Save a new bookmark
    #[command(alias = "create")]
    Add {
        /// URL to save (https:// is added when no scheme is given)
        url: String,
        /// Title
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// Notes
        #[arg(short, long)]
        notes: Option<String>,
        /// Tags to add
        #[arg(short, long)]
        tag: Vec<String>,
        /// Collection ID
        #[arg(short, long)]
        collection: Option<i64>,
    },
    /// List bookmarks, newest first
    #[command(alias = "ls")]
    List {
        /// Only bookmarks with this tag
        #[arg(short, long, conflicts_with_all = ["collection", "uncategorized"])]
        tag: Option<String>,
        /// Only bookmarks in this collection
        #[arg(short, long, conflicts_with = "uncategorized")]
        collection: Option<i64>,
        /// Only bookmarks without a collection
        #[arg(long)]
        uncategorized: bool,
        /// Include tag placeholder entries
        #[arg(long)]
        all: bool,
    },
    /// Show bookmark details
    Show {
        /// Bookmark ID
        id: i64,
    },
    /// Edit a bookmark (prompts when no field flags are given)
    Edit {
        /// Bookmark ID
        id: i64,
        /// New URL
        #[arg(long)]
        url: Option<String>,
        /// New title (empty clears it)
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// New notes (empty clears them)
        #[arg(short, long)]
        notes: Option<String>,
        /// Replace tags
        #[arg(short, long)]
        tag: Option<Vec<String>>,
        /// Move to this collection
        #[arg(short, long, conflicts_with = "uncategorized")]
        collection: Option<i64>,
        /// Remove from its collection
        #[arg(long)]
        uncategorized: bool,
    },
    /// Delete a bookmark
    #[command(alias = "rm")]
    Delete {
        /// Bookmark ID
        id: i64,
    },
    /// Open a bookmark in the browser
    Open {
        /// Bookmark ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum CollectionCommands {
    /// Create a collection
    #[command(alias = "create")]
    Add {
        /// Collection name
        name: String,
        /// Hex color, e.g. #0062AD
        #[arg(long)]
        color: Option<String>,
    },
    /// List collections, newest first
    #[command(alias = "ls")]
    List,
    /// Rename or recolor a collection
    Edit {
        /// Collection ID
        id: i64,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New hex color
        #[arg(long)]
        color: Option<String>,
    },
}

#[derive(Subcommand)]
enum TagCommands {
    /// Create a tag without tagging anything
    #[command(alias = "create")]
    Add {
        /// Tag name
        name: String,
    },
    /// List tags with usage counts
    #[command(alias = "ls")]
    List,
    /// Rename a tag on every bookmark (merges into an existing tag)
    #[command(alias = "mv")]
    Rename {
        /// Current name
        from: String,
        /// New name
        to: String,
    },
    /// Remove a tag from every bookmark and delete it
    #[command(alias = "rm")]
    Delete {
        /// Tag name
        name: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Print the config file path
    Path,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, backup_dir, log_file)
        key: String,
        /// Configuration value ("none" clears optional keys)
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.unwrap_or_else(Config::config_file_path);

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), &config_path, &output);
    }

    let config = Config::load_from_path(&config_path).context("Failed to load configuration")?;
    init_logging(&config);

    let store = Store::open_with_config(config).context("Failed to open bookmark database")?;
    debug!("Opened store at {:?}", store.config().sqlite_path());

    let result = match cli.command {
        Commands::Bookmark { command } => handle_bookmark_command(command, &store, &output).await,
        Commands::Collection { command } => {
            handle_collection_command(command, &store, &output).await
        }
        Commands::Tag { command } => handle_tag_command(command, &store, &output).await,
        Commands::Backup { path, list } => {
            if list {
                commands::backup::list(&store, &output)
            } else {
                commands::backup::backup(&store, path, &output).await
            }
        }
        Commands::Restore { path, yes } => {
            commands::backup::restore(&store, &path, yes, &output).await
        }
        Commands::Status => commands::status::show(&store, &config_path, &output).await,
        Commands::Config { .. } => unreachable!(), // Handled above
    };

    store.close().await;
    result
}

async fn handle_bookmark_command(
    command: BookmarkCommands,
    store: &Store,
    output: &Output,
) -> Result<()> {
    match command {
        BookmarkCommands::Add {
            url,
            title,
            notes,
            tag,
            collection,
        } => {
            let new = NewBookmark {
                url,
                title,
                notes,
                tags: tag,
                collection,
            };
            commands::bookmark::add(store, new, output).await
        }
        BookmarkCommands::List {
            tag,
            collection,
            uncategorized,
            all,
        } => {
            let filter = filter_from_flags(tag, collection, uncategorized);
            commands::bookmark::list(store, filter, all, output).await
        }
        BookmarkCommands::Show { id } => commands::bookmark::show(store, id, output).await,
        BookmarkCommands::Edit {
            id,
            url,
            title,
            notes,
            tag,
            collection,
            uncategorized,
        } => {
            let edits = BookmarkEdits {
                url,
                title,
                notes,
                tags: tag,
                collection: if uncategorized {
                    Some(None)
                } else {
                    collection.map(Some)
                },
            };
            commands::bookmark::edit(store, id, edits, output).await
        }
        BookmarkCommands::Delete { id } => commands::bookmark::delete(store, id, output).await,
        BookmarkCommands::Open { id } => commands::bookmark::open(store, id, output).await,
    }
}

async fn handle_collection_command(
    command: CollectionCommands,
    store: &Store,
    output: &Output,
) -> Result<()> {
    match command {
        CollectionCommands::Add { name, color } => {
            commands::collection::add(store, name, color, output).await
        }
        CollectionCommands::List => commands::collection::list(store, output).await,
        CollectionCommands::Edit { id, name, color } => {
            commands::collection::edit(store, id, name, color, output).await
        }
    }
}

async fn handle_tag_command(command: TagCommands, store: &Store, output: &Output) -> Result<()> {
    match command {
        TagCommands::Add { name } => commands::tag::add(store, name, output).await,
        TagCommands::List => commands::tag::list(store, output).await,
        TagCommands::Rename { from, to } => commands::tag::rename(store, from, to, output).await,
        TagCommands::Delete { name } => commands::tag::delete(store, name, output).await,
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: &Path,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Path) => commands::config::path(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging
///
/// Only initializes if LOCKER_LOG environment variable is set.
/// Logs to config.log_file when set, otherwise to stderr.
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("LOCKER_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "locker_core={},locker_cli={}",
        log_level, log_level
    ));

    let Some(log_path) = config.log_file.as_ref() else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
        return;
    };

    let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            return;
        }
    };

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    debug!("Logging to {:?}", log_path);
}
