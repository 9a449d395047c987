//! Bookmark Locker Core Library
//!
//! This crate provides the core functionality for Bookmark Locker, a local
//! store for bookmarks grouped into collections and labelled with tags, with
//! full JSON backup and restore.
//!
//! # Architecture
//!
//! - **SQLite**: Source of truth for all records
//! - **Store worker**: A single thread owns the connection; callers submit
//!   commands and await their completion
//! - **Live queries**: Watch channels that receive the full result again after
//!   every write to the tables they read
//!
//! # Quick Start
//!
//! ```text
//! let store = Store::open()?;
//!
//! // Add a bookmark
//! let mut bookmark = Bookmark::new("https://example.com");
//! bookmark.set_title(Some("Example".into()));
//! store.bookmarks().insert(&bookmark).await?;
//!
//! // Query bookmarks
//! let bookmarks = store.bookmarks().all().await?;
//!
//! // Back up everything
//! let json = store.export_snapshot().await?;
//! ```
//!
//! # Modules
//!
//! - `store`: Unified storage interface (main entry point)
//! - `repository`: Per-record facades handed out by the store
//! - `models`: Data structures for bookmarks, collections, and tags
//! - `tag_codec`: JSON encoding of ordered tag lists
//! - `snapshot`: Backup document format
//! - `restore`: Replacing the store's contents from a backup
//! - `storage`: SQLite schema, queries, worker and backup files
//! - `config`: Application configuration

pub mod config;
pub mod models;
pub mod repository;
pub mod restore;
pub mod snapshot;
pub mod storage;
pub mod store;
pub mod tag_codec;

pub use config::Config;
pub use models::{Bookmark, Collection, Tag, ValidationError};
pub use repository::{BookmarkRepository, CollectionRepository, TagRepository};
pub use restore::RestoreSummary;
pub use snapshot::Snapshot;
pub use storage::{BookmarkFilter, DecodeError, LiveQuery, StoreError, StoreResult, StoreStats};
pub use store::Store;
