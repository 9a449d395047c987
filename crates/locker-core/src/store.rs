//! Unified storage interface
//!
//! The `Store` opens the SQLite database, starts the worker that owns it and
//! hands out the per-record repositories. It also drives backup and restore:
//!
//! - Export: one worker command reads every table in a single transaction
//! - Restore: one worker command replaces every table in a single transaction
//!
//! ## Usage
//!
//! ```ignore
//! let store = Store::open()?;
//!
//! // Add data
//! let id = store.bookmarks().insert(&Bookmark::new("https://example.com")).await?;
//!
//! // Back up and restore
//! let path = store.backup_to_default_dir().await?;
//! store.restore_from_file(&path).await?;
//!
//! store.close().await;
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::repository::{BookmarkRepository, CollectionRepository, TagRepository};
use crate::restore::RestoreSummary;
use crate::snapshot::{default_backup_file_name, Snapshot};
use crate::storage::persistence::{list_backups, read_backup, write_backup};
use crate::storage::worker::{self, Command, StoreHandle};
use crate::storage::{Database, StoreResult, StoreStats};

/// Entry point to the bookmark store
///
/// The connection stays open until [`Store::close`] is called or the store
/// and every repository handed out by it are dropped.
pub struct Store {
    handle: StoreHandle,
    config: Config,
}

impl Store {
    /// Open the store using the configuration from the default location
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config).context("Failed to open bookmark database")
    }

    /// Open the store with a specific configuration
    pub fn open_with_config(config: Config) -> StoreResult<Self> {
        let db = Database::open(&config)?;
        Ok(Self {
            handle: worker::spawn(db)?,
            config,
        })
    }

    /// Open a store backed by an in-memory database (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            handle: worker::spawn(db)?,
            config: Config::default(),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bookmarks(&self) -> BookmarkRepository {
        BookmarkRepository::new(self.handle.clone())
    }

    pub fn collections(&self) -> CollectionRepository {
        CollectionRepository::new(self.handle.clone())
    }

    pub fn tags(&self) -> TagRepository {
        TagRepository::new(self.handle.clone())
    }

    /// Row counts per table
    pub async fn stats(&self) -> StoreResult<StoreStats> {
        self.handle.request(|reply| Command::Stats { reply }).await
    }

    /// Check if this is a new store (nothing saved yet)
    pub async fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.stats().await? == StoreStats::default())
    }

    // ==================== Backup & Restore ====================

    /// Read the full state of the store
    pub async fn export(&self) -> StoreResult<Snapshot> {
        self.handle.request(|reply| Command::Export { reply }).await
    }

    /// Export the full state as a backup document
    pub async fn export_snapshot(&self) -> StoreResult<String> {
        Ok(self.export().await?.serialize())
    }

    /// Replace the store's contents with a snapshot
    pub async fn restore(&self, snapshot: Snapshot) -> StoreResult<RestoreSummary> {
        self.handle
            .request(|reply| Command::Restore { snapshot, reply })
            .await
    }

    /// Parse a backup document and restore it
    ///
    /// A document that does not parse leaves the store untouched.
    pub async fn import_snapshot(&self, text: &str) -> StoreResult<RestoreSummary> {
        let snapshot = Snapshot::parse(text)?;
        self.restore(snapshot).await
    }

    /// Write a backup document to `path`
    pub async fn backup_to_file(&self, path: &Path) -> StoreResult<Snapshot> {
        let snapshot = self.export().await?;
        write_backup(path, &snapshot)?;
        info!("Backup written to {:?}", path);
        Ok(snapshot)
    }

    /// Write a backup with a generated name into the configured backup directory
    pub async fn backup_to_default_dir(&self) -> StoreResult<PathBuf> {
        let path = self.config.backup_dir().join(default_backup_file_name());
        self.backup_to_file(&path).await?;
        Ok(path)
    }

    /// Restore from a backup document on disk
    pub async fn restore_from_file(&self, path: &Path) -> StoreResult<RestoreSummary> {
        let snapshot = read_backup(path)?;
        info!("Restoring from {:?}", path);
        self.restore(snapshot).await
    }

    /// Backups in the configured backup directory, newest first
    pub fn list_backups(&self) -> StoreResult<Vec<PathBuf>> {
        list_backups(&self.config.backup_dir())
    }

    /// Apply queued commands, then close the database
    ///
    /// Repositories still held elsewhere fail with `StoreError::Closed`
    /// afterwards.
    pub async fn close(self) {
        self.handle.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bookmark, Collection};
    use crate::storage::StoreError;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> Config {
        Config::with_data_dir(temp_dir.path())
    }

    #[tokio::test]
    async fn test_open_creates_new_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::open_with_config(test_config(&temp_dir)).unwrap();

        assert!(store.is_empty().await.unwrap());
        assert!(temp_dir.path().join("bookmarks.db").exists());
    }

    #[tokio::test]
    async fn test_open_loads_existing_store() {
        let temp_dir = TempDir::new().unwrap();

        {
            let store = Store::open_with_config(test_config(&temp_dir)).unwrap();
            store
                .bookmarks()
                .insert(&Bookmark::new("https://example.com"))
                .await
                .unwrap();
            store.close().await;
        }

        let store = Store::open_with_config(test_config(&temp_dir)).unwrap();
        let all = store.bookmarks().all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].url, "https://example.com");
    }

    #[tokio::test]
    async fn test_validation_happens_before_submission() {
        let store = Store::open_in_memory().unwrap();

        let err = store
            .bookmarks()
            .insert(&Bookmark::new("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let err = store
            .collections()
            .insert(&Collection::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_normalizes_url() {
        let store = Store::open_in_memory().unwrap();
        let id = store
            .bookmarks()
            .insert(&Bookmark::new("example.com"))
            .await
            .unwrap();

        let bookmark = store.bookmarks().get(id).await.unwrap().unwrap();
        assert_eq!(bookmark.url, "https://example.com");
    }

    #[tokio::test]
    async fn test_backup_and_restore_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::open_with_config(test_config(&temp_dir)).unwrap();

        let reading = store
            .collections()
            .insert(&Collection::new("Reading"))
            .await
            .unwrap();
        let mut bookmark = Bookmark::new("https://a.com");
        bookmark.set_collection(Some(reading));
        let id = store.bookmarks().insert(&bookmark).await.unwrap();

        let path = store.backup_to_default_dir().await.unwrap();
        assert!(path.starts_with(temp_dir.path().join("backups")));
        assert_eq!(store.list_backups().unwrap(), vec![path.clone()]);

        store.bookmarks().delete(id).await.unwrap();
        assert!(store.bookmarks().all().await.unwrap().is_empty());

        let summary = store.restore_from_file(&path).await.unwrap();
        assert_eq!(summary.bookmarks, 1);
        assert_eq!(summary.collections, 1);

        let collections = store.collections().all().await.unwrap();
        let restored = store.bookmarks().all().await.unwrap();
        assert_eq!(restored[0].collection_id, Some(collections[0].id));
    }

    #[tokio::test]
    async fn test_restore_from_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::open_in_memory().unwrap();

        let err = store
            .restore_from_file(&temp_dir.path().join("missing.json"))
            .await
            .unwrap_err();
        assert!(err.is_io());
    }

    #[tokio::test]
    async fn test_closed_store_rejects_commands() {
        let store = Store::open_in_memory().unwrap();
        let bookmarks = store.bookmarks();

        store.close().await;

        let err = bookmarks.all().await.unwrap_err();
        assert!(matches!(err, StoreError::Closed));
    }
}
