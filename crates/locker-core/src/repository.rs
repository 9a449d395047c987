//! Repository facades
//!
//! One facade per record type over the store worker. Facades are cheap
//! clones of the worker handle; every method submits one command and
//! resolves when the worker has applied it. Input is validated before a
//! command is submitted.

use crate::models::{normalize_tag_name, Bookmark, Collection, Tag};
use crate::storage::worker::{Command, StoreHandle};
use crate::storage::{BookmarkFilter, LiveQuery, StoreResult};

/// Bookmark operations
#[derive(Clone)]
pub struct BookmarkRepository {
    handle: StoreHandle,
}

impl BookmarkRepository {
    pub(crate) fn new(handle: StoreHandle) -> Self {
        Self { handle }
    }

    /// Insert a bookmark, returning the id the store assigned
    ///
    /// Any id already set on `bookmark` is ignored.
    pub async fn insert(&self, bookmark: &Bookmark) -> StoreResult<i64> {
        let bookmark = bookmark.normalized()?;
        self.handle
            .request(|reply| Command::InsertBookmark { bookmark, reply })
            .await
    }

    /// Overwrite the bookmark with the same id
    ///
    /// The stored timestamp is kept. Updating an id that does not exist does
    /// nothing.
    pub async fn update(&self, bookmark: &Bookmark) -> StoreResult<()> {
        let bookmark = bookmark.normalized()?;
        self.handle
            .request(|reply| Command::UpdateBookmark { bookmark, reply })
            .await
    }

    pub async fn delete(&self, id: i64) -> StoreResult<()> {
        self.handle
            .request(|reply| Command::DeleteBookmark { id, reply })
            .await
    }

    pub async fn get(&self, id: i64) -> StoreResult<Option<Bookmark>> {
        self.handle
            .request(|reply| Command::GetBookmark { id, reply })
            .await
    }

    /// All bookmarks, newest first
    pub async fn all(&self) -> StoreResult<Vec<Bookmark>> {
        self.query(BookmarkFilter::All).await
    }

    /// Bookmarks in a collection, or uncategorized ones for `None`
    pub async fn by_collection(&self, collection_id: Option<i64>) -> StoreResult<Vec<Bookmark>> {
        self.query(BookmarkFilter::Collection(collection_id)).await
    }

    pub async fn by_tag(&self, tag: &str) -> StoreResult<Vec<Bookmark>> {
        self.query(BookmarkFilter::Tag(tag.to_string())).await
    }

    pub async fn query(&self, filter: BookmarkFilter) -> StoreResult<Vec<Bookmark>> {
        self.handle
            .request(|reply| Command::Bookmarks { filter, reply })
            .await
    }

    pub async fn count(&self) -> StoreResult<i64> {
        let stats = self.handle.request(|reply| Command::Stats { reply }).await?;
        Ok(stats.bookmarks)
    }

    /// Live view of all bookmarks
    pub async fn watch_all(&self) -> StoreResult<LiveQuery<Bookmark>> {
        self.watch(BookmarkFilter::All).await
    }

    /// Live view of a collection's bookmarks
    pub async fn watch_by_collection(
        &self,
        collection_id: Option<i64>,
    ) -> StoreResult<LiveQuery<Bookmark>> {
        self.watch(BookmarkFilter::Collection(collection_id)).await
    }

    pub async fn watch(&self, filter: BookmarkFilter) -> StoreResult<LiveQuery<Bookmark>> {
        self.handle
            .request(|reply| Command::WatchBookmarks { filter, reply })
            .await
    }
}

/// Collection operations
#[derive(Clone)]
pub struct CollectionRepository {
    handle: StoreHandle,
}

impl CollectionRepository {
    pub(crate) fn new(handle: StoreHandle) -> Self {
        Self { handle }
    }

    /// Insert a collection, returning the id the store assigned
    pub async fn insert(&self, collection: &Collection) -> StoreResult<i64> {
        let collection = collection.normalized()?;
        self.handle
            .request(|reply| Command::InsertCollection { collection, reply })
            .await
    }

    /// Overwrite name and color of the collection with the same id
    pub async fn update(&self, collection: &Collection) -> StoreResult<()> {
        let collection = collection.normalized()?;
        self.handle
            .request(|reply| Command::UpdateCollection { collection, reply })
            .await
    }

    pub async fn get(&self, id: i64) -> StoreResult<Option<Collection>> {
        self.handle
            .request(|reply| Command::GetCollection { id, reply })
            .await
    }

    /// All collections, newest first
    pub async fn all(&self) -> StoreResult<Vec<Collection>> {
        self.handle
            .request(|reply| Command::Collections { reply })
            .await
    }

    pub async fn watch_all(&self) -> StoreResult<LiveQuery<Collection>> {
        self.handle
            .request(|reply| Command::WatchCollections { reply })
            .await
    }
}

/// Tag operations
#[derive(Clone)]
pub struct TagRepository {
    handle: StoreHandle,
}

impl TagRepository {
    pub(crate) fn new(handle: StoreHandle) -> Self {
        Self { handle }
    }

    /// Create a tag that no bookmark carries yet
    pub async fn create(&self, name: &str) -> StoreResult<i64> {
        let name = normalize_tag_name(name)?;
        self.handle
            .request(|reply| Command::CreateTag { name, reply })
            .await
    }

    /// Rename a tag everywhere, merging into `to` if it exists
    ///
    /// Returns the number of bookmarks that carried `from`.
    pub async fn rename(&self, from: &str, to: &str) -> StoreResult<usize> {
        let from = normalize_tag_name(from)?;
        let to = normalize_tag_name(to)?;
        self.handle
            .request(|reply| Command::RenameTag { from, to, reply })
            .await
    }

    /// Remove a tag from every bookmark and delete it
    ///
    /// Also deletes the `tag://<name>` template bookmark if there is one.
    /// Returns the number of bookmarks that carried the tag.
    pub async fn delete(&self, name: &str) -> StoreResult<usize> {
        let name = normalize_tag_name(name)?;
        self.handle
            .request(|reply| Command::DeleteTag { name, reply })
            .await
    }

    /// All tags, alphabetical
    pub async fn all(&self) -> StoreResult<Vec<Tag>> {
        self.handle.request(|reply| Command::Tags { reply }).await
    }

    /// Tags with usage counts, most used first
    pub async fn with_counts(&self) -> StoreResult<Vec<(String, i64)>> {
        self.handle
            .request(|reply| Command::TagCounts { reply })
            .await
    }

    pub async fn watch_all(&self) -> StoreResult<LiveQuery<Tag>> {
        self.handle.request(|reply| Command::WatchTags { reply }).await
    }
}
