//! Structured query layer
//!
//! Typed reads and writes against the bookmark, collection and tag tables.
//! `Database` owns the SQLite connection; the free functions operate on any
//! `Connection` (or `Transaction`) so the restore engine can compose them
//! inside a single transaction.
//!
//! ## Tables
//!
//! - `bookmarks` - Bookmark records
//! - `collections` - Collection records
//! - `tags` - Normalized tag names
//! - `bookmark_tags` - Ordered bookmark-to-tag junction

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Params, Row};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{Bookmark, Collection, Tag, TEMPLATE_SCHEME};
use crate::snapshot::Snapshot;
use crate::storage::error::{DecodeError, StoreError, StoreResult};
use crate::storage::schema::{get_schema_version, needs_init, recreate_schema};
use crate::tag_codec;

/// Which bookmarks a read selects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookmarkFilter {
    /// Every bookmark
    All,
    /// Bookmarks in the given collection; `None` selects uncategorized ones
    Collection(Option<i64>),
    /// Bookmarks carrying the given tag
    Tag(String),
}

/// Row counts per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub bookmarks: i64,
    pub collections: i64,
    pub tags: i64,
}

/// SQLite-backed record store
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create the SQLite database
    pub fn open(config: &Config) -> StoreResult<Self> {
        let path = config.sqlite_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(&path)?;
        debug!("Opened database at {:?}", path);
        Self::prepare(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        if needs_init(&conn) {
            if let Ok(Some(version)) = get_schema_version(&conn) {
                warn!(
                    "Database schema version {} is outdated; recreating (existing data is discarded)",
                    version
                );
            }
            recreate_schema(&conn)?;
        }

        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    // ==================== Bookmarks ====================

    /// Insert a bookmark and its tags, returning the assigned id
    pub fn insert_bookmark(&mut self, bookmark: &Bookmark) -> StoreResult<i64> {
        let tx = self.conn.transaction()?;
        let id = insert_bookmark_row(&tx, bookmark)?;
        tx.commit()?;
        Ok(id)
    }

    /// Overwrite a bookmark by id, keeping its timestamp
    ///
    /// Returns `false` when no bookmark has that id.
    pub fn update_bookmark(&mut self, bookmark: &Bookmark) -> StoreResult<bool> {
        let tx = self.conn.transaction()?;
        let found = update_bookmark_row(&tx, bookmark)?;
        tx.commit()?;
        Ok(found)
    }

    /// Delete a bookmark by id
    pub fn delete_bookmark(&mut self, id: i64) -> StoreResult<bool> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM bookmark_tags WHERE bookmark_id = ?1", params![id])?;
        let deleted = tx.execute("DELETE FROM bookmarks WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    pub fn get_bookmark(&self, id: i64) -> StoreResult<Option<Bookmark>> {
        let rows = query_bookmark_rows(&self.conn, "WHERE b.id = ?1", params![id])?;
        rows.into_iter().next().map(BookmarkRow::into_bookmark).transpose()
    }

    /// Bookmarks matching `filter`, newest first
    pub fn bookmarks(&self, filter: &BookmarkFilter) -> StoreResult<Vec<Bookmark>> {
        select_bookmarks(&self.conn, filter)
    }

    // ==================== Collections ====================

    pub fn insert_collection(&mut self, collection: &Collection) -> StoreResult<i64> {
        insert_collection_row(&self.conn, collection)
    }

    /// Overwrite a collection's name and color by id
    ///
    /// Returns `false` when no collection has that id.
    pub fn update_collection(&mut self, collection: &Collection) -> StoreResult<bool> {
        let updated = self.conn.execute(
            "UPDATE collections SET name = ?1, color = ?2 WHERE id = ?3",
            params![collection.name, collection.color, collection.id],
        )?;
        Ok(updated > 0)
    }

    pub fn get_collection(&self, id: i64) -> StoreResult<Option<Collection>> {
        let rows = query_collection_rows(&self.conn, "WHERE id = ?1", params![id])?;
        rows.into_iter().next().map(CollectionRow::into_collection).transpose()
    }

    /// All collections, newest first
    pub fn collections(&self) -> StoreResult<Vec<Collection>> {
        select_collections(&self.conn)
    }

    // ==================== Tags ====================

    /// Create a tag if it does not exist yet, returning its id
    pub fn create_tag(&mut self, name: &str) -> StoreResult<i64> {
        Ok(ensure_tag(&self.conn, name)?)
    }

    /// Rename a tag on every bookmark that carries it
    ///
    /// If `to` already exists the two tags are merged. Returns the number of
    /// bookmarks that carried `from`.
    pub fn rename_tag(&mut self, from: &str, to: &str) -> StoreResult<usize> {
        if from == to {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let Some(from_id) = tag_id(&tx, from)? else {
            return Ok(0);
        };
        let affected = tag_usage(&tx, from_id)?;
        let to_id = ensure_tag(&tx, to)?;

        // Bookmarks already carrying `to` keep their existing position for it.
        tx.execute(
            "UPDATE OR IGNORE bookmark_tags SET tag_id = ?1 WHERE tag_id = ?2",
            params![to_id, from_id],
        )?;
        tx.execute("DELETE FROM bookmark_tags WHERE tag_id = ?1", params![from_id])?;
        tx.execute("DELETE FROM tags WHERE id = ?1", params![from_id])?;

        // Keep a single template per tag: drop `from`'s when `to` already has one.
        let (from_url, to_url) = (template_url(from), template_url(to));
        let to_has_template: bool = tx
            .prepare("SELECT 1 FROM bookmarks WHERE url = ?1")?
            .exists(params![to_url])?;
        if to_has_template {
            tx.execute(
                "DELETE FROM bookmark_tags WHERE bookmark_id IN (SELECT id FROM bookmarks WHERE url = ?1)",
                params![from_url],
            )?;
            tx.execute("DELETE FROM bookmarks WHERE url = ?1", params![from_url])?;
        } else {
            tx.execute(
                "UPDATE bookmarks SET url = ?1 WHERE url = ?2",
                params![to_url, from_url],
            )?;
        }
        tx.commit()?;

        debug!("Renamed tag '{}' to '{}' on {} bookmark(s)", from, to, affected);
        Ok(affected)
    }

    /// Delete a tag everywhere
    ///
    /// Removes it from every bookmark, deletes the tag itself and any
    /// `tag://<name>` template bookmark. Returns the number of bookmarks that
    /// carried the tag.
    pub fn delete_tag(&mut self, name: &str) -> StoreResult<usize> {
        let tx = self.conn.transaction()?;

        let affected = match tag_id(&tx, name)? {
            Some(id) => {
                let affected = tag_usage(&tx, id)?;
                tx.execute("DELETE FROM bookmark_tags WHERE tag_id = ?1", params![id])?;
                tx.execute("DELETE FROM tags WHERE id = ?1", params![id])?;
                affected
            }
            None => 0,
        };

        let template = template_url(name);
        tx.execute(
            "DELETE FROM bookmark_tags WHERE bookmark_id IN (SELECT id FROM bookmarks WHERE url = ?1)",
            params![template],
        )?;
        let templates = tx.execute("DELETE FROM bookmarks WHERE url = ?1", params![template])?;
        tx.commit()?;

        debug!(
            "Deleted tag '{}' from {} bookmark(s), {} template(s) removed",
            name, affected, templates
        );
        Ok(affected)
    }

    /// All tags, alphabetical
    pub fn tags(&self) -> StoreResult<Vec<Tag>> {
        select_tags(&self.conn)
    }

    /// Tags with the number of bookmarks carrying each, most used first
    pub fn tags_with_counts(&self) -> StoreResult<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT t.name, COUNT(bt.bookmark_id) as count
            FROM tags t
            LEFT JOIN bookmark_tags bt ON t.id = bt.tag_id
            GROUP BY t.id
            ORDER BY count DESC, t.name
            "#,
        )?;

        let tags = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(String, i64)>, _>>()?;
        Ok(tags)
    }

    // ==================== Whole store ====================

    pub fn stats(&self) -> StoreResult<StoreStats> {
        let count = |table: &str| -> StoreResult<i64> {
            Ok(self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?)
        };
        Ok(StoreStats {
            bookmarks: count("bookmarks")?,
            collections: count("collections")?,
            tags: count("tags")?,
        })
    }

    /// Read every table in one transaction
    pub fn snapshot(&mut self) -> StoreResult<Snapshot> {
        let tx = self.conn.transaction()?;
        let bookmarks = select_bookmarks(&tx, &BookmarkFilter::All)?;
        let collections = select_collections(&tx)?;
        let tags = select_tags(&tx)?.into_iter().map(|t| t.name).collect();
        tx.commit()?;

        info!(
            "Exported {} bookmark(s), {} collection(s)",
            bookmarks.len(),
            collections.len()
        );
        Ok(Snapshot {
            bookmarks,
            collections,
            tags,
        })
    }
}

// ==================== Row mapping ====================

const BOOKMARK_COLUMNS: &str = r#"
    b.id, b.url, b.title, b.notes, b.collection_id, b.timestamp,
    COALESCE((
        SELECT json_group_array(t.name ORDER BY bt.position)
        FROM bookmark_tags bt
        JOIN tags t ON t.id = bt.tag_id
        WHERE bt.bookmark_id = b.id
    ), '[]') AS tags
"#;

struct BookmarkRow {
    id: i64,
    url: String,
    title: Option<String>,
    notes: Option<String>,
    collection_id: Option<i64>,
    timestamp: i64,
    tags: String,
}

impl BookmarkRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            notes: row.get(3)?,
            collection_id: row.get(4)?,
            timestamp: row.get(5)?,
            tags: row.get(6)?,
        })
    }

    fn into_bookmark(self) -> StoreResult<Bookmark> {
        Ok(Bookmark {
            id: self.id,
            url: self.url,
            title: self.title,
            notes: self.notes,
            tags: tag_codec::decode(&self.tags)?,
            collection_id: self.collection_id,
            timestamp: from_millis("timestamp", self.timestamp)?,
        })
    }
}

struct CollectionRow {
    id: i64,
    name: String,
    color: String,
    created_at: i64,
}

impl CollectionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            color: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn into_collection(self) -> StoreResult<Collection> {
        Ok(Collection {
            id: self.id,
            name: self.name,
            color: self.color,
            created_at: from_millis("created_at", self.created_at)?,
        })
    }
}

fn from_millis(column: &'static str, millis: i64) -> Result<DateTime<Utc>, DecodeError> {
    DateTime::from_timestamp_millis(millis).ok_or(DecodeError::Timestamp { column, millis })
}

fn template_url(tag: &str) -> String {
    format!("{}{}", TEMPLATE_SCHEME, tag)
}

// ==================== Reads ====================

fn query_bookmark_rows<P: Params>(
    conn: &Connection,
    filter: &str,
    params: P,
) -> rusqlite::Result<Vec<BookmarkRow>> {
    let sql = format!(
        "SELECT {} FROM bookmarks b {} ORDER BY b.timestamp DESC, b.id DESC",
        BOOKMARK_COLUMNS, filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, BookmarkRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub(crate) fn select_bookmarks(
    conn: &Connection,
    filter: &BookmarkFilter,
) -> StoreResult<Vec<Bookmark>> {
    let rows = match filter {
        BookmarkFilter::All => query_bookmark_rows(conn, "", [])?,
        BookmarkFilter::Collection(Some(id)) => {
            query_bookmark_rows(conn, "WHERE b.collection_id = ?1", params![id])?
        }
        // `= NULL` never matches; unset needs its own predicate.
        BookmarkFilter::Collection(None) => {
            query_bookmark_rows(conn, "WHERE b.collection_id IS NULL", [])?
        }
        BookmarkFilter::Tag(name) => query_bookmark_rows(
            conn,
            r#"WHERE b.id IN (
                SELECT bt.bookmark_id FROM bookmark_tags bt
                JOIN tags t ON t.id = bt.tag_id
                WHERE t.name = ?1
            )"#,
            params![name],
        )?,
    };

    rows.into_iter().map(BookmarkRow::into_bookmark).collect()
}

fn query_collection_rows<P: Params>(
    conn: &Connection,
    filter: &str,
    params: P,
) -> rusqlite::Result<Vec<CollectionRow>> {
    let sql = format!(
        "SELECT id, name, color, created_at FROM collections {} ORDER BY created_at DESC, id DESC",
        filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, CollectionRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub(crate) fn select_collections(conn: &Connection) -> StoreResult<Vec<Collection>> {
    query_collection_rows(conn, "", [])?
        .into_iter()
        .map(CollectionRow::into_collection)
        .collect()
}

pub(crate) fn select_tags(conn: &Connection) -> StoreResult<Vec<Tag>> {
    let mut stmt = conn.prepare("SELECT id, name FROM tags ORDER BY name")?;
    let tags = stmt
        .query_map([], |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tags)
}

fn tag_id(conn: &Connection, name: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row("SELECT id FROM tags WHERE name = ?1", params![name], |row| {
        row.get(0)
    })
    .optional()
}

fn tag_usage(conn: &Connection, tag_id: i64) -> rusqlite::Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookmark_tags WHERE tag_id = ?1",
        params![tag_id],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

// ==================== Writes ====================

/// Insert a bookmark row and its tag associations; the record's id is ignored
pub(crate) fn insert_bookmark_row(conn: &Connection, bookmark: &Bookmark) -> StoreResult<i64> {
    conn.execute(
        r#"
        INSERT INTO bookmarks (url, title, notes, collection_id, timestamp)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            bookmark.url,
            bookmark.title,
            bookmark.notes,
            bookmark.collection_id,
            bookmark.timestamp.timestamp_millis(),
        ],
    )?;
    let id = conn.last_insert_rowid();
    write_tags(conn, id, &bookmark.tags)?;
    Ok(id)
}

fn update_bookmark_row(conn: &Connection, bookmark: &Bookmark) -> StoreResult<bool> {
    let updated = conn.execute(
        r#"
        UPDATE bookmarks SET url = ?1, title = ?2, notes = ?3, collection_id = ?4
        WHERE id = ?5
        "#,
        params![
            bookmark.url,
            bookmark.title,
            bookmark.notes,
            bookmark.collection_id,
            bookmark.id,
        ],
    )?;
    if updated == 0 {
        return Ok(false);
    }
    write_tags(conn, bookmark.id, &bookmark.tags)?;
    Ok(true)
}

/// Replace a bookmark's tag associations with `tags`, in order
fn write_tags(conn: &Connection, bookmark_id: i64, tags: &[String]) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM bookmark_tags WHERE bookmark_id = ?1",
        params![bookmark_id],
    )?;
    if tags.is_empty() {
        return Ok(());
    }

    let encoded = tag_codec::encode(tags);
    conn.execute(
        "INSERT OR IGNORE INTO tags (name) SELECT value FROM json_each(?1)",
        params![encoded],
    )?;
    conn.execute(
        r#"
        INSERT OR IGNORE INTO bookmark_tags (bookmark_id, tag_id, position)
        SELECT ?1, t.id, j.key
        FROM json_each(?2) AS j
        JOIN tags t ON t.name = j.value
        "#,
        params![bookmark_id, encoded],
    )?;
    Ok(())
}

/// Insert a collection row; the record's id is ignored
pub(crate) fn insert_collection_row(conn: &Connection, collection: &Collection) -> StoreResult<i64> {
    conn.execute(
        "INSERT INTO collections (name, color, created_at) VALUES (?1, ?2, ?3)",
        params![
            collection.name,
            collection.color,
            collection.created_at.timestamp_millis(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get or create a tag, returning its ID
pub(crate) fn ensure_tag(conn: &Connection, name: &str) -> rusqlite::Result<i64> {
    if let Some(id) = tag_id(conn, name)? {
        return Ok(id);
    }
    conn.execute("INSERT INTO tags (name) VALUES (?1)", params![name])?;
    Ok(conn.last_insert_rowid())
}

/// Clear all data from tables (preserving schema)
pub(crate) fn clear_all_data(conn: &Connection) -> rusqlite::Result<()> {
    // Order matters due to foreign keys
    conn.execute("DELETE FROM bookmark_tags", [])?;
    conn.execute("DELETE FROM bookmarks", [])?;
    conn.execute("DELETE FROM collections", [])?;
    conn.execute("DELETE FROM tags", [])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn bookmark(url: &str, tags: &[&str]) -> Bookmark {
        let mut bookmark = Bookmark::new(url);
        bookmark.set_tags(tags.iter().map(|t| t.to_string()).collect());
        bookmark
    }

    fn create_test_db() -> Database {
        let mut db = Database::open_in_memory().unwrap();

        let reading = db.insert_collection(&Collection::new("Reading")).unwrap();

        let mut rust = bookmark("https://rust-lang.org", &["programming", "rust"]);
        rust.set_title(Some("Rust Programming Language".to_string()));
        rust.set_collection(Some(reading));
        db.insert_bookmark(&rust).unwrap();

        let mut example = bookmark("https://example.com", &["example"]);
        example.timestamp = rust.timestamp + Duration::seconds(1);
        db.insert_bookmark(&example).unwrap();

        db
    }

    #[test]
    fn test_insert_and_read_back() {
        let mut db = Database::open_in_memory().unwrap();

        let mut original = bookmark("https://a.com", &["b", "a", "c"]);
        original.set_title(Some("A".to_string()));
        original.set_notes(Some("notes".to_string()));
        original.set_collection(Some(42));

        let id = db.insert_bookmark(&original).unwrap();
        assert_ne!(id, 0);

        let found = db.get_bookmark(id).unwrap().unwrap();
        assert_eq!(found, Bookmark { id, ..original });
    }

    #[test]
    fn test_all_bookmarks_newest_first() {
        let db = create_test_db();

        let bookmarks = db.bookmarks(&BookmarkFilter::All).unwrap();
        let urls: Vec<&str> = bookmarks.iter().map(|b| b.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com", "https://rust-lang.org"]);
    }

    #[test]
    fn test_filter_by_collection() {
        let db = create_test_db();
        let reading = db.collections().unwrap()[0].id;

        let in_reading = db.bookmarks(&BookmarkFilter::Collection(Some(reading))).unwrap();
        assert_eq!(in_reading.len(), 1);
        assert_eq!(in_reading[0].url, "https://rust-lang.org");

        let uncategorized = db.bookmarks(&BookmarkFilter::Collection(None)).unwrap();
        assert_eq!(uncategorized.len(), 1);
        assert_eq!(uncategorized[0].url, "https://example.com");

        let empty = db.bookmarks(&BookmarkFilter::Collection(Some(999))).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_filter_by_tag() {
        let db = create_test_db();

        let rust = db.bookmarks(&BookmarkFilter::Tag("rust".into())).unwrap();
        assert_eq!(rust.len(), 1);
        assert_eq!(rust[0].tags, vec!["programming", "rust"]);

        assert!(db
            .bookmarks(&BookmarkFilter::Tag("nonexistent".into()))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_update_keeps_timestamp() {
        let mut db = create_test_db();
        let mut target = db.bookmarks(&BookmarkFilter::All).unwrap().remove(0);
        let original_timestamp = target.timestamp;

        target.set_title(Some("Updated".to_string()));
        target.set_tags(vec!["new".to_string()]);
        target.timestamp = original_timestamp + Duration::days(3);
        assert!(db.update_bookmark(&target).unwrap());

        let found = db.get_bookmark(target.id).unwrap().unwrap();
        assert_eq!(found.title.as_deref(), Some("Updated"));
        assert_eq!(found.tags, vec!["new"]);
        assert_eq!(found.timestamp, original_timestamp);
    }

    #[test]
    fn test_update_missing_is_noop() {
        let mut db = create_test_db();
        let mut ghost = bookmark("https://ghost.com", &["ghost"]);
        ghost.id = 12345;

        assert!(!db.update_bookmark(&ghost).unwrap());
        assert_eq!(db.stats().unwrap().bookmarks, 2);
        assert!(db.tags().unwrap().iter().all(|t| t.name != "ghost"));
    }

    #[test]
    fn test_delete_bookmark() {
        let mut db = create_test_db();
        let id = db.bookmarks(&BookmarkFilter::All).unwrap()[0].id;

        assert!(db.delete_bookmark(id).unwrap());
        assert!(db.get_bookmark(id).unwrap().is_none());
        assert!(!db.delete_bookmark(id).unwrap());
        assert_eq!(db.stats().unwrap().bookmarks, 1);
    }

    #[test]
    fn test_collections() {
        let mut db = Database::open_in_memory().unwrap();
        let id = db
            .insert_collection(&Collection::new("Work").with_color("#BA1A1A"))
            .unwrap();

        let mut collection = db.get_collection(id).unwrap().unwrap();
        assert_eq!(collection.color, "#BA1A1A");

        collection.name = "Office".to_string();
        assert!(db.update_collection(&collection).unwrap());
        assert_eq!(db.collections().unwrap()[0].name, "Office");

        collection.id = 999;
        assert!(!db.update_collection(&collection).unwrap());
    }

    #[test]
    fn test_malformed_tag_column_is_a_read_error() {
        let db = create_test_db();
        // Simulate a corrupted association: a tag name cannot be forged
        // into invalid JSON, so break the decoder input directly.
        let err = BookmarkRow {
            id: 1,
            url: "https://a.com".into(),
            title: None,
            notes: None,
            collection_id: None,
            timestamp: 0,
            tags: "[broken".into(),
        }
        .into_bookmark()
        .unwrap_err();
        assert!(matches!(err, StoreError::Decode(DecodeError::Tags { .. })));
        assert_eq!(db.stats().unwrap().bookmarks, 2);
    }

    #[test]
    fn test_tags_with_counts() {
        let mut db = create_test_db();
        db.create_tag("unused").unwrap();

        let tags = db.tags_with_counts().unwrap();
        assert_eq!(tags.len(), 4);
        let unused = tags.iter().find(|(name, _)| name == "unused").unwrap();
        assert_eq!(unused.1, 0);
        assert_eq!(tags.last().unwrap().0, "unused");
    }

    #[test]
    fn test_create_tag_is_idempotent() {
        let mut db = Database::open_in_memory().unwrap();
        let first = db.create_tag("news").unwrap();
        let second = db.create_tag("news").unwrap();
        assert_eq!(first, second);
        assert_eq!(db.tags().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_tag() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_bookmark(&bookmark("https://a.com", &["news", "tech"]))
            .unwrap();
        db.insert_bookmark(&bookmark("https://b.com", &["sport", "news"]))
            .unwrap();
        db.insert_bookmark(&bookmark("https://c.com", &["tech"]))
            .unwrap();
        db.insert_bookmark(&Bookmark::template("news")).unwrap();
        db.insert_bookmark(&Bookmark::template("tech")).unwrap();

        let affected = db.delete_tag("news").unwrap();
        assert_eq!(affected, 3);

        let bookmarks = db.bookmarks(&BookmarkFilter::All).unwrap();
        assert_eq!(bookmarks.len(), 4);
        assert!(bookmarks.iter().all(|b| !b.has_tag("news")));
        assert!(bookmarks.iter().all(|b| b.url != "tag://news"));
        assert!(bookmarks.iter().any(|b| b.url == "tag://tech"));

        let b = bookmarks.iter().find(|b| b.url == "https://b.com").unwrap();
        assert_eq!(b.tags, vec!["sport"]);

        let names: Vec<String> = db.tags().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["sport", "tech"]);
    }

    #[test]
    fn test_rename_tag_keeps_position() {
        let mut db = Database::open_in_memory().unwrap();
        let id = db
            .insert_bookmark(&bookmark("https://a.com", &["one", "two", "three"]))
            .unwrap();

        assert_eq!(db.rename_tag("two", "deux").unwrap(), 1);

        let found = db.get_bookmark(id).unwrap().unwrap();
        assert_eq!(found.tags, vec!["one", "deux", "three"]);
        assert!(db.tags().unwrap().iter().all(|t| t.name != "two"));
    }

    #[test]
    fn test_rename_tag_merges_into_existing() {
        let mut db = Database::open_in_memory().unwrap();
        let both = db
            .insert_bookmark(&bookmark("https://a.com", &["rs", "rust"]))
            .unwrap();
        let old = db.insert_bookmark(&bookmark("https://b.com", &["rs"])).unwrap();

        assert_eq!(db.rename_tag("rs", "rust").unwrap(), 2);

        assert_eq!(db.get_bookmark(both).unwrap().unwrap().tags, vec!["rust"]);
        assert_eq!(db.get_bookmark(old).unwrap().unwrap().tags, vec!["rust"]);
        assert_eq!(db.tags().unwrap().len(), 1);
        assert_eq!(db.rename_tag("missing", "x").unwrap(), 0);
    }

    #[test]
    fn test_rename_tag_merges_templates() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_bookmark(&Bookmark::template("rs")).unwrap();
        db.insert_bookmark(&Bookmark::template("rust")).unwrap();

        db.rename_tag("rs", "rust").unwrap();

        let templates: Vec<String> = db
            .bookmarks(&BookmarkFilter::All)
            .unwrap()
            .into_iter()
            .filter(|b| b.is_template())
            .map(|b| b.url)
            .collect();
        assert_eq!(templates, vec!["tag://rust"]);
        assert_eq!(db.tags().unwrap().len(), 1);
    }

    #[test]
    fn test_rename_tag_moves_lone_template() {
        let mut db = Database::open_in_memory().unwrap();
        let id = db.insert_bookmark(&Bookmark::template("rs")).unwrap();

        db.rename_tag("rs", "rust").unwrap();

        let template = db.get_bookmark(id).unwrap().unwrap();
        assert_eq!(template.url, "tag://rust");
        assert_eq!(template.tags, vec!["rust"]);
    }

    #[test]
    fn test_snapshot_reads_everything() {
        let mut db = create_test_db();
        db.create_tag("standalone").unwrap();

        let snapshot = db.snapshot().unwrap();
        assert_eq!(snapshot.bookmarks.len(), 2);
        assert_eq!(snapshot.collections.len(), 1);
        assert_eq!(
            snapshot.tags,
            vec!["example", "programming", "rust", "standalone"]
        );
    }

    #[test]
    fn test_special_characters_in_content() {
        let mut db = Database::open_in_memory().unwrap();

        let mut b = bookmark(
            "https://example.com/path?query=value&other=123",
            &["tag-with-dash", "tag_with_underscore", "with \"quotes\""],
        );
        b.set_title(Some("Test \"quotes\" and 'apostrophes'".to_string()));
        b.set_notes(Some("Notes with\nnewlines\tand\ttabs".to_string()));
        let id = db.insert_bookmark(&b).unwrap();

        let found = db.get_bookmark(id).unwrap().unwrap();
        assert_eq!(found.title, b.title);
        assert!(found.notes.as_ref().unwrap().contains('\n'));
        assert_eq!(found.tags, b.tags);
    }
}
