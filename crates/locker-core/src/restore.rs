//! Restore engine
//!
//! Replaces the whole store with the contents of a [`Snapshot`]. Records are
//! validated first, then everything is deleted and reinserted in a single
//! transaction. Collections get fresh ids and every bookmark's collection
//! reference is remapped to the new id of the collection it pointed at.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{info, warn};

use crate::models::{normalize_tag_name, ValidationError};
use crate::snapshot::Snapshot;
use crate::storage::error::StoreResult;
use crate::storage::query::{
    clear_all_data, ensure_tag, insert_bookmark_row, insert_collection_row, select_tags, Database,
};

/// What a restore wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RestoreSummary {
    pub bookmarks: usize,
    pub collections: usize,
    pub tags: usize,
    /// Bookmarks whose collection was not part of the snapshot
    pub cleared_references: usize,
}

/// Validated, normalized copy of a snapshot
///
/// Fails on the first invalid record, before anything is written. Collection
/// ids must be unique since bookmark references are remapped through them.
pub fn prepare(snapshot: &Snapshot) -> Result<Snapshot, ValidationError> {
    let mut seen = HashSet::with_capacity(snapshot.collections.len());
    if let Some(duplicate) = snapshot.collections.iter().find(|c| !seen.insert(c.id)) {
        return Err(ValidationError::DuplicateCollectionId(duplicate.id));
    }

    let bookmarks = snapshot
        .bookmarks
        .iter()
        .map(|b| b.normalized())
        .collect::<Result<Vec<_>, _>>()?;
    let collections = snapshot
        .collections
        .iter()
        .map(|c| c.normalized())
        .collect::<Result<Vec<_>, _>>()?;

    let mut tags: Vec<String> = Vec::with_capacity(snapshot.tags.len());
    for tag in &snapshot.tags {
        let tag = normalize_tag_name(tag)?;
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    Ok(Snapshot {
        bookmarks,
        collections,
        tags,
    })
}

/// Replace the store's contents with `snapshot`
///
/// On any failure the transaction is rolled back and the previous contents
/// are kept.
pub fn restore(db: &mut Database, snapshot: &Snapshot) -> StoreResult<RestoreSummary> {
    let snapshot = prepare(snapshot)?;

    let tx = db.connection_mut().transaction()?;
    clear_all_data(&tx)?;

    let mut collection_ids: HashMap<i64, i64> = HashMap::with_capacity(snapshot.collections.len());
    for collection in &snapshot.collections {
        let new_id = insert_collection_row(&tx, collection)?;
        collection_ids.insert(collection.id, new_id);
    }

    for tag in &snapshot.tags {
        ensure_tag(&tx, tag)?;
    }

    let mut cleared_references = 0;
    for bookmark in &snapshot.bookmarks {
        let mut bookmark = bookmark.clone();
        if let Some(old_id) = bookmark.collection_id {
            bookmark.collection_id = collection_ids.get(&old_id).copied();
            if bookmark.collection_id.is_none() {
                warn!(
                    "Bookmark {} references collection {} which is not in the backup; clearing",
                    bookmark.url, old_id
                );
                cleared_references += 1;
            }
        }
        insert_bookmark_row(&tx, &bookmark)?;
    }

    let tags = select_tags(&tx)?.len();
    tx.commit()?;

    let summary = RestoreSummary {
        bookmarks: snapshot.bookmarks.len(),
        collections: snapshot.collections.len(),
        tags,
        cleared_references,
    };
    info!(
        "Restored {} bookmark(s), {} collection(s), {} tag(s)",
        summary.bookmarks, summary.collections, summary.tags
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bookmark, Collection};
    use crate::storage::error::StoreError;
    use crate::storage::query::BookmarkFilter;

    fn seeded_db() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        let existing = db.insert_collection(&Collection::new("Existing")).unwrap();
        let mut bookmark = Bookmark::new("https://existing.com");
        bookmark.set_tags(vec!["old".to_string()]);
        bookmark.set_collection(Some(existing));
        db.insert_bookmark(&bookmark).unwrap();
        db
    }

    fn snapshot_with_association() -> Snapshot {
        let mut reading = Collection::new("Reading");
        reading.id = 1;
        let mut bookmark = Bookmark::new("https://a.com");
        bookmark.id = 10;
        bookmark.set_collection(Some(1));
        bookmark.set_tags(vec!["news".to_string()]);
        Snapshot {
            bookmarks: vec![bookmark],
            collections: vec![reading],
            tags: vec!["news".to_string(), "unused".to_string()],
        }
    }

    #[test]
    fn test_restore_replaces_contents() {
        let mut db = seeded_db();

        let summary = restore(&mut db, &snapshot_with_association()).unwrap();
        assert_eq!(
            summary,
            RestoreSummary {
                bookmarks: 1,
                collections: 1,
                tags: 2,
                cleared_references: 0,
            }
        );

        let bookmarks = db.bookmarks(&BookmarkFilter::All).unwrap();
        assert_eq!(bookmarks.len(), 1);
        assert_eq!(bookmarks[0].url, "https://a.com");
        let names: Vec<String> = db.tags().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["news", "unused"]);
    }

    #[test]
    fn test_restore_remaps_collection_ids() {
        let mut db = seeded_db();
        restore(&mut db, &snapshot_with_association()).unwrap();

        let collections = db.collections().unwrap();
        assert_eq!(collections.len(), 1);
        let new_id = collections[0].id;
        assert_ne!(new_id, 1);

        let bookmark = &db.bookmarks(&BookmarkFilter::All).unwrap()[0];
        assert_eq!(bookmark.collection_id, Some(new_id));
        assert_ne!(bookmark.id, 10);
    }

    #[test]
    fn test_dangling_reference_is_cleared() {
        let mut db = Database::open_in_memory().unwrap();
        let mut snapshot = snapshot_with_association();
        snapshot.bookmarks[0].set_collection(Some(99));

        let summary = restore(&mut db, &snapshot).unwrap();
        assert_eq!(summary.cleared_references, 1);

        let uncategorized = db.bookmarks(&BookmarkFilter::Collection(None)).unwrap();
        assert_eq!(uncategorized.len(), 1);
    }

    #[test]
    fn test_duplicate_collection_ids_are_rejected() {
        let mut db = seeded_db();
        let mut snapshot = snapshot_with_association();
        let mut second = Collection::new("Later");
        second.id = 1;
        snapshot.collections.push(second);

        let err = restore(&mut db, &snapshot).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::DuplicateCollectionId(1))
        ));

        let collections = db.collections().unwrap();
        assert_eq!(collections.len(), 1);
        assert_eq!(collections[0].name, "Existing");
        let bookmarks = db.bookmarks(&BookmarkFilter::All).unwrap();
        assert_eq!(bookmarks[0].url, "https://existing.com");
    }

    #[test]
    fn test_invalid_record_leaves_store_untouched() {
        let mut db = seeded_db();
        let mut snapshot = snapshot_with_association();
        snapshot.collections.push(Collection::new("   "));

        let err = restore(&mut db, &snapshot).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::BlankCollectionName)
        ));
        assert_eq!(db.bookmarks(&BookmarkFilter::All).unwrap()[0].url, "https://existing.com");
    }

    #[test]
    fn test_failure_mid_restore_rolls_back() {
        let mut db = seeded_db();
        db.connection()
            .execute_batch(
                r#"
                CREATE TRIGGER reject_boom BEFORE INSERT ON bookmarks
                WHEN NEW.url = 'https://boom.com'
                BEGIN SELECT RAISE(ABORT, 'boom'); END;
                "#,
            )
            .unwrap();

        let mut snapshot = snapshot_with_association();
        snapshot.bookmarks.push(Bookmark::new("https://boom.com"));

        let err = restore(&mut db, &snapshot).unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));

        let bookmarks = db.bookmarks(&BookmarkFilter::All).unwrap();
        assert_eq!(bookmarks.len(), 1);
        assert_eq!(bookmarks[0].url, "https://existing.com");
        assert_eq!(bookmarks[0].tags, vec!["old"]);
        assert_eq!(db.collections().unwrap()[0].name, "Existing");
    }

    #[test]
    fn test_prepare_normalizes() {
        let mut snapshot = snapshot_with_association();
        snapshot.bookmarks[0].url = "example.com".to_string();
        snapshot.tags = vec![" news ".to_string(), "news".to_string()];

        let prepared = prepare(&snapshot).unwrap();
        assert_eq!(prepared.bookmarks[0].url, "https://example.com");
        assert_eq!(prepared.tags, vec!["news"]);
    }
}
