//! Store worker
//!
//! A dedicated thread owns the SQLite connection and applies commands one at
//! a time in the order they were submitted. Every command carries a oneshot
//! reply, so callers await completion instead of firing and forgetting.
//!
//! After each successful write the worker re-runs every live query that
//! depends on a touched table and pushes the fresh result to its watchers.

use std::thread;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

use super::error::{StoreError, StoreResult};
use super::live::LiveQuery;
use super::query::{BookmarkFilter, Database, StoreStats};
use crate::models::{Bookmark, Collection, Tag};
use crate::restore::{self, RestoreSummary};
use crate::snapshot::Snapshot;

/// Capacity of the command queue
const COMMAND_QUEUE: usize = 64;

type Reply<T> = oneshot::Sender<StoreResult<T>>;

/// Commands sent to the store worker
pub(crate) enum Command {
    InsertBookmark {
        bookmark: Bookmark,
        reply: Reply<i64>,
    },
    UpdateBookmark {
        bookmark: Bookmark,
        reply: Reply<()>,
    },
    DeleteBookmark {
        id: i64,
        reply: Reply<()>,
    },
    GetBookmark {
        id: i64,
        reply: Reply<Option<Bookmark>>,
    },
    Bookmarks {
        filter: BookmarkFilter,
        reply: Reply<Vec<Bookmark>>,
    },
    WatchBookmarks {
        filter: BookmarkFilter,
        reply: Reply<LiveQuery<Bookmark>>,
    },
    InsertCollection {
        collection: Collection,
        reply: Reply<i64>,
    },
    UpdateCollection {
        collection: Collection,
        reply: Reply<()>,
    },
    GetCollection {
        id: i64,
        reply: Reply<Option<Collection>>,
    },
    Collections {
        reply: Reply<Vec<Collection>>,
    },
    WatchCollections {
        reply: Reply<LiveQuery<Collection>>,
    },
    CreateTag {
        name: String,
        reply: Reply<i64>,
    },
    RenameTag {
        from: String,
        to: String,
        reply: Reply<usize>,
    },
    DeleteTag {
        name: String,
        reply: Reply<usize>,
    },
    Tags {
        reply: Reply<Vec<Tag>>,
    },
    TagCounts {
        reply: Reply<Vec<(String, i64)>>,
    },
    WatchTags {
        reply: Reply<LiveQuery<Tag>>,
    },
    Stats {
        reply: Reply<StoreStats>,
    },
    Export {
        reply: Reply<Snapshot>,
    },
    Restore {
        snapshot: Snapshot,
        reply: Reply<RestoreSummary>,
    },
    /// Close the connection and stop the worker
    Shutdown { done: oneshot::Sender<()> },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::InsertBookmark { .. } => "insert_bookmark",
            Command::UpdateBookmark { .. } => "update_bookmark",
            Command::DeleteBookmark { .. } => "delete_bookmark",
            Command::GetBookmark { .. } => "get_bookmark",
            Command::Bookmarks { .. } => "bookmarks",
            Command::WatchBookmarks { .. } => "watch_bookmarks",
            Command::InsertCollection { .. } => "insert_collection",
            Command::UpdateCollection { .. } => "update_collection",
            Command::GetCollection { .. } => "get_collection",
            Command::Collections { .. } => "collections",
            Command::WatchCollections { .. } => "watch_collections",
            Command::CreateTag { .. } => "create_tag",
            Command::RenameTag { .. } => "rename_tag",
            Command::DeleteTag { .. } => "delete_tag",
            Command::Tags { .. } => "tags",
            Command::TagCounts { .. } => "tag_counts",
            Command::WatchTags { .. } => "watch_tags",
            Command::Stats { .. } => "stats",
            Command::Export { .. } => "export",
            Command::Restore { .. } => "restore",
            Command::Shutdown { .. } => "shutdown",
        }
    }
}

/// Tables a write touched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Touched {
    bookmarks: bool,
    collections: bool,
    tags: bool,
}

impl Touched {
    const NONE: Touched = Touched {
        bookmarks: false,
        collections: false,
        tags: false,
    };
    const BOOKMARKS: Touched = Touched {
        bookmarks: true,
        collections: false,
        tags: true,
    };
    const COLLECTIONS: Touched = Touched {
        bookmarks: false,
        collections: true,
        tags: false,
    };
    const TAGS: Touched = Touched {
        bookmarks: false,
        collections: false,
        tags: true,
    };
    const ALL: Touched = Touched {
        bookmarks: true,
        collections: true,
        tags: true,
    };

    fn any(self) -> bool {
        self.bookmarks || self.collections || self.tags
    }
}

/// A registered live query
enum LiveSlot {
    Bookmarks {
        filter: BookmarkFilter,
        tx: watch::Sender<Vec<Bookmark>>,
    },
    Collections(watch::Sender<Vec<Collection>>),
    Tags(watch::Sender<Vec<Tag>>),
}

impl LiveSlot {
    fn is_closed(&self) -> bool {
        match self {
            LiveSlot::Bookmarks { tx, .. } => tx.is_closed(),
            LiveSlot::Collections(tx) => tx.is_closed(),
            LiveSlot::Tags(tx) => tx.is_closed(),
        }
    }

    /// Bookmark reads join the tag tables, so they depend on both
    fn depends_on(&self, touched: Touched) -> bool {
        match self {
            LiveSlot::Bookmarks { .. } => touched.bookmarks || touched.tags,
            LiveSlot::Collections(_) => touched.collections,
            LiveSlot::Tags(_) => touched.tags,
        }
    }

    fn refresh(&self, db: &Database) -> StoreResult<()> {
        match self {
            LiveSlot::Bookmarks { filter, tx } => {
                tx.send_replace(db.bookmarks(filter)?);
            }
            LiveSlot::Collections(tx) => {
                tx.send_replace(db.collections()?);
            }
            LiveSlot::Tags(tx) => {
                tx.send_replace(db.tags()?);
            }
        }
        Ok(())
    }
}

/// Cloneable handle to the store worker
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<Command>,
}

impl StoreHandle {
    /// Submit a command and wait for its reply
    pub(crate) async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> StoreResult<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| StoreError::Closed)?;
        rx.await.map_err(|_| StoreError::Closed)?
    }

    /// Ask the worker to close the connection, waiting until it has
    ///
    /// Commands already queued are applied first.
    pub(crate) async fn shutdown(&self) {
        let (done, rx) = oneshot::channel();
        if self.tx.send(Command::Shutdown { done }).await.is_ok() {
            let _ = rx.await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Start the worker thread that owns `db`
pub(crate) fn spawn(db: Database) -> StoreResult<StoreHandle> {
    let (tx, rx) = mpsc::channel(COMMAND_QUEUE);

    thread::Builder::new()
        .name("locker-store".to_string())
        .spawn(move || run(db, rx))
        .map_err(StoreError::Worker)?;

    Ok(StoreHandle { tx })
}

/// Worker loop: apply commands until shutdown or every handle is dropped
fn run(mut db: Database, mut rx: mpsc::Receiver<Command>) {
    let mut live: Vec<LiveSlot> = Vec::new();
    debug!("Store worker started");

    while let Some(command) = rx.blocking_recv() {
        debug!("Store command: {}", command.name());

        if let Command::Shutdown { done } = command {
            drop(live);
            drop(db);
            let _ = done.send(());
            debug!("Store worker shut down");
            return;
        }

        handle(&mut db, &mut live, command);
    }

    debug!("Store worker stopped: all handles dropped");
}

fn handle(db: &mut Database, live: &mut Vec<LiveSlot>, command: Command) {
    match command {
        Command::InsertBookmark { bookmark, reply } => {
            let result = db.insert_bookmark(&bookmark);
            settle(db, live, reply, result, Touched::BOOKMARKS);
        }
        Command::UpdateBookmark { bookmark, reply } => {
            let result = db.update_bookmark(&bookmark);
            settle_changed(db, live, reply, result, Touched::BOOKMARKS);
        }
        Command::DeleteBookmark { id, reply } => {
            let result = db.delete_bookmark(id);
            settle_changed(db, live, reply, result, Touched::BOOKMARKS);
        }
        Command::GetBookmark { id, reply } => {
            let _ = reply.send(db.get_bookmark(id));
        }
        Command::Bookmarks { filter, reply } => {
            let _ = reply.send(db.bookmarks(&filter));
        }
        Command::WatchBookmarks { filter, reply } => {
            let result = db.bookmarks(&filter).map(|initial| {
                let (tx, rx) = watch::channel(initial);
                live.push(LiveSlot::Bookmarks { filter, tx });
                LiveQuery::new(rx)
            });
            let _ = reply.send(result);
        }
        Command::InsertCollection { collection, reply } => {
            let result = db.insert_collection(&collection);
            settle(db, live, reply, result, Touched::COLLECTIONS);
        }
        Command::UpdateCollection { collection, reply } => {
            let result = db.update_collection(&collection);
            settle_changed(db, live, reply, result, Touched::COLLECTIONS);
        }
        Command::GetCollection { id, reply } => {
            let _ = reply.send(db.get_collection(id));
        }
        Command::Collections { reply } => {
            let _ = reply.send(db.collections());
        }
        Command::WatchCollections { reply } => {
            let result = db.collections().map(|initial| {
                let (tx, rx) = watch::channel(initial);
                live.push(LiveSlot::Collections(tx));
                LiveQuery::new(rx)
            });
            let _ = reply.send(result);
        }
        Command::CreateTag { name, reply } => {
            let result = db.create_tag(&name);
            settle(db, live, reply, result, Touched::TAGS);
        }
        Command::RenameTag { from, to, reply } => {
            let result = db.rename_tag(&from, &to);
            settle(db, live, reply, result, Touched::TAGS);
        }
        Command::DeleteTag { name, reply } => {
            let result = db.delete_tag(&name);
            settle(db, live, reply, result, Touched::TAGS);
        }
        Command::Tags { reply } => {
            let _ = reply.send(db.tags());
        }
        Command::TagCounts { reply } => {
            let _ = reply.send(db.tags_with_counts());
        }
        Command::WatchTags { reply } => {
            let result = db.tags().map(|initial| {
                let (tx, rx) = watch::channel(initial);
                live.push(LiveSlot::Tags(tx));
                LiveQuery::new(rx)
            });
            let _ = reply.send(result);
        }
        Command::Stats { reply } => {
            let _ = reply.send(db.stats());
        }
        Command::Export { reply } => {
            let _ = reply.send(db.snapshot());
        }
        Command::Restore { snapshot, reply } => {
            let result = restore::restore(db, &snapshot);
            settle(db, live, reply, result, Touched::ALL);
        }
        Command::Shutdown { done } => {
            let _ = done.send(());
        }
    }
}

/// Notify live queries after a successful write, then reply
///
/// Watchers see the new state before the writer's future resolves.
fn settle<T>(
    db: &Database,
    live: &mut Vec<LiveSlot>,
    reply: Reply<T>,
    result: StoreResult<T>,
    touched: Touched,
) {
    if result.is_ok() {
        notify(db, live, touched);
    }
    // The caller may have stopped waiting.
    let _ = reply.send(result);
}

/// Like [`settle`] for writes that report whether a row matched
fn settle_changed(
    db: &Database,
    live: &mut Vec<LiveSlot>,
    reply: Reply<()>,
    result: StoreResult<bool>,
    touched: Touched,
) {
    let touched = match result {
        Ok(true) => touched,
        _ => Touched::NONE,
    };
    settle(db, live, reply, result.map(|_| ()), touched);
}

fn notify(db: &Database, live: &mut Vec<LiveSlot>, touched: Touched) {
    if !touched.any() {
        return;
    }

    live.retain(|slot| !slot.is_closed());
    for slot in live.iter().filter(|slot| slot.depends_on(touched)) {
        if let Err(e) = slot.refresh(db) {
            warn!("Failed to refresh live query: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_in_memory() -> StoreHandle {
        spawn(Database::open_in_memory().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_commands_apply_in_order() {
        let handle = spawn_in_memory();

        let id = handle
            .request(|reply| Command::InsertBookmark {
                bookmark: Bookmark::new("https://a.com"),
                reply,
            })
            .await
            .unwrap();
        handle
            .request(|reply| Command::DeleteBookmark { id, reply })
            .await
            .unwrap();

        let all = handle
            .request(|reply| Command::Bookmarks {
                filter: BookmarkFilter::All,
                reply,
            })
            .await
            .unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_live_query_sees_write_before_reply() {
        let handle = spawn_in_memory();
        let live = handle
            .request(|reply| Command::WatchBookmarks {
                filter: BookmarkFilter::All,
                reply,
            })
            .await
            .unwrap();
        assert!(live.current().is_empty());

        handle
            .request(|reply| Command::InsertBookmark {
                bookmark: Bookmark::new("https://a.com"),
                reply,
            })
            .await
            .unwrap();

        assert!(live.has_changed());
        assert_eq!(live.current().len(), 1);
    }

    #[tokio::test]
    async fn test_collection_write_does_not_touch_bookmark_queries() {
        let handle = spawn_in_memory();
        let live = handle
            .request(|reply| Command::WatchBookmarks {
                filter: BookmarkFilter::All,
                reply,
            })
            .await
            .unwrap();

        handle
            .request(|reply| Command::InsertCollection {
                collection: Collection::new("Reading"),
                reply,
            })
            .await
            .unwrap();

        assert!(!live.has_changed());
    }

    #[tokio::test]
    async fn test_dropped_live_queries_are_pruned() {
        let handle = spawn_in_memory();
        let live = handle
            .request(|reply| Command::WatchTags { reply })
            .await
            .unwrap();
        drop(live);

        // Refreshing a dropped slot must not fail the write.
        let id = handle
            .request(|reply| Command::CreateTag {
                name: "rust".to_string(),
                reply,
            })
            .await
            .unwrap();
        assert!(id > 0);
    }

    #[tokio::test]
    async fn test_shutdown_closes_store() {
        let handle = spawn_in_memory();
        let mut live = handle
            .request(|reply| Command::WatchCollections { reply })
            .await
            .unwrap();

        handle.shutdown().await;

        let err = handle
            .request(|reply| Command::Collections { reply })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Closed));
        assert!(live.changed().await.is_none());
    }
}
