//! Storage layer
//!
//! Handles the SQLite record store and backup file persistence.
//!
//! ## Architecture
//!
//! - **SQLite**: Source of truth for bookmarks, collections and tags
//! - **Worker**: A single thread owns the connection and applies commands in
//!   submission order
//! - **Live queries**: Watch channels re-fed by the worker after each write
//! - **Backups**: JSON documents written atomically next to the database

pub mod error;
pub mod live;
pub mod persistence;
pub mod query;
pub mod schema;
pub mod worker;

pub use error::{DecodeError, StoreError, StoreResult};
pub use live::LiveQuery;
pub use query::{BookmarkFilter, Database, StoreStats};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
pub use worker::StoreHandle;
