//! Backup documents
//!
//! A [`Snapshot`] is the full state of the store: every bookmark, every
//! collection and every tag name. It is written to disk as pretty-printed
//! JSON and parsed back strictly; a document that does not parse is never
//! partially applied.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Bookmark, Collection};
use crate::storage::error::DecodeError;

/// Prefix of generated backup file names
pub const BACKUP_FILE_PREFIX: &str = "BookmarkLocker_Backup_";

/// Full exported state of the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub bookmarks: Vec<Bookmark>,
    pub collections: Vec<Collection>,
    /// Every known tag, including ones no bookmark carries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Snapshot {
    /// Serialize to a pretty-printed JSON document
    pub fn serialize(&self) -> String {
        // Plain strings, integers and vectors always serialize.
        serde_json::to_string_pretty(self).unwrap_or_else(|_| String::from("{}"))
    }

    /// Parse a JSON document produced by [`Snapshot::serialize`]
    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        serde_json::from_str(text).map_err(DecodeError::Snapshot)
    }

    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty() && self.collections.is_empty() && self.tags.is_empty()
    }
}

/// File name for a backup taken now
pub fn default_backup_file_name() -> String {
    backup_file_name(Utc::now())
}

/// `BookmarkLocker_Backup_<epoch-millis>.json`
pub fn backup_file_name(at: DateTime<Utc>) -> String {
    format!("{}{}.json", BACKUP_FILE_PREFIX, at.timestamp_millis())
}
