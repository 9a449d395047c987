//! Data models for Bookmark Locker
//!
//! Defines the core records: Bookmark, Collection and Tag, plus the
//! validation rules applied before a record reaches the store.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use url::{Host, Url};

/// URL prefix of legacy template bookmarks that stand for a bare tag
pub const TEMPLATE_SCHEME: &str = "tag://";

/// Color given to new collections
pub const DEFAULT_COLOR: &str = "#0062AD";

/// Color shown when a stored collection color is missing or unparsable
pub const FALLBACK_COLOR: &str = "#448AFF";

/// Rejected input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("URL cannot be empty")]
    BlankUrl,

    #[error("Invalid URL '{0}' (expected e.g. https://example.com)")]
    InvalidUrl(String),

    #[error("Collection name cannot be empty")]
    BlankCollectionName,

    #[error("Tag name cannot be empty")]
    BlankTagName,

    #[error("Collection id {0} appears more than once")]
    DuplicateCollectionId(i64),
}

/// A saved URL
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    /// Store-assigned identity, 0 until first insert
    #[serde(default)]
    pub id: i64,
    /// The URL (or `tag://<name>` for a template bookmark)
    pub url: String,
    /// Optional display title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Optional free-form notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Ordered tags, no duplicates
    pub tags: Vec<String>,
    /// Owning collection; not checked against the collections table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<i64>,
    /// Creation time, immutable after insert
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl Bookmark {
    /// Create an unsaved bookmark for the given URL
    ///
    /// The URL is validated and normalized on insert, not here.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: 0,
            url: url.into(),
            title: None,
            notes: None,
            tags: Vec::new(),
            collection_id: None,
            timestamp: now(),
        }
    }

    /// Create a template bookmark standing for the given tag
    pub fn template(tag: &str) -> Self {
        let mut bookmark = Self::new(format!("{}{}", TEMPLATE_SCHEME, tag));
        bookmark.title = Some(format!("Tag: {}", tag));
        bookmark.tags = vec![tag.to_string()];
        bookmark
    }

    /// Whether this record has been assigned an id by the store
    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }

    /// Whether this is a `tag://` template rather than a real page
    pub fn is_template(&self) -> bool {
        self.url.starts_with(TEMPLATE_SCHEME)
    }

    pub fn set_title(&mut self, title: Option<String>) {
        self.title = title;
    }

    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes;
    }

    pub fn set_collection(&mut self, collection_id: Option<i64>) {
        self.collection_id = collection_id;
    }

    /// Add a tag
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    /// Remove a tag
    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.retain(|t| t != tag);
    }

    /// Set all tags (replacing existing)
    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.tags = tags;
    }

    /// Replace `from` with `to` in place, dropping `from` if `to` is already present
    pub fn rename_tag(&mut self, from: &str, to: &str) {
        if self.has_tag(to) {
            self.remove_tag(from);
        } else if let Some(tag) = self.tags.iter_mut().find(|t| *t == from) {
            *tag = to.to_string();
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Validated copy ready for storage
    ///
    /// Prefixes a missing scheme with `https://`, turns blank title and notes
    /// into `None`, trims tags and drops blank or repeated ones.
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in &self.tags {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }

        Ok(Self {
            id: self.id,
            url: normalize_url(&self.url)?,
            title: non_blank(self.title.as_deref()),
            notes: non_blank(self.notes.as_deref()),
            tags,
            collection_id: self.collection_id,
            timestamp: self.timestamp,
        })
    }
}

/// A named, colored group of bookmarks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    /// Store-assigned identity, 0 until first insert
    #[serde(default)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Hex RGB color, not validated by the store
    #[serde(default = "default_color", deserialize_with = "color_or_default")]
    pub color: String,
    /// Creation time, immutable after insert
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Collection {
    /// Create an unsaved collection with the default color
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            color: default_color(),
            created_at: now(),
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }

    /// The color to render: the stored one if it parses, otherwise [`FALLBACK_COLOR`]
    pub fn display_color(&self) -> &str {
        if is_hex_color(&self.color) {
            &self.color
        } else {
            FALLBACK_COLOR
        }
    }

    /// Validated copy ready for storage
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::BlankCollectionName);
        }
        Ok(Self {
            id: self.id,
            name: name.to_string(),
            color: self.color.trim().to_string(),
            created_at: self.created_at,
        })
    }
}

/// A tag that bookmarks can reference
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

impl Tag {
    /// Create an unsaved tag
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
        }
    }

    /// Get the tag name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Trim a tag name, rejecting blank ones
pub fn normalize_tag_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        Err(ValidationError::BlankTagName)
    } else {
        Ok(name.to_string())
    }
}

/// Validate a user-entered URL, adding `https://` when no scheme is given
pub fn normalize_url(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankUrl);
    }

    if let Some(tag) = trimmed.strip_prefix(TEMPLATE_SCHEME) {
        normalize_tag_name(tag)?;
        return Ok(trimmed.to_string());
    }

    let lower = trimmed.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    if is_web_url(&candidate) {
        Ok(candidate)
    } else {
        Err(ValidationError::InvalidUrl(candidate))
    }
}

/// Current time truncated to what the store and backups keep
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn is_web_url(candidate: &str) -> bool {
    if candidate.chars().any(char::is_whitespace) {
        return false;
    }
    let Ok(parsed) = Url::parse(candidate) else {
        return false;
    };
    match parsed.host() {
        Some(Host::Domain(domain)) => domain == "localhost" || is_dotted_domain(domain),
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => true,
        None => false,
    }
}

fn is_dotted_domain(domain: &str) -> bool {
    let labels: Vec<&str> = domain.trim_end_matches('.').split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let well_formed = labels
        .iter()
        .all(|l| !l.is_empty() && !l.starts_with('-') && !l.ends_with('-'));
    let tld = labels[labels.len() - 1];
    well_formed && (tld.starts_with("xn--") || tld.chars().all(|c| c.is_ascii_alphabetic()))
}

fn is_hex_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(hex) => (hex.len() == 6 || hex.len() == 8) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn color_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_color))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bookmark_new() {
        let bookmark = Bookmark::new("https://example.com");
        assert_eq!(bookmark.url, "https://example.com");
        assert_eq!(bookmark.id, 0);
        assert!(!bookmark.is_persisted());
        assert!(bookmark.tags.is_empty());
        assert!(bookmark.title.is_none());
        assert!(bookmark.collection_id.is_none());
        assert_eq!(bookmark.timestamp.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn test_bookmark_tags() {
        let mut bookmark = Bookmark::new("https://example.com");
        bookmark.add_tag("rust");
        bookmark.add_tag("programming");
        assert_eq!(bookmark.tags, vec!["rust", "programming"]);

        // Adding duplicate should not add again
        bookmark.add_tag("rust");
        assert_eq!(bookmark.tags.len(), 2);

        bookmark.remove_tag("rust");
        assert_eq!(bookmark.tags, vec!["programming"]);
    }

    #[test]
    fn test_bookmark_rename_tag() {
        let mut bookmark = Bookmark::new("https://example.com");
        bookmark.set_tags(vec!["a".into(), "b".into(), "c".into()]);

        bookmark.rename_tag("b", "x");
        assert_eq!(bookmark.tags, vec!["a", "x", "c"]);

        // Renaming onto an existing tag merges
        bookmark.rename_tag("a", "c");
        assert_eq!(bookmark.tags, vec!["x", "c"]);
    }

    #[test]
    fn test_url_gets_https_prefix() {
        assert_eq!(normalize_url("example.com").unwrap(), "https://example.com");
        assert_eq!(
            normalize_url("  www.rust-lang.org/learn ").unwrap(),
            "https://www.rust-lang.org/learn"
        );
        assert_eq!(normalize_url("http://a.com").unwrap(), "http://a.com");
    }

    #[test]
    fn test_url_validation_errors() {
        assert_eq!(normalize_url("   "), Err(ValidationError::BlankUrl));
        assert!(matches!(
            normalize_url("not a url"),
            Err(ValidationError::InvalidUrl(_))
        ));
        assert!(matches!(
            normalize_url("nodots"),
            Err(ValidationError::InvalidUrl(_))
        ));
        assert!(matches!(
            normalize_url("ftp://files.example.com"),
            Err(ValidationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_url_accepts_hosts() {
        assert!(normalize_url("http://localhost:8080/app").is_ok());
        assert!(normalize_url("https://192.168.1.10/admin").is_ok());
        assert!(normalize_url("https://example.com/path?query=value&other=123").is_ok());
    }

    #[test]
    fn test_template_url() {
        assert_eq!(normalize_url("tag://news").unwrap(), "tag://news");
        assert_eq!(normalize_url("tag://  "), Err(ValidationError::BlankTagName));

        let template = Bookmark::template("news");
        assert!(template.is_template());
        assert_eq!(template.tags, vec!["news"]);
        assert!(!Bookmark::new("https://news.com").is_template());
    }

    #[test]
    fn test_bookmark_normalized() {
        let mut bookmark = Bookmark::new("example.com");
        bookmark.set_title(Some("".to_string()));
        bookmark.set_notes(Some("  keep me ".to_string()));
        bookmark.set_tags(vec![" rust ".into(), "rust".into(), "".into(), "web".into()]);

        let normalized = bookmark.normalized().unwrap();
        assert_eq!(normalized.url, "https://example.com");
        assert_eq!(normalized.title, None);
        assert_eq!(normalized.notes, Some("keep me".to_string()));
        assert_eq!(normalized.tags, vec!["rust", "web"]);
        assert_eq!(normalized.timestamp, bookmark.timestamp);
    }

    #[test]
    fn test_collection_new() {
        let collection = Collection::new("Reading");
        assert_eq!(collection.name, "Reading");
        assert_eq!(collection.color, DEFAULT_COLOR);
        assert!(!collection.is_persisted());
    }

    #[test]
    fn test_collection_validation() {
        assert_eq!(
            Collection::new("  ").normalized(),
            Err(ValidationError::BlankCollectionName)
        );
        assert_eq!(Collection::new(" Work ").normalized().unwrap().name, "Work");
    }

    #[test]
    fn test_display_color_fallback() {
        assert_eq!(Collection::new("a").display_color(), DEFAULT_COLOR);
        assert_eq!(
            Collection::new("a").with_color("#800080").display_color(),
            "#800080"
        );
        assert_eq!(
            Collection::new("a").with_color("purple").display_color(),
            FALLBACK_COLOR
        );
        assert_eq!(
            Collection::new("a").with_color("").display_color(),
            FALLBACK_COLOR
        );
    }

    #[test]
    fn test_bookmark_json_field_names() {
        let mut bookmark = Bookmark::new("https://a.com");
        bookmark.set_collection(Some(1));
        let json = serde_json::to_value(&bookmark).unwrap();

        assert_eq!(json["collectionId"], 1);
        assert!(json["timestamp"].is_i64());
        assert!(json["tags"].is_array());
        assert!(json.get("title").is_none());
    }

    #[test]
    fn test_collection_null_color_uses_default() {
        let json = r#"{"id": 3, "name": "Work", "color": null, "createdAt": 1700000000000}"#;
        let collection: Collection = serde_json::from_str(json).unwrap();
        assert_eq!(collection.color, DEFAULT_COLOR);
        assert_eq!(collection.created_at.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_tag_display() {
        let tag = Tag::new("rust");
        assert_eq!(format!("{}", tag), "rust");
        assert_eq!(tag.name(), "rust");
        assert_eq!(normalize_tag_name(" rust "), Ok("rust".to_string()));
        assert_eq!(normalize_tag_name(""), Err(ValidationError::BlankTagName));
    }
}
