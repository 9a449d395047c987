//! Tag codec
//!
//! An ordered tag sequence travels between Rust and SQLite as a JSON array
//! of strings. Writes hand the encoded array to `json_each`, reads get it
//! back from `json_group_array`.

use crate::storage::error::DecodeError;

/// Encode tags as a JSON array, `[]` for none
pub fn encode(tags: &[String]) -> String {
    // Serializing a slice of strings cannot fail.
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

/// Decode a JSON array of strings back into tags
pub fn decode(value: &str) -> Result<Vec<String>, DecodeError> {
    serde_json::from_str(value).map_err(|source| DecodeError::Tags {
        value: value.to_string(),
        source,
    })
}
