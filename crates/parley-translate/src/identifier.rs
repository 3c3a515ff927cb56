use std::sync::LazyLock;

use bson::oid::ObjectId;
use regex::Regex;
use tracing::warn;

use crate::error::TranslateError;

/// A 24-hex run, bare or after `id` / `_id` with an optional separator.
/// Longer hex runs do not match.
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:\b|_?id\s*[:="]?\s*)([0-9a-f]{24})\b"#).unwrap());

/// Find the first embedded document identifier.
///
/// A run that fails to construct an identifier is skipped and scanning
/// continues with the next run.
pub fn extract_identifier(text: &str) -> Option<ObjectId> {
    let lowered = text.to_lowercase();
    for caps in IDENTIFIER.captures_iter(&lowered) {
        let run = &caps[1];
        match ObjectId::parse_str(run) {
            Ok(id) => return Some(id),
            Err(error) => warn!(run, %error, "discarding malformed identifier"),
        }
    }
    None
}

/// Parse an identifier supplied as an explicit argument.
pub fn parse_identifier(id: &str) -> Result<ObjectId, TranslateError> {
    let id = id.trim();
    ObjectId::parse_str(id).map_err(|_| TranslateError::MalformedIdentifier(id.to_string()))
}
