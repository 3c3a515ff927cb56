//! Structured JSON input, used verbatim when the whole request parses.

use bson::Document;

/// Parse the request as a JSON object.
pub fn parse_document(text: &str) -> Option<Document> {
    let text = text.trim();
    if !text.starts_with('{') {
        return None;
    }
    serde_json::from_str(text).ok()
}

/// Parse the request as a pipeline: an array of stage objects, or a single
/// stage object.
pub fn parse_pipeline(text: &str) -> Option<Vec<Document>> {
    let text = text.trim();
    if text.starts_with('[') {
        return serde_json::from_str(text).ok();
    }
    parse_document(text).map(|stage| vec![stage])
}
