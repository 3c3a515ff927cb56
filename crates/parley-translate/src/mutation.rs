use std::sync::LazyLock;

use parley_query::DocumentMutation;
use regex::Regex;

use crate::coerce::{coerce, unquote};
use crate::error::TranslateError;
use crate::literal;

/// `field: value` or `field = value`; the value runs to the next comma.
static ASSIGNMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b([a-z_][\w.]*)\s*[:=]\s*([^,]+)").unwrap());

/// Parse insert/update data.
///
/// A JSON object is used verbatim. Otherwise each assignment is coerced and
/// stored as a literal value; text is never turned into a match pattern.
pub fn parse_mutation(text: &str) -> Result<DocumentMutation, TranslateError> {
    if let Some(doc) = literal::parse_document(text) {
        if doc.is_empty() {
            return Err(TranslateError::UnparseableMutation);
        }
        return Ok(DocumentMutation::from_document(doc));
    }

    let mut mutation = DocumentMutation::new();
    for caps in ASSIGNMENT.captures_iter(text) {
        let value = unquote(&caps[2]);
        if value.is_empty() {
            continue;
        }
        mutation.set(&caps[1], coerce(value));
    }

    if mutation.is_empty() {
        return Err(TranslateError::UnparseableMutation);
    }
    Ok(mutation)
}
