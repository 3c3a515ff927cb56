use std::sync::LazyLock;

use parley_query::{Filter, FilterClause, ParsedIntent};
use regex::Regex;
use tracing::debug;

use crate::fields::{FieldSet, default_constraint, extract_fields};
use crate::identifier::extract_identifier;
use crate::literal;
use crate::terms::reduce;

static COUNTING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:count|how\s+many|number\s+of)\b").unwrap());

/// Filler that surrounds a counting request without constraining it.
const COUNT_FILLER: &[&str] = &[
    "all", "total", "do", "does", "we", "you", "have", "has", "there", "exist", "exists",
    "currently", "please", "what", "what's", "whats", "collection", "documents", "document",
    "records", "record", "entries", "items", "many", "count", "number", "how", "stored",
    "available", "our", "library",
];

/// Classify a read request.
///
/// Precedence: literal JSON filter, counting phrasing, embedded identifier,
/// field patterns, free-text search. Blank text is `Invalid`.
pub fn classify(text: &str, fields: Option<&FieldSet>) -> ParsedIntent {
    let intent = classify_inner(text, fields);
    debug!(?intent, "classified request");
    intent
}

fn classify_inner(text: &str, fields: Option<&FieldSet>) -> ParsedIntent {
    if let Some(doc) = literal::parse_document(text) {
        return ParsedIntent::Find(Filter::Literal(doc));
    }

    if let Some(keyword) = COUNTING.find(text) {
        let rest = format!("{} {}", &text[..keyword.start()], &text[keyword.end()..]);
        return ParsedIntent::Count(Filter::Fields(counting_clause(&rest, fields)));
    }

    if let Some(id) = extract_identifier(text) {
        return ParsedIntent::IdentifierLookup(id);
    }

    let clause = extract_fields(text, fields);
    if !clause.is_empty() {
        return ParsedIntent::Find(Filter::Fields(clause));
    }

    if text.trim().is_empty() {
        return ParsedIntent::Invalid;
    }

    let term = reduce(text);
    match fields {
        Some(set) if !set.text_fields().is_empty() => ParsedIntent::Find(Filter::AnyField {
            fields: set.text_fields(),
            term: strip_nouns(&term, set),
        }),
        _ => ParsedIntent::Find(Filter::Text(term)),
    }
}

/// Resolve the filter for an explicit count request.
///
/// Blank text counts everything; a JSON object is used verbatim; otherwise
/// the text is read like the sub-phrase of a counting request.
pub fn count_filter(text: &str, fields: Option<&FieldSet>) -> Filter {
    if text.trim().is_empty() {
        return Filter::everything();
    }
    if let Some(doc) = literal::parse_document(text) {
        return Filter::Literal(doc);
    }
    let text = COUNTING.replace(text, " ");
    Filter::Fields(counting_clause(&text, fields))
}

fn counting_clause(text: &str, fields: Option<&FieldSet>) -> FilterClause {
    let mut clause = extract_fields(text, fields);
    if clause.is_empty() {
        let leftover = fields.and_then(|set| default_constraint(text, set, COUNT_FILLER));
        if let Some((field, value)) = leftover {
            clause.insert(field, value);
        }
    }
    clause
}

fn strip_nouns(term: &str, set: &FieldSet) -> String {
    let kept: Vec<&str> = term.split_whitespace().filter(|w| !set.is_noun(w)).collect();
    if kept.is_empty() {
        term.to_string()
    } else {
        kept.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use parley_query::{FilterValue, Pattern};

    const HEX: &str = "507f1f77bcf86cd799439011";

    fn fuzzy(text: &str) -> FilterValue {
        FilterValue::Matches(Pattern::substring(text))
    }

    fn clause_of(intent: &ParsedIntent) -> &FilterClause {
        match intent {
            ParsedIntent::Count(Filter::Fields(c)) | ParsedIntent::Find(Filter::Fields(c)) => c,
            other => panic!("expected a field filter, got {other:?}"),
        }
    }

    #[test]
    fn count_fantasy_books() {
        let books = FieldSet::books();
        for text in ["count fantasy", "count fantasy books", "How many fantasy books do we have?"] {
            let intent = classify(text, Some(&books));
            assert!(intent.is_count(), "{text}");
            assert_eq!(clause_of(&intent).get("genre"), Some(&fuzzy("fantasy")), "{text}");
        }
    }

    #[test]
    fn count_everything() {
        let intent = classify("Count all books in the collection", Some(&FieldSet::books()));
        assert_eq!(intent, ParsedIntent::Count(Filter::everything()));

        let intent = classify("how many documents", None);
        assert_eq!(intent, ParsedIntent::Count(Filter::everything()));
    }

    #[test]
    fn count_takes_precedence_over_fields() {
        let intent = classify(
            "count books by author: King, genre: fantasy",
            Some(&FieldSet::books()),
        );
        assert!(intent.is_count());
        let clause = clause_of(&intent);
        assert_eq!(clause.get("author"), Some(&fuzzy("King")));
        assert_eq!(clause.get("genre"), Some(&fuzzy("fantasy")));
    }

    #[test]
    fn count_generic_collection() {
        let intent = classify("number of orders where status: completed", None);
        assert!(intent.is_count());
        assert_eq!(clause_of(&intent).get("status"), Some(&fuzzy("completed")));
    }

    #[test]
    fn counting_needs_a_whole_word() {
        let intent = classify("account_type: premium", None);
        assert!(!intent.is_count());
        let intent = classify("discount: 10", None);
        assert!(!intent.is_count());
    }

    #[test]
    fn status_active_is_find() {
        let intent = classify("status: active", None);
        let mut expected = FilterClause::new();
        expected.insert("status", fuzzy("active"));
        assert_eq!(intent, ParsedIntent::Find(Filter::Fields(expected)));
    }

    #[test]
    fn identifier_beats_fields() {
        let intent = classify(&format!("status: active id: {HEX}"), None);
        match intent {
            ParsedIntent::IdentifierLookup(id) => assert_eq!(id.to_hex(), HEX),
            other => panic!("expected identifier lookup, got {other:?}"),
        }
    }

    #[test]
    fn free_text_over_known_fields() {
        let intent = classify("find me fantasy books", Some(&FieldSet::books()));
        assert_eq!(
            intent,
            ParsedIntent::Find(Filter::AnyField {
                fields: vec!["title".into(), "author".into(), "genre".into(), "isbn".into()],
                term: "fantasy".into(),
            })
        );
    }

    #[test]
    fn free_text_without_known_fields() {
        let intent = classify("show me the wireless headphones", None);
        assert_eq!(
            intent,
            ParsedIntent::Find(Filter::Text("wireless headphones".into()))
        );
    }

    #[test]
    fn blank_is_invalid() {
        assert_eq!(classify("   ", None), ParsedIntent::Invalid);
    }

    #[test]
    fn literal_json_is_used_verbatim() {
        let intent = classify(r#"{"price": {"$gt": 100}}"#, None);
        match intent {
            ParsedIntent::Find(Filter::Literal(doc)) => {
                assert!(doc.get_document("price").unwrap().contains_key("$gt"));
            }
            other => panic!("expected literal filter, got {other:?}"),
        }
    }

    #[test]
    fn classification_is_deterministic() {
        let books = FieldSet::books();
        for text in ["count fantasy", "status: active", "Show me books by Stephen King", ""] {
            assert_eq!(classify(text, Some(&books)), classify(text, Some(&books)));
        }
    }

    #[test]
    fn explicit_count_filters() {
        assert_eq!(count_filter("", None), Filter::everything());
        assert_eq!(
            count_filter(r#"{"status": "done"}"#, None),
            Filter::Literal(doc! { "status": "done" })
        );
        let filter = count_filter("status: done", None);
        assert!(filter.references("status"));
    }
}
