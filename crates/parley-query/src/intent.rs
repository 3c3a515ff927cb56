use bson::Document;
use bson::oid::ObjectId;

use crate::filter::Filter;

/// Outcome of classifying a read request.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedIntent {
    Count(Filter),
    Find(Filter),
    IdentifierLookup(ObjectId),
    /// Nothing could be classified; executed as an unconstrained, capped find.
    Invalid,
}

impl ParsedIntent {
    /// The filter document this intent selects with.
    pub fn filter_document(&self) -> Document {
        match self {
            ParsedIntent::Count(filter) | ParsedIntent::Find(filter) => filter.to_document(),
            ParsedIntent::IdentifierLookup(id) => bson::doc! { "_id": *id },
            ParsedIntent::Invalid => Document::new(),
        }
    }

    pub fn references(&self, field: &str) -> bool {
        match self {
            ParsedIntent::Count(filter) | ParsedIntent::Find(filter) => filter.references(field),
            ParsedIntent::IdentifierLookup(_) => field == "_id",
            ParsedIntent::Invalid => false,
        }
    }

    pub fn is_count(&self) -> bool {
        matches!(self, ParsedIntent::Count(_))
    }
}
