use std::collections::BTreeMap;

use bson::{Bson, Document, doc};

use crate::operator::Comparison;
use crate::value::Scalar;

/// Case-insensitive substring matcher over a string field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub text: String,
    pub case_insensitive: bool,
}

impl Pattern {
    pub fn substring(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            case_insensitive: true,
        }
    }

    /// Render as a `$regex` operator document. The text is escaped so it
    /// always matches literally.
    pub fn to_document(&self) -> Document {
        let mut doc = doc! { "$regex": regex::escape(&self.text) };
        if self.case_insensitive {
            doc.insert("$options", "i");
        }
        doc
    }
}

/// The constraint placed on a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Exact equality against a non-text scalar.
    Exact(Scalar),
    Matches(Pattern),
    Compare(Comparison, Scalar),
}

impl FilterValue {
    /// Text is fuzzy-matched; every other scalar is compared exactly.
    pub fn from_scalar(value: Scalar) -> Self {
        match value {
            Scalar::Text(text) => FilterValue::Matches(Pattern::substring(text)),
            other => FilterValue::Exact(other),
        }
    }

    pub fn to_bson(&self) -> Bson {
        match self {
            FilterValue::Exact(v) => v.to_bson(),
            FilterValue::Matches(p) => Bson::Document(p.to_document()),
            FilterValue::Compare(op, v) => {
                let mut doc = Document::new();
                doc.insert(op.operator(), v.to_bson());
                Bson::Document(doc)
            }
        }
    }
}

/// Field-to-constraint map with implicit AND semantics.
///
/// Keys are unique and kept sorted, so two clauses built from the same text
/// always compare (and render) identically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterClause {
    entries: BTreeMap<String, FilterValue>,
}

impl FilterClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a constraint. A later constraint on the same field replaces the
    /// earlier one. Empty field names are ignored.
    pub fn insert(&mut self, field: impl Into<String>, value: FilterValue) -> Option<FilterValue> {
        let field = field.into();
        if field.is_empty() {
            return None;
        }
        self.entries.insert(field, value)
    }

    pub fn get(&self, field: &str) -> Option<&FilterValue> {
        self.entries.get(field)
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.entries.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        for (field, value) in &self.entries {
            doc.insert(field.clone(), value.to_bson());
        }
        doc
    }
}

/// The selection a find or count request resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// AND of field constraints. Empty means "no constraint".
    Fields(FilterClause),
    /// OR of substring matches of one term across several text fields.
    AnyField { fields: Vec<String>, term: String },
    /// Store-native full text search.
    Text(String),
    /// A structured filter document supplied verbatim by the caller.
    Literal(Document),
}

impl Filter {
    pub fn everything() -> Self {
        Filter::Fields(FilterClause::new())
    }

    pub fn is_unconstrained(&self) -> bool {
        match self {
            Filter::Fields(clause) => clause.is_empty(),
            Filter::Literal(doc) => doc.is_empty(),
            Filter::AnyField { fields, .. } => fields.is_empty(),
            Filter::Text(_) => false,
        }
    }

    /// Whether the filter explicitly constrains `field` at its top level.
    pub fn references(&self, field: &str) -> bool {
        match self {
            Filter::Fields(clause) => clause.contains_field(field),
            Filter::AnyField { fields, .. } => fields.iter().any(|f| f == field),
            Filter::Text(_) => false,
            Filter::Literal(doc) => doc.contains_key(field),
        }
    }

    pub fn to_document(&self) -> Document {
        match self {
            Filter::Fields(clause) => clause.to_document(),
            Filter::AnyField { fields, term } => {
                if fields.is_empty() {
                    return Document::new();
                }
                let pattern = Pattern::substring(term.clone()).to_document();
                let branches: Vec<Bson> = fields
                    .iter()
                    .map(|field| {
                        let mut branch = Document::new();
                        branch.insert(field.clone(), pattern.clone());
                        Bson::Document(branch)
                    })
                    .collect();
                doc! { "$or": branches }
            }
            Filter::Text(term) => doc! { "$text": { "$search": term.clone() } },
            Filter::Literal(doc) => doc.clone(),
        }
    }
}
