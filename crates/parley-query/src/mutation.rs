use bson::{Bson, Document};

use crate::value::Scalar;

/// Field values to write on insert or `$set` on update.
///
/// Keeps the order fields appeared in the request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMutation {
    fields: Document,
}

impl DocumentMutation {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mutation supplied as a structured document.
    pub fn from_document(fields: Document) -> Self {
        Self { fields }
    }

    /// Set a field; a repeated field keeps the last value.
    pub fn set(&mut self, field: impl Into<String>, value: Scalar) {
        let field = field.into();
        if field.is_empty() {
            return;
        }
        self.fields.insert(field, Bson::from(value));
    }

    /// Stamp a timestamp field, overwriting any user-supplied value.
    pub fn stamp(&mut self, field: &str, at: bson::DateTime) {
        self.fields.insert(field, Bson::DateTime(at));
    }

    pub fn get(&self, field: &str) -> Option<&Bson> {
        self.fields.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn as_document(&self) -> &Document {
        &self.fields
    }

    pub fn into_document(self) -> Document {
        self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_keeps_literal_text() {
        let mut mutation = DocumentMutation::new();
        mutation.set("title", Scalar::Text("Dune".into()));
        mutation.set("pages", Scalar::Int(412));
        assert_eq!(mutation.get("title"), Some(&Bson::String("Dune".into())));
        assert_eq!(mutation.get("pages"), Some(&Bson::Int64(412)));
        let keys: Vec<&String> = mutation.as_document().keys().collect();
        assert_eq!(keys, ["title", "pages"]);
    }

    #[test]
    fn stamp_overwrites() {
        let mut mutation = DocumentMutation::new();
        mutation.set("created_at", Scalar::Text("yesterday".into()));
        let now = bson::DateTime::now();
        mutation.stamp("created_at", now);
        assert_eq!(mutation.get("created_at"), Some(&Bson::DateTime(now)));
    }
}
