use std::fmt;

use bson::oid::ObjectId;
use bson::{Bson, Document};
use parley_store::Namespace;
use serde_json::{Map, Value, json};

use crate::error::DispatchError;

/// The result of an executed request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Databases(Vec<String>),
    Collections {
        database: String,
        collections: Vec<String>,
    },
    Description {
        ns: Namespace,
        document_count: u64,
        sample: Option<Document>,
    },
    Documents {
        ns: Namespace,
        documents: Vec<Document>,
    },
    Document {
        ns: Namespace,
        document: Document,
    },
    Counted {
        ns: Namespace,
        count: u64,
        filter: Document,
    },
    Aggregated {
        ns: Namespace,
        results: Vec<Document>,
    },
    Inserted {
        ns: Namespace,
        id: Bson,
    },
    Updated {
        ns: Namespace,
        id: ObjectId,
        modified: bool,
    },
    Deleted {
        ns: Namespace,
        id: ObjectId,
    },
    DeletedMany {
        ns: Namespace,
        deleted: u64,
        filter: Document,
    },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Databases(names) => pretty(f, json!({ "databases": names })),
            Outcome::Collections {
                database,
                collections,
            } => pretty(f, json!({ "database": database, "collections": collections })),
            Outcome::Description {
                ns,
                document_count,
                sample,
            } => {
                let fields: Vec<&str> = sample
                    .iter()
                    .flat_map(|doc| doc.keys().map(String::as_str))
                    .collect();
                let sample = sample.as_ref().map_or(Value::Null, document_json);
                pretty(
                    f,
                    json!({
                        "database": ns.database,
                        "collection": ns.collection,
                        "document_count": document_count,
                        "sample_fields": fields,
                        "sample_document": sample,
                    }),
                )
            }
            Outcome::Documents { ns, documents } if documents.is_empty() => {
                write!(f, "No documents found in {ns} matching your query.")
            }
            Outcome::Documents { ns, documents } => pretty(
                f,
                json!({
                    "database": ns.database,
                    "collection": ns.collection,
                    "results": documents.iter().map(document_json).collect::<Vec<_>>(),
                }),
            ),
            Outcome::Document { ns, document } => pretty(
                f,
                json!({
                    "database": ns.database,
                    "collection": ns.collection,
                    "document": document_json(document),
                }),
            ),
            Outcome::Counted { ns, count, filter } => {
                write!(f, "Found {count} documents in {ns} matching filter: ")?;
                describe_filter(f, filter)
            }
            Outcome::Aggregated { ns, results } if results.is_empty() => {
                write!(f, "No aggregation results for {ns}.")
            }
            Outcome::Aggregated { ns, results } => pretty(
                f,
                json!({
                    "database": ns.database,
                    "collection": ns.collection,
                    "aggregation_results": results.iter().map(document_json).collect::<Vec<_>>(),
                }),
            ),
            Outcome::Inserted { ns, id } => {
                write!(f, "Document added to {ns} with ID: {}", id_text(id))
            }
            Outcome::Updated { ns, id, modified: true } => {
                write!(f, "Document {id} updated in {ns}.")
            }
            Outcome::Updated { ns, id, modified: false } => {
                write!(f, "Document {id} found in {ns} but no changes were made.")
            }
            Outcome::Deleted { ns, id } => write!(f, "Document {id} deleted from {ns}."),
            Outcome::DeletedMany { ns, deleted: 0, .. } => {
                write!(f, "No documents found matching the filter in {ns}.")
            }
            Outcome::DeletedMany {
                ns,
                deleted,
                filter,
            } => {
                write!(f, "Deleted {deleted} documents from {ns} matching filter: ")?;
                describe_filter(f, filter)
            }
        }
    }
}

/// Render a dispatch result as the single response string.
///
/// Failures are prefixed with `error: ` so callers can tell them apart.
pub fn render(result: Result<Outcome, DispatchError>) -> String {
    match result {
        Ok(outcome) => outcome.to_string(),
        Err(e) => format!("error: {e}"),
    }
}

fn pretty(f: &mut fmt::Formatter<'_>, value: Value) -> fmt::Result {
    let text = serde_json::to_string_pretty(&value).map_err(|_| fmt::Error)?;
    f.write_str(&text)
}

fn describe_filter(f: &mut fmt::Formatter<'_>, filter: &Document) -> fmt::Result {
    if filter.is_empty() {
        return f.write_str("all documents");
    }
    let text = serde_json::to_string(&document_json(filter)).map_err(|_| fmt::Error)?;
    f.write_str(&text)
}

fn id_text(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Plain JSON for a document: identifiers as hex strings, dates as RFC 3339.
pub(crate) fn document_json(doc: &Document) -> Value {
    Value::Object(
        doc.iter()
            .map(|(key, value)| (key.clone(), bson_json(value)))
            .collect::<Map<String, Value>>(),
    )
}

fn bson_json(value: &Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(n) => Value::from(*n),
        Bson::Int64(n) => Value::from(*n),
        Bson::Double(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
        Bson::String(s) => Value::String(s.clone()),
        Bson::Array(items) => Value::Array(items.iter().map(bson_json).collect()),
        Bson::Document(doc) => document_json(doc),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(text) => Value::String(text),
            Err(_) => Value::from(dt.timestamp_millis()),
        },
        other => Value::String(other.to_string()),
    }
}
