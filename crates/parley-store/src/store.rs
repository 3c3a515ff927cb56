use std::fmt;

use bson::{Bson, Document};

use crate::error::StoreError;

/// A database and collection pair, passed through uninterpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub limit: Option<usize>,
    /// Drop the `_id` field from returned documents.
    pub exclude_id: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched: u64,
    pub modified: u64,
}

/// The document store the dispatcher executes against.
///
/// Filters and pipelines are MongoDB-shaped documents. Implementations own
/// their connection and concurrency concerns; callers never retry.
pub trait DocumentStore {
    fn list_databases(&self) -> Result<Vec<String>, StoreError>;

    fn list_collections(&self, database: &str) -> Result<Vec<String>, StoreError>;

    fn find(
        &self,
        ns: &Namespace,
        filter: &Document,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError>;

    fn count(&self, ns: &Namespace, filter: &Document) -> Result<u64, StoreError>;

    fn aggregate(&self, ns: &Namespace, pipeline: &[Document]) -> Result<Vec<Document>, StoreError>;

    /// Insert a document, assigning an `_id` when it has none. Returns the `_id`.
    fn insert_one(&self, ns: &Namespace, document: Document) -> Result<Bson, StoreError>;

    /// `$set` the given fields on the first document matching `filter`.
    fn update_one(
        &self,
        ns: &Namespace,
        filter: &Document,
        set: Document,
    ) -> Result<UpdateResult, StoreError>;

    fn delete_one(&self, ns: &Namespace, filter: &Document) -> Result<u64, StoreError>;

    fn delete_many(&self, ns: &Namespace, filter: &Document) -> Result<u64, StoreError>;
}
