use bson::oid::ObjectId;
use bson::Document;
use parley_store::{FindOptions, Namespace};

/// A fully resolved store call, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreRequest {
    ListDatabases,
    ListCollections {
        database: String,
    },
    Describe {
        ns: Namespace,
    },
    Find {
        ns: Namespace,
        filter: Document,
        options: FindOptions,
    },
    Get {
        ns: Namespace,
        id: ObjectId,
    },
    Count {
        ns: Namespace,
        filter: Document,
    },
    Aggregate {
        ns: Namespace,
        pipeline: Vec<Document>,
    },
    Insert {
        ns: Namespace,
        document: Document,
    },
    Update {
        ns: Namespace,
        id: ObjectId,
        set: Document,
    },
    Delete {
        ns: Namespace,
        id: ObjectId,
    },
    DeleteMany {
        ns: Namespace,
        filter: Document,
    },
}

impl StoreRequest {
    /// Operation name used in logs and adapter errors.
    pub fn operation(&self) -> &'static str {
        match self {
            StoreRequest::ListDatabases => "list_databases",
            StoreRequest::ListCollections { .. } => "list_collections",
            StoreRequest::Describe { .. } => "describe_collection",
            StoreRequest::Find { .. } => "find",
            StoreRequest::Get { .. } => "get_by_id",
            StoreRequest::Count { .. } => "count",
            StoreRequest::Aggregate { .. } => "aggregate",
            StoreRequest::Insert { .. } => "insert",
            StoreRequest::Update { .. } => "update",
            StoreRequest::Delete { .. } => "delete",
            StoreRequest::DeleteMany { .. } => "delete_many",
        }
    }
}
