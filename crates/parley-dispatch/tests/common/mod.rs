#![allow(dead_code)]

use bson::oid::ObjectId;
use bson::{Bson, Document, doc};
use parley_dispatch::{DispatchConfig, Dispatcher, Outcome};
use parley_store::{DocumentStore, MemoryStore, Namespace};

pub const LIBRARY: &str = "library";
pub const SHOP: &str = "shop";

pub fn dispatcher() -> Dispatcher<MemoryStore> {
    Dispatcher::new(MemoryStore::new(), DispatchConfig::default())
}

fn insert_all(store: &MemoryStore, database: &str, collection: &str, docs: Vec<Document>) {
    let ns = Namespace::new(database, collection);
    for doc in docs {
        store.insert_one(&ns, doc).unwrap();
    }
}

/// Six books, three members, five orders, four products and a system database.
pub fn seeded() -> Dispatcher<MemoryStore> {
    let store = MemoryStore::new();
    insert_all(
        &store,
        LIBRARY,
        "books",
        vec![
            doc! { "title": "Dune", "author": "Frank Herbert", "genre": "scifi", "isbn": "9780441013593", "price": 9.99 },
            doc! { "title": "The Hobbit", "author": "J.R.R. Tolkien", "genre": "fantasy", "price": 12.5 },
            doc! { "title": "A Game of Thrones", "author": "George R. R. Martin", "genre": "fantasy", "price": 15.0 },
            doc! { "title": "It", "author": "Stephen King", "genre": "horror", "price": 11.0 },
            doc! { "title": "The Shining", "author": "Stephen King", "genre": "horror", "price": 8.0 },
            doc! { "title": "Mistborn", "author": "Brandon Sanderson", "genre": "Fantasy", "price": 10.0 },
        ],
    );
    insert_all(
        &store,
        LIBRARY,
        "members",
        vec![
            doc! { "name": "Alice Smith", "email": "alice@example.com", "member_id": "M-001", "phone": "555-0100" },
            doc! { "name": "Bob Jones", "email": "bob@example.com", "member_id": "M-002", "phone": "555-0101" },
            doc! { "name": "Carol White", "email": "carol@example.com", "member_id": "M-003", "phone": "555-0102" },
        ],
    );
    insert_all(
        &store,
        SHOP,
        "orders",
        vec![
            doc! { "order_no": 1, "status": "active", "total": 120, "region": "north" },
            doc! { "order_no": 2, "status": "completed", "total": 80, "region": "south" },
            doc! { "order_no": 3, "status": "active", "total": 45, "region": "north" },
            doc! { "order_no": 4, "status": "cancelled", "total": 300, "region": "east" },
            doc! { "order_no": 5, "status": "inactive", "total": 10, "region": "north" },
        ],
    );
    insert_all(
        &store,
        SHOP,
        "products",
        vec![
            doc! { "name": "Wireless Headphones", "category": "audio", "price": 99.0 },
            doc! { "name": "Bluetooth Speaker", "category": "audio", "price": 49.0 },
            doc! { "name": "USB Cable", "category": "accessories", "price": 9.0 },
            doc! { "name": "Laptop Stand", "category": "accessories", "price": 35.0 },
        ],
    );
    insert_all(&store, "admin", "system.users", vec![doc! { "user": "root" }]);
    Dispatcher::new(store, DispatchConfig::default())
}

/// The `_id` of the first document matching `filter`.
pub fn id_of(dispatcher: &Dispatcher<MemoryStore>, ns: &Namespace, filter: Document) -> ObjectId {
    let found = dispatcher
        .store()
        .find(ns, &filter, &Default::default())
        .unwrap();
    match found.first().and_then(|doc| doc.get("_id")) {
        Some(Bson::ObjectId(id)) => *id,
        other => panic!("no object id for {filter}: {other:?}"),
    }
}

pub fn documents(outcome: Outcome) -> Vec<Document> {
    match outcome {
        Outcome::Documents { documents, .. } => documents,
        other => panic!("expected documents, got {other:?}"),
    }
}

pub fn count(outcome: Outcome) -> u64 {
    match outcome {
        Outcome::Counted { count, .. } => count,
        other => panic!("expected a count, got {other:?}"),
    }
}

pub fn json(outcome: &Outcome) -> serde_json::Value {
    serde_json::from_str(&outcome.to_string()).unwrap()
}
