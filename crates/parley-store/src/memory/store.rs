use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use arc_swap::ArcSwap;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use imbl::Vector;
use parley_query::{Expression, parse_filter};

use super::eval::matches;
use super::pipeline;
use crate::error::StoreError;
use crate::store::{DocumentStore, FindOptions, Namespace, UpdateResult};

pub(crate) type Collection = Vector<Document>;

/// An in-process document store.
///
/// Each collection is an immutable vector behind an `ArcSwap`: readers load a
/// snapshot without locking, writers serialize on `write_lock` and publish a
/// new version. Collections come into existence on first insert.
pub struct MemoryStore {
    collections: RwLock<BTreeMap<Namespace, Arc<ArcSwap<Collection>>>>,
    write_lock: Mutex<()>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(BTreeMap::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Snapshot a collection. Missing collections read as empty.
    fn snapshot(&self, ns: &Namespace) -> Result<Collection, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|e| StoreError::Storage(format!("collection map poisoned: {e}")))?;
        Ok(collections
            .get(ns)
            .map(|slot| (**slot.load()).clone())
            .unwrap_or_default())
    }

    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.write_lock
            .lock()
            .map_err(|e| StoreError::Storage(format!("write lock poisoned: {e}")))
    }

    /// Publish a new version of a collection, creating it if needed.
    fn publish(&self, ns: &Namespace, data: Collection) -> Result<(), StoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| StoreError::Storage(format!("collection map poisoned: {e}")))?;
        match collections.get(ns) {
            Some(slot) => slot.store(Arc::new(data)),
            None => {
                collections.insert(ns.clone(), Arc::new(ArcSwap::new(Arc::new(data))));
            }
        }
        Ok(())
    }

    fn filtered(&self, ns: &Namespace, filter: &Document) -> Result<Vec<Document>, StoreError> {
        let expr = parse_filter(filter)?;
        Ok(self
            .snapshot(ns)?
            .into_iter()
            .filter(|doc| matches(doc, &expr))
            .collect())
    }

    /// Remove matching documents, at most `limit` of them.
    fn remove(
        &self,
        ns: &Namespace,
        expr: &Expression,
        limit: Option<usize>,
    ) -> Result<u64, StoreError> {
        let _guard = self.lock_writes()?;
        let current = self.snapshot(ns)?;
        let mut removed = 0usize;
        let kept: Collection = current
            .into_iter()
            .filter(|doc| {
                let hit = limit.is_none_or(|max| removed < max) && matches(doc, expr);
                if hit {
                    removed += 1;
                }
                !hit
            })
            .collect();
        if removed > 0 {
            self.publish(ns, kept)?;
        }
        Ok(removed as u64)
    }
}

impl DocumentStore for MemoryStore {
    fn list_databases(&self) -> Result<Vec<String>, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|e| StoreError::Storage(format!("collection map poisoned: {e}")))?;
        let names: BTreeSet<&str> = collections.keys().map(|ns| ns.database.as_str()).collect();
        Ok(names.into_iter().map(str::to_string).collect())
    }

    fn list_collections(&self, database: &str) -> Result<Vec<String>, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|e| StoreError::Storage(format!("collection map poisoned: {e}")))?;
        Ok(collections
            .keys()
            .filter(|ns| ns.database == database)
            .map(|ns| ns.collection.clone())
            .collect())
    }

    fn find(
        &self,
        ns: &Namespace,
        filter: &Document,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let mut docs = self.filtered(ns, filter)?;
        if let Some(limit) = options.limit {
            docs.truncate(limit);
        }
        if options.exclude_id {
            for doc in &mut docs {
                doc.remove("_id");
            }
        }
        Ok(docs)
    }

    fn count(&self, ns: &Namespace, filter: &Document) -> Result<u64, StoreError> {
        Ok(self.filtered(ns, filter)?.len() as u64)
    }

    fn aggregate(&self, ns: &Namespace, pipeline: &[Document]) -> Result<Vec<Document>, StoreError> {
        let docs = self.snapshot(ns)?.into_iter().collect();
        pipeline::run(docs, pipeline)
    }

    fn insert_one(&self, ns: &Namespace, mut document: Document) -> Result<Bson, StoreError> {
        let id = match document.get("_id") {
            Some(id) => id.clone(),
            None => {
                let id = Bson::ObjectId(ObjectId::new());
                // _id leads the document, as a server would store it
                let mut stored = Document::new();
                stored.insert("_id", id.clone());
                for (key, value) in document {
                    stored.insert(key, value);
                }
                document = stored;
                id
            }
        };

        let _guard = self.lock_writes()?;
        let mut data = self.snapshot(ns)?;
        if data.iter().any(|doc| doc.get("_id") == Some(&id)) {
            return Err(StoreError::Storage(format!("duplicate _id {id} in {ns}")));
        }
        data.push_back(document);
        self.publish(ns, data)?;
        Ok(id)
    }

    fn update_one(
        &self,
        ns: &Namespace,
        filter: &Document,
        set: Document,
    ) -> Result<UpdateResult, StoreError> {
        let expr = parse_filter(filter)?;
        let _guard = self.lock_writes()?;
        let mut data = self.snapshot(ns)?;

        let Some(index) = data.iter().position(|doc| matches(doc, &expr)) else {
            return Ok(UpdateResult::default());
        };

        let mut updated = data[index].clone();
        for (path, value) in set {
            set_path(&mut updated, &path, value)?;
        }
        let modified = updated != data[index];
        if modified {
            data.set(index, updated);
            self.publish(ns, data)?;
        }
        Ok(UpdateResult {
            matched: 1,
            modified: modified as u64,
        })
    }

    fn delete_one(&self, ns: &Namespace, filter: &Document) -> Result<u64, StoreError> {
        let expr = parse_filter(filter)?;
        self.remove(ns, &expr, Some(1))
    }

    fn delete_many(&self, ns: &Namespace, filter: &Document) -> Result<u64, StoreError> {
        let expr = parse_filter(filter)?;
        self.remove(ns, &expr, None)
    }
}

/// Assign a value at a dotted path, creating intermediate documents.
fn set_path(doc: &mut Document, path: &str, value: Bson) -> Result<(), StoreError> {
    match path.split_once('.') {
        None => {
            doc.insert(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            let child = doc
                .entry(head.to_string())
                .or_insert_with(|| Bson::Document(Document::new()));
            match child {
                Bson::Document(inner) => set_path(inner, rest, value),
                _ => Err(StoreError::InvalidQuery(format!(
                    "cannot set {path}: {head} is not a document"
                ))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn ns() -> Namespace {
        Namespace::new("library", "books")
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for (title, genre) in [("Dune", "scifi"), ("Emma", "classic"), ("Hyperion", "scifi")] {
            store
                .insert_one(&ns(), doc! { "title": title, "genre": genre })
                .unwrap();
        }
        store
    }

    #[test]
    fn insert_assigns_object_id() {
        let store = MemoryStore::new();
        let id = store.insert_one(&ns(), doc! { "title": "Dune" }).unwrap();
        assert!(std::matches!(id, Bson::ObjectId(_)));

        let found = store.find(&ns(), &doc! {}, &FindOptions::default()).unwrap();
        assert_eq!(found[0].get("_id"), Some(&id));
        assert_eq!(found[0].keys().next().map(String::as_str), Some("_id"));
    }

    #[test]
    fn insert_keeps_caller_id_and_rejects_duplicates() {
        let store = MemoryStore::new();
        store.insert_one(&ns(), doc! { "_id": 7, "title": "Dune" }).unwrap();
        let err = store.insert_one(&ns(), doc! { "_id": 7 }).unwrap_err();
        assert!(std::matches!(err, StoreError::Storage(_)));
    }

    #[test]
    fn find_limit_and_projection() {
        let store = seeded();
        let opts = FindOptions {
            limit: Some(1),
            exclude_id: true,
        };
        let found = store.find(&ns(), &doc! { "genre": "scifi" }, &opts).unwrap();
        assert_eq!(found, vec![doc! { "title": "Dune", "genre": "scifi" }]);
    }

    #[test]
    fn missing_collection_reads_empty() {
        let store = MemoryStore::new();
        let missing = Namespace::new("nope", "nothing");
        assert_eq!(store.count(&missing, &doc! {}).unwrap(), 0);
        assert!(store.list_databases().unwrap().is_empty());
    }

    #[test]
    fn catalog_listing() {
        let store = seeded();
        store
            .insert_one(&Namespace::new("library", "members"), doc! { "name": "Ada" })
            .unwrap();
        store
            .insert_one(&Namespace::new("shop", "orders"), doc! { "n": 1 })
            .unwrap();
        assert_eq!(store.list_databases().unwrap(), vec!["library", "shop"]);
        assert_eq!(
            store.list_collections("library").unwrap(),
            vec!["books", "members"]
        );
    }

    #[test]
    fn update_reports_matched_and_modified() {
        let store = seeded();
        let result = store
            .update_one(&ns(), &doc! { "title": "Dune" }, doc! { "genre": "classic" })
            .unwrap();
        assert_eq!(result, UpdateResult { matched: 1, modified: 1 });

        let again = store
            .update_one(&ns(), &doc! { "title": "Dune" }, doc! { "genre": "classic" })
            .unwrap();
        assert_eq!(again, UpdateResult { matched: 1, modified: 0 });

        let none = store
            .update_one(&ns(), &doc! { "title": "Missing" }, doc! { "genre": "x" })
            .unwrap();
        assert_eq!(none, UpdateResult::default());

        assert_eq!(store.count(&ns(), &doc! { "genre": "classic" }).unwrap(), 2);
    }

    #[test]
    fn update_nested_path() {
        let store = seeded();
        store
            .update_one(&ns(), &doc! { "title": "Emma" }, doc! { "meta.shelf": "B2" })
            .unwrap();
        assert_eq!(store.count(&ns(), &doc! { "meta.shelf": "B2" }).unwrap(), 1);
    }

    #[test]
    fn update_by_object_id() {
        let store = MemoryStore::new();
        let Bson::ObjectId(id) = store.insert_one(&ns(), doc! { "title": "Dune" }).unwrap() else {
            panic!("expected object id");
        };
        let result = store
            .update_one(&ns(), &doc! { "_id": id }, doc! { "pages": 412 })
            .unwrap();
        assert_eq!(result.matched, 1);
    }

    #[test]
    fn delete_one_and_many() {
        let store = seeded();
        assert_eq!(store.delete_one(&ns(), &doc! { "genre": "scifi" }).unwrap(), 1);
        assert_eq!(store.count(&ns(), &doc! {}).unwrap(), 2);
        assert_eq!(store.delete_many(&ns(), &doc! { "genre": "scifi" }).unwrap(), 1);
        assert_eq!(store.delete_many(&ns(), &doc! { "genre": "scifi" }).unwrap(), 0);
        assert_eq!(store.count(&ns(), &doc! {}).unwrap(), 1);
    }

    #[test]
    fn snapshots_are_isolated_from_writes() {
        let store = seeded();
        let before = store.snapshot(&ns()).unwrap();
        store.delete_many(&ns(), &doc! {}).unwrap();
        assert_eq!(before.len(), 3);
        assert_eq!(store.count(&ns(), &doc! {}).unwrap(), 0);
    }

    #[test]
    fn invalid_filter_is_reported() {
        let store = seeded();
        let err = store.count(&ns(), &doc! { "$text": 1 }).unwrap_err();
        assert!(std::matches!(err, StoreError::InvalidQuery(_)));
    }
}
