use bson::oid::ObjectId;
use bson::{DateTime, Document};
use parley_query::{Filter, ParsedIntent};
use parley_store::{DocumentStore, FindOptions, Namespace};
use parley_translate::{
    FieldSet, classify, count_filter, extract_fields, literal, parse_identifier, parse_mutation,
    synthesize,
};
use tracing::{debug, info, warn};

use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::outcome::Outcome;
use crate::request::StoreRequest;

/// How a mutation is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationMode {
    Insert,
    /// Update the document with this identifier (hex string).
    Update { id: String },
}

/// Translates requests and runs them against an injected store.
pub struct Dispatcher<S> {
    store: S,
    config: DispatchConfig,
}

impl<S: DocumentStore> Dispatcher<S> {
    pub fn new(store: S, config: DispatchConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Release the store handle.
    pub fn into_store(self) -> S {
        self.store
    }

    fn field_set(&self, collection: &str) -> Option<&FieldSet> {
        self.config.field_set(collection)
    }

    // ── Resolution ─────────────────────────────────────────────

    /// Classify a read request and resolve it to a count or a capped find.
    pub fn resolve_find(
        &self,
        database: &str,
        collection: &str,
        text: &str,
    ) -> Result<StoreRequest, DispatchError> {
        let ns = Namespace::new(database, collection);
        let intent = classify(text, self.field_set(collection));
        let filter = intent.filter_document();

        if intent.is_count() {
            return Ok(StoreRequest::Count { ns, filter });
        }

        let options = FindOptions {
            limit: Some(self.config.page_size),
            exclude_id: !intent.references("_id"),
        };
        if intent == ParsedIntent::Invalid {
            debug!(%ns, "unclassifiable request, running an unconstrained find");
        }
        Ok(StoreRequest::Find {
            ns,
            filter,
            options,
        })
    }

    pub fn resolve_count(
        &self,
        database: &str,
        collection: &str,
        text: &str,
    ) -> Result<StoreRequest, DispatchError> {
        let filter = count_filter(text, self.field_set(collection)).to_document();
        Ok(StoreRequest::Count {
            ns: Namespace::new(database, collection),
            filter,
        })
    }

    pub fn resolve_get_by_id(
        &self,
        database: &str,
        collection: &str,
        id: &str,
    ) -> Result<StoreRequest, DispatchError> {
        Ok(StoreRequest::Get {
            ns: Namespace::new(database, collection),
            id: parse_identifier(id)?,
        })
    }

    pub fn resolve_aggregate(
        &self,
        database: &str,
        collection: &str,
        text: &str,
    ) -> Result<StoreRequest, DispatchError> {
        let spec = synthesize(text)?;
        Ok(StoreRequest::Aggregate {
            ns: Namespace::new(database, collection),
            pipeline: spec.to_pipeline(),
        })
    }

    /// Parse mutation data and stamp it with the current time.
    pub fn resolve_mutate(
        &self,
        database: &str,
        collection: &str,
        text: &str,
        mode: &MutationMode,
    ) -> Result<StoreRequest, DispatchError> {
        let ns = Namespace::new(database, collection);
        // validate the target before parsing the data
        let target = match mode {
            MutationMode::Insert => None,
            MutationMode::Update { id } => Some(parse_identifier(id)?),
        };

        let mut mutation = parse_mutation(text)?;
        let now = DateTime::now();
        Ok(match target {
            None => {
                mutation.stamp(&self.config.created_field, now);
                StoreRequest::Insert {
                    ns,
                    document: mutation.into_document(),
                }
            }
            Some(id) => {
                mutation.stamp(&self.config.updated_field, now);
                StoreRequest::Update {
                    ns,
                    id,
                    set: mutation.into_document(),
                }
            }
        })
    }

    pub fn resolve_delete(
        &self,
        database: &str,
        collection: &str,
        id: &str,
    ) -> Result<StoreRequest, DispatchError> {
        Ok(StoreRequest::Delete {
            ns: Namespace::new(database, collection),
            id: parse_identifier(id)?,
        })
    }

    /// Resolve a bulk delete. An empty filter is refused.
    pub fn resolve_delete_many(
        &self,
        database: &str,
        collection: &str,
        text: &str,
    ) -> Result<StoreRequest, DispatchError> {
        let ns = Namespace::new(database, collection);
        let filter = match literal::parse_document(text) {
            Some(doc) => Filter::Literal(doc),
            None => Filter::Fields(extract_fields(text, self.field_set(collection))),
        };
        if filter.is_unconstrained() {
            warn!(%ns, "refusing bulk delete without a filter");
            return Err(DispatchError::UnsafeDelete(ns));
        }
        Ok(StoreRequest::DeleteMany {
            ns,
            filter: filter.to_document(),
        })
    }

    // ── Execution ──────────────────────────────────────────────

    /// Run a resolved request against the store.
    pub fn execute(&self, request: StoreRequest) -> Result<Outcome, DispatchError> {
        let operation = request.operation();
        debug!(operation, ?request, "executing");

        match request {
            StoreRequest::ListDatabases => {
                let names = self
                    .store
                    .list_databases()
                    .map_err(DispatchError::adapter(operation, "*"))?;
                Ok(Outcome::Databases(
                    names
                        .into_iter()
                        .filter(|name| !self.config.is_system_database(name))
                        .collect(),
                ))
            }
            StoreRequest::ListCollections { database } => {
                let collections = self
                    .store
                    .list_collections(&database)
                    .map_err(DispatchError::adapter(operation, &database))?;
                Ok(Outcome::Collections {
                    database,
                    collections,
                })
            }
            StoreRequest::Describe { ns } => {
                let document_count = self
                    .store
                    .count(&ns, &Document::new())
                    .map_err(DispatchError::adapter(operation, &ns))?;
                let options = FindOptions {
                    limit: Some(1),
                    exclude_id: true,
                };
                let sample = self
                    .store
                    .find(&ns, &Document::new(), &options)
                    .map_err(DispatchError::adapter(operation, &ns))?
                    .into_iter()
                    .next();
                Ok(Outcome::Description {
                    ns,
                    document_count,
                    sample,
                })
            }
            StoreRequest::Find {
                ns,
                filter,
                options,
            } => {
                let documents = self
                    .store
                    .find(&ns, &filter, &options)
                    .map_err(DispatchError::adapter(operation, &ns))?;
                Ok(Outcome::Documents { ns, documents })
            }
            StoreRequest::Get { ns, id } => {
                let options = FindOptions {
                    limit: Some(1),
                    exclude_id: false,
                };
                let found = self
                    .store
                    .find(&ns, &bson::doc! { "_id": id }, &options)
                    .map_err(DispatchError::adapter(operation, &ns))?
                    .into_iter()
                    .next();
                match found {
                    Some(document) => Ok(Outcome::Document { ns, document }),
                    None => Err(not_found(id, ns)),
                }
            }
            StoreRequest::Count { ns, filter } => {
                let count = self
                    .store
                    .count(&ns, &filter)
                    .map_err(DispatchError::adapter(operation, &ns))?;
                Ok(Outcome::Counted { ns, count, filter })
            }
            StoreRequest::Aggregate { ns, pipeline } => {
                let results = self
                    .store
                    .aggregate(&ns, &pipeline)
                    .map_err(DispatchError::adapter(operation, &ns))?;
                Ok(Outcome::Aggregated { ns, results })
            }
            StoreRequest::Insert { ns, document } => {
                let id = self
                    .store
                    .insert_one(&ns, document)
                    .map_err(DispatchError::adapter(operation, &ns))?;
                info!(%ns, %id, "inserted document");
                Ok(Outcome::Inserted { ns, id })
            }
            StoreRequest::Update { ns, id, set } => {
                let result = self
                    .store
                    .update_one(&ns, &bson::doc! { "_id": id }, set)
                    .map_err(DispatchError::adapter(operation, &ns))?;
                if result.matched == 0 {
                    return Err(not_found(id, ns));
                }
                info!(%ns, %id, modified = result.modified, "updated document");
                Ok(Outcome::Updated {
                    ns,
                    id,
                    modified: result.modified > 0,
                })
            }
            StoreRequest::Delete { ns, id } => {
                let deleted = self
                    .store
                    .delete_one(&ns, &bson::doc! { "_id": id })
                    .map_err(DispatchError::adapter(operation, &ns))?;
                if deleted == 0 {
                    return Err(not_found(id, ns));
                }
                info!(%ns, %id, "deleted document");
                Ok(Outcome::Deleted { ns, id })
            }
            StoreRequest::DeleteMany { ns, filter } => {
                let deleted = self
                    .store
                    .delete_many(&ns, &filter)
                    .map_err(DispatchError::adapter(operation, &ns))?;
                info!(%ns, deleted, "deleted documents");
                Ok(Outcome::DeletedMany {
                    ns,
                    deleted,
                    filter,
                })
            }
        }
    }

    // ── Operations ─────────────────────────────────────────────

    /// Answer a free-form read request: a count or a page of documents.
    pub fn find(
        &self,
        database: &str,
        collection: &str,
        text: &str,
    ) -> Result<Outcome, DispatchError> {
        self.execute(self.resolve_find(database, collection, text)?)
    }

    pub fn count(
        &self,
        database: &str,
        collection: &str,
        text: &str,
    ) -> Result<Outcome, DispatchError> {
        self.execute(self.resolve_count(database, collection, text)?)
    }

    pub fn get_by_id(
        &self,
        database: &str,
        collection: &str,
        id: &str,
    ) -> Result<Outcome, DispatchError> {
        self.execute(self.resolve_get_by_id(database, collection, id)?)
    }

    pub fn aggregate(
        &self,
        database: &str,
        collection: &str,
        text: &str,
    ) -> Result<Outcome, DispatchError> {
        self.execute(self.resolve_aggregate(database, collection, text)?)
    }

    pub fn mutate(
        &self,
        database: &str,
        collection: &str,
        text: &str,
        mode: &MutationMode,
    ) -> Result<Outcome, DispatchError> {
        self.execute(self.resolve_mutate(database, collection, text, mode)?)
    }

    pub fn delete(
        &self,
        database: &str,
        collection: &str,
        id: &str,
    ) -> Result<Outcome, DispatchError> {
        self.execute(self.resolve_delete(database, collection, id)?)
    }

    pub fn delete_many(
        &self,
        database: &str,
        collection: &str,
        text: &str,
    ) -> Result<Outcome, DispatchError> {
        self.execute(self.resolve_delete_many(database, collection, text)?)
    }

    /// List user databases; system databases are hidden.
    pub fn list_databases(&self) -> Result<Outcome, DispatchError> {
        self.execute(StoreRequest::ListDatabases)
    }

    pub fn list_collections(&self, database: &str) -> Result<Outcome, DispatchError> {
        self.execute(StoreRequest::ListCollections {
            database: database.to_string(),
        })
    }

    /// Count, sample field names and a sample document without `_id`.
    pub fn describe_collection(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Outcome, DispatchError> {
        self.execute(StoreRequest::Describe {
            ns: Namespace::new(database, collection),
        })
    }
}

fn not_found(id: ObjectId, namespace: Namespace) -> DispatchError {
    DispatchError::NotFound {
        id: id.to_hex(),
        namespace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{Bson, doc};
    use parley_store::MemoryStore;
    use parley_translate::TranslateError;

    const HEX: &str = "507f1f77bcf86cd799439011";

    fn dispatcher() -> Dispatcher<MemoryStore> {
        Dispatcher::new(MemoryStore::new(), DispatchConfig::default())
    }

    #[test]
    fn count_request_resolves_to_count() {
        let request = dispatcher()
            .resolve_find("library", "books", "count fantasy")
            .unwrap();
        assert_eq!(
            request,
            StoreRequest::Count {
                ns: Namespace::new("library", "books"),
                filter: doc! { "genre": { "$regex": "fantasy", "$options": "i" } },
            }
        );
    }

    #[test]
    fn find_is_capped_and_hides_id() {
        let request = dispatcher()
            .resolve_find("shop", "orders", "status: active")
            .unwrap();
        match request {
            StoreRequest::Find {
                filter, options, ..
            } => {
                assert_eq!(filter, doc! { "status": { "$regex": "active", "$options": "i" } });
                assert_eq!(options.limit, Some(20));
                assert!(options.exclude_id);
            }
            other => panic!("expected find, got {other:?}"),
        }
    }

    #[test]
    fn identifier_lookup_keeps_id() {
        let request = dispatcher()
            .resolve_find("shop", "orders", &format!("order id: {HEX}"))
            .unwrap();
        match request {
            StoreRequest::Find {
                filter, options, ..
            } => {
                let id = ObjectId::parse_str(HEX).unwrap();
                assert_eq!(filter, doc! { "_id": id });
                assert!(!options.exclude_id);
            }
            other => panic!("expected find, got {other:?}"),
        }
    }

    #[test]
    fn literal_filter_on_id_keeps_id() {
        let request = dispatcher()
            .resolve_find("shop", "orders", r#"{"_id": 7}"#)
            .unwrap();
        assert!(std::matches!(
            request,
            StoreRequest::Find { options: FindOptions { exclude_id: false, .. }, .. }
        ));
    }

    #[test]
    fn blank_request_is_unconstrained_find() {
        let request = dispatcher().resolve_find("shop", "orders", "  ").unwrap();
        match request {
            StoreRequest::Find { filter, .. } => assert!(filter.is_empty()),
            other => panic!("expected find, got {other:?}"),
        }
    }

    #[test]
    fn insert_is_stamped() {
        let request = dispatcher()
            .resolve_mutate("library", "books", "title: Dune", &MutationMode::Insert)
            .unwrap();
        match request {
            StoreRequest::Insert { document, .. } => {
                assert_eq!(document.get_str("title").unwrap(), "Dune");
                assert!(std::matches!(document.get("created_at"), Some(Bson::DateTime(_))));
            }
            other => panic!("expected insert, got {other:?}"),
        }
    }

    #[test]
    fn update_validates_identifier_first() {
        let mode = MutationMode::Update { id: "not-an-id".into() };
        let err = dispatcher()
            .resolve_mutate("library", "books", "title: Dune", &mode)
            .unwrap_err();
        assert!(std::matches!(
            err,
            DispatchError::Translate(TranslateError::MalformedIdentifier(_))
        ));
    }

    #[test]
    fn update_is_stamped() {
        let mode = MutationMode::Update { id: HEX.into() };
        let request = dispatcher()
            .resolve_mutate("library", "books", "genre: classic", &mode)
            .unwrap();
        match request {
            StoreRequest::Update { id, set, .. } => {
                assert_eq!(id.to_hex(), HEX);
                assert!(set.contains_key("updated_at"));
                assert!(!set.contains_key("created_at"));
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn empty_mutation_is_an_error() {
        let err = dispatcher()
            .resolve_mutate("library", "books", "nothing here", &MutationMode::Insert)
            .unwrap_err();
        assert!(std::matches!(
            err,
            DispatchError::Translate(TranslateError::UnparseableMutation)
        ));
    }

    #[test]
    fn unrecognized_aggregation_is_an_error() {
        let err = dispatcher()
            .resolve_aggregate("shop", "products", "do something weird")
            .unwrap_err();
        assert!(std::matches!(
            err,
            DispatchError::Translate(TranslateError::UnrecognizedAggregation(_))
        ));
    }

    #[test]
    fn bulk_delete_needs_a_filter() {
        let d = dispatcher();
        for text in ["", "everything please", "{}"] {
            let err = d.resolve_delete_many("shop", "orders", text).unwrap_err();
            assert!(std::matches!(err, DispatchError::UnsafeDelete(_)), "{text}");
        }
        let request = d.resolve_delete_many("shop", "orders", "status: cancelled").unwrap();
        assert!(std::matches!(request, StoreRequest::DeleteMany { .. }));
    }

    #[test]
    fn explicit_ids_are_validated() {
        let d = dispatcher();
        assert!(d.resolve_get_by_id("shop", "orders", "xyz").is_err());
        assert!(d.resolve_delete("shop", "orders", "xyz").is_err());
        assert!(d.resolve_delete("shop", "orders", HEX).is_ok());
    }

    #[test]
    fn resolution_is_deterministic() {
        let d = dispatcher();
        for text in ["count fantasy", "status: active", "group by genre", "wireless headphones"] {
            assert_eq!(
                d.resolve_find("library", "books", text).unwrap(),
                d.resolve_find("library", "books", text).unwrap()
            );
        }
    }
}
