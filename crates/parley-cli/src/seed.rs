use std::collections::BTreeMap;
use std::path::Path;

use bson::Document;
use parley_store::{DocumentStore, MemoryStore, Namespace};
use tracing::info;

use crate::Error;

/// Seed data: database name → collection name → documents.
pub type Seed = BTreeMap<String, BTreeMap<String, Vec<Document>>>;

pub fn parse(text: &str) -> Result<Seed, serde_json::Error> {
    serde_json::from_str(text)
}

pub fn load(path: &Path) -> Result<Seed, Error> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text).map_err(|source| Error::Seed {
        path: path.to_path_buf(),
        source,
    })
}

/// Insert every seeded document. Returns how many were inserted.
pub fn apply(store: &MemoryStore, seed: Seed) -> Result<usize, Error> {
    let mut inserted = 0;
    for (database, collections) in seed {
        for (collection, documents) in collections {
            let ns = Namespace::new(database.as_str(), collection);
            let count = documents.len();
            for document in documents {
                store.insert_one(&ns, document)?;
            }
            info!(%ns, count, "seeded collection");
            inserted += count;
        }
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn seed_loads_into_store() {
        let seed = parse(
            r#"{
                "library": {
                    "books": [{"title": "Dune"}, {"title": "Emma"}],
                    "members": [{"name": "Ada"}]
                }
            }"#,
        )
        .unwrap();
        let store = MemoryStore::new();
        assert_eq!(apply(&store, seed).unwrap(), 3);

        let books = Namespace::new("library", "books");
        assert_eq!(store.count(&books, &doc! { "title": "Emma" }).unwrap(), 1);
        assert_eq!(store.list_collections("library").unwrap(), vec!["books", "members"]);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        std::fs::write(&path, r#"{"shop": {"orders": [{"status": "active"}]}}"#).unwrap();

        let seed = load(&path).unwrap();
        assert_eq!(seed["shop"]["orders"].len(), 1);

        let missing = load(&dir.path().join("missing.json")).unwrap_err();
        assert!(std::matches!(missing, Error::Read { .. }));
    }

    #[test]
    fn rejects_non_documents() {
        assert!(parse(r#"{"library": {"books": [1, 2]}}"#).is_err());
    }
}
