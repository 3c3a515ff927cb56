use std::collections::BTreeMap;

use parley_translate::FieldSet;
use serde::{Deserialize, Serialize};

/// Dispatcher settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum documents returned by a find.
    pub page_size: usize,
    /// Field stamped with the insertion time.
    pub created_field: String,
    /// Field stamped with the time of each update.
    pub updated_field: String,
    /// Databases hidden from `list_databases`.
    pub system_databases: Vec<String>,
    /// Field vocabulary keyed by collection name.
    pub field_sets: BTreeMap<String, FieldSet>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        let mut field_sets = BTreeMap::new();
        field_sets.insert("books".to_string(), FieldSet::books());
        field_sets.insert("members".to_string(), FieldSet::members());
        Self {
            page_size: 20,
            created_field: "created_at".into(),
            updated_field: "updated_at".into(),
            system_databases: vec!["admin".into(), "config".into(), "local".into()],
            field_sets,
        }
    }
}

impl DispatchConfig {
    pub fn field_set(&self, collection: &str) -> Option<&FieldSet> {
        self.field_sets.get(collection)
    }

    pub fn is_system_database(&self, name: &str) -> bool {
        self.system_databases.iter().any(|db| db == name)
    }
}
