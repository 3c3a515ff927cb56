mod error;
mod store;

pub use error::StoreError;
pub use store::{DocumentStore, FindOptions, Namespace, UpdateResult};

#[cfg(feature = "memory")]
mod memory;

#[cfg(feature = "memory")]
pub use memory::MemoryStore;
