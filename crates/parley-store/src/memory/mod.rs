mod eval;
mod pipeline;
mod store;

pub use store::MemoryStore;
