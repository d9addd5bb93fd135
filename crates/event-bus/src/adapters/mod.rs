//! Adapters: durable store implementations.

pub mod file_store;
pub mod memory_store;

pub use file_store::FileStore;
pub use memory_store::InMemoryStore;
