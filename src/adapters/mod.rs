// Adapters layer: concrete implementations of the domain ports.

pub mod document_store;
pub mod storage;

pub use document_store::{FileDocumentStore, MemoryDocumentStore};
pub use storage::LocalStorage;
