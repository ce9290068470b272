//! Metadata storage for the CDC webhook engine
//!
//! Trigger definitions and credential records live in two independently
//! keyed tables. A SQLite backend is used for durable storage; the in-memory
//! backend serves tests and embedded hosts without a database file.

pub mod memory;
pub mod repository;
pub mod traits;

pub use memory::MemoryMetadataStore;
pub use repository::MetadataStore;
pub use traits::*;
