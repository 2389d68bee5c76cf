//! Store backend implementations.
//!
//! This module contains implementations of the store traits in
//! [`crate::core`]. Network backends are gated behind feature flags.
//!
//! # Available Backends
//!
//! | Backend | Feature | Trait | Description |
//! |---------|---------|-------|-------------|
//! | Memory | (always) | `DocumentStore` | In-process collections, for tests and embedding |
//! | Object store | (always) | `BlobStore` | Local directory or in-memory blobs via `object_store` |
//! | MongoDB | `mongodb` | `DocumentStore` | Measurements, data files and provenances |
//! | SPARQL HTTP | `sparql-http` | `GraphStore` | Remote triple store over the SPARQL 1.1 protocol |
//!
//! # Example
//!
//! ```ignore
//! use silex_persistence::backends::blob::ObjectStoreBlobs;
//! use silex_persistence::backends::memory::MemoryDocumentStore;
//!
//! let documents = MemoryDocumentStore::new();
//! let blobs = ObjectStoreBlobs::local("./data/files")?;
//! ```

pub mod blob;
pub mod memory;

#[cfg(feature = "mongodb")]
pub mod mongodb;

#[cfg(feature = "sparql-http")]
pub mod sparql_http;

pub use blob::ObjectStoreBlobs;
pub use memory::MemoryDocumentStore;

#[cfg(feature = "mongodb")]
pub use self::mongodb::MongoDocumentStore;

#[cfg(feature = "sparql-http")]
pub use sparql_http::SparqlHttpStore;
