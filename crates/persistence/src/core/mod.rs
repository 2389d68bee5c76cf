//! Core store traits.
//!
//! The data layer talks to three kinds of stores:
//!
//! - [`GraphStore`] - RDF triple store queried with SELECT queries
//! - [`DocumentStore`] - document store queried with operator filters,
//!   with unique compound indexes and transactions ([`DocumentTransaction`])
//! - [`BlobStore`] - binary content addressed by path
//!
//! Implementations live in [`crate::backends`]. Every call is `async` and
//! the repositories await them one at a time; nothing is spawned.
//!
//! # Example: Implementing a Graph Store
//!
//! ```ignore
//! use async_trait::async_trait;
//! use silex_persistence::core::GraphStore;
//! use silex_persistence::sparql::{QueryResult, SelectQuery};
//! use silex_persistence::error::StorageResult;
//!
//! struct MyStore;
//!
//! #[async_trait]
//! impl GraphStore for MyStore {
//!     fn backend_name(&self) -> &'static str {
//!         "my-store"
//!     }
//!
//!     fn supports_property_paths(&self) -> bool {
//!         false
//!     }
//!
//!     async fn select(&self, query: &SelectQuery) -> StorageResult<QueryResult> {
//!         // ... evaluate query.to_sparql()
//!     }
//! }
//! ```

mod blob;
mod document;
mod graph;

pub use blob::BlobStore;
pub use document::{Document, DocumentStore, DocumentTransaction, FindOptions, IndexSpec};
pub use graph::GraphStore;
