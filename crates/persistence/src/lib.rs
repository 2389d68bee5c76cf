//! Silex Persistence Layer
//!
//! This crate bridges typed domain models with two heterogeneous stores: an
//! RDF triple store queried with SPARQL, and a document store queried with
//! BSON-like filters. Data file content lives in a blob store.
//!
//! # Features
//!
//! - **Typed mapping**: a registry of datatype handlers and per-type schemas
//!   hydrate SPARQL result rows into models in a single round-trip
//! - **Dynamic search**: sparse optional criteria compile into SPARQL
//!   fragments or document filters, including device attribution through
//!   provenance
//! - **Type coherence**: measurement values are checked against their
//!   variable's declared datatype before they are written
//! - **Transactional files**: metadata and content are written together or
//!   not at all
//!
//! # Backend Features
//!
//! Enable network backends with feature flags in `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! silex-persistence = { version = "0.1", features = ["mongodb", "sparql-http"] }
//! ```
//!
//! - `mongodb` - MongoDB document store
//! - `sparql-http` - remote triple store over the SPARQL 1.1 protocol
//!
//! The in-memory document store and the `object_store` blob store are always
//! available.
//!
//! # Architecture
//!
//! - [`config`] - configuration structure and validation
//! - [`error`] - error types for all operations
//! - [`uri`] - identifiers and prefix normalization
//! - [`mapping`] - deserializer registry, schema cache and result hydrator
//! - [`sparql`] - SELECT query model and result rows
//! - [`search`] - graph and document filter builders
//! - [`validation`] - type coherence of measurement values
//! - [`types`] - records, models and pagination
//! - [`core`] - store traits
//! - [`backends`] - store implementations
//! - [`dal`] - repositories combining the above
//!
//! # Search
//!
//! ```
//! use silex_persistence::search::{DataSearchCriteria, DocumentFilterBuilder};
//! use silex_persistence::types::{PageRequest, paginate};
//! use silex_persistence::uri::Uri;
//!
//! let criteria = DataSearchCriteria::new()
//!     .with_variables([Uri::parse("http://example.org/variable/height").unwrap()]);
//! let filter = DocumentFilterBuilder::new().compile(&criteria);
//! assert!(filter.get("variable").is_some());
//!
//! let page = paginate((0..15).collect::<Vec<_>>(), &PageRequest::new(Some(1), 10));
//! assert_eq!(page.len(), 5);
//! assert_eq!(page.page_info.total, 15);
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod config;
pub mod core;
pub mod dal;
pub mod error;
pub mod mapping;
pub mod search;
pub mod sparql;
pub mod types;
pub mod uri;
pub mod validation;
pub mod vocabulary;

// Re-export commonly used types at crate root
pub use config::PersistenceConfig;
pub use error::{StorageError, StorageResult};
pub use mapping::MappingContext;
pub use uri::Uri;

// Re-export core traits
pub use core::{BlobStore, DocumentStore, DocumentTransaction, GraphStore};

// Re-export repositories
pub use dal::{
    DataLayer, DataRepository, ExperimentRepository, ProvenanceRepository, VariableRepository,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
