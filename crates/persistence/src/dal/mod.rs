//! Repositories over the graph, document and blob stores.
//!
//! - [`DataRepository`] - measurements and data files (document + blob stores)
//! - [`ProvenanceRepository`] - provenances (document store)
//! - [`ExperimentRepository`] - experiments (graph store)
//! - [`VariableRepository`] - variables (graph store), also the datatype
//!   source of the type coherence check
//!
//! [`DataLayer`] wires all four from one configuration.
//!
//! # Example
//!
//! ```ignore
//! use silex_persistence::backends::{MemoryDocumentStore, ObjectStoreBlobs};
//! use silex_persistence::dal::DataLayer;
//!
//! let layer = DataLayer::new(&config, graph, Arc::new(MemoryDocumentStore::new()),
//!     Arc::new(ObjectStoreBlobs::in_memory()))?;
//! layer.create_indexes().await?;
//! let stored = layer.data.create_all(measurements).await?;
//! ```

mod data;
mod experiment;
mod provenance;
mod variable;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::PersistenceConfig;
use crate::core::{BlobStore, Document, DocumentStore, GraphStore};
use crate::error::{BackendError, ResourceError, StorageError, StorageResult};
use crate::mapping::{GraphResource, MappingContext, TypeScope};
use crate::uri::Uri;

pub use data::DataRepository;
pub use experiment::ExperimentRepository;
pub use provenance::ProvenanceRepository;
pub use variable::VariableRepository;

/// A shared graph store.
pub type DynGraphStore = Arc<dyn GraphStore>;

/// A shared document store.
pub type DynDocumentStore = Arc<dyn DocumentStore>;

/// A shared blob store.
pub type DynBlobStore = Arc<dyn BlobStore>;

/// All repositories, sharing one mapping context and one set of stores.
#[derive(Clone)]
pub struct DataLayer {
    pub data: DataRepository,
    pub provenances: ProvenanceRepository,
    pub experiments: ExperimentRepository,
    pub variables: VariableRepository,
}

impl DataLayer {
    /// Validates the configuration and builds every repository.
    pub fn new(
        config: &PersistenceConfig,
        graph: DynGraphStore,
        documents: DynDocumentStore,
        blobs: DynBlobStore,
    ) -> StorageResult<Self> {
        let mapping = MappingContext::initialize(config)?;
        let variables = VariableRepository::new(graph.clone(), mapping.clone());
        let experiments = ExperimentRepository::new(graph, mapping, config.max_page_size);
        let provenances = ProvenanceRepository::new(config, documents.clone())?;
        let data = DataRepository::new(
            config,
            documents,
            blobs,
            provenances.clone(),
            variables.clone(),
        )?;
        Ok(Self {
            data,
            provenances,
            experiments,
            variables,
        })
    }

    /// Creates the document store indexes of every repository.
    pub async fn create_indexes(&self) -> StorageResult<()> {
        self.provenances.create_indexes().await?;
        self.data.create_indexes().await
    }
}

impl std::fmt::Debug for DataLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataLayer").finish_non_exhaustive()
    }
}

fn not_found(resource_type: &str, uri: &Uri) -> StorageError {
    ResourceError::NotFound {
        resource_type: resource_type.to_string(),
        id: uri.to_string(),
    }
    .into()
}

fn to_document<T: Serialize>(value: &T) -> StorageResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(document) => Ok(document),
        other => Err(BackendError::SerializationError {
            message: format!("expected an object, got {other}"),
        }
        .into()),
    }
}

fn from_document<T: DeserializeOwned>(document: Document) -> StorageResult<T> {
    Ok(serde_json::from_value(Value::Object(document))?)
}

/// Parses the string values of a `distinct` result, skipping other values.
fn distinct_uris(values: Vec<Value>) -> StorageResult<Vec<Uri>> {
    let mut uris = values
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s),
            _ => None,
        })
        .map(Uri::parse)
        .collect::<Result<Vec<_>, _>>()?;
    uris.sort();
    uris.dedup();
    Ok(uris)
}

/// Fetches graph resources in one projection query, in the order of `uris`.
///
/// Identifiers with no matching resource, or whose resource is not an
/// instance of the model's class, are absent from the result.
async fn fetch_by_uris<T: GraphResource>(
    graph: &dyn GraphStore,
    mapping: &MappingContext,
    uris: &[Uri],
    lang: Option<&str>,
) -> StorageResult<Vec<T>> {
    if uris.is_empty() {
        return Ok(Vec::new());
    }
    let schema = mapping.schema_for::<T>()?;
    let closure = if graph.supports_property_paths() {
        None
    } else {
        Some(graph.subclass_closure(schema.rdf_type().as_str()).await?)
    };
    let scope = closure
        .as_ref()
        .map_or(TypeScope::PropertyPath, TypeScope::Classes);
    let query = schema.projection_query(uris, scope, lang);
    tracing::debug!(
        resource = schema.type_name(),
        count = uris.len(),
        "fetching resources by identifier"
    );
    let result = graph.select(&query).await?;
    let models: Vec<T> = mapping.hydrate_rows(result.rows(), lang)?;

    let positions: HashMap<&Uri, usize> = uris.iter().enumerate().map(|(i, u)| (u, i)).collect();
    let mut ordered: Vec<(usize, T)> = models
        .into_iter()
        .filter_map(|m| {
            let position = m.uri().and_then(|u| positions.get(u)).copied()?;
            Some((position, m))
        })
        .collect();
    ordered.sort_by_key(|(position, _)| *position);
    Ok(ordered.into_iter().map(|(_, m)| m).collect())
}
