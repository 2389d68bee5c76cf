//! Test infrastructure for the persistence layer.
//!
//! Provides a fixture-backed graph store, an oxigraph-backed one, failing
//! blob stores and builders for measurements, provenances and data files.

#![allow(dead_code)]

pub mod triple_store;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::Value;

use silex_persistence::backends::{MemoryDocumentStore, ObjectStoreBlobs};
use silex_persistence::core::{BlobStore, GraphStore};
use silex_persistence::dal::DataLayer;
use silex_persistence::mapping::schema::RESOURCE_TYPE_VAR;
use silex_persistence::error::{BackendError, StorageResult};
use silex_persistence::sparql::{Binding, Path, QueryResult, SelectQuery, Term, ValuesBlock};
use silex_persistence::types::{NewMeasurement, ProvenanceRef};
use silex_persistence::uri::Uri;
use silex_persistence::vocabulary::{oeso, xsd};
use silex_persistence::PersistenceConfig;

pub const HEIGHT: &str = "http://example.org/variable/height";
pub const LEAF_COUNT: &str = "http://example.org/variable/leaf_count";
pub const NOTE: &str = "http://example.org/variable/note";
pub const UNTYPED: &str = "http://example.org/variable/untyped";

pub fn uri(value: &str) -> Uri {
    Uri::parse(value).unwrap()
}

pub fn date(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 6, day, 8, 0, 0).unwrap()
}

pub fn measurement(variable: &str, provenance: ProvenanceRef, day: u32, value: Value) -> NewMeasurement {
    NewMeasurement::new(uri(variable), provenance, date(day), value)
        .with_objects([uri("http://example.org/plant/1")])
}

/// A graph store answering from fixtures instead of evaluating SPARQL.
///
/// - projection queries (`VALUES ?uri`) return the bindings registered with
///   [`FixtureGraphStore::with_resource`] for resources of the requested
///   class or one of its subclasses;
/// - closure checks (`VALUES ?candidate`) and subclass walks
///   (`VALUES ?parent`) use the registered types and subclass axioms;
/// - any other query returns the registered search rows.
#[derive(Default)]
pub struct FixtureGraphStore {
    property_paths: bool,
    resources: HashMap<String, Vec<(String, Binding)>>,
    types: HashMap<String, String>,
    subclasses: Vec<(String, String)>,
    search_rows: Vec<Vec<(String, Binding)>>,
    queries: Mutex<Vec<SelectQuery>>,
}

impl FixtureGraphStore {
    pub fn new(property_paths: bool) -> Self {
        Self {
            property_paths,
            ..Default::default()
        }
    }

    pub fn with_resource(mut self, uri: &str, class: &str, bindings: Vec<(&str, Binding)>) -> Self {
        self.types.insert(uri.to_string(), class.to_string());
        let mut row: Vec<(String, Binding)> = bindings
            .into_iter()
            .map(|(var, binding)| (var.to_string(), binding))
            .collect();
        row.push(("uri".to_string(), Binding::uri(uri)));
        self.resources.insert(uri.to_string(), row);
        self
    }

    pub fn with_type(mut self, instance: &str, class: &str) -> Self {
        self.types.insert(instance.to_string(), class.to_string());
        self
    }

    pub fn with_subclass(mut self, sub: &str, parent: &str) -> Self {
        self.subclasses.push((sub.to_string(), parent.to_string()));
        self
    }

    pub fn with_search_row(mut self, bindings: Vec<(&str, Binding)>) -> Self {
        self.search_rows.push(
            bindings
                .into_iter()
                .map(|(var, binding)| (var.to_string(), binding))
                .collect(),
        );
        self
    }

    /// Adds a variable declaring `datatype`.
    pub fn with_variable(self, variable: &str, label: &str, datatype: Option<&str>) -> Self {
        let mut bindings = vec![("label", Binding::lang_literal(label, "en"))];
        if let Some(datatype) = datatype {
            bindings.push(("datatype", Binding::uri(datatype)));
        }
        self.with_resource(variable, oeso::VARIABLE, bindings)
    }

    /// The queries received so far.
    pub fn queries(&self) -> Vec<SelectQuery> {
        self.queries.lock().clone()
    }

    fn closure(&self, class: &str) -> BTreeSet<String> {
        let mut closure = BTreeSet::from([class.to_string()]);
        loop {
            let next: Vec<String> = self
                .subclasses
                .iter()
                .filter(|(sub, parent)| closure.contains(parent) && !closure.contains(sub))
                .map(|(sub, _)| sub.clone())
                .collect();
            if next.is_empty() {
                return closure;
            }
            closure.extend(next);
        }
    }

    /// The classes a query accepts for `var`: a `VALUES` block over the
    /// type variable, or the closure of an inlined `rdfs:subClassOf*` path.
    fn allowed_types(&self, query: &SelectQuery, type_var: &str) -> BTreeSet<String> {
        if let Some(types) = block(query, type_var) {
            return iris(types).into_iter().collect();
        }
        let class = query
            .pattern
            .triples
            .iter()
            .find(|t| matches!(t.path, Path::ZeroOrMore(_)))
            .and_then(|t| match &t.object {
                Term::Iri(class) => Some(class.clone()),
                _ => None,
            })
            .unwrap_or_default();
        self.closure(&class)
    }

    fn has_type_in(&self, instance: &str, allowed: &BTreeSet<String>) -> bool {
        self.types.get(instance).is_some_and(|t| allowed.contains(t))
    }
}

fn block<'q>(query: &'q SelectQuery, var: &str) -> Option<&'q ValuesBlock> {
    query.pattern.values.iter().find(|b| b.var == var)
}

fn iris(block: &ValuesBlock) -> Vec<String> {
    block
        .values
        .iter()
        .filter_map(|t| match t {
            Term::Iri(iri) => Some(iri.clone()),
            _ => None,
        })
        .collect()
}

#[async_trait]
impl GraphStore for FixtureGraphStore {
    fn backend_name(&self) -> &'static str {
        "fixture"
    }

    fn supports_property_paths(&self) -> bool {
        self.property_paths
    }

    async fn select(&self, query: &SelectQuery) -> StorageResult<QueryResult> {
        self.queries.lock().push(query.clone());
        let mut result = QueryResult::new(query.projection.clone());

        if let Some(candidates) = block(query, "candidate") {
            let allowed = self.allowed_types(query, "type");
            for candidate in iris(candidates) {
                if self.has_type_in(&candidate, &allowed) {
                    let row = result.row().with("candidate", Binding::uri(candidate));
                    result.push(row);
                }
            }
            return Ok(result);
        }

        if let Some(parents) = block(query, "parent") {
            let parents: BTreeSet<String> = iris(parents).into_iter().collect();
            for (sub, parent) in &self.subclasses {
                if parents.contains(parent) {
                    let row = result.row().with("sub", Binding::uri(sub.clone()));
                    result.push(row);
                }
            }
            return Ok(result);
        }

        if let Some(uris) = block(query, "uri") {
            let allowed = self.allowed_types(query, RESOURCE_TYPE_VAR);
            for uri in iris(uris) {
                if !self.has_type_in(&uri, &allowed) {
                    continue;
                }
                if let Some(bindings) = self.resources.get(&uri) {
                    let row = bindings
                        .iter()
                        .filter(|(var, _)| query.projection.contains(var))
                        .fold(result.row(), |row, (var, b)| row.with(var.clone(), b.clone()));
                    result.push(row);
                }
            }
            return Ok(result);
        }

        for bindings in &self.search_rows {
            let row = bindings
                .iter()
                .filter(|(var, _)| query.projection.contains(var))
                .fold(result.row(), |row, (var, b)| row.with(var.clone(), b.clone()));
            result.push(row);
        }
        Ok(result)
    }
}

/// A blob store that writes the content, then reports a failure.
pub struct FailingBlobs {
    pub inner: ObjectStoreBlobs,
}

#[async_trait]
impl BlobStore for FailingBlobs {
    fn backend_name(&self) -> &'static str {
        "failing"
    }

    async fn write(&self, path: &str, content: Vec<u8>) -> StorageResult<()> {
        self.inner.write(path, content).await?;
        Err(BackendError::StorageIo {
            path: path.to_string(),
            message: "disk full".to_string(),
            source: None,
        }
        .into())
    }

    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.inner.read(path).await
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        self.inner.delete(path).await
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        self.inner.exists(path).await
    }
}

/// The variables every data test can measure.
pub fn variable_graph() -> FixtureGraphStore {
    FixtureGraphStore::new(true)
        .with_variable(HEIGHT, "Height", Some(xsd::DECIMAL))
        .with_variable(LEAF_COUNT, "Leaf count", Some("xsd:integer"))
        .with_variable(NOTE, "Note", Some(xsd::STRING))
        .with_variable(UNTYPED, "Untyped", None)
}

/// Routes crate logs to the test output. Set `RUST_LOG` to change the level.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("silex_persistence=warn"));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(filter)
        .try_init();
}

/// A data layer over memory stores, with indexes created.
pub async fn data_layer(graph: FixtureGraphStore, blobs: Arc<dyn BlobStore>) -> DataLayer {
    init_tracing();
    let layer = DataLayer::new(
        &PersistenceConfig::default(),
        Arc::new(graph),
        Arc::new(MemoryDocumentStore::new()),
        blobs,
    )
    .unwrap();
    layer.create_indexes().await.unwrap();
    layer
}

pub fn sensing_graph() -> FixtureGraphStore {
    FixtureGraphStore::new(false).with_subclass("http://example.org/Camera", oeso::SENSING_DEVICE)
}
