//! Mapping between graph-store rows and typed models.
//!
//! - [`registry`] - datatype handlers keyed by native type and datatype IRI
//! - [`schema`] - per-type field classification, cached once per process
//! - [`hydrator`] - builds model instances from projected result rows
//!
//! [`MappingContext`] owns the registry and the schema cache. It is built
//! once at startup by [`MappingContext::initialize`] and shared through an
//! `Arc`; there is no global state.

pub mod handlers;
pub mod hydrator;
pub mod registry;
pub mod schema;

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::PersistenceConfig;
use crate::error::{MappingResult, StorageResult};
use crate::sparql::ResultRow;
use crate::types::{ExperimentModel, VariableModel};
use crate::uri::UriNormalizer;

pub use handlers::{DatatypeHandler, NativeType, NativeValue, TypedLiteral};
pub use hydrator::ResultHydrator;
pub use registry::DeserializerRegistry;
pub use schema::{
    FieldDescriptor, FieldKind, GraphResource, ResourceDescriptor, ResourceSchema, SchemaCache,
    TypeScope,
};

/// Registry, schema cache and language settings shared by repositories.
#[derive(Debug)]
pub struct MappingContext {
    registry: DeserializerRegistry,
    schemas: SchemaCache,
    default_language: String,
}

impl MappingContext {
    /// Creates a context with the built-in handlers and an empty schema cache.
    pub fn new(normalizer: UriNormalizer, default_language: impl Into<String>) -> Self {
        Self {
            registry: DeserializerRegistry::with_builtins(normalizer),
            schemas: SchemaCache::new(),
            default_language: default_language.into(),
        }
    }

    /// Builds the context from configuration and warms the schemas of every
    /// built-in model, so schema errors surface at startup.
    pub fn initialize(config: &PersistenceConfig) -> StorageResult<Arc<Self>> {
        config.validate()?;
        let context = Self::new(config.normalizer(), config.graph.default_language.clone());
        context.schema_for::<ExperimentModel>()?;
        context.schema_for::<VariableModel>()?;
        tracing::info!(
            datatypes = context.registry.len(),
            schemas = context.schemas.len(),
            language = %context.default_language,
            "mapping context initialized"
        );
        Ok(Arc::new(context))
    }

    pub fn registry(&self) -> &DeserializerRegistry {
        &self.registry
    }

    pub fn normalizer(&self) -> &UriNormalizer {
        self.registry.normalizer()
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Returns the cached schema of `T`.
    pub fn schema_for<T: GraphResource>(&self) -> MappingResult<Arc<ResourceSchema>> {
        self.schemas.schema_for::<T>(&self.registry)
    }

    /// Hydrates one row as `T`.
    pub fn hydrate<T: GraphResource>(&self, row: &ResultRow, lang: Option<&str>) -> MappingResult<T> {
        let schema = self.schema_for::<T>()?;
        ResultHydrator::new(&self.registry).hydrate(row, &schema, lang)
    }

    /// Hydrates rows as `T`, one model per identifier, in order of first
    /// appearance.
    ///
    /// Projections over optional multi-valued columns (labels in several
    /// languages, for instance) can return several rows per resource. The
    /// row kept is the first whose label matches `lang`, else the first
    /// untagged one, else the first row.
    pub fn hydrate_rows<T: GraphResource>(
        &self,
        rows: &[ResultRow],
        lang: Option<&str>,
    ) -> MappingResult<Vec<T>> {
        let schema = self.schema_for::<T>()?;
        let label = schema.label().map(|l| l.field);
        let mut chosen: Vec<(&ResultRow, LabelRank)> = Vec::with_capacity(rows.len());
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for row in rows {
            let rank = LabelRank::of(row, label, lang);
            let Some(uri) = row.value(schema.identifier()) else {
                chosen.push((row, rank));
                continue;
            };
            match positions.get(uri).copied() {
                Some(i) if rank < chosen[i].1 => chosen[i] = (row, rank),
                Some(_) => {}
                None => {
                    positions.insert(uri, chosen.len());
                    chosen.push((row, rank));
                }
            }
        }

        let hydrator = ResultHydrator::new(&self.registry);
        chosen
            .into_iter()
            .map(|(row, _)| hydrator.hydrate::<T>(row, &schema, lang))
            .collect()
    }
}

/// How well a row's label fits the requested language; lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum LabelRank {
    Matching,
    Untagged,
    Other,
}

impl LabelRank {
    fn of(row: &ResultRow, label: Option<&str>, lang: Option<&str>) -> Self {
        let (Some(label), Some(lang)) = (label, lang) else {
            return LabelRank::Matching;
        };
        match row.get(label).map(|b| b.lang.as_deref()) {
            Some(Some(tag)) if language_matches(tag, lang) => LabelRank::Matching,
            Some(None) => LabelRank::Untagged,
            _ => LabelRank::Other,
        }
    }
}

/// Basic language-range matching: `en` matches `en` and `en-GB`.
fn language_matches(tag: &str, range: &str) -> bool {
    match tag.get(..range.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(range) => {
            tag.len() == range.len() || tag.as_bytes()[range.len()] == b'-'
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparql::{Binding, QueryResult};

    #[test]
    fn test_initialize_warms_schemas() {
        let context = MappingContext::initialize(&PersistenceConfig::default()).unwrap();
        assert!(context.schemas.contains::<ExperimentModel>());
        assert!(context.schemas.contains::<VariableModel>());
        assert_eq!(context.default_language(), "en");
    }

    #[test]
    fn test_schema_built_once() {
        let context = MappingContext::new(UriNormalizer::default(), "en");
        let first = context.schema_for::<VariableModel>().unwrap();
        let second = context.schema_for::<VariableModel>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(context.schemas.len(), 1);
    }

    #[test]
    fn test_hydrate_rows_prefers_requested_language() {
        let context = MappingContext::new(UriNormalizer::default(), "en");
        let schema = context.schema_for::<VariableModel>().unwrap();
        let columns: Vec<String> = schema
            .projection_query(&[], TypeScope::PropertyPath, None)
            .projection
            .clone();
        let result = QueryResult::new(columns);
        let row = |uri: &str, label: Binding| {
            result
                .row()
                .with("uri", Binding::uri(uri))
                .with("label", label)
        };
        let rows = vec![
            row("http://ex.org/var/1", Binding::lang_literal("Hauteur", "fr")),
            row("http://ex.org/var/2", Binding::literal("Weight")),
            row("http://ex.org/var/1", Binding::literal("height")),
            row("http://ex.org/var/1", Binding::lang_literal("Height", "en-GB")),
            row("http://ex.org/var/2", Binding::lang_literal("Poids", "fr")),
        ];

        let variables: Vec<VariableModel> = context.hydrate_rows(&rows, Some("en")).unwrap();
        let labels: Vec<&str> = variables
            .iter()
            .map(|v| v.label.as_ref().unwrap().value.as_str())
            .collect();
        assert_eq!(labels, vec!["Height", "Weight"]);

        let variables: Vec<VariableModel> = context.hydrate_rows(&rows, None).unwrap();
        assert_eq!(variables[0].label.as_ref().unwrap().value, "Hauteur");
    }

    #[test]
    fn test_language_matching() {
        assert!(language_matches("en", "en"));
        assert!(language_matches("EN-gb", "en"));
        assert!(!language_matches("eng", "en"));
        assert!(!language_matches("e", "en"));
    }
}
