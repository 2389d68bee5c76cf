//! Configuration for the data layer.
//!
//! The host service is responsible for loading the configuration (file,
//! environment, ...). This module only defines its shape, its defaults and
//! its invariants.
//!
//! ```
//! use silex_persistence::config::PersistenceConfig;
//!
//! let config: PersistenceConfig = serde_json::from_str(r#"{
//!     "base_uri": "http://phenome.example.org/",
//!     "graph": { "endpoint": "http://localhost:7200/repositories/silex" },
//!     "documents": { "database": "phenome" }
//! }"#).unwrap();
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.documents.collections.data, "data");
//! assert_eq!(config.default_page_size, 20);
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{StorageResult, ValidationError};
use crate::uri::{Uri, UriNormalizer};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Base of generated identifiers (`<base_uri>id/<kind>/<uuid>`).
    #[serde(default = "default_base_uri")]
    pub base_uri: String,

    /// Graph store settings.
    #[serde(default)]
    pub graph: GraphConfig,

    /// Document store settings.
    #[serde(default)]
    pub documents: DocumentConfig,

    /// Blob store settings.
    #[serde(default)]
    pub blobs: BlobConfig,

    /// Page size used when a request does not give one.
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Upper bound on requested page sizes.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

/// Graph store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// SPARQL query endpoint.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Request timeout in milliseconds.
    #[serde(default = "default_graph_timeout_ms")]
    pub timeout_ms: u64,

    /// Whether the store evaluates property paths such as `rdfs:subClassOf*`.
    #[serde(default = "default_true")]
    pub supports_property_paths: bool,

    /// Language used for labels when a request does not give one.
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Extra prefix bindings, on top of rdf, rdfs, owl, xsd and oeso.
    #[serde(default)]
    pub prefixes: BTreeMap<String, String>,
}

/// Document store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Connection string.
    #[serde(default = "default_document_uri")]
    pub uri: String,

    /// Database name.
    #[serde(default = "default_database")]
    pub database: String,

    /// Collection names.
    #[serde(default)]
    pub collections: CollectionNames,
}

/// Names of the collections used by the repositories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionNames {
    #[serde(default = "default_data_collection")]
    pub data: String,

    #[serde(default = "default_file_collection")]
    pub files: String,

    #[serde(default = "default_provenance_collection")]
    pub provenances: String,
}

/// Blob store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobConfig {
    /// Root directory for the local file system store; in-memory when unset.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Path prefix under which data files are written.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

fn default_base_uri() -> String {
    "http://www.opensilex.org/silex/".to_string()
}

fn default_page_size() -> usize {
    20
}

fn default_max_page_size() -> usize {
    10_000
}

fn default_graph_timeout_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "en".to_string()
}

fn default_document_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    "silex".to_string()
}

fn default_data_collection() -> String {
    "data".to_string()
}

fn default_file_collection() -> String {
    "file".to_string()
}

fn default_provenance_collection() -> String {
    "provenance".to_string()
}

fn default_file_prefix() -> String {
    "datafile".to_string()
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            base_uri: default_base_uri(),
            graph: GraphConfig::default(),
            documents: DocumentConfig::default(),
            blobs: BlobConfig::default(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: default_graph_timeout_ms(),
            supports_property_paths: true,
            default_language: default_language(),
            prefixes: BTreeMap::new(),
        }
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            uri: default_document_uri(),
            database: default_database(),
            collections: CollectionNames::default(),
        }
    }
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            data: default_data_collection(),
            files: default_file_collection(),
            provenances: default_provenance_collection(),
        }
    }
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            root: None,
            file_prefix: default_file_prefix(),
        }
    }
}

impl PersistenceConfig {
    /// Validates configuration invariants.
    pub fn validate(&self) -> StorageResult<()> {
        self.base_uri()?;

        if self.default_page_size == 0 {
            return Err(invalid("default_page_size must be > 0"));
        }
        if self.max_page_size < self.default_page_size {
            return Err(invalid("max_page_size must be >= default_page_size"));
        }
        if self.graph.default_language.trim().is_empty() {
            return Err(invalid("graph.default_language must not be empty"));
        }
        if let Some(endpoint) = self.graph.endpoint.as_deref() {
            let lower = endpoint.trim().to_ascii_lowercase();
            if !lower.starts_with("http://") && !lower.starts_with("https://") {
                return Err(invalid("graph.endpoint must start with http:// or https://"));
            }
        }
        for (prefix, namespace) in &self.graph.prefixes {
            if prefix.is_empty() || prefix.contains(':') {
                return Err(invalid(&format!("invalid prefix '{prefix}'")));
            }
            Uri::parse(namespace)?;
        }

        let names = &self.documents.collections;
        if [&names.data, &names.files, &names.provenances]
            .iter()
            .any(|n| n.trim().is_empty())
        {
            return Err(invalid("collection names must not be empty"));
        }
        if names.data == names.files {
            return Err(invalid("data and file collections must differ"));
        }
        if self.blobs.file_prefix.trim().is_empty() {
            return Err(invalid("blobs.file_prefix must not be empty"));
        }
        Ok(())
    }

    /// The parsed base URI.
    pub fn base_uri(&self) -> StorageResult<Uri> {
        Ok(Uri::parse(&self.base_uri)?)
    }

    /// Builds the normalizer with the default and configured prefixes.
    pub fn normalizer(&self) -> UriNormalizer {
        self.graph
            .prefixes
            .iter()
            .fold(UriNormalizer::default(), |n, (prefix, ns)| {
                n.with_prefix(prefix.clone(), ns.clone())
            })
    }
}

fn invalid(message: &str) -> crate::error::StorageError {
    ValidationError::InvalidConfiguration {
        message: message.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PersistenceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.blobs.file_prefix, "datafile");
        assert!(config.graph.supports_property_paths);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: PersistenceConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.documents.collections.provenances, "provenance");
        assert_eq!(config.max_page_size, 10_000);
    }

    #[test]
    fn validate_rejects_relative_base_uri() {
        let config = PersistenceConfig {
            base_uri: "silex/".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let config = PersistenceConfig {
            default_page_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_http_endpoint() {
        let mut config = PersistenceConfig::default();
        config.graph.endpoint = Some("ftp://triples.local".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_shared_collections() {
        let mut config = PersistenceConfig::default();
        config.documents.collections.files = "data".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_configured_prefixes_reach_normalizer() {
        let mut config = PersistenceConfig::default();
        config
            .graph
            .prefixes
            .insert("vocab".to_string(), "http://ex.org/vocab#".to_string());
        assert!(config.validate().is_ok());
        assert_eq!(
            config.normalizer().expand("vocab:height"),
            "http://ex.org/vocab#height"
        );
        assert_eq!(
            config.normalizer().expand("xsd:string"),
            "http://www.w3.org/2001/XMLSchema#string"
        );
    }
}
