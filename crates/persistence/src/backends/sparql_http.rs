//! SPARQL 1.1 protocol client.
//!
//! Sends SELECT queries as form-encoded POST requests and parses the
//! `application/sparql-results+json` response.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;

use crate::config::GraphConfig;
use crate::core::GraphStore;
use crate::error::{BackendError, StorageResult, ValidationError};
use crate::sparql::{QueryResult, SelectQuery};

const RESULTS_JSON: &str = "application/sparql-results+json";

/// A remote triple store reached over HTTP.
#[derive(Debug, Clone)]
pub struct SparqlHttpStore {
    http: Client,
    endpoint: String,
    supports_property_paths: bool,
}

impl SparqlHttpStore {
    /// Creates a client from the graph configuration.
    pub fn from_config(config: &GraphConfig) -> StorageResult<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| ValidationError::MissingRequiredField {
                field: "graph.endpoint".to_string(),
            })?;
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| BackendError::ConnectionFailed {
                backend_name: "sparql-http".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            http,
            endpoint,
            supports_property_paths: config.supports_property_paths,
        })
    }
}

#[async_trait]
impl GraphStore for SparqlHttpStore {
    fn backend_name(&self) -> &'static str {
        "sparql-http"
    }

    fn supports_property_paths(&self) -> bool {
        self.supports_property_paths
    }

    async fn select(&self, query: &SelectQuery) -> StorageResult<QueryResult> {
        let text = query.to_sparql();
        tracing::debug!(endpoint = %self.endpoint, query = %text, "sparql select");

        let response = self
            .http
            .post(&self.endpoint)
            .header(ACCEPT, RESULTS_JSON)
            .form(&[("query", text.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::QueryError {
                message: format!(
                    "endpoint returned {}: {}",
                    status,
                    body.chars().take(200).collect::<String>()
                ),
            }
            .into());
        }

        let body: serde_json::Value = response.json().await?;
        QueryResult::from_sparql_json(&body)
    }
}
