//! Provenance repository.

use std::collections::BTreeSet;

use crate::config::PersistenceConfig;
use crate::core::{FindOptions, IndexSpec};
use crate::error::StorageResult;
use crate::search::DocumentFilter;
use crate::types::{NewProvenance, OrderBy, ProvenanceRecord};
use crate::uri::Uri;

use super::{DynDocumentStore, distinct_uris, from_document, not_found, to_document};

/// Stores provenances in the document store.
#[derive(Clone)]
pub struct ProvenanceRepository {
    documents: DynDocumentStore,
    collection: String,
    base_uri: Uri,
}

impl ProvenanceRepository {
    pub fn new(config: &PersistenceConfig, documents: DynDocumentStore) -> StorageResult<Self> {
        Ok(Self {
            documents,
            collection: config.documents.collections.provenances.clone(),
            base_uri: config.base_uri()?,
        })
    }

    pub async fn create_indexes(&self) -> StorageResult<()> {
        self.documents
            .create_index(&self.collection, &IndexSpec::ascending(["uri"]).unique())
            .await?;
        self.documents
            .create_index(&self.collection, &IndexSpec::ascending(["agents.uri"]))
            .await?;
        tracing::info!(collection = %self.collection, "provenance indexes ready");
        Ok(())
    }

    /// Stores a provenance, generating its identifier when absent.
    pub async fn create(&self, provenance: NewProvenance) -> StorageResult<ProvenanceRecord> {
        let uri = provenance
            .uri
            .clone()
            .unwrap_or_else(|| Uri::generate(&self.base_uri, "provenance"));
        let record = provenance.into_record(uri);
        self.documents
            .insert_one(&self.collection, to_document(&record)?)
            .await?;
        tracing::debug!(uri = %record.uri, "created provenance");
        Ok(record)
    }

    pub async fn get(&self, uri: &Uri) -> StorageResult<ProvenanceRecord> {
        let filter = DocumentFilter::new().with_eq("uri", uri.as_str());
        match self.documents.find_one(&self.collection, &filter).await? {
            Some(document) => from_document(document),
            None => Err(not_found("provenance", uri)),
        }
    }

    /// Returns the provenances that exist among `uris`, sorted by identifier.
    pub async fn get_many(&self, uris: &[Uri]) -> StorageResult<Vec<ProvenanceRecord>> {
        if uris.is_empty() {
            return Ok(Vec::new());
        }
        let filter = DocumentFilter::new().with_in("uri", uris.iter().map(Uri::as_str));
        let options = FindOptions::new().sort([OrderBy::asc("uri")]);
        self.documents
            .find(&self.collection, &filter, &options)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    pub async fn delete(&self, uri: &Uri) -> StorageResult<()> {
        let filter = DocumentFilter::new().with_eq("uri", uri.as_str());
        if self.documents.delete_many(&self.collection, &filter).await? == 0 {
            return Err(not_found("provenance", uri));
        }
        Ok(())
    }

    /// Identifiers of the provenances listing any of `agents`.
    pub async fn uris_by_agents(&self, agents: &[Uri]) -> StorageResult<BTreeSet<Uri>> {
        if agents.is_empty() {
            return Ok(BTreeSet::new());
        }
        let filter = DocumentFilter::new().with_in("agents.uri", agents.iter().map(Uri::as_str));
        let values = self
            .documents
            .distinct(&self.collection, "uri", &filter)
            .await?;
        Ok(distinct_uris(values)?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backends::MemoryDocumentStore;
    use crate::types::AgentRef;

    fn uri(value: &str) -> Uri {
        Uri::parse(value).unwrap()
    }

    async fn repository() -> ProvenanceRepository {
        let repository =
            ProvenanceRepository::new(&PersistenceConfig::default(), Arc::new(MemoryDocumentStore::new()))
                .unwrap();
        repository.create_indexes().await.unwrap();
        repository
    }

    #[tokio::test]
    async fn test_create_generates_uri() {
        let repository = repository().await;
        let record = repository.create(NewProvenance::new("phenotyping")).await.unwrap();
        assert!(
            record
                .uri
                .as_str()
                .starts_with("http://www.opensilex.org/silex/id/provenance/")
        );
        assert_eq!(repository.get(&record.uri).await.unwrap(), record);
    }

    #[tokio::test]
    async fn test_duplicate_uri_rejected() {
        let repository = repository().await;
        let given = NewProvenance::new("p").with_uri(uri("http://ex.org/prov/1"));
        repository.create(given.clone()).await.unwrap();
        let err = repository.create(given).await.unwrap_err();
        assert!(err.is_duplicate_key());
    }

    #[tokio::test]
    async fn test_uris_by_agents() {
        let repository = repository().await;
        let device = uri("http://ex.org/device/camera");
        repository
            .create(
                NewProvenance::new("p1")
                    .with_uri(uri("http://ex.org/prov/1"))
                    .with_agent(AgentRef::new(device.clone())),
            )
            .await
            .unwrap();
        repository
            .create(
                NewProvenance::new("p2")
                    .with_uri(uri("http://ex.org/prov/2"))
                    .with_agent(AgentRef::new(uri("http://ex.org/device/other"))),
            )
            .await
            .unwrap();

        let found = repository.uris_by_agents(&[device]).await.unwrap();
        assert_eq!(found, BTreeSet::from([uri("http://ex.org/prov/1")]));
        assert!(repository.uris_by_agents(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let repository = repository().await;
        let err = repository.delete(&uri("http://ex.org/prov/x")).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
