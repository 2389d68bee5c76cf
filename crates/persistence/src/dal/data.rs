//! Measurement and data file repository.
//!
//! Measurements are validated against their variables' datatypes before
//! they are written; a batch is stored entirely or not at all. Data files
//! pair a metadata document with blob content, written in one scoped
//! transaction: if either write fails, the metadata is rolled back and any
//! partially written blob is deleted before the error is returned.

use std::collections::HashSet;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;

use crate::config::PersistenceConfig;
use crate::core::{DocumentTransaction, FindOptions, IndexSpec};
use crate::error::{ResourceError, StorageResult, ValidationError};
use crate::search::{DataSearchCriteria, DocumentFilter, DocumentFilterBuilder};
use crate::types::{
    DataFileRecord, MeasurementRecord, NewDataFile, NewMeasurement, OrderBy, Page, PageInfo,
    PageRequest, ProvenanceRecord, VariableModel, paginate,
};
use crate::uri::Uri;
use crate::validation::TypeCoherenceValidator;

use super::{
    DynBlobStore, DynDocumentStore, ProvenanceRepository, VariableRepository, distinct_uris,
    from_document, not_found, to_document,
};

/// Stores measurements and data files.
#[derive(Clone)]
pub struct DataRepository {
    documents: DynDocumentStore,
    blobs: DynBlobStore,
    provenances: ProvenanceRepository,
    variables: VariableRepository,
    data_collection: String,
    file_collection: String,
    file_prefix: String,
    base_uri: Uri,
    max_page_size: usize,
    inserting: InFlightFiles,
}

impl DataRepository {
    pub fn new(
        config: &PersistenceConfig,
        documents: DynDocumentStore,
        blobs: DynBlobStore,
        provenances: ProvenanceRepository,
        variables: VariableRepository,
    ) -> StorageResult<Self> {
        Ok(Self {
            documents,
            blobs,
            provenances,
            variables,
            data_collection: config.documents.collections.data.clone(),
            file_collection: config.documents.collections.files.clone(),
            file_prefix: config.blobs.file_prefix.clone(),
            base_uri: config.base_uri()?,
            max_page_size: config.max_page_size,
            inserting: InFlightFiles::default(),
        })
    }

    /// Creates the measurement and data file indexes.
    ///
    /// The compound unique indexes reject a second measurement of the same
    /// variable, provenance, scientific objects and date.
    pub async fn create_indexes(&self) -> StorageResult<()> {
        let data = [
            IndexSpec::ascending(["uri"]).unique(),
            IndexSpec::ascending(["variable", "provenance", "scientificObjects", "date"]).unique(),
            IndexSpec::ascending(["variable", "scientificObjects", "date"]),
            IndexSpec::ascending(["scientificObjects", "date"]),
        ];
        for index in &data {
            self.documents
                .create_index(&self.data_collection, index)
                .await?;
        }

        let files = [
            IndexSpec::ascending(["uri"]).unique(),
            IndexSpec::ascending(["provenance", "scientificObjects", "date"]).unique(),
        ];
        for index in &files {
            self.documents
                .create_index(&self.file_collection, index)
                .await?;
        }
        tracing::info!(
            data = %self.data_collection,
            files = %self.file_collection,
            "data indexes ready"
        );
        Ok(())
    }

    pub async fn create(&self, measurement: NewMeasurement) -> StorageResult<MeasurementRecord> {
        let mut created = self.create_all(vec![measurement]).await?;
        created.pop().ok_or_else(|| {
            ValidationError::MissingRequiredField {
                field: "measurement".to_string(),
            }
            .into()
        })
    }

    /// Validates and stores a batch, generating missing identifiers.
    ///
    /// # Errors
    ///
    /// * `ValidationError::NoVariableDataType` / `TypeMismatch` - nothing is written
    /// * `ResourceError::DuplicateKey` - nothing is written
    pub async fn create_all(
        &self,
        measurements: Vec<NewMeasurement>,
    ) -> StorageResult<Vec<MeasurementRecord>> {
        if measurements.is_empty() {
            return Ok(Vec::new());
        }
        let checked = TypeCoherenceValidator::new(&self.variables)
            .validate_batch(measurements)
            .await?;

        let records: Vec<MeasurementRecord> = checked
            .into_iter()
            .map(|c| {
                let uri = c
                    .measurement
                    .uri
                    .clone()
                    .unwrap_or_else(|| Uri::generate(&self.base_uri, "data"));
                c.into_record(uri)
            })
            .collect();
        let documents = records
            .iter()
            .map(to_document)
            .collect::<StorageResult<Vec<_>>>()?;

        self.documents
            .insert_many(&self.data_collection, documents)
            .await?;
        tracing::info!(count = records.len(), "stored measurements");
        Ok(records)
    }

    pub async fn get(&self, uri: &Uri) -> StorageResult<MeasurementRecord> {
        let filter = DocumentFilter::new().with_eq("uri", uri.as_str());
        match self.documents.find_one(&self.data_collection, &filter).await? {
            Some(document) => from_document(document),
            None => Err(not_found("data", uri)),
        }
    }

    /// Replaces a stored measurement in full, after validating its value.
    pub async fn update(&self, measurement: NewMeasurement) -> StorageResult<MeasurementRecord> {
        let uri = measurement
            .uri
            .clone()
            .ok_or_else(|| ValidationError::MissingRequiredField {
                field: "uri".to_string(),
            })?;
        let record = TypeCoherenceValidator::new(&self.variables)
            .validate_batch(vec![measurement])
            .await?
            .pop()
            .map(|c| c.into_record(uri.clone()))
            .ok_or_else(|| not_found("data", &uri))?;

        let filter = DocumentFilter::new().with_eq("uri", uri.as_str());
        let matched = self
            .documents
            .replace_one(&self.data_collection, &filter, to_document(&record)?)
            .await?;
        if matched == 0 {
            return Err(not_found("data", &uri));
        }
        Ok(record)
    }

    pub async fn delete(&self, uri: &Uri) -> StorageResult<()> {
        let filter = DocumentFilter::new().with_eq("uri", uri.as_str());
        if self
            .documents
            .delete_many(&self.data_collection, &filter)
            .await?
            == 0
        {
            return Err(not_found("data", uri));
        }
        Ok(())
    }

    /// Deletes the listed measurements, returning how many existed.
    pub async fn delete_many(&self, uris: &[Uri]) -> StorageResult<u64> {
        if uris.is_empty() {
            return Ok(0);
        }
        let filter = DocumentFilter::new().with_in("uri", uris.iter().map(Uri::as_str));
        self.documents
            .delete_many(&self.data_collection, &filter)
            .await
    }

    /// Deletes every measurement matching `criteria`.
    pub async fn delete_with_filter(&self, criteria: &DataSearchCriteria) -> StorageResult<u64> {
        let Some(filter) = self.filter_for(criteria).await? else {
            return Ok(0);
        };
        let deleted = self
            .documents
            .delete_many(&self.data_collection, &filter)
            .await?;
        tracing::info!(deleted, "deleted measurements by filter");
        Ok(deleted)
    }

    /// Searches measurements. Without explicit order, newest first.
    pub async fn search(
        &self,
        criteria: &DataSearchCriteria,
        order_by: &[OrderBy],
        page: PageRequest,
    ) -> StorageResult<Page<MeasurementRecord>> {
        self.search_in(&self.data_collection, criteria, order_by, page)
            .await
    }

    /// Searches the measurements attributed to `device`.
    pub async fn search_by_device(
        &self,
        device: &Uri,
        criteria: &DataSearchCriteria,
        order_by: &[OrderBy],
        page: PageRequest,
    ) -> StorageResult<Page<MeasurementRecord>> {
        let criteria = criteria.clone().with_device(device.clone());
        self.search(&criteria, order_by, page).await
    }

    pub async fn count(&self, criteria: &DataSearchCriteria) -> StorageResult<u64> {
        match self.filter_for(criteria).await? {
            Some(filter) => self.documents.count(&self.data_collection, &filter).await,
            None => Ok(0),
        }
    }

    /// Variables measured in an experiment, sorted by identifier and paged.
    pub async fn variables_by_experiment(
        &self,
        experiment: &Uri,
        page: PageRequest,
        lang: Option<&str>,
    ) -> StorageResult<Page<VariableModel>> {
        let filter = DocumentFilter::new().with_eq("provenance.experiments", experiment.as_str());
        let values = self
            .documents
            .distinct(&self.data_collection, "variable", &filter)
            .await?;
        let Page { items, page_info } =
            paginate(distinct_uris(values)?, &page.capped(self.max_page_size));
        let variables = self.variables.get_many(&items, lang).await?;
        Ok(Page::new(variables, page_info))
    }

    /// Provenances of the measurements of an experiment.
    pub async fn provenances_by_experiment(
        &self,
        experiment: &Uri,
    ) -> StorageResult<Vec<ProvenanceRecord>> {
        let filter = DocumentFilter::new().with_eq("provenance.experiments", experiment.as_str());
        let values = self
            .documents
            .distinct(&self.data_collection, "provenance.uri", &filter)
            .await?;
        self.provenances.get_many(&distinct_uris(values)?).await
    }

    /// Variables having at least one measurement matching `criteria`.
    pub async fn used_variables(
        &self,
        criteria: &DataSearchCriteria,
        lang: Option<&str>,
    ) -> StorageResult<Vec<VariableModel>> {
        let Some(filter) = self.filter_for(criteria).await? else {
            return Ok(Vec::new());
        };
        let values = self
            .documents
            .distinct(&self.data_collection, "variable", &filter)
            .await?;
        self.variables.get_many(&distinct_uris(values)?, lang).await
    }

    /// Stores a data file's metadata and content together.
    ///
    /// The metadata is inserted in a transaction, the content is written to
    /// the blob store, then the transaction commits. A failed metadata insert
    /// leaves the blob store untouched; a failed write or commit rolls back
    /// and removes the blob.
    ///
    /// The uri stays reserved until the commit, so a concurrent insert of the
    /// same uri fails with `DuplicateKey` before touching the blob path.
    pub async fn insert_file(
        &self,
        file: NewDataFile,
        content: Vec<u8>,
    ) -> StorageResult<DataFileRecord> {
        let uri = file
            .uri
            .clone()
            .unwrap_or_else(|| Uri::generate(&self.base_uri, "file"));
        let path = blob_path(&self.file_prefix, &uri);
        let record = file.into_record(uri, path);
        let document = to_document(&record)?;
        let _reservation = self.inserting.reserve(&self.file_collection, &record.uri)?;

        let mut transaction = self.documents.begin().await?;
        if let Err(e) = transaction.insert_one(&self.file_collection, document).await {
            rollback(transaction).await;
            return Err(e);
        }
        if let Err(e) = self.blobs.write(&record.path, content).await {
            rollback(transaction).await;
            self.remove_blob(&record.path).await;
            return Err(e);
        }
        if let Err(e) = transaction.commit().await {
            self.remove_blob(&record.path).await;
            return Err(e);
        }

        tracing::info!(uri = %record.uri, path = %record.path, "stored data file");
        Ok(record)
    }

    /// Removes a partially written blob. Failures are logged; the caller
    /// returns the original error.
    async fn remove_blob(&self, path: &str) {
        if let Err(e) = self.blobs.delete_if_exists(path).await {
            tracing::warn!(error = %e, path, "failed to remove partially written blob");
        }
    }

    pub async fn get_file(&self, uri: &Uri) -> StorageResult<DataFileRecord> {
        let filter = DocumentFilter::new().with_eq("uri", uri.as_str());
        match self.documents.find_one(&self.file_collection, &filter).await? {
            Some(document) => from_document(document),
            None => Err(not_found("datafile", uri)),
        }
    }

    /// Returns the content of a data file.
    pub async fn read_file(&self, uri: &Uri) -> StorageResult<Vec<u8>> {
        let record = self.get_file(uri).await?;
        self.blobs.read(&record.path).await
    }

    /// Searches data files. Measurement-only criteria (variables,
    /// confidence) match nothing on files and should be left empty.
    pub async fn search_files(
        &self,
        criteria: &DataSearchCriteria,
        order_by: &[OrderBy],
        page: PageRequest,
    ) -> StorageResult<Page<DataFileRecord>> {
        self.search_in(&self.file_collection, criteria, order_by, page)
            .await
    }

    /// Deletes a data file's metadata, then its content.
    pub async fn delete_file(&self, uri: &Uri) -> StorageResult<()> {
        let record = self.get_file(uri).await?;
        let filter = DocumentFilter::new().with_eq("uri", uri.as_str());
        self.documents
            .delete_many(&self.file_collection, &filter)
            .await?;
        self.blobs.delete_if_exists(&record.path).await?;
        Ok(())
    }

    /// Compiles criteria, resolving device provenances when a device is set.
    ///
    /// `None` means no record can match.
    async fn filter_for(&self, criteria: &DataSearchCriteria) -> StorageResult<Option<DocumentFilter>> {
        let builder = DocumentFilterBuilder::new();
        match &criteria.device {
            Some(device) => {
                let provenances = self
                    .provenances
                    .uris_by_agents(std::slice::from_ref(device))
                    .await?;
                Ok(builder.compile_for_device(criteria, device, &provenances))
            }
            None => Ok(Some(builder.compile(criteria))),
        }
    }

    async fn search_in<T: DeserializeOwned>(
        &self,
        collection: &str,
        criteria: &DataSearchCriteria,
        order_by: &[OrderBy],
        page: PageRequest,
    ) -> StorageResult<Page<T>> {
        let page = page.capped(self.max_page_size);
        let Some(filter) = self.filter_for(criteria).await? else {
            return Ok(Page::empty(&page));
        };

        let total = self.documents.count(collection, &filter).await?;
        let sort = if order_by.is_empty() {
            vec![OrderBy::desc("date")]
        } else {
            order_by.to_vec()
        };
        let mut options = FindOptions::new().sort(sort);
        if !page.is_unbounded() {
            options = options
                .skip(page.offset() as u64)
                .limit(page.page_size as u64);
        }

        let items = self
            .documents
            .find(collection, &filter, &options)
            .await?
            .into_iter()
            .map(from_document)
            .collect::<StorageResult<Vec<T>>>()?;
        Ok(Page::new(
            items,
            PageInfo {
                page: page.served_page(),
                page_size: page.page_size,
                total,
            },
        ))
    }
}

/// Data file uris with an insert in progress.
#[derive(Clone, Default)]
struct InFlightFiles(Arc<Mutex<HashSet<Uri>>>);

impl InFlightFiles {
    fn reserve(&self, collection: &str, uri: &Uri) -> StorageResult<FileReservation> {
        if !self.0.lock().insert(uri.clone()) {
            tracing::debug!(uri = %uri, "data file insert already in progress");
            return Err(ResourceError::DuplicateKey {
                collection: collection.to_string(),
                key: format!("uri {uri}"),
            }
            .into());
        }
        Ok(FileReservation {
            files: self.clone(),
            uri: uri.clone(),
        })
    }
}

/// Releases the uri when the insert finishes, whatever its outcome.
struct FileReservation {
    files: InFlightFiles,
    uri: Uri,
}

impl Drop for FileReservation {
    fn drop(&mut self) {
        self.files.0.lock().remove(&self.uri);
    }
}

async fn rollback(transaction: Box<dyn DocumentTransaction>) {
    if let Err(e) = transaction.rollback().await {
        tracing::warn!(error = %e, "data file rollback failed");
    }
}

/// Blob location of a data file: `<prefix>/<base64url(uri)>`.
pub(crate) fn blob_path(prefix: &str, uri: &Uri) -> String {
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        URL_SAFE_NO_PAD.encode(uri.as_str())
    )
}
