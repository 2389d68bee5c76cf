//! Document store abstraction.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StorageResult;
use crate::search::DocumentFilter;
use crate::types::OrderBy;

/// A schema-flexible record.
pub type Document = Map<String, Value>;

/// A compound index on ascending keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Field paths, in index order.
    pub keys: Vec<String>,
    /// Rejects a second document with the same key values.
    pub unique: bool,
}

impl IndexSpec {
    /// A non-unique ascending index.
    pub fn ascending<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    /// Marks the index unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// A stable name derived from the keys (`variable_1_date_1`).
    pub fn name(&self) -> String {
        self.keys
            .iter()
            .map(|k| format!("{k}_1"))
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// Sort, skip and limit of a find.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Vec<OrderBy>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(mut self, sort: impl IntoIterator<Item = OrderBy>) -> Self {
        self.sort.extend(sort);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A document store with filter queries and unique indexes.
///
/// Unique index violations surface as `ResourceError::DuplicateKey`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns a human-readable name for this store.
    fn backend_name(&self) -> &'static str;

    /// Creates an index if it does not exist yet.
    async fn create_index(&self, collection: &str, index: &IndexSpec) -> StorageResult<()>;

    /// Inserts one document.
    async fn insert_one(&self, collection: &str, document: Document) -> StorageResult<()>;

    /// Inserts documents atomically: either all are stored or none.
    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> StorageResult<()>;

    /// Replaces the first document matching `filter`.
    ///
    /// Returns the number of matched documents (0 or 1).
    async fn replace_one(
        &self,
        collection: &str,
        filter: &DocumentFilter,
        document: Document,
    ) -> StorageResult<u64>;

    /// Returns the documents matching `filter`.
    async fn find(
        &self,
        collection: &str,
        filter: &DocumentFilter,
        options: &FindOptions,
    ) -> StorageResult<Vec<Document>>;

    /// Returns the first document matching `filter`.
    async fn find_one(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> StorageResult<Option<Document>> {
        let mut found = self
            .find(collection, filter, &FindOptions::new().limit(1))
            .await?;
        Ok(found.pop())
    }

    /// Counts the documents matching `filter`.
    async fn count(&self, collection: &str, filter: &DocumentFilter) -> StorageResult<u64>;

    /// Returns the distinct values of `field` among matching documents.
    ///
    /// Array fields contribute each of their elements.
    async fn distinct(
        &self,
        collection: &str,
        field: &str,
        filter: &DocumentFilter,
    ) -> StorageResult<Vec<Value>>;

    /// Deletes the documents matching `filter`, returning how many were removed.
    async fn delete_many(&self, collection: &str, filter: &DocumentFilter) -> StorageResult<u64>;

    /// Starts a transaction.
    async fn begin(&self) -> StorageResult<Box<dyn DocumentTransaction>>;
}

/// Writes buffered until commit.
///
/// Dropping a transaction without committing discards its writes.
#[async_trait]
pub trait DocumentTransaction: Send {
    /// Inserts one document within the transaction.
    async fn insert_one(&mut self, collection: &str, document: Document) -> StorageResult<()>;

    /// Commits the transaction, persisting all changes.
    async fn commit(self: Box<Self>) -> StorageResult<()>;

    /// Rolls back the transaction, discarding all changes.
    async fn rollback(self: Box<Self>) -> StorageResult<()>;
}
