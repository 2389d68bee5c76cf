//! MongoDB document store backend.
//!
//! Documents are converted between `serde_json` and BSON through serde and
//! read back as relaxed extended JSON. The `_id` field MongoDB adds is never
//! returned. Transactions use client sessions and need a replica set.

use std::fmt::Debug;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, Bson, Document as BsonDocument, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, ClientSession, Collection, Database, IndexModel};
use serde_json::Value;

use crate::config::DocumentConfig;
use crate::core::{Document, DocumentStore, DocumentTransaction, FindOptions, IndexSpec};
use crate::error::{BackendError, ResourceError, StorageError, StorageResult};
use crate::search::DocumentFilter;

const DUPLICATE_KEY_CODE: i32 = 11000;

/// Document store backed by a MongoDB database.
#[derive(Clone)]
pub struct MongoDocumentStore {
    client: Client,
    database: Database,
}

impl Debug for MongoDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoDocumentStore")
            .field("database", &self.database.name())
            .finish_non_exhaustive()
    }
}

impl MongoDocumentStore {
    /// Connects using the document store configuration.
    pub async fn connect(config: &DocumentConfig) -> StorageResult<Self> {
        let client = Client::with_uri_str(&config.uri).await.map_err(|e| {
            BackendError::ConnectionFailed {
                backend_name: "mongodb".to_string(),
                message: e.to_string(),
            }
        })?;
        let database = client.database(&config.database);
        tracing::info!(database = %config.database, "connected to mongodb");
        Ok(Self { client, database })
    }

    fn collection(&self, name: &str) -> Collection<BsonDocument> {
        self.database.collection(name)
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) => write.code == DUPLICATE_KEY_CODE,
        _ => err.to_string().contains("E11000"),
    }
}

fn write_error(collection: &str, err: mongodb::error::Error) -> StorageError {
    if is_duplicate_key(&err) {
        return ResourceError::DuplicateKey {
            collection: collection.to_string(),
            key: err.to_string(),
        }
        .into();
    }
    err.into()
}

fn to_bson(document: &Document) -> StorageResult<BsonDocument> {
    bson::to_document(document).map_err(|e| {
        BackendError::SerializationError {
            message: e.to_string(),
        }
        .into()
    })
}

fn filter_to_bson(filter: &DocumentFilter) -> StorageResult<BsonDocument> {
    to_bson(filter.as_map())
}

fn from_bson(document: BsonDocument) -> StorageResult<Document> {
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(mut map) => {
            map.remove("_id");
            Ok(map)
        }
        other => Err(BackendError::SerializationError {
            message: format!("expected a document, got {other}"),
        }
        .into()),
    }
}

fn sort_to_bson(options: &FindOptions) -> BsonDocument {
    let mut sort = BsonDocument::new();
    for key in &options.sort {
        sort.insert(key.field.clone(), key.direction.as_i32());
    }
    sort
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    fn backend_name(&self) -> &'static str {
        "mongodb"
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> StorageResult<()> {
        let mut keys = BsonDocument::new();
        for key in &index.keys {
            keys.insert(key.clone(), 1);
        }
        let model = IndexModel::builder()
            .keys(keys)
            .options(
                IndexOptions::builder()
                    .unique(index.unique)
                    .name(index.name())
                    .build(),
            )
            .build();
        self.collection(collection)
            .create_index(model)
            .await
            .map_err(|e| write_error(collection, e))?;
        Ok(())
    }

    async fn insert_one(&self, collection: &str, document: Document) -> StorageResult<()> {
        self.collection(collection)
            .insert_one(to_bson(&document)?)
            .await
            .map_err(|e| write_error(collection, e))?;
        Ok(())
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> StorageResult<()> {
        if documents.is_empty() {
            return Ok(());
        }
        let documents = documents
            .iter()
            .map(to_bson)
            .collect::<StorageResult<Vec<_>>>()?;

        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;
        let inserted = self
            .collection(collection)
            .insert_many(documents)
            .session(&mut session)
            .await;
        match inserted {
            Ok(_) => {
                session.commit_transaction().await?;
                Ok(())
            }
            Err(e) => {
                if let Err(abort) = session.abort_transaction().await {
                    tracing::warn!(error = %abort, "failed to abort insert_many transaction");
                }
                Err(write_error(collection, e))
            }
        }
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: &DocumentFilter,
        document: Document,
    ) -> StorageResult<u64> {
        let result = self
            .collection(collection)
            .replace_one(filter_to_bson(filter)?, to_bson(&document)?)
            .await
            .map_err(|e| write_error(collection, e))?;
        Ok(result.matched_count)
    }

    async fn find(
        &self,
        collection: &str,
        filter: &DocumentFilter,
        options: &FindOptions,
    ) -> StorageResult<Vec<Document>> {
        let mut find = self
            .collection(collection)
            .find(filter_to_bson(filter)?)
            .projection(doc! { "_id": 0 });
        if !options.sort.is_empty() {
            find = find.sort(sort_to_bson(options));
        }
        if let Some(skip) = options.skip {
            find = find.skip(skip);
        }
        if let Some(limit) = options.limit {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        let documents: Vec<BsonDocument> = find.await?.try_collect().await?;
        documents.into_iter().map(from_bson).collect()
    }

    async fn count(&self, collection: &str, filter: &DocumentFilter) -> StorageResult<u64> {
        Ok(self
            .collection(collection)
            .count_documents(filter_to_bson(filter)?)
            .await?)
    }

    async fn distinct(
        &self,
        collection: &str,
        field: &str,
        filter: &DocumentFilter,
    ) -> StorageResult<Vec<Value>> {
        let values = self
            .collection(collection)
            .distinct(field, filter_to_bson(filter)?)
            .await?;
        Ok(values.into_iter().map(Bson::into_relaxed_extjson).collect())
    }

    async fn delete_many(&self, collection: &str, filter: &DocumentFilter) -> StorageResult<u64> {
        let result = self
            .collection(collection)
            .delete_many(filter_to_bson(filter)?)
            .await?;
        Ok(result.deleted_count)
    }

    async fn begin(&self) -> StorageResult<Box<dyn DocumentTransaction>> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;
        Ok(Box::new(MongoTransaction {
            session,
            database: self.database.clone(),
        }))
    }
}

/// A MongoDB multi-document transaction.
pub struct MongoTransaction {
    session: ClientSession,
    database: Database,
}

#[async_trait]
impl DocumentTransaction for MongoTransaction {
    async fn insert_one(&mut self, collection: &str, document: Document) -> StorageResult<()> {
        self.database
            .collection::<BsonDocument>(collection)
            .insert_one(to_bson(&document)?)
            .session(&mut self.session)
            .await
            .map_err(|e| write_error(collection, e))?;
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> StorageResult<()> {
        self.session.commit_transaction().await?;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> StorageResult<()> {
        self.session.abort_transaction().await?;
        Ok(())
    }
}
