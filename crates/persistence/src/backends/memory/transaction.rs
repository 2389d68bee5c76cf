//! Buffered transactions for the in-memory document store.

use async_trait::async_trait;

use crate::core::{Document, DocumentTransaction};
use crate::error::{StorageResult, TransactionError};

use super::store::Collections;

/// Writes staged in memory and applied under one lock on commit.
pub struct MemoryTransaction {
    collections: Collections,
    pending: Vec<(String, Document)>,
    active: bool,
}

impl MemoryTransaction {
    pub(crate) fn new(collections: Collections) -> Self {
        Self {
            collections,
            pending: Vec::new(),
            active: true,
        }
    }

    fn staged(&self, collection: &str) -> Vec<Document> {
        self.pending
            .iter()
            .filter(|(name, _)| name == collection)
            .map(|(_, d)| d.clone())
            .collect()
    }
}

#[async_trait]
impl DocumentTransaction for MemoryTransaction {
    async fn insert_one(&mut self, collection: &str, document: Document) -> StorageResult<()> {
        if !self.active {
            return Err(TransactionError::InvalidTransaction.into());
        }
        {
            let collections = self.collections.read();
            if let Some(coll) = collections.get(collection) {
                coll.check_unique(collection, &document, None, &self.staged(collection))?;
            }
        }
        self.pending.push((collection.to_string(), document));
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> StorageResult<()> {
        if !self.active {
            return Err(TransactionError::InvalidTransaction.into());
        }
        self.active = false;

        let mut collections = self.collections.write();
        for (position, (name, document)) in self.pending.iter().enumerate() {
            let earlier: Vec<Document> = self.pending[..position]
                .iter()
                .filter(|(n, _)| n == name)
                .map(|(_, d)| d.clone())
                .collect();
            if let Some(coll) = collections.get(name) {
                coll.check_unique(name, document, None, &earlier)
                    .map_err(|e| TransactionError::RolledBack {
                        reason: e.to_string(),
                    })?;
            }
        }
        for (name, document) in self.pending.drain(..) {
            collections
                .entry(name)
                .or_default()
                .documents
                .push(document);
        }
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> StorageResult<()> {
        if !self.active {
            return Err(TransactionError::InvalidTransaction.into());
        }
        self.active = false;
        self.pending.clear();
        Ok(())
    }
}
