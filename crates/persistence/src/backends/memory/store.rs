//! In-memory document store.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::core::{Document, DocumentStore, DocumentTransaction, FindOptions, IndexSpec};
use crate::error::{ResourceError, StorageResult};
use crate::search::DocumentFilter;
use crate::types::SortDirection;

use super::filter::{flatten, matches, resolve, sort_order};
use super::transaction::MemoryTransaction;

#[derive(Debug, Default)]
pub(crate) struct Collection {
    pub(crate) documents: Vec<Document>,
    pub(crate) indexes: Vec<IndexSpec>,
}

impl Collection {
    /// Fails when `document` collides with a stored document on a unique
    /// index. `skip` excludes one stored position (the replaced document).
    pub(crate) fn check_unique(
        &self,
        name: &str,
        document: &Document,
        skip: Option<usize>,
        staged: &[Document],
    ) -> StorageResult<()> {
        for index in self.indexes.iter().filter(|i| i.unique) {
            let keys = index_keys(index, document);
            let others = self
                .documents
                .iter()
                .enumerate()
                .filter(|(pos, _)| Some(*pos) != skip)
                .map(|(_, d)| d)
                .chain(staged.iter());
            for other in others {
                if let Some(key) = index_keys(index, other).intersection(&keys).next() {
                    return Err(ResourceError::DuplicateKey {
                        collection: name.to_string(),
                        key: format!("{} {}", index.name(), key),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}

pub(crate) type Collections = Arc<RwLock<HashMap<String, Collection>>>;

/// Index entries of a document.
///
/// Array fields are indexed per element, so a document yields one entry per
/// combination of elements. Missing fields and empty arrays index as null.
fn index_keys(index: &IndexSpec, document: &Document) -> HashSet<String> {
    let mut tuples: Vec<Vec<Value>> = vec![Vec::new()];
    for key in &index.keys {
        let resolved = resolve(document, key);
        let mut elements: Vec<Value> = Vec::new();
        for value in resolved {
            match value {
                Value::Array(items) => elements.extend(items.iter().cloned()),
                other => elements.push(other.clone()),
            }
        }
        if elements.is_empty() {
            elements.push(Value::Null);
        }
        tuples = tuples
            .into_iter()
            .flat_map(|prefix| {
                elements.iter().map(move |e| {
                    let mut tuple = prefix.clone();
                    tuple.push(e.clone());
                    tuple
                })
            })
            .collect();
    }
    tuples
        .into_iter()
        .map(|t| Value::Array(t).to_string())
        .collect()
}

/// Document store kept in process memory.
///
/// Evaluates the filter operators produced by the filter builders, honors
/// unique indexes with array-element semantics and buffers transactional
/// writes until commit. Intended for tests and single-process deployments.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Collections,
}

impl Debug for MemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let collections = self.collections.read();
        f.debug_struct("MemoryDocumentStore")
            .field("collections", &collections.len())
            .field(
                "documents",
                &collections.values().map(|c| c.documents.len()).sum::<usize>(),
            )
            .finish()
    }
}

impl MemoryDocumentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, |c| c.documents.len())
    }

    fn select(&self, collection: &str, filter: &DocumentFilter) -> StorageResult<Vec<Document>> {
        let collections = self.collections.read();
        let Some(coll) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for document in &coll.documents {
            if matches(document, filter.as_map())? {
                out.push(document.clone());
            }
        }
        Ok(out)
    }
}

fn compare(a: &Document, b: &Document, options: &FindOptions) -> Ordering {
    for key in &options.sort {
        let left = resolve(a, &key.field).into_iter().next();
        let right = resolve(b, &key.field).into_iter().next();
        let ordering = match key.direction {
            SortDirection::Asc => sort_order(left, right),
            SortDirection::Desc => sort_order(right, left),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> StorageResult<()> {
        let mut collections = self.collections.write();
        let coll = collections.entry(collection.to_string()).or_default();
        if coll.indexes.contains(index) {
            return Ok(());
        }
        if index.unique {
            let staged = Collection {
                documents: Vec::new(),
                indexes: vec![index.clone()],
            };
            let mut seen: Vec<Document> = Vec::with_capacity(coll.documents.len());
            for document in &coll.documents {
                staged.check_unique(collection, document, None, &seen)?;
                seen.push(document.clone());
            }
        }
        coll.indexes.push(index.clone());
        Ok(())
    }

    async fn insert_one(&self, collection: &str, document: Document) -> StorageResult<()> {
        let mut collections = self.collections.write();
        let coll = collections.entry(collection.to_string()).or_default();
        coll.check_unique(collection, &document, None, &[])?;
        coll.documents.push(document);
        Ok(())
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> StorageResult<()> {
        let mut collections = self.collections.write();
        let coll = collections.entry(collection.to_string()).or_default();
        let mut staged: Vec<Document> = Vec::with_capacity(documents.len());
        for document in documents {
            coll.check_unique(collection, &document, None, &staged)?;
            staged.push(document);
        }
        coll.documents.extend(staged);
        Ok(())
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: &DocumentFilter,
        document: Document,
    ) -> StorageResult<u64> {
        let mut collections = self.collections.write();
        let Some(coll) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let mut position = None;
        for (pos, existing) in coll.documents.iter().enumerate() {
            if matches(existing, filter.as_map())? {
                position = Some(pos);
                break;
            }
        }
        let Some(pos) = position else {
            return Ok(0);
        };
        coll.check_unique(collection, &document, Some(pos), &[])?;
        coll.documents[pos] = document;
        Ok(1)
    }

    async fn find(
        &self,
        collection: &str,
        filter: &DocumentFilter,
        options: &FindOptions,
    ) -> StorageResult<Vec<Document>> {
        let mut found = self.select(collection, filter)?;
        if !options.sort.is_empty() {
            found.sort_by(|a, b| compare(a, b, options));
        }
        let skip = options.skip.unwrap_or(0) as usize;
        let limit = options.limit.map_or(usize::MAX, |l| l as usize);
        Ok(found.into_iter().skip(skip).take(limit).collect())
    }

    async fn count(&self, collection: &str, filter: &DocumentFilter) -> StorageResult<u64> {
        Ok(self.select(collection, filter)?.len() as u64)
    }

    async fn distinct(
        &self,
        collection: &str,
        field: &str,
        filter: &DocumentFilter,
    ) -> StorageResult<Vec<Value>> {
        let mut values: Vec<Value> = Vec::new();
        for document in self.select(collection, filter)? {
            for value in flatten(&resolve(&document, field)) {
                if value.is_array() || values.contains(value) {
                    continue;
                }
                values.push(value.clone());
            }
        }
        Ok(values)
    }

    async fn delete_many(&self, collection: &str, filter: &DocumentFilter) -> StorageResult<u64> {
        let mut collections = self.collections.write();
        let Some(coll) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = coll.documents.len();
        let mut keep = Vec::with_capacity(before);
        for document in &coll.documents {
            keep.push(!matches(document, filter.as_map())?);
        }
        let mut keep = keep.into_iter();
        coll.documents.retain(|_| keep.next().unwrap_or(true));
        Ok((before - coll.documents.len()) as u64)
    }

    async fn begin(&self) -> StorageResult<Box<dyn DocumentTransaction>> {
        Ok(Box::new(MemoryTransaction::new(Arc::clone(&self.collections))))
    }
}
