//! Variable repository.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::mapping::MappingContext;
use crate::types::{Datatype, VariableModel};
use crate::uri::Uri;
use crate::validation::DatatypeResolver;

use super::{DynGraphStore, fetch_by_uris, not_found};

/// Reads variables from the graph store.
#[derive(Clone)]
pub struct VariableRepository {
    graph: DynGraphStore,
    mapping: Arc<MappingContext>,
}

impl VariableRepository {
    pub fn new(graph: DynGraphStore, mapping: Arc<MappingContext>) -> Self {
        Self { graph, mapping }
    }

    pub async fn get(&self, uri: &Uri, lang: Option<&str>) -> StorageResult<VariableModel> {
        self.get_many(std::slice::from_ref(uri), lang)
            .await?
            .pop()
            .ok_or_else(|| not_found("variable", uri))
    }

    /// Returns the variables that exist among `uris`, in the same order.
    pub async fn get_many(
        &self,
        uris: &[Uri],
        lang: Option<&str>,
    ) -> StorageResult<Vec<VariableModel>> {
        let lang = lang.unwrap_or(self.mapping.default_language());
        fetch_by_uris(self.graph.as_ref(), &self.mapping, uris, Some(lang)).await
    }
}

#[async_trait]
impl DatatypeResolver for VariableRepository {
    async fn resolve_datatype(&self, variable: &Uri) -> StorageResult<Option<Datatype>> {
        let found = self.get(variable, None).await?;
        let Some(datatype) = found.datatype else {
            return Ok(None);
        };
        let handler = self.mapping.registry().for_datatype(datatype.as_str())?;
        let resolved = Datatype::from_native(handler.native_type());
        tracing::debug!(variable = %variable, datatype = %datatype, ?resolved, "resolved variable datatype");
        Ok(resolved)
    }
}
