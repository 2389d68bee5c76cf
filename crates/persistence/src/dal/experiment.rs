//! Experiment repository.
//!
//! A search runs in four steps:
//!
//! 1. compile the criteria into a [`QueryFragment`] and select the matching
//!    identifiers, in the requested order;
//! 2. drop rows whose post-query closure checks fail (stores without
//!    property paths);
//! 3. paginate the remaining identifiers;
//! 4. fetch and hydrate the page with one projection query.
//!
//! The closure pass runs before pagination so totals and page contents only
//! count experiments that really match.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use crate::error::{StorageResult, ValidationError};
use crate::mapping::{GraphResource, MappingContext, ResourceSchema};
use crate::search::{ExperimentSearchCriteria, GraphFilterBuilder, QueryFragment, SUBJECT_VAR};
use crate::sparql::{GroupPattern, OrderCondition, ResultRow, SelectQuery, Term, TriplePattern};
use crate::types::{ExperimentModel, OrderBy, Page, PageRequest, SortDirection, paginate};
use crate::uri::Uri;
use crate::vocabulary::rdf;

use super::{DynGraphStore, fetch_by_uris, not_found};

/// Reads and searches experiments in the graph store.
#[derive(Clone)]
pub struct ExperimentRepository {
    graph: DynGraphStore,
    mapping: Arc<MappingContext>,
    max_page_size: usize,
}

impl ExperimentRepository {
    pub fn new(graph: DynGraphStore, mapping: Arc<MappingContext>, max_page_size: usize) -> Self {
        Self {
            graph,
            mapping,
            max_page_size,
        }
    }

    pub async fn get(&self, uri: &Uri, lang: Option<&str>) -> StorageResult<ExperimentModel> {
        self.get_many(std::slice::from_ref(uri), lang)
            .await?
            .pop()
            .ok_or_else(|| not_found("experiment", uri))
    }

    /// Returns the experiments that exist among `uris`, in the same order.
    pub async fn get_many(
        &self,
        uris: &[Uri],
        lang: Option<&str>,
    ) -> StorageResult<Vec<ExperimentModel>> {
        let lang = lang.unwrap_or(self.mapping.default_language());
        fetch_by_uris(self.graph.as_ref(), &self.mapping, uris, Some(lang)).await
    }

    /// Searches experiments.
    ///
    /// `order_by` names model fields (`uri`, `label`, `startDate`, ...).
    /// The page size is capped by configuration.
    pub async fn search(
        &self,
        criteria: &ExperimentSearchCriteria,
        order_by: &[OrderBy],
        page: PageRequest,
        lang: Option<&str>,
    ) -> StorageResult<Page<ExperimentModel>> {
        let schema = self.mapping.schema_for::<ExperimentModel>()?;
        let builder =
            GraphFilterBuilder::new(self.mapping.registry(), self.graph.supports_property_paths());
        let fragment = builder.compile(criteria)?;

        let query = self.identifier_query(&schema, fragment.clone(), order_by)?;
        let result = self.graph.select(&query).await?;
        let rows = self.closure_filter(&fragment, result.into_rows()).await?;

        let mut seen = HashSet::new();
        let ids: Vec<Uri> = rows
            .iter()
            .filter_map(|row| row.value(SUBJECT_VAR))
            .filter(|uri| seen.insert(uri.to_string()))
            .map(Uri::parse)
            .collect::<Result<_, _>>()?;

        let Page { items, page_info } = paginate(ids, &page.capped(self.max_page_size));
        let experiments = self.get_many(&items, lang).await?;
        tracing::debug!(
            total = page_info.total,
            page = page_info.page,
            returned = experiments.len(),
            "experiment search"
        );
        Ok(Page::new(experiments, page_info))
    }

    fn identifier_query(
        &self,
        schema: &ResourceSchema,
        fragment: QueryFragment,
        order_by: &[OrderBy],
    ) -> StorageResult<SelectQuery> {
        let subject = Term::var(SUBJECT_VAR);
        let mut projection = vec![SUBJECT_VAR.to_string()];
        projection.extend(fragment.post_check_vars());

        let mut pattern = fragment.apply(GroupPattern::new().triple(TriplePattern::new(
            subject.clone(),
            rdf::TYPE,
            Term::iri(schema.rdf_type().as_str()),
        )));

        let mut conditions = Vec::with_capacity(order_by.len());
        for order in order_by {
            let var = if order.field == schema.identifier() {
                SUBJECT_VAR.to_string()
            } else {
                let predicate = sort_predicate(schema, &order.field).ok_or_else(|| {
                    ValidationError::UnsupportedSortField {
                        type_name: schema.type_name().to_string(),
                        field: order.field.clone(),
                    }
                })?;
                let var = format!("order_{}", order.field);
                pattern = pattern.optional(GroupPattern::new().triple(TriplePattern::new(
                    subject.clone(),
                    predicate,
                    Term::var(var.clone()),
                )));
                projection.push(var.clone());
                var
            };
            conditions.push(match order.direction {
                SortDirection::Asc => OrderCondition::asc(var),
                SortDirection::Desc => OrderCondition::desc(var),
            });
        }
        if conditions.is_empty() {
            conditions.push(OrderCondition::asc(SUBJECT_VAR));
        }

        let query = conditions
            .into_iter()
            .fold(SelectQuery::new(projection).distinct().with_pattern(pattern), |q, c| {
                q.order_by(c)
            });
        Ok(query)
    }

    /// Keeps the rows whose closure-checked variables are bound to instances
    /// of the required class.
    async fn closure_filter(
        &self,
        fragment: &QueryFragment,
        mut rows: Vec<ResultRow>,
    ) -> StorageResult<Vec<ResultRow>> {
        for check in fragment.post_checks() {
            let candidates: Vec<Uri> = rows
                .iter()
                .filter_map(|row| row.value(&check.var))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(Uri::parse)
                .collect::<Result<_, _>>()?;
            let valid = self.graph.instances_of(&check.class, &candidates).await?;
            let before = rows.len();
            rows.retain(|row| {
                row.value(&check.var)
                    .and_then(|value| Uri::parse(value).ok())
                    .is_some_and(|uri| valid.contains(&uri))
            });
            tracing::debug!(
                var = %check.var,
                class = %check.class,
                removed = before - rows.len(),
                "closure post-filter"
            );
        }
        Ok(rows)
    }
}

fn sort_predicate<'s>(schema: &'s ResourceSchema, field: &str) -> Option<&'s str> {
    if let Some(label) = schema.label().filter(|l| l.field == field) {
        return Some(label.predicate.as_str());
    }
    schema
        .data_properties()
        .iter()
        .find(|p| p.field == field)
        .map(|p| p.predicate.as_str())
}

impl std::fmt::Debug for ExperimentRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperimentRepository")
            .field("graph", &self.graph.backend_name())
            .field("type", &ExperimentModel::descriptor().type_name)
            .finish()
    }
}
