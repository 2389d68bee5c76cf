//! Graph store abstraction.

use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::sparql::{GroupPattern, Path, QueryResult, SelectQuery, Term, TriplePattern, ValuesBlock};
use crate::uri::Uri;
use crate::vocabulary::{rdf, rdfs};

/// A triple store answering SELECT queries.
///
/// Results are rows of named columns; the hydrator and the repositories
/// interpret them.
///
/// # Example
///
/// ```ignore
/// use silex_persistence::core::GraphStore;
/// use silex_persistence::sparql::SelectQuery;
///
/// async fn count_rows<G: GraphStore>(store: &G, query: &SelectQuery) -> StorageResult<usize> {
///     Ok(store.select(query).await?.rows().len())
/// }
/// ```
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Returns a human-readable name for this store.
    fn backend_name(&self) -> &'static str;

    /// Returns true when the store evaluates property paths (`p*`, `a/b`).
    fn supports_property_paths(&self) -> bool;

    /// Executes a SELECT query.
    async fn select(&self, query: &SelectQuery) -> StorageResult<QueryResult>;

    /// Returns the candidates that are instances of `class` or of one of
    /// its subclasses.
    ///
    /// Stores without property paths resolve the subclass closure level by
    /// level before checking the candidates' types.
    async fn instances_of(&self, class: &str, candidates: &[Uri]) -> StorageResult<BTreeSet<Uri>> {
        if candidates.is_empty() {
            return Ok(BTreeSet::new());
        }

        let candidate_values = ValuesBlock::new(
            "candidate",
            candidates.iter().map(|u| Term::iri(u.as_str())).collect(),
        );
        let type_pattern = TriplePattern::new(Term::var("candidate"), rdf::TYPE, Term::var("type"));

        let pattern = if self.supports_property_paths() {
            GroupPattern::new()
                .values(candidate_values)
                .triple(type_pattern)
                .triple(TriplePattern::with_path(
                    Term::var("type"),
                    Path::ZeroOrMore(rdfs::SUB_CLASS_OF.to_string()),
                    Term::iri(class),
                ))
        } else {
            let closure = self.subclass_closure(class).await?;
            GroupPattern::new()
                .values(candidate_values)
                .values(ValuesBlock::new(
                    "type",
                    closure.into_iter().map(Term::iri).collect(),
                ))
                .triple(type_pattern)
        };

        let query = SelectQuery::new(["candidate"]).distinct().with_pattern(pattern);
        let result = self.select(&query).await?;
        let mut instances = BTreeSet::new();
        for row in result.rows() {
            if let Some(value) = row.value("candidate") {
                instances.insert(Uri::parse(value)?);
            }
        }
        Ok(instances)
    }

    /// Returns `class` and all of its transitive subclasses.
    async fn subclass_closure(&self, class: &str) -> StorageResult<BTreeSet<String>> {
        let mut closure: BTreeSet<String> = BTreeSet::new();
        closure.insert(class.to_string());
        let mut frontier: HashSet<String> = closure.clone().into_iter().collect();

        while !frontier.is_empty() {
            let query = SelectQuery::new(["sub"]).distinct().with_pattern(
                GroupPattern::new()
                    .values(ValuesBlock::new(
                        "parent",
                        frontier.iter().map(|c| Term::iri(c.as_str())).collect(),
                    ))
                    .triple(TriplePattern::new(
                        Term::var("sub"),
                        rdfs::SUB_CLASS_OF,
                        Term::var("parent"),
                    )),
            );
            let result = self.select(&query).await?;
            frontier = result
                .rows()
                .iter()
                .filter_map(|row| row.value("sub"))
                .filter(|sub| !closure.contains(*sub))
                .map(str::to_string)
                .collect();
            closure.extend(frontier.iter().cloned());
        }
        Ok(closure)
    }
}
