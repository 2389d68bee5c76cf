//! A graph store evaluating queries with an in-memory oxigraph store.
//!
//! Unlike [`super::FixtureGraphStore`], every query is rendered to SPARQL
//! and evaluated by a real engine, so the rendered text itself is under
//! test.

use async_trait::async_trait;
use oxigraph::model::Term;
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;

use silex_persistence::core::GraphStore;
use silex_persistence::error::{BackendError, StorageResult};
use silex_persistence::sparql::{Binding, BindingKind, QueryResult, SelectQuery};
use silex_persistence::vocabulary::xsd;

const PREFIXES: &str = "\
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>
PREFIX oeso: <http://www.opensilex.org/vocabulary/oeso#>
PREFIX ex: <http://example.org/>
";

pub struct OxigraphGraphStore {
    store: Store,
    property_paths: bool,
}

impl OxigraphGraphStore {
    /// An empty store. With `property_paths` off, callers fall back to
    /// level-by-level subclass walks even though the engine could do better.
    pub fn new(property_paths: bool) -> Self {
        Self {
            store: Store::new().unwrap(),
            property_paths,
        }
    }

    /// Inserts triples written in Turtle-like `INSERT DATA` syntax. The
    /// `rdf`, `rdfs`, `xsd`, `oeso` and `ex` prefixes are declared.
    pub fn with_triples(self, triples: &str) -> Self {
        let update = format!("{PREFIXES}INSERT DATA {{\n{triples}\n}}");
        self.store.update(update.as_str()).unwrap();
        self
    }
}

fn query_error(query: &str, error: impl std::fmt::Display) -> BackendError {
    BackendError::QueryError {
        message: format!("{error}\n{query}"),
    }
}

fn binding(term: &Term) -> Binding {
    match term {
        Term::NamedNode(node) => Binding::uri(node.as_str()),
        Term::BlankNode(node) => Binding {
            kind: BindingKind::Bnode,
            ..Binding::uri(node.as_str())
        },
        Term::Literal(literal) => match literal.language() {
            Some(lang) => Binding::lang_literal(literal.value(), lang),
            None if literal.datatype().as_str() == xsd::STRING => Binding::literal(literal.value()),
            None => Binding::typed(literal.value(), literal.datatype().as_str()),
        },
        #[allow(unreachable_patterns)]
        other => Binding::literal(other.to_string()),
    }
}

#[async_trait]
impl GraphStore for OxigraphGraphStore {
    fn backend_name(&self) -> &'static str {
        "oxigraph"
    }

    fn supports_property_paths(&self) -> bool {
        self.property_paths
    }

    async fn select(&self, query: &SelectQuery) -> StorageResult<QueryResult> {
        let text = query.to_sparql();
        let solutions = match self
            .store
            .query(text.as_str())
            .map_err(|e| query_error(&text, e))?
        {
            QueryResults::Solutions(solutions) => solutions,
            _ => return Err(query_error(&text, "not a SELECT result").into()),
        };

        let mut result = QueryResult::new(query.projection.clone());
        for solution in solutions {
            let solution = solution.map_err(|e| query_error(&text, e))?;
            let row = solution
                .iter()
                .fold(result.row(), |row, (var, term)| row.with(var.as_str(), binding(term)));
            result.push(row);
        }
        Ok(result)
    }
}
