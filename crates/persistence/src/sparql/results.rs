//! SELECT results in tabular form.
//!
//! A [`QueryResult`] keeps the projected variable list next to the rows, so
//! consumers can tell a column that was projected but unbound (an OPTIONAL
//! that did not match) from a column that was never projected.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{BackendError, StorageResult};

/// The kind of RDF term bound to a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    Uri,
    Literal,
    #[serde(rename = "typed-literal")]
    TypedLiteral,
    Bnode,
}

/// A value bound to one variable in one row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Binding {
    #[serde(rename = "type")]
    pub kind: BindingKind,
    pub value: String,
    #[serde(rename = "xml:lang", default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub datatype: Option<String>,
}

impl Binding {
    /// An IRI binding.
    pub fn uri(value: impl Into<String>) -> Self {
        Self {
            kind: BindingKind::Uri,
            value: value.into(),
            lang: None,
            datatype: None,
        }
    }

    /// A plain literal binding.
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            kind: BindingKind::Literal,
            value: value.into(),
            lang: None,
            datatype: None,
        }
    }

    /// A language-tagged literal binding.
    pub fn lang_literal(value: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            lang: Some(lang.into()),
            ..Self::literal(value)
        }
    }

    /// A typed literal binding.
    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            datatype: Some(datatype.into()),
            ..Self::literal(value)
        }
    }
}

/// One solution of a SELECT query.
#[derive(Debug, Clone)]
pub struct ResultRow {
    vars: Arc<[String]>,
    bindings: HashMap<String, Binding>,
}

impl ResultRow {
    /// Creates an empty row for the given projection.
    pub fn new(vars: Arc<[String]>) -> Self {
        Self {
            vars,
            bindings: HashMap::new(),
        }
    }

    /// Binds a variable.
    pub fn with(mut self, var: impl Into<String>, binding: Binding) -> Self {
        self.bindings.insert(var.into(), binding);
        self
    }

    /// Returns true when the variable was projected by the query.
    pub fn has_column(&self, var: &str) -> bool {
        self.vars.iter().any(|v| v == var)
    }

    /// The projected variables.
    pub fn vars(&self) -> &[String] {
        &self.vars
    }

    /// Returns the binding for a variable, if bound.
    pub fn get(&self, var: &str) -> Option<&Binding> {
        self.bindings.get(var)
    }

    /// Returns the lexical value for a variable, if bound.
    pub fn value(&self, var: &str) -> Option<&str> {
        self.bindings.get(var).map(|b| b.value.as_str())
    }
}

/// The full result of a SELECT query.
#[derive(Debug, Clone)]
pub struct QueryResult {
    vars: Arc<[String]>,
    rows: Vec<ResultRow>,
}

impl QueryResult {
    /// Creates an empty result for the given projection.
    pub fn new<I, S>(vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Starts a new row sharing this result's projection.
    pub fn row(&self) -> ResultRow {
        ResultRow::new(Arc::clone(&self.vars))
    }

    /// Appends a row.
    pub fn push(&mut self, row: ResultRow) {
        self.rows.push(row);
    }

    /// The projected variables.
    pub fn vars(&self) -> &[String] {
        &self.vars
    }

    /// The rows in store order.
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// Consumes the result and returns its rows.
    pub fn into_rows(self) -> Vec<ResultRow> {
        self.rows
    }

    /// Returns true when no row matched.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Parses the SPARQL 1.1 Query Results JSON format.
    pub fn from_sparql_json(body: &serde_json::Value) -> StorageResult<Self> {
        let parsed: SparqlJsonResults =
            serde_json::from_value(body.clone()).map_err(|e| BackendError::QueryError {
                message: format!("malformed SPARQL JSON results: {e}"),
            })?;

        let mut result = QueryResult::new(parsed.head.vars);
        for solution in parsed.results.bindings {
            let mut row = result.row();
            for (var, binding) in solution {
                row = row.with(var, binding);
            }
            result.push(row);
        }
        Ok(result)
    }
}

#[derive(Deserialize)]
struct SparqlJsonResults {
    head: SparqlJsonHead,
    results: SparqlJsonBindings,
}

#[derive(Deserialize)]
struct SparqlJsonHead {
    #[serde(default)]
    vars: Vec<String>,
}

#[derive(Deserialize)]
struct SparqlJsonBindings {
    bindings: Vec<HashMap<String, Binding>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_sparql_json() {
        let body = json!({
            "head": { "vars": ["uri", "label", "startDate"] },
            "results": { "bindings": [
                {
                    "uri": { "type": "uri", "value": "http://ex.org/xp1" },
                    "label": { "type": "literal", "value": "Maize 2020", "xml:lang": "en" },
                    "startDate": {
                        "type": "literal",
                        "value": "2020-04-01",
                        "datatype": "http://www.w3.org/2001/XMLSchema#date"
                    }
                },
                { "uri": { "type": "uri", "value": "http://ex.org/xp2" } }
            ]}
        });

        let result = QueryResult::from_sparql_json(&body).unwrap();
        assert_eq!(result.vars(), ["uri", "label", "startDate"]);
        assert_eq!(result.rows().len(), 2);

        let first = &result.rows()[0];
        assert_eq!(first.get("label").unwrap().lang.as_deref(), Some("en"));
        assert_eq!(first.value("startDate"), Some("2020-04-01"));

        let second = &result.rows()[1];
        assert!(second.has_column("label"));
        assert!(second.get("label").is_none());
        assert!(!second.has_column("objective"));
    }

    #[test]
    fn test_malformed_results_rejected() {
        let body = json!({ "head": {} });
        assert!(QueryResult::from_sparql_json(&body).is_err());
    }
}
