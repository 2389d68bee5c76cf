//! SPARQL query model.
//!
//! A small, typed subset of SPARQL 1.1 SELECT queries: triple patterns with
//! optional property paths, FILTER expressions, nested OPTIONAL groups and
//! VALUES blocks. Builders in [`crate::search::graph`] and
//! [`crate::mapping::schema`] produce these structures and backends render
//! them with [`SelectQuery::to_sparql`].
//!
//! Every IRI is rendered in expanded form, so queries carry no PREFIX
//! declarations.

mod query;
mod results;

pub use query::{
    Expr, GroupPattern, OrderCondition, Path, SelectQuery, Term, TriplePattern, ValuesBlock,
    escape_literal,
};
pub use results::{Binding, BindingKind, QueryResult, ResultRow};
