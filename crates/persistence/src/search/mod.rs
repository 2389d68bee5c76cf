//! Search filter compilation.
//!
//! Both builders turn sparse optional criteria into store queries. Absent
//! criteria impose no constraint and present ones are combined with AND.
//!
//! - [`graph`] - experiment criteria to SPARQL patterns, filters and VALUES
//! - [`document`] - measurement criteria to document filters, including
//!   device attribution through provenance

pub mod document;
pub mod graph;

pub use document::{DataSearchCriteria, DocumentFilter, DocumentFilterBuilder};
pub use graph::{
    ClosureCheck, ExperimentSearchCriteria, GraphFilterBuilder, QueryFragment, SENSORS_VAR,
    SUBJECT_VAR,
};
