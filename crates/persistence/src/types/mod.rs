//! Core types for the data layer.
//!
//! This module contains the fundamental types used throughout the
//! persistence layer:
//!
//! - [`MeasurementRecord`] / [`NewMeasurement`] - measurements in the document store
//! - [`MeasurementValue`] - the closed set of value kinds a measurement can hold
//! - [`ProvenanceRecord`] / [`ProvenanceRef`] - how measurements were produced
//! - [`DataFileRecord`] - metadata of binary files kept in the blob store
//! - [`ExperimentModel`] / [`VariableModel`] - graph-backed models
//! - [`Page`] / [`PageRequest`] - pagination

mod datafile;
mod experiment;
mod measurement;
mod order;
mod pagination;
mod provenance;
mod resource;
mod variable;

pub use datafile::{DataFileRecord, NewDataFile};
pub use experiment::ExperimentModel;
pub use measurement::{
    Datatype, MeasurementRecord, MeasurementValue, NOT_AVAILABLE, NewMeasurement, timestamp,
};
pub use order::{OrderBy, SortDirection};
pub use pagination::{Page, PageInfo, PageRequest, paginate};
pub use provenance::{AgentRef, NewProvenance, ProvenanceRecord, ProvenanceRef};
pub use resource::{LocalizedLabel, ResourceStub};
pub use variable::VariableModel;
