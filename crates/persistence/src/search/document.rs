//! Document Filter Builder.
//!
//! Compiles [`DataSearchCriteria`] into a [`DocumentFilter`], the
//! operator-map dialect understood by the document stores:
//!
//! | criterion | filter |
//! |---|---|
//! | experiments | `provenance.experiments: {$in: [...]}` |
//! | scientific objects | `scientificObjects: {$in: [...]}` |
//! | variables | `variable: {$in: [...]}` |
//! | provenances | `provenance.uri: {$in: [...]}` |
//! | time range | `date: {$gte: start, $lt: end}` |
//! | confidence | `confidence: {$gte: min, $lte: max}` |
//! | metadata | `metadata.<key>: value` |
//!
//! Dates are compared as fixed-width UTC strings, the stored form.
//!
//! # Device attribution
//!
//! A device is attributed a record either through the record's own agent
//! override (`provenance.provUsed`) or, when the record has none, through
//! the agents of its provenance. [`DocumentFilterBuilder::compile_for_device`]
//! takes the provenances listing the device and builds the disjunction of
//! both cases.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::types::timestamp;
use crate::uri::Uri;

/// A document-store filter: field paths mapped to values or operator maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentFilter(Map<String, Value>);

impl DocumentFilter {
    /// A filter matching every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the filter matches every document.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Adds a condition on a field path, replacing any previous one.
    pub fn with(mut self, path: impl Into<String>, condition: Value) -> Self {
        self.0.insert(path.into(), condition);
        self
    }

    /// Adds `path: {$in: values}`.
    pub fn with_in<I, V>(self, path: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.with(path, json!({ "$in": values }))
    }

    /// Adds `path: value`.
    pub fn with_eq(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(path, value.into())
    }

    /// Returns the condition on a field path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.0.get(path)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for DocumentFilter {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl std::fmt::Display for DocumentFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", serde_json::Value::Object(self.0.clone()))
    }
}

impl From<DocumentFilter> for Value {
    fn from(filter: DocumentFilter) -> Self {
        Value::Object(filter.0)
    }
}

/// Optional criteria of a measurement or data file search.
///
/// Absent or empty fields impose no constraint. The time range is
/// `[start_date, end_date)`, the confidence range `[min, max]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSearchCriteria {
    pub experiments: Vec<Uri>,
    pub scientific_objects: Vec<Uri>,
    pub variables: Vec<Uri>,
    pub provenances: Vec<Uri>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub confidence_min: Option<f64>,
    pub confidence_max: Option<f64>,
    pub metadata: BTreeMap<String, String>,
    /// Restricts the search to records attributed to this device.
    pub device: Option<Uri>,
}

impl DataSearchCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_experiments(mut self, experiments: impl IntoIterator<Item = Uri>) -> Self {
        self.experiments.extend(experiments);
        self
    }

    pub fn with_objects(mut self, objects: impl IntoIterator<Item = Uri>) -> Self {
        self.scientific_objects.extend(objects);
        self
    }

    pub fn with_variables(mut self, variables: impl IntoIterator<Item = Uri>) -> Self {
        self.variables.extend(variables);
        self
    }

    pub fn with_provenances(mut self, provenances: impl IntoIterator<Item = Uri>) -> Self {
        self.provenances.extend(provenances);
        self
    }

    pub fn with_start_date(mut self, start: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self
    }

    pub fn with_end_date(mut self, end: DateTime<Utc>) -> Self {
        self.end_date = Some(end);
        self
    }

    pub fn with_confidence(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.confidence_min = min;
        self.confidence_max = max;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_device(mut self, device: Uri) -> Self {
        self.device = Some(device);
        self
    }
}

/// Compiles [`DataSearchCriteria`] into document filters.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentFilterBuilder;

impl DocumentFilterBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Compiles every criterion except the device.
    pub fn compile(&self, criteria: &DataSearchCriteria) -> DocumentFilter {
        let filter = self.base(criteria, true);
        tracing::debug!(filter = %filter, "compiled document filter");
        filter
    }

    /// Compiles a device-mode search.
    ///
    /// `device_provenances` are the provenances listing `device` among their
    /// agents. They are intersected with the explicit provenance criterion,
    /// if any. Returns `None` when the intersection is empty: no record can
    /// match and the caller must not query the store.
    pub fn compile_for_device(
        &self,
        criteria: &DataSearchCriteria,
        device: &Uri,
        device_provenances: &BTreeSet<Uri>,
    ) -> Option<DocumentFilter> {
        let mut resolved: BTreeSet<&Uri> = device_provenances.iter().collect();
        if !criteria.provenances.is_empty() {
            let explicit: BTreeSet<&Uri> = criteria.provenances.iter().collect();
            resolved.retain(|uri| explicit.contains(uri));
        }
        if resolved.is_empty() {
            tracing::debug!(device = %device, "no provenance attributes the device");
            return None;
        }

        let direct = json!({ "provenance.provUsed.uri": device.as_str() });
        let resolved: Vec<&str> = resolved.iter().map(|uri| uri.as_str()).collect();
        let indirect = json!({
            "provenance.uri": { "$in": resolved },
            "$or": [
                { "provenance.provUsed": { "$exists": false } },
                { "provenance.provUsed": { "$size": 0 } },
            ],
        });

        let filter = self
            .base(criteria, false)
            .with("$or", json!([direct, indirect]));
        tracing::debug!(filter = %filter, "compiled device filter");
        Some(filter)
    }

    fn base(&self, criteria: &DataSearchCriteria, with_provenances: bool) -> DocumentFilter {
        let mut filter = DocumentFilter::new();

        if !criteria.experiments.is_empty() {
            filter = filter.with_in("provenance.experiments", uris(&criteria.experiments));
        }
        if !criteria.scientific_objects.is_empty() {
            filter = filter.with_in("scientificObjects", uris(&criteria.scientific_objects));
        }
        if !criteria.variables.is_empty() {
            filter = filter.with_in("variable", uris(&criteria.variables));
        }
        if with_provenances && !criteria.provenances.is_empty() {
            filter = filter.with_in("provenance.uri", uris(&criteria.provenances));
        }

        if criteria.start_date.is_some() || criteria.end_date.is_some() {
            let mut range = Map::new();
            if let Some(start) = &criteria.start_date {
                range.insert("$gte".to_string(), Value::String(timestamp::format(start)));
            }
            if let Some(end) = &criteria.end_date {
                range.insert("$lt".to_string(), Value::String(timestamp::format(end)));
            }
            filter = filter.with("date", Value::Object(range));
        }

        if criteria.confidence_min.is_some() || criteria.confidence_max.is_some() {
            let mut range = Map::new();
            if let Some(min) = criteria.confidence_min {
                range.insert("$gte".to_string(), json!(min));
            }
            if let Some(max) = criteria.confidence_max {
                range.insert("$lte".to_string(), json!(max));
            }
            filter = filter.with("confidence", Value::Object(range));
        }

        for (key, value) in &criteria.metadata {
            filter = filter.with_eq(format!("metadata.{key}"), value.as_str());
        }
        filter
    }
}

fn uris(values: &[Uri]) -> Vec<&str> {
    values.iter().map(Uri::as_str).collect()
}
