//! Type Coherence Validator.
//!
//! Before measurements are written, every raw value is checked against the
//! datatype declared by its variable and converted into a
//! [`MeasurementValue`] of the matching kind:
//!
//! | datatype | accepted JSON value |
//! |---|---|
//! | integer | whole number (`3`, `3.0`) |
//! | decimal | floating number (`3.5`) |
//! | boolean | `true` / `false` |
//! | date | `"YYYY-MM-DD"` |
//! | datetime | RFC 3339 string |
//! | string | any string |
//!
//! The `"NA"` placeholder is accepted for every datatype and does not
//! trigger a datatype lookup. A batch is all-or-nothing: the first failure
//! aborts it.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde_json::Value;

use crate::error::{StorageResult, ValidationError};
use crate::types::{Datatype, MeasurementRecord, MeasurementValue, NOT_AVAILABLE, NewMeasurement};
use crate::uri::Uri;

/// Looks up the declared datatype of a variable.
#[async_trait]
pub trait DatatypeResolver: Send + Sync {
    /// Returns `None` when the variable declares no (supported) datatype.
    ///
    /// An unknown variable is a `ResourceError::NotFound`.
    async fn resolve_datatype(&self, variable: &Uri) -> StorageResult<Option<Datatype>>;
}

/// A measurement whose value matched its variable's datatype.
#[derive(Debug, Clone, PartialEq)]
pub struct CoherentMeasurement {
    pub measurement: NewMeasurement,
    pub value: MeasurementValue,
}

impl CoherentMeasurement {
    /// Builds the stored record.
    pub fn into_record(self, uri: Uri) -> MeasurementRecord {
        self.measurement.into_record(uri, self.value)
    }
}

/// Checks measurement batches against declared datatypes.
pub struct TypeCoherenceValidator<'a, R: DatatypeResolver + ?Sized> {
    resolver: &'a R,
}

impl<'a, R: DatatypeResolver + ?Sized> TypeCoherenceValidator<'a, R> {
    pub fn new(resolver: &'a R) -> Self {
        Self { resolver }
    }

    /// Validates a batch, returning typed values in input order.
    ///
    /// Each distinct variable is resolved at most once per call.
    ///
    /// # Errors
    ///
    /// * `ResourceError::NotFound` - a variable does not exist
    /// * `ValidationError::NoVariableDataType` - a variable declares no datatype
    /// * `ValidationError::TypeMismatch` - a value does not match its datatype
    pub async fn validate_batch(
        &self,
        records: Vec<NewMeasurement>,
    ) -> StorageResult<Vec<CoherentMeasurement>> {
        let mut datatypes: HashMap<Uri, Datatype> = HashMap::new();
        let mut checked = Vec::with_capacity(records.len());

        for measurement in records {
            if measurement.is_not_available() {
                checked.push(CoherentMeasurement {
                    measurement,
                    value: MeasurementValue::NotAvailable,
                });
                continue;
            }

            let datatype = match datatypes.get(&measurement.variable) {
                Some(datatype) => *datatype,
                None => {
                    let datatype = self
                        .resolver
                        .resolve_datatype(&measurement.variable)
                        .await?
                        .ok_or_else(|| ValidationError::NoVariableDataType {
                            variable: measurement.variable.to_string(),
                        })?;
                    datatypes.insert(measurement.variable.clone(), datatype);
                    datatype
                }
            };

            let value = check_value(&measurement.variable, datatype, &measurement.value)?;
            checked.push(CoherentMeasurement { measurement, value });
        }

        tracing::debug!(
            records = checked.len(),
            variables = datatypes.len(),
            "measurement batch is type coherent"
        );
        Ok(checked)
    }
}

/// Converts one raw value into a measurement value of `datatype`.
pub fn check_value(
    variable: &Uri,
    datatype: Datatype,
    value: &Value,
) -> Result<MeasurementValue, ValidationError> {
    if value.as_str() == Some(NOT_AVAILABLE) {
        return Ok(MeasurementValue::NotAvailable);
    }

    let converted = match datatype {
        Datatype::Integer => integral(value).map(MeasurementValue::Integer),
        Datatype::Decimal => value
            .is_f64()
            .then(|| value.as_f64())
            .flatten()
            .map(MeasurementValue::Decimal),
        Datatype::Boolean => value.as_bool().map(MeasurementValue::Boolean),
        Datatype::Date => value
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .map(MeasurementValue::Date),
        Datatype::DateTime => value
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(MeasurementValue::DateTime),
        Datatype::String => value.as_str().map(|s| MeasurementValue::Text(s.to_string())),
    };

    converted.ok_or_else(|| ValidationError::TypeMismatch {
        variable: variable.to_string(),
        value: value.to_string(),
        expected: datatype.to_string(),
    })
}

fn integral(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}
