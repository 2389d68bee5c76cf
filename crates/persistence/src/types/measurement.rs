//! Measurement records stored in the document store.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mapping::NativeType;
use crate::uri::Uri;

use super::provenance::ProvenanceRef;

/// Placeholder accepted for any datatype when a value is missing.
pub const NOT_AVAILABLE: &str = "NA";

/// Declared datatype of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Datatype {
    Integer,
    Decimal,
    Boolean,
    Date,
    DateTime,
    String,
}

impl Datatype {
    /// Maps a native type to a measurement datatype. Identifiers have none.
    pub fn from_native(native: NativeType) -> Option<Self> {
        match native {
            NativeType::Integer => Some(Datatype::Integer),
            NativeType::Decimal => Some(Datatype::Decimal),
            NativeType::Boolean => Some(Datatype::Boolean),
            NativeType::Date => Some(Datatype::Date),
            NativeType::DateTime => Some(Datatype::DateTime),
            NativeType::String => Some(Datatype::String),
            NativeType::Uri => None,
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Datatype::Integer => "integer",
            Datatype::Decimal => "decimal",
            Datatype::Boolean => "boolean",
            Datatype::Date => "date",
            Datatype::DateTime => "datetime",
            Datatype::String => "string",
        };
        f.write_str(name)
    }
}

/// A type-coherent measurement value.
///
/// Stored adjacently tagged (`{"type": "decimal", "value": 1.5}`) so the
/// kind survives a round trip through the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum MeasurementValue {
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    Text(String),
    NotAvailable,
}

impl MeasurementValue {
    /// Returns true for the missing-value placeholder.
    pub fn is_not_available(&self) -> bool {
        matches!(self, MeasurementValue::NotAvailable)
    }
}

/// A single measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementRecord {
    pub uri: Uri,

    /// Scientific objects the value was measured on, sorted and unique.
    #[serde(default)]
    pub scientific_objects: Vec<Uri>,

    pub variable: Uri,

    pub provenance: ProvenanceRef,

    #[serde(with = "timestamp")]
    pub date: DateTime<Utc>,

    pub value: MeasurementValue,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// An incoming measurement whose value has not been checked yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMeasurement {
    #[serde(default)]
    pub uri: Option<Uri>,

    #[serde(default)]
    pub scientific_objects: Vec<Uri>,

    pub variable: Uri,

    pub provenance: ProvenanceRef,

    pub date: DateTime<Utc>,

    /// Raw value, checked against the variable's datatype before storage.
    pub value: Value,

    #[serde(default)]
    pub confidence: Option<f64>,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl NewMeasurement {
    pub fn new(variable: Uri, provenance: ProvenanceRef, date: DateTime<Utc>, value: Value) -> Self {
        Self {
            uri: None,
            scientific_objects: Vec::new(),
            variable,
            provenance,
            date,
            value,
            confidence: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_uri(mut self, uri: Uri) -> Self {
        self.uri = Some(uri);
        self
    }

    pub fn with_objects(mut self, objects: impl IntoIterator<Item = Uri>) -> Self {
        self.scientific_objects.extend(objects);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns true when the raw value is the missing-value placeholder.
    pub fn is_not_available(&self) -> bool {
        self.value.as_str() == Some(NOT_AVAILABLE)
    }

    /// Builds the stored record from a checked value.
    ///
    /// Scientific objects are sorted and deduplicated and the date is
    /// truncated to the stored millisecond precision.
    pub fn into_record(self, uri: Uri, value: MeasurementValue) -> MeasurementRecord {
        MeasurementRecord {
            uri,
            scientific_objects: normalize_objects(self.scientific_objects),
            variable: self.variable,
            provenance: self.provenance,
            date: self.date.trunc_subsecs(3),
            value,
            confidence: self.confidence,
            metadata: self.metadata,
        }
    }
}

pub(crate) fn normalize_objects(mut objects: Vec<Uri>) -> Vec<Uri> {
    objects.sort();
    objects.dedup();
    objects
}

/// Fixed-width UTC timestamps (`2020-04-01T10:00:00.000Z`).
///
/// Every stored date has the same width and zone, so comparing the strings
/// orders them chronologically. Range filters rely on that.
pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

    /// Formats a date the way it is stored.
    pub fn format(date: &DateTime<Utc>) -> String {
        date.format(FORMAT).to_string()
    }

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|d| d.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn uri(s: &str) -> Uri {
        Uri::parse(s).unwrap()
    }

    #[test]
    fn test_value_serialization_is_tagged() {
        let value = MeasurementValue::Decimal(1.5);
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({"type": "decimal", "value": 1.5})
        );
        assert_eq!(
            serde_json::to_value(MeasurementValue::NotAvailable).unwrap(),
            json!({"type": "notAvailable"})
        );
    }

    #[test]
    fn test_integral_decimal_keeps_its_kind() {
        let stored = serde_json::to_value(MeasurementValue::Decimal(2.0)).unwrap();
        let back: MeasurementValue = serde_json::from_value(stored).unwrap();
        assert_eq!(back, MeasurementValue::Decimal(2.0));
    }

    #[test]
    fn test_timestamp_is_fixed_width() {
        let date = Utc.with_ymd_and_hms(2020, 4, 1, 10, 0, 0).unwrap();
        assert_eq!(timestamp::format(&date), "2020-04-01T10:00:00.000Z");
    }

    #[test]
    fn test_into_record_normalizes() {
        let date = Utc.with_ymd_and_hms(2020, 4, 1, 10, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(1_234_567);
        let new = NewMeasurement::new(
            uri("http://ex.org/var/height"),
            ProvenanceRef::new(uri("http://ex.org/prov/1")),
            date,
            json!(12),
        )
        .with_objects([uri("http://ex.org/so/b"), uri("http://ex.org/so/a"), uri("http://ex.org/so/b")]);

        let record = new.into_record(uri("http://ex.org/id/data/1"), MeasurementValue::Integer(12));
        assert_eq!(
            record.scientific_objects,
            vec![uri("http://ex.org/so/a"), uri("http://ex.org/so/b")]
        );
        assert_eq!(record.date.timestamp_subsec_millis(), 1);
        assert_eq!(record.date.timestamp_subsec_nanos(), 1_000_000);
    }

    #[test]
    fn test_record_document_shape() {
        let record = MeasurementRecord {
            uri: uri("http://ex.org/id/data/1"),
            scientific_objects: vec![uri("http://ex.org/so/a")],
            variable: uri("http://ex.org/var/height"),
            provenance: ProvenanceRef::new(uri("http://ex.org/prov/1")),
            date: Utc.with_ymd_and_hms(2020, 4, 1, 10, 0, 0).unwrap(),
            value: MeasurementValue::Integer(3),
            confidence: Some(0.9),
            metadata: BTreeMap::new(),
        };
        let doc = serde_json::to_value(&record).unwrap();
        assert_eq!(doc["scientificObjects"], json!(["http://ex.org/so/a"]));
        assert_eq!(doc["provenance"]["uri"], json!("http://ex.org/prov/1"));
        assert_eq!(doc["date"], json!("2020-04-01T10:00:00.000Z"));
        assert!(doc.get("metadata").is_none());

        let back: MeasurementRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(back, record);
    }
}
