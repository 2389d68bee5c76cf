//! Metadata of binary data files.

use std::collections::BTreeMap;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::uri::Uri;

use super::measurement::{normalize_objects, timestamp};
use super::provenance::ProvenanceRef;

/// A stored file: its metadata document and the blob path it points to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFileRecord {
    pub uri: Uri,
    pub rdf_type: Uri,
    #[serde(default)]
    pub scientific_objects: Vec<Uri>,
    pub provenance: ProvenanceRef,
    #[serde(with = "timestamp")]
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Location of the content in the blob store.
    pub path: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// An incoming file description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDataFile {
    #[serde(default)]
    pub uri: Option<Uri>,
    pub rdf_type: Uri,
    #[serde(default)]
    pub scientific_objects: Vec<Uri>,
    pub provenance: ProvenanceRef,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl NewDataFile {
    pub fn new(rdf_type: Uri, provenance: ProvenanceRef, date: DateTime<Utc>) -> Self {
        Self {
            uri: None,
            rdf_type,
            scientific_objects: Vec::new(),
            provenance,
            date,
            filename: None,
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

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn into_record(self, uri: Uri, path: String) -> DataFileRecord {
        DataFileRecord {
            uri,
            rdf_type: self.rdf_type,
            scientific_objects: normalize_objects(self.scientific_objects),
            provenance: self.provenance,
            date: self.date.trunc_subsecs(3),
            filename: self.filename,
            path,
            metadata: self.metadata,
        }
    }
}
