//! Value types shared by graph-backed models.

use serde::{Deserialize, Serialize};

use crate::uri::Uri;

/// A label together with its language tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedLabel {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl LocalizedLabel {
    pub fn new(value: impl Into<String>, lang: Option<&str>) -> Self {
        Self {
            value: value.into(),
            lang: lang.map(str::to_string),
        }
    }
}

/// A shallow reference to another resource, as produced by hydration.
///
/// Only the identifier, the declared type and, when projected, a display
/// name are known. Resolving the full resource is a separate lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStub {
    pub uri: Uri,
    #[serde(rename = "rdfType")]
    pub rdf_type: Uri,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}
