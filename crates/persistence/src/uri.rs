//! Resource identifiers and prefix normalization.
//!
//! Identifiers in the graph store may be written in expanded form
//! (`http://www.w3.org/2001/XMLSchema#integer`), in prefixed form
//! (`xsd:integer`) or wrapped in angle brackets. [`UriNormalizer`] holds the
//! prefix map and turns any of those spellings into one canonical expanded
//! string, so two identifiers can be compared reliably.
//!
//! # Example
//!
//! ```
//! use silex_persistence::uri::UriNormalizer;
//!
//! let normalizer = UriNormalizer::default();
//! assert!(normalizer.equivalent(
//!     "xsd:integer",
//!     "<http://www.w3.org/2001/XMLSchema#integer>",
//! ));
//! assert_eq!(
//!     normalizer.compact("http://www.w3.org/2001/XMLSchema#integer"),
//!     "xsd:integer"
//! );
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{StorageResult, ValidationError};
use crate::vocabulary::{oeso, owl, rdf, rdfs, xsd};

/// A syntactically valid absolute URI.
///
/// Construction goes through [`Uri::parse`], which strips surrounding angle
/// brackets and whitespace. Deserialization applies the same check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uri(String);

impl Uri {
    /// Parses an identifier, rejecting relative or malformed values.
    pub fn parse(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let raw = strip_brackets(value.as_ref());
        if raw.is_empty() {
            return Err(ValidationError::InvalidIdentifier {
                value: value.as_ref().to_string(),
                message: "identifier is empty".to_string(),
            });
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidIdentifier {
                value: raw.to_string(),
                message: "identifier contains whitespace".to_string(),
            });
        }
        url::Url::parse(raw).map_err(|e| ValidationError::InvalidIdentifier {
            value: raw.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self(raw.to_string()))
    }

    /// Generates a fresh identifier `<base>id/<kind>/<uuid>`.
    pub fn generate(base: &Uri, kind: &str) -> Self {
        let separator = if base.0.ends_with('/') || base.0.ends_with('#') {
            ""
        } else {
            "/"
        };
        Self(format!("{}{}id/{}/{}", base.0, separator, kind, Uuid::new_v4()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the identifier and returns the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Uri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Uri {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uri::parse(s)
    }
}

impl TryFrom<String> for Uri {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Uri::parse(value)
    }
}

impl From<Uri> for String {
    fn from(uri: Uri) -> Self {
        uri.0
    }
}

fn strip_brackets(value: &str) -> &str {
    let trimmed = value.trim();
    trimmed
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(trimmed)
}

/// Prefix map used to expand and compact identifiers.
#[derive(Debug, Clone)]
pub struct UriNormalizer {
    /// prefix -> namespace
    prefixes: BTreeMap<String, String>,
}

impl Default for UriNormalizer {
    fn default() -> Self {
        Self::empty()
            .with_prefix("rdf", rdf::NS)
            .with_prefix("rdfs", rdfs::NS)
            .with_prefix("owl", owl::NS)
            .with_prefix("xsd", xsd::NS)
            .with_prefix("oeso", oeso::NS)
    }
}

impl UriNormalizer {
    /// Creates a normalizer without any prefix.
    pub fn empty() -> Self {
        Self {
            prefixes: BTreeMap::new(),
        }
    }

    /// Adds or replaces a prefix binding.
    pub fn with_prefix(mut self, prefix: impl Into<String>, namespace: impl Into<String>) -> Self {
        self.prefixes.insert(prefix.into(), namespace.into());
        self
    }

    /// Returns the namespace bound to a prefix.
    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    /// Iterates over `(prefix, namespace)` pairs in prefix order.
    pub fn prefixes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, ns)| (p.as_str(), ns.as_str()))
    }

    /// Expands a prefixed name. Unknown prefixes and expanded forms are
    /// returned unchanged, minus any angle brackets.
    pub fn expand(&self, value: &str) -> String {
        let raw = strip_brackets(value);
        if let Some((prefix, local)) = raw.split_once(':') {
            // "http://..." has a local part starting with "//"
            if !local.starts_with("//") {
                if let Some(ns) = self.prefixes.get(prefix) {
                    return format!("{ns}{local}");
                }
            }
        }
        raw.to_string()
    }

    /// Compacts an expanded identifier using the longest matching namespace.
    pub fn compact(&self, value: &str) -> String {
        let expanded = self.expand(value);
        self.prefixes
            .iter()
            .filter(|(_, ns)| expanded.starts_with(ns.as_str()) && expanded.len() > ns.len())
            .max_by_key(|(_, ns)| ns.len())
            .map(|(prefix, ns)| format!("{}:{}", prefix, &expanded[ns.len()..]))
            .unwrap_or(expanded)
    }

    /// Expands and validates an identifier.
    pub fn normalize(&self, value: &str) -> StorageResult<Uri> {
        Ok(Uri::parse(self.expand(value))?)
    }

    /// Compares two identifiers by their expanded forms.
    pub fn equivalent(&self, a: &str, b: &str) -> bool {
        self.expand(a) == self.expand(b)
    }
}
