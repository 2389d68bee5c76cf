//! Provenance records and references.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::uri::Uri;

/// A weak reference to an agent (device, operator, software).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentRef {
    pub uri: Uri,
    #[serde(rename = "rdfType", default, skip_serializing_if = "Option::is_none")]
    pub rdf_type: Option<Uri>,
}

impl AgentRef {
    pub fn new(uri: Uri) -> Self {
        Self {
            uri,
            rdf_type: None,
        }
    }

    pub fn with_type(mut self, rdf_type: Uri) -> Self {
        self.rdf_type = Some(rdf_type);
        self
    }
}

/// Describes how a family of measurements was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub uri: Uri,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
    /// Agents in declaration order.
    #[serde(default)]
    pub agents: Vec<AgentRef>,
}

/// An incoming provenance without a required identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProvenance {
    #[serde(default)]
    pub uri: Option<Uri>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
    #[serde(default)]
    pub agents: Vec<AgentRef>,
}

impl NewProvenance {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uri: None,
            name: name.into(),
            description: None,
            settings: BTreeMap::new(),
            agents: Vec::new(),
        }
    }

    pub fn with_uri(mut self, uri: Uri) -> Self {
        self.uri = Some(uri);
        self
    }

    pub fn with_agent(mut self, agent: AgentRef) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }

    pub fn into_record(self, uri: Uri) -> ProvenanceRecord {
        ProvenanceRecord {
            uri,
            name: self.name,
            description: self.description,
            settings: self.settings,
            agents: self.agents,
        }
    }
}

/// The provenance of one measurement.
///
/// `prov_used` overrides the provenance's agents for this record only.
/// When it is empty the record is attributed to the provenance's agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceRef {
    pub uri: Uri,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prov_used: Vec<AgentRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub experiments: Vec<Uri>,
}

impl ProvenanceRef {
    pub fn new(uri: Uri) -> Self {
        Self {
            uri,
            prov_used: Vec::new(),
            experiments: Vec::new(),
        }
    }

    pub fn with_agent(mut self, agent: AgentRef) -> Self {
        self.prov_used.push(agent);
        self
    }

    pub fn with_experiment(mut self, experiment: Uri) -> Self {
        self.experiments.push(experiment);
        self
    }
}
