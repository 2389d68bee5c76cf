//! Vocabulary IRIs used by the graph side of the data layer.
//!
//! All constants are expanded IRIs. Use [`crate::uri::UriNormalizer`] to
//! go between these and their prefixed forms.

/// RDF core vocabulary.
pub mod rdf {
    pub const NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
}

/// RDF Schema vocabulary.
pub mod rdfs {
    pub const NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
    pub const LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
    pub const COMMENT: &str = "http://www.w3.org/2000/01/rdf-schema#comment";
    pub const SUB_CLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
}

/// OWL vocabulary.
pub mod owl {
    pub const NS: &str = "http://www.w3.org/2002/07/owl#";
}

/// XML Schema datatypes.
pub mod xsd {
    pub const NS: &str = "http://www.w3.org/2001/XMLSchema#";
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const INT: &str = "http://www.w3.org/2001/XMLSchema#int";
    pub const LONG: &str = "http://www.w3.org/2001/XMLSchema#long";
    pub const SHORT: &str = "http://www.w3.org/2001/XMLSchema#short";
    pub const NON_NEGATIVE_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#nonNegativeInteger";
    pub const DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
    pub const DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
    pub const FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    pub const DATE: &str = "http://www.w3.org/2001/XMLSchema#date";
    pub const DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const ANY_URI: &str = "http://www.w3.org/2001/XMLSchema#anyURI";
}

/// Experimental-ontology vocabulary for phenotyping resources.
pub mod oeso {
    pub const NS: &str = "http://www.opensilex.org/vocabulary/oeso#";

    // Classes
    pub const EXPERIMENT: &str = "http://www.opensilex.org/vocabulary/oeso#Experiment";
    pub const VARIABLE: &str = "http://www.opensilex.org/vocabulary/oeso#Variable";
    pub const SENSING_DEVICE: &str = "http://www.opensilex.org/vocabulary/oeso#SensingDevice";
    pub const SPECIES: &str = "http://www.opensilex.org/vocabulary/oeso#Species";
    pub const UNIT: &str = "http://www.opensilex.org/vocabulary/oeso#Unit";
    pub const ENTITY: &str = "http://www.opensilex.org/vocabulary/oeso#Entity";
    pub const CHARACTERISTIC: &str = "http://www.opensilex.org/vocabulary/oeso#Characteristic";
    pub const METHOD: &str = "http://www.opensilex.org/vocabulary/oeso#Method";
    pub const PROJECT: &str = "http://www.opensilex.org/vocabulary/oeso#Project";
    pub const DATA_FILE: &str = "http://www.opensilex.org/vocabulary/oeso#Datafile";

    // Experiment properties
    pub const START_DATE: &str = "http://www.opensilex.org/vocabulary/oeso#startDate";
    pub const END_DATE: &str = "http://www.opensilex.org/vocabulary/oeso#endDate";
    pub const HAS_OBJECTIVE: &str = "http://www.opensilex.org/vocabulary/oeso#hasObjective";
    pub const HAS_CAMPAIGN: &str = "http://www.opensilex.org/vocabulary/oeso#hasCampaign";
    pub const HAS_SPECIES: &str = "http://www.opensilex.org/vocabulary/oeso#hasSpecies";
    pub const IS_PUBLIC: &str = "http://www.opensilex.org/vocabulary/oeso#isPublic";
    pub const HAS_KEYWORD: &str = "http://www.opensilex.org/vocabulary/oeso#hasKeyword";
    pub const HAS_PROJECT: &str = "http://www.opensilex.org/vocabulary/oeso#hasProject";
    pub const HAS_SCIENTIFIC_SUPERVISOR: &str =
        "http://www.opensilex.org/vocabulary/oeso#hasScientificSupervisor";
    pub const HAS_TECHNICAL_SUPERVISOR: &str =
        "http://www.opensilex.org/vocabulary/oeso#hasTechnicalSupervisor";
    pub const HAS_GROUP: &str = "http://www.opensilex.org/vocabulary/oeso#hasGroup";
    pub const MEASURES: &str = "http://www.opensilex.org/vocabulary/oeso#measures";
    pub const PARTICIPATES_IN: &str = "http://www.opensilex.org/vocabulary/oeso#participatesIn";
    pub const HAS_INFRASTRUCTURE: &str =
        "http://www.opensilex.org/vocabulary/oeso#hasInfrastructure";
    pub const HAS_DEVICE: &str = "http://www.opensilex.org/vocabulary/oeso#hasDevice";

    // Variable properties
    pub const HAS_DATA_TYPE: &str = "http://www.opensilex.org/vocabulary/oeso#hasDataType";
    pub const HAS_UNIT: &str = "http://www.opensilex.org/vocabulary/oeso#hasUnit";
    pub const HAS_ENTITY: &str = "http://www.opensilex.org/vocabulary/oeso#hasEntity";
    pub const HAS_CHARACTERISTIC: &str =
        "http://www.opensilex.org/vocabulary/oeso#hasCharacteristic";
    pub const HAS_METHOD: &str = "http://www.opensilex.org/vocabulary/oeso#hasMethod";
}
