//! Experiments, as stored in the graph store.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::MappingResult;
use crate::mapping::schema::{literal_into, unknown_field};
use crate::mapping::{FieldDescriptor, GraphResource, NativeType, ResourceDescriptor, TypedLiteral};
use crate::uri::Uri;
use crate::vocabulary::{oeso, rdfs};

use super::resource::{LocalizedLabel, ResourceStub};

/// An experiment.
///
/// The list-valued relations (keywords, projects, supervisors, groups,
/// variables, sensors, infrastructures, devices) are searchable but are not
/// filled by hydration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentModel {
    pub uri: Option<Uri>,
    pub label: Option<LocalizedLabel>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub objective: Option<String>,
    pub comment: Option<String>,
    pub campaign: Option<i64>,
    pub is_public: Option<bool>,
    pub species: Option<ResourceStub>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub projects: Vec<Uri>,
    #[serde(default)]
    pub scientific_supervisors: Vec<Uri>,
    #[serde(default)]
    pub technical_supervisors: Vec<Uri>,
    #[serde(default)]
    pub groups: Vec<Uri>,
    #[serde(default)]
    pub variables: Vec<Uri>,
    #[serde(default)]
    pub sensors: Vec<Uri>,
    #[serde(default)]
    pub infrastructures: Vec<Uri>,
    #[serde(default)]
    pub devices: Vec<Uri>,
}

impl GraphResource for ExperimentModel {
    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new("ExperimentModel", oeso::EXPERIMENT)
            .field(FieldDescriptor::identifier("uri"))
            .field(FieldDescriptor::label("label", rdfs::LABEL))
            .field(FieldDescriptor::data("startDate", oeso::START_DATE, NativeType::Date))
            .field(FieldDescriptor::data("endDate", oeso::END_DATE, NativeType::Date))
            .field(FieldDescriptor::data(
                "objective",
                oeso::HAS_OBJECTIVE,
                NativeType::String,
            ))
            .field(FieldDescriptor::data("comment", rdfs::COMMENT, NativeType::String))
            .field(FieldDescriptor::data(
                "campaign",
                oeso::HAS_CAMPAIGN,
                NativeType::Integer,
            ))
            .field(FieldDescriptor::data("isPublic", oeso::IS_PUBLIC, NativeType::Boolean))
            .field(FieldDescriptor::object("species", oeso::HAS_SPECIES, oeso::SPECIES).named())
            .field(FieldDescriptor::data_list(
                "keywords",
                oeso::HAS_KEYWORD,
                NativeType::String,
            ))
            .field(FieldDescriptor::object_list(
                "projects",
                oeso::HAS_PROJECT,
                oeso::PROJECT,
            ))
            .field(FieldDescriptor::data_list(
                "scientificSupervisors",
                oeso::HAS_SCIENTIFIC_SUPERVISOR,
                NativeType::Uri,
            ))
            .field(FieldDescriptor::data_list(
                "technicalSupervisors",
                oeso::HAS_TECHNICAL_SUPERVISOR,
                NativeType::Uri,
            ))
            .field(FieldDescriptor::data_list("groups", oeso::HAS_GROUP, NativeType::Uri))
            .field(FieldDescriptor::object_list(
                "variables",
                oeso::MEASURES,
                oeso::VARIABLE,
            ))
            .field(FieldDescriptor::data_list(
                "infrastructures",
                oeso::HAS_INFRASTRUCTURE,
                NativeType::Uri,
            ))
            .field(FieldDescriptor::object_list(
                "devices",
                oeso::HAS_DEVICE,
                oeso::SENSING_DEVICE,
            ))
    }

    fn uri(&self) -> Option<&Uri> {
        self.uri.as_ref()
    }

    fn set_uri(&mut self, uri: Uri) {
        self.uri = Some(uri);
    }

    fn set_label(&mut self, label: LocalizedLabel) {
        self.label = Some(label);
    }

    fn set_data(&mut self, field: &str, value: TypedLiteral) -> MappingResult<()> {
        match field {
            "startDate" => self.start_date = Some(literal_into(field, value)?),
            "endDate" => self.end_date = Some(literal_into(field, value)?),
            "objective" => self.objective = Some(literal_into(field, value)?),
            "comment" => self.comment = Some(literal_into(field, value)?),
            "campaign" => self.campaign = Some(literal_into(field, value)?),
            "isPublic" => self.is_public = Some(literal_into(field, value)?),
            other => return Err(unknown_field::<Self>(other)),
        }
        Ok(())
    }

    fn set_object(&mut self, field: &str, stub: ResourceStub) -> MappingResult<()> {
        match field {
            "species" => self.species = Some(stub),
            other => return Err(unknown_field::<Self>(other)),
        }
        Ok(())
    }
}
