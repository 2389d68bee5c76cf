//! Variables, as stored in the graph store.

use serde::{Deserialize, Serialize};

use crate::error::MappingResult;
use crate::mapping::schema::{literal_into, unknown_field};
use crate::mapping::{FieldDescriptor, GraphResource, NativeType, ResourceDescriptor, TypedLiteral};
use crate::uri::Uri;
use crate::vocabulary::{oeso, rdfs};

use super::resource::{LocalizedLabel, ResourceStub};

/// A measured variable: what is observed on which entity, how, and in
/// which unit, plus the datatype its values must have.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableModel {
    pub uri: Option<Uri>,
    pub label: Option<LocalizedLabel>,
    pub description: Option<String>,
    /// Declared datatype IRI (`xsd:integer`, `xsd:decimal`, ...).
    pub datatype: Option<Uri>,
    pub entity: Option<ResourceStub>,
    pub characteristic: Option<ResourceStub>,
    pub method: Option<ResourceStub>,
    pub unit: Option<ResourceStub>,
}

impl GraphResource for VariableModel {
    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new("VariableModel", oeso::VARIABLE)
            .field(FieldDescriptor::identifier("uri"))
            .field(FieldDescriptor::label("label", rdfs::LABEL))
            .field(FieldDescriptor::data(
                "description",
                rdfs::COMMENT,
                NativeType::String,
            ))
            .field(FieldDescriptor::data(
                "datatype",
                oeso::HAS_DATA_TYPE,
                NativeType::Uri,
            ))
            .field(FieldDescriptor::object("entity", oeso::HAS_ENTITY, oeso::ENTITY).named())
            .field(
                FieldDescriptor::object(
                    "characteristic",
                    oeso::HAS_CHARACTERISTIC,
                    oeso::CHARACTERISTIC,
                )
                .named(),
            )
            .field(FieldDescriptor::object("method", oeso::HAS_METHOD, oeso::METHOD).named())
            .field(FieldDescriptor::object("unit", oeso::HAS_UNIT, oeso::UNIT).named())
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
            "description" => self.description = Some(literal_into(field, value)?),
            "datatype" => self.datatype = Some(literal_into(field, value)?),
            other => return Err(unknown_field::<Self>(other)),
        }
        Ok(())
    }

    fn set_object(&mut self, field: &str, stub: ResourceStub) -> MappingResult<()> {
        let slot = match field {
            "entity" => &mut self.entity,
            "characteristic" => &mut self.characteristic,
            "method" => &mut self.method,
            "unit" => &mut self.unit,
            other => return Err(unknown_field::<Self>(other)),
        };
        *slot = Some(stub);
        Ok(())
    }
}
