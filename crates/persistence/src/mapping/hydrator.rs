//! Result Hydrator.
//!
//! Turns one projected result row into a model instance using only the
//! row's own columns. Object properties become shallow [`ResourceStub`]s
//! (identifier, declared type, optional display name); nothing is fetched
//! from the store while hydrating.
//!
//! Multi-valued properties are not hydrated and stay empty.

use crate::error::{MappingError, MappingResult};
use crate::sparql::ResultRow;
use crate::types::{LocalizedLabel, ResourceStub};
use crate::uri::Uri;
use crate::vocabulary::xsd;

use super::registry::DeserializerRegistry;
use super::schema::{GraphResource, ResourceSchema, name_column};

/// Builds model instances from result rows.
#[derive(Debug, Clone, Copy)]
pub struct ResultHydrator<'a> {
    registry: &'a DeserializerRegistry,
}

impl<'a> ResultHydrator<'a> {
    pub fn new(registry: &'a DeserializerRegistry) -> Self {
        Self { registry }
    }

    /// Hydrates one row.
    ///
    /// Fails with [`MappingError::UnknownResultRow`] when the row lacks the
    /// identifier binding or a column the schema expects. Projected columns
    /// that are unbound or empty leave their field unset. The label carries
    /// `lang` when one is requested, otherwise the literal's own tag.
    pub fn hydrate<T: GraphResource>(
        &self,
        row: &ResultRow,
        schema: &ResourceSchema,
        lang: Option<&str>,
    ) -> MappingResult<T> {
        for column in schema.expected_columns() {
            if !row.has_column(column) {
                return Err(unknown_row(schema, column));
            }
        }

        let identifier = row
            .value(schema.identifier())
            .ok_or_else(|| unknown_row(schema, schema.identifier()))?;
        let uri = Uri::parse(identifier).map_err(|_| MappingError::InvalidLiteral {
            datatype: xsd::ANY_URI.to_string(),
            lexical: identifier.to_string(),
        })?;

        let mut model = T::default();
        model.set_uri(uri);

        if let Some(label) = schema.label() {
            if let Some(binding) = row.get(label.field).filter(|b| !b.value.is_empty()) {
                model.set_label(LocalizedLabel {
                    value: binding.value.clone(),
                    lang: lang.map(str::to_string).or_else(|| binding.lang.clone()),
                });
            }
        }

        for property in schema.data_properties() {
            let Some(lexical) = non_empty(row, property.field) else {
                continue;
            };
            let value = self
                .registry
                .for_native_type(property.native)?
                .parse(lexical)?;
            model.set_data(property.field, value)?;
        }

        for property in schema.object_properties() {
            let Some(lexical) = non_empty(row, property.field) else {
                continue;
            };
            let uri = Uri::parse(lexical).map_err(|_| MappingError::InvalidLiteral {
                datatype: xsd::ANY_URI.to_string(),
                lexical: lexical.to_string(),
            })?;
            let name = if property.named {
                non_empty(row, &name_column(property.field)).map(str::to_string)
            } else {
                None
            };
            model.set_object(
                property.field,
                ResourceStub {
                    uri,
                    rdf_type: property.target_type.clone(),
                    name,
                },
            )?;
        }

        Ok(model)
    }
}

fn non_empty<'r>(row: &'r ResultRow, column: &str) -> Option<&'r str> {
    row.value(column).filter(|v| !v.is_empty())
}

fn unknown_row(schema: &ResourceSchema, column: &str) -> MappingError {
    MappingError::UnknownResultRow {
        type_name: schema.type_name().to_string(),
        column: column.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::handlers::{NativeType, TypedLiteral};
    use crate::mapping::schema::{
        FieldDescriptor, ResourceDescriptor, literal_into, unknown_field,
    };
    use crate::sparql::{Binding, QueryResult};
    use crate::uri::UriNormalizer;
    use crate::vocabulary::{oeso, rdfs};
    use chrono::NaiveDate;

    #[derive(Debug, Default)]
    struct Trial {
        uri: Option<Uri>,
        label: Option<LocalizedLabel>,
        start_date: Option<NaiveDate>,
        species: Option<ResourceStub>,
        keywords: Vec<String>,
    }

    impl GraphResource for Trial {
        fn descriptor() -> ResourceDescriptor {
            ResourceDescriptor::new("Trial", oeso::EXPERIMENT)
                .field(FieldDescriptor::identifier("uri"))
                .field(FieldDescriptor::label("label", rdfs::LABEL))
                .field(FieldDescriptor::data(
                    "startDate",
                    oeso::START_DATE,
                    NativeType::Date,
                ))
                .field(
                    FieldDescriptor::object("species", oeso::HAS_SPECIES, oeso::SPECIES).named(),
                )
                .field(FieldDescriptor::data_list(
                    "keywords",
                    oeso::HAS_KEYWORD,
                    NativeType::String,
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

    fn registry() -> DeserializerRegistry {
        DeserializerRegistry::with_builtins(UriNormalizer::default())
    }

    fn schema(registry: &DeserializerRegistry) -> ResourceSchema {
        ResourceSchema::build(&Trial::descriptor(), registry).unwrap()
    }

    #[test]
    fn test_hydrates_all_single_valued_fields() {
        let registry = registry();
        let schema = schema(&registry);
        let result = QueryResult::new(["uri", "label", "startDate", "species", "species__name"]);
        let row = result
            .row()
            .with("uri", Binding::uri("http://ex.org/xp/1"))
            .with("label", Binding::lang_literal("Maize 2020", "fr"))
            .with(
                "startDate",
                Binding::typed("2020-04-01", "http://www.w3.org/2001/XMLSchema#date"),
            )
            .with("species", Binding::uri("http://ex.org/species/maize"))
            .with("species__name", Binding::literal("Zea mays"));

        let trial: Trial = ResultHydrator::new(&registry)
            .hydrate(&row, &schema, None)
            .unwrap();

        assert_eq!(trial.uri.unwrap().as_str(), "http://ex.org/xp/1");
        let label = trial.label.unwrap();
        assert_eq!(label.value, "Maize 2020");
        assert_eq!(label.lang.as_deref(), Some("fr"));
        assert_eq!(trial.start_date, NaiveDate::from_ymd_opt(2020, 4, 1));
        let species = trial.species.unwrap();
        assert_eq!(species.name.as_deref(), Some("Zea mays"));
        assert_eq!(species.rdf_type.as_str(), oeso::SPECIES);
        assert!(trial.keywords.is_empty());
    }

    #[test]
    fn test_label_takes_requested_language() {
        let registry = registry();
        let schema = schema(&registry);
        let result = QueryResult::new(["uri", "label", "startDate", "species"]);
        let untagged = result
            .row()
            .with("uri", Binding::uri("http://ex.org/xp/4"))
            .with("label", Binding::literal("Essai"));
        let tagged = result
            .row()
            .with("uri", Binding::uri("http://ex.org/xp/4"))
            .with("label", Binding::lang_literal("Essai", "fr-CA"));

        let hydrator = ResultHydrator::new(&registry);
        for row in [&untagged, &tagged] {
            let trial: Trial = hydrator.hydrate(row, &schema, Some("fr")).unwrap();
            assert_eq!(trial.label.unwrap().lang.as_deref(), Some("fr"));
        }
        let trial: Trial = hydrator.hydrate(&untagged, &schema, None).unwrap();
        assert!(trial.label.unwrap().lang.is_none());
    }

    #[test]
    fn test_empty_label_leaves_label_unset() {
        let registry = registry();
        let schema = schema(&registry);
        let result = QueryResult::new(["uri", "label", "startDate", "species"]);
        let row = result
            .row()
            .with("uri", Binding::uri("http://ex.org/xp/2"))
            .with("label", Binding::literal(""));

        let trial: Trial = ResultHydrator::new(&registry)
            .hydrate(&row, &schema, Some("en"))
            .unwrap();
        assert!(trial.label.is_none());
        assert!(trial.start_date.is_none());
    }

    #[test]
    fn test_object_without_name_column() {
        let registry = registry();
        let schema = schema(&registry);
        let result = QueryResult::new(["uri", "label", "startDate", "species"]);
        let row = result
            .row()
            .with("uri", Binding::uri("http://ex.org/xp/3"))
            .with("species", Binding::uri("http://ex.org/species/wheat"));

        let trial: Trial = ResultHydrator::new(&registry)
            .hydrate(&row, &schema, None)
            .unwrap();
        let species = trial.species.unwrap();
        assert_eq!(species.uri.as_str(), "http://ex.org/species/wheat");
        assert!(species.name.is_none());
    }

    #[test]
    fn test_missing_projected_column_is_rejected() {
        let registry = registry();
        let schema = schema(&registry);
        let result = QueryResult::new(["uri", "label"]);
        let row = result.row().with("uri", Binding::uri("http://ex.org/xp/4"));

        let err = ResultHydrator::new(&registry)
            .hydrate::<Trial>(&row, &schema, None)
            .unwrap_err();
        match err {
            MappingError::UnknownResultRow { column, .. } => assert_eq!(column, "startDate"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_identifier_binding_is_rejected() {
        let registry = registry();
        let schema = schema(&registry);
        let result = QueryResult::new(["uri", "label", "startDate", "species"]);
        let row = result.row().with("label", Binding::literal("orphan"));

        assert!(matches!(
            ResultHydrator::new(&registry).hydrate::<Trial>(&row, &schema, None),
            Err(MappingError::UnknownResultRow { .. })
        ));
    }

    #[test]
    fn test_bad_literal_propagates() {
        let registry = registry();
        let schema = schema(&registry);
        let result = QueryResult::new(["uri", "label", "startDate", "species"]);
        let row = result
            .row()
            .with("uri", Binding::uri("http://ex.org/xp/5"))
            .with("startDate", Binding::literal("April first"));

        assert!(matches!(
            ResultHydrator::new(&registry).hydrate::<Trial>(&row, &schema, None),
            Err(MappingError::InvalidLiteral { .. })
        ));
    }
}
