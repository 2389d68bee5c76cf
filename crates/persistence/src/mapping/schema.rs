//! Resource Schema Cache.
//!
//! A [`ResourceSchema`] classifies the fields of a graph-backed model into
//! the identifier, the label, single-valued data properties, single-valued
//! object properties and multi-valued properties (which hydration leaves
//! empty). Models describe their fields through
//! [`GraphResource::descriptor`]; the schema validates that description
//! once and the [`SchemaCache`] keeps the result for the life of the
//! process.
//!
//! # Example
//!
//! ```ignore
//! impl GraphResource for VariableModel {
//!     fn descriptor() -> ResourceDescriptor {
//!         ResourceDescriptor::new("VariableModel", oeso::VARIABLE)
//!             .field(FieldDescriptor::identifier("uri"))
//!             .field(FieldDescriptor::label("label", rdfs::LABEL))
//!             .field(FieldDescriptor::object("unit", oeso::HAS_UNIT, oeso::UNIT).named())
//!     }
//!     // ...
//! }
//! ```

use std::any::TypeId;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{MappingError, MappingResult};
use crate::sparql::{Expr, GroupPattern, Path, SelectQuery, Term, TriplePattern, ValuesBlock};
use crate::types::{LocalizedLabel, ResourceStub};
use crate::uri::Uri;
use crate::vocabulary::{rdf, rdfs};

use super::handlers::{NativeType, NativeValue, TypedLiteral};
use super::registry::DeserializerRegistry;

/// Suffix of the column carrying the display name of a named object.
pub const NAME_COLUMN_SUFFIX: &str = "__name";

/// Variable bound to the asserted type of a projected resource.
pub const RESOURCE_TYPE_VAR: &str = "resourceType";

/// Returns the name column for an object field.
pub fn name_column(field: &str) -> String {
    format!("{field}{NAME_COLUMN_SUFFIX}")
}

/// A model stored as a resource in the graph store.
pub trait GraphResource: Default + Send + Sync + 'static {
    /// Declares the model's fields and their predicates.
    fn descriptor() -> ResourceDescriptor;

    /// The identifier, once set.
    fn uri(&self) -> Option<&Uri>;

    fn set_uri(&mut self, uri: Uri);

    fn set_label(&mut self, label: LocalizedLabel) {
        let _ = label;
    }

    fn set_data(&mut self, field: &str, value: TypedLiteral) -> MappingResult<()> {
        let _ = value;
        Err(unknown_field::<Self>(field))
    }

    fn set_object(&mut self, field: &str, stub: ResourceStub) -> MappingResult<()> {
        let _ = stub;
        Err(unknown_field::<Self>(field))
    }
}

/// Error for a field the model does not accept.
pub fn unknown_field<T: GraphResource>(field: &str) -> MappingError {
    MappingError::UnknownField {
        type_name: T::descriptor().type_name.to_string(),
        field: field.to_string(),
    }
}

/// Unwraps a literal into the native type a field expects.
pub fn literal_into<T: NativeValue>(field: &str, value: TypedLiteral) -> MappingResult<T> {
    let lexical = value.lexical();
    T::from_literal(value).ok_or_else(|| MappingError::InvalidLiteral {
        datatype: format!("{} ({field})", T::NATIVE),
        lexical,
    })
}

/// How a field maps to the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Identifier,
    Label,
    Data { native: NativeType },
    Object { target_type: &'static str, named: bool },
    DataList { native: NativeType },
    ObjectList { target_type: &'static str },
}

/// Declaration of one model field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub predicate: Option<&'static str>,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldDescriptor {
    pub fn identifier(name: &'static str) -> Self {
        Self {
            name,
            predicate: None,
            kind: FieldKind::Identifier,
            required: true,
        }
    }

    pub fn label(name: &'static str, predicate: &'static str) -> Self {
        Self {
            name,
            predicate: Some(predicate),
            kind: FieldKind::Label,
            required: false,
        }
    }

    pub fn data(name: &'static str, predicate: &'static str, native: NativeType) -> Self {
        Self {
            name,
            predicate: Some(predicate),
            kind: FieldKind::Data { native },
            required: false,
        }
    }

    pub fn object(name: &'static str, predicate: &'static str, target_type: &'static str) -> Self {
        Self {
            name,
            predicate: Some(predicate),
            kind: FieldKind::Object {
                target_type,
                named: false,
            },
            required: false,
        }
    }

    pub fn data_list(name: &'static str, predicate: &'static str, native: NativeType) -> Self {
        Self {
            name,
            predicate: Some(predicate),
            kind: FieldKind::DataList { native },
            required: false,
        }
    }

    pub fn object_list(
        name: &'static str,
        predicate: &'static str,
        target_type: &'static str,
    ) -> Self {
        Self {
            name,
            predicate: Some(predicate),
            kind: FieldKind::ObjectList { target_type },
            required: false,
        }
    }

    /// Marks an object field as carrying a display name column.
    pub fn named(mut self) -> Self {
        if let FieldKind::Object { named, .. } = &mut self.kind {
            *named = true;
        }
        self
    }

    /// Marks the field as mandatory in projections.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Declaration of a model: its RDF type and fields.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    pub type_name: &'static str,
    pub rdf_type: &'static str,
    pub fields: Vec<FieldDescriptor>,
}

impl ResourceDescriptor {
    pub fn new(type_name: &'static str, rdf_type: &'static str) -> Self {
        Self {
            type_name,
            rdf_type,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }
}

/// The label property of a schema.
#[derive(Debug, Clone)]
pub struct LabelProperty {
    pub field: &'static str,
    pub predicate: Uri,
}

/// A single-valued literal property.
#[derive(Debug, Clone)]
pub struct DataProperty {
    pub field: &'static str,
    pub predicate: Uri,
    pub native: NativeType,
    pub required: bool,
}

/// A single-valued reference to another resource.
#[derive(Debug, Clone)]
pub struct ObjectProperty {
    pub field: &'static str,
    pub predicate: Uri,
    pub target_type: Uri,
    pub named: bool,
    pub required: bool,
}

/// A multi-valued property; declared but never hydrated.
#[derive(Debug, Clone)]
pub struct ListProperty {
    pub field: &'static str,
    pub predicate: Uri,
}

/// The validated field classification of one model type.
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    type_name: &'static str,
    rdf_type: Uri,
    identifier: &'static str,
    label: Option<LabelProperty>,
    data: Vec<DataProperty>,
    objects: Vec<ObjectProperty>,
    lists: Vec<ListProperty>,
}

impl ResourceSchema {
    /// Classifies a descriptor, failing on the first inconsistent field.
    pub fn build(
        descriptor: &ResourceDescriptor,
        registry: &DeserializerRegistry,
    ) -> MappingResult<Self> {
        let type_name = descriptor.type_name;
        let fail = |field: &str, reason: String| MappingError::SchemaBuild {
            type_name: type_name.to_string(),
            field: field.to_string(),
            reason,
        };
        let resolve = |field: &str, iri: &str, what: &str| -> MappingResult<Uri> {
            Uri::parse(registry.normalizer().expand(iri))
                .map_err(|_| fail(field, format!("has an invalid {what} '{iri}'")))
        };

        let rdf_type = resolve("rdf:type", descriptor.rdf_type, "type")?;

        let mut seen = HashSet::new();
        let mut identifier = None;
        let mut label = None;
        let mut data = Vec::new();
        let mut objects = Vec::new();
        let mut lists = Vec::new();

        for field in &descriptor.fields {
            let name = field.name;
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(fail(name, "is not a valid column name".to_string()));
            }
            if !seen.insert(name) {
                return Err(fail(name, "is declared twice".to_string()));
            }

            if field.kind == FieldKind::Identifier {
                if identifier.replace(name).is_some() {
                    return Err(fail(name, "is a second identifier field".to_string()));
                }
                continue;
            }

            let predicate = match field.predicate {
                Some(p) => resolve(name, p, "predicate")?,
                None => return Err(fail(name, "has no predicate".to_string())),
            };

            match &field.kind {
                FieldKind::Identifier => {}
                FieldKind::Label => {
                    if label.is_some() {
                        return Err(fail(name, "is a second label field".to_string()));
                    }
                    label = Some(LabelProperty {
                        field: name,
                        predicate,
                    });
                }
                FieldKind::Data { native } => {
                    if !registry.has_native(*native) {
                        return Err(fail(
                            name,
                            format!("has no registered handler for {native}"),
                        ));
                    }
                    data.push(DataProperty {
                        field: name,
                        predicate,
                        native: *native,
                        required: field.required,
                    });
                }
                FieldKind::Object { target_type, named } => {
                    let target_type = resolve(name, target_type, "target type")?;
                    objects.push(ObjectProperty {
                        field: name,
                        predicate,
                        target_type,
                        named: *named,
                        required: field.required,
                    });
                }
                FieldKind::DataList { .. } | FieldKind::ObjectList { .. } => {
                    lists.push(ListProperty {
                        field: name,
                        predicate,
                    });
                }
            }
        }

        let identifier = identifier
            .ok_or_else(|| fail("<none>", "no identifier field is declared".to_string()))?;

        Ok(Self {
            type_name,
            rdf_type,
            identifier,
            label,
            data,
            objects,
            lists,
        })
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn rdf_type(&self) -> &Uri {
        &self.rdf_type
    }

    /// The identifier column.
    pub fn identifier(&self) -> &'static str {
        self.identifier
    }

    pub fn label(&self) -> Option<&LabelProperty> {
        self.label.as_ref()
    }

    pub fn data_properties(&self) -> &[DataProperty] {
        &self.data
    }

    pub fn object_properties(&self) -> &[ObjectProperty] {
        &self.objects
    }

    /// Multi-valued properties, which hydration does not fill.
    pub fn list_properties(&self) -> &[ListProperty] {
        &self.lists
    }

    /// Columns a result row must project for hydration.
    ///
    /// Name columns of named objects are not included; they are optional.
    pub fn expected_columns(&self) -> Vec<&'static str> {
        let mut columns = vec![self.identifier];
        columns.extend(self.label.iter().map(|l| l.field));
        columns.extend(self.data.iter().map(|d| d.field));
        columns.extend(self.objects.iter().map(|o| o.field));
        columns
    }

    /// Builds the query projecting every hydrated column for `uris`.
    ///
    /// Only identifiers typed with the schema's class, or one of its
    /// subclasses as given by `scope`, produce rows. Labels are restricted
    /// to `lang` or untagged literals when a language is given.
    pub fn projection_query(
        &self,
        uris: &[Uri],
        scope: TypeScope<'_>,
        lang: Option<&str>,
    ) -> SelectQuery {
        let subject = Term::var(self.identifier);
        let mut projection: Vec<String> = self
            .expected_columns()
            .into_iter()
            .map(str::to_string)
            .collect();
        projection.extend(
            self.objects
                .iter()
                .filter(|o| o.named)
                .map(|o| name_column(o.field)),
        );

        let mut pattern = GroupPattern::new().values(ValuesBlock::new(
            self.identifier,
            uris.iter().map(|u| Term::iri(u.as_str())).collect(),
        ));
        pattern = self.type_constraint(pattern, scope);

        if let Some(label) = &self.label {
            let mut group = GroupPattern::new().triple(TriplePattern::new(
                subject.clone(),
                label.predicate.as_str(),
                Term::var(label.field),
            ));
            if let Some(lang) = lang {
                group = group.filter(lang_filter(label.field, lang));
            }
            pattern = pattern.optional(group);
        }

        for property in &self.data {
            let triple = TriplePattern::new(
                subject.clone(),
                property.predicate.as_str(),
                Term::var(property.field),
            );
            pattern = if property.required {
                pattern.triple(triple)
            } else {
                pattern.optional(GroupPattern::new().triple(triple))
            };
        }

        for property in &self.objects {
            let mut group = GroupPattern::new().triple(TriplePattern::new(
                subject.clone(),
                property.predicate.as_str(),
                Term::var(property.field),
            ));
            if property.named {
                let name_var = name_column(property.field);
                let mut name_group = GroupPattern::new().triple(TriplePattern::new(
                    Term::var(property.field),
                    rdfs::LABEL,
                    Term::var(name_var.clone()),
                ));
                if let Some(lang) = lang {
                    name_group = name_group.filter(lang_filter(&name_var, lang));
                }
                group = group.optional(name_group);
            }
            if property.required {
                pattern.triples.extend(group.triples);
                pattern.optionals.extend(group.optionals);
            } else {
                pattern = pattern.optional(group);
            }
        }

        SelectQuery::new(projection).with_pattern(pattern)
    }

    fn type_constraint(&self, pattern: GroupPattern, scope: TypeScope<'_>) -> GroupPattern {
        let asserted = TriplePattern::new(
            Term::var(self.identifier),
            rdf::TYPE,
            Term::var(RESOURCE_TYPE_VAR),
        );
        match scope {
            TypeScope::PropertyPath => pattern.triple(asserted).triple(TriplePattern::with_path(
                Term::var(RESOURCE_TYPE_VAR),
                Path::ZeroOrMore(rdfs::SUB_CLASS_OF.to_string()),
                Term::iri(self.rdf_type.as_str()),
            )),
            TypeScope::Classes(classes) => pattern
                .values(ValuesBlock::new(
                    RESOURCE_TYPE_VAR,
                    classes.iter().map(|c| Term::iri(c.as_str())).collect(),
                ))
                .triple(asserted),
        }
    }
}

/// How a projection restricts identifiers to the schema's class.
#[derive(Debug, Clone, Copy)]
pub enum TypeScope<'a> {
    /// `?uri rdf:type/rdfs:subClassOf* <class>`, evaluated by the store.
    PropertyPath,
    /// `?uri rdf:type ?t` with `?t` drawn from a precomputed subclass closure.
    Classes(&'a BTreeSet<String>),
}

fn lang_filter(var: &str, lang: &str) -> Expr {
    Expr::Or(vec![
        Expr::LangMatches {
            term: Term::var(var),
            range: lang.to_string(),
        },
        Expr::LangIs {
            term: Term::var(var),
            tag: String::new(),
        },
    ])
}

/// Process-wide cache of schemas keyed by model type.
#[derive(Default)]
pub struct SchemaCache {
    schemas: RwLock<HashMap<TypeId, Arc<ResourceSchema>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the schema for `T`, building it on first use.
    ///
    /// Construction happens under the write lock, so concurrent first calls
    /// build the schema once. A failed build caches nothing.
    pub fn schema_for<T: GraphResource>(
        &self,
        registry: &DeserializerRegistry,
    ) -> MappingResult<Arc<ResourceSchema>> {
        let key = TypeId::of::<T>();
        if let Some(schema) = self.schemas.read().get(&key) {
            return Ok(Arc::clone(schema));
        }

        let mut schemas = self.schemas.write();
        if let Some(schema) = schemas.get(&key) {
            return Ok(Arc::clone(schema));
        }

        let schema = Arc::new(ResourceSchema::build(&T::descriptor(), registry)?);
        tracing::debug!(
            type_name = schema.type_name(),
            data = schema.data_properties().len(),
            objects = schema.object_properties().len(),
            unsupported = schema.list_properties().len(),
            "built resource schema"
        );
        schemas.insert(key, Arc::clone(&schema));
        Ok(schema)
    }

    /// Returns true when the schema of `T` is cached.
    pub fn contains<T: GraphResource>(&self) -> bool {
        self.schemas.read().contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.schemas.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.read().is_empty()
    }
}

impl std::fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCache")
            .field("schema_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uri::UriNormalizer;
    use crate::vocabulary::oeso;

    fn registry() -> DeserializerRegistry {
        DeserializerRegistry::with_builtins(UriNormalizer::default())
    }

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new("Plot", "oeso:Plot")
            .field(FieldDescriptor::identifier("uri"))
            .field(FieldDescriptor::label("label", "rdfs:label"))
            .field(FieldDescriptor::data("area", "oeso:hasArea", NativeType::Decimal))
            .field(FieldDescriptor::object("species", oeso::HAS_SPECIES, oeso::SPECIES).named())
            .field(FieldDescriptor::object_list(
                "devices",
                oeso::HAS_DEVICE,
                oeso::SENSING_DEVICE,
            ))
    }

    #[test]
    fn test_classifies_fields() {
        let schema = ResourceSchema::build(&descriptor(), &registry()).unwrap();
        assert_eq!(schema.identifier(), "uri");
        assert_eq!(schema.label().unwrap().predicate.as_str(), rdfs::LABEL);
        assert_eq!(schema.data_properties()[0].native, NativeType::Decimal);
        assert!(schema.object_properties()[0].named);
        assert_eq!(schema.list_properties()[0].field, "devices");
        assert_eq!(
            schema.expected_columns(),
            vec!["uri", "label", "area", "species"]
        );
        assert_eq!(schema.rdf_type().as_str(), format!("{}Plot", oeso::NS));
    }

    #[test]
    fn test_missing_identifier_rejected() {
        let descriptor = ResourceDescriptor::new("Broken", "oeso:Broken")
            .field(FieldDescriptor::label("label", "rdfs:label"));
        let err = ResourceSchema::build(&descriptor, &registry()).unwrap_err();
        assert!(matches!(err, MappingError::SchemaBuild { .. }));
    }

    #[test]
    fn test_duplicate_field_named_in_error() {
        let descriptor = descriptor().field(FieldDescriptor::data(
            "area",
            "oeso:hasArea",
            NativeType::Decimal,
        ));
        match ResourceSchema::build(&descriptor, &registry()) {
            Err(MappingError::SchemaBuild { field, .. }) => assert_eq!(field, "area"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_field_without_handler_rejected() {
        let empty = DeserializerRegistry::new(UriNormalizer::default());
        match ResourceSchema::build(&descriptor(), &empty) {
            Err(MappingError::SchemaBuild { field, reason, .. }) => {
                assert_eq!(field, "area");
                assert!(reason.contains("f64"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_predicate_rejected() {
        let descriptor = descriptor().field(FieldDescriptor::data(
            "height",
            "not a predicate",
            NativeType::Decimal,
        ));
        match ResourceSchema::build(&descriptor, &registry()) {
            Err(MappingError::SchemaBuild { field, .. }) => assert_eq!(field, "height"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_projection_query_shape() {
        let schema = ResourceSchema::build(&descriptor(), &registry()).unwrap();
        let uris = vec![Uri::parse("http://ex.org/plot/1").unwrap()];
        let query = schema.projection_query(&uris, TypeScope::PropertyPath, Some("en"));

        assert_eq!(
            query.projection,
            vec!["uri", "label", "area", "species", "species__name"]
        );
        let text = query.to_sparql();
        assert!(text.contains("VALUES ?uri { <http://ex.org/plot/1> }"));
        assert!(text.contains(&format!("?uri <{}> ?resourceType .", rdf::TYPE)));
        assert!(text.contains(&format!(
            "?resourceType <{}>* <{}Plot> .",
            rdfs::SUB_CLASS_OF,
            oeso::NS
        )));
        assert!(text.contains("langMatches(lang(?label), \"en\")"));
        assert!(text.contains(&format!("?species <{}> ?species__name .", rdfs::LABEL)));
        assert!(!text.contains("devices"));
    }

    #[test]
    fn test_projection_query_with_class_closure() {
        let schema = ResourceSchema::build(&descriptor(), &registry()).unwrap();
        let uris = vec![Uri::parse("http://ex.org/plot/1").unwrap()];
        let classes: BTreeSet<String> = [format!("{}Plot", oeso::NS), "http://ex.org/Subplot".into()]
            .into_iter()
            .collect();
        let query = schema.projection_query(&uris, TypeScope::Classes(&classes), None);

        assert!(!query.pattern.uses_property_paths());
        assert!(!query.projection.contains(&RESOURCE_TYPE_VAR.to_string()));
        let text = query.to_sparql();
        assert!(text.contains("<http://ex.org/Subplot>"));
        assert!(text.contains(&format!("?uri <{}> ?resourceType .", rdf::TYPE)));
    }
}
