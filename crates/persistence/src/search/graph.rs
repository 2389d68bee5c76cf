//! Graph Filter Builder.
//!
//! Compiles an [`ExperimentSearchCriteria`] into a [`QueryFragment`]: the
//! triple patterns, FILTER expressions and VALUES blocks to add under the
//! experiment type pattern.
//!
//! Singular criteria become equality or regex filters on a variable bound by
//! one triple pattern. List criteria become one triple pattern each plus one
//! VALUES block per variable, so a list of N values never expands into N
//! filter expressions.
//!
//! Sensors are linked through `oeso:participatesIn`, which any resource may
//! carry. The fragment therefore records a [`ClosureCheck`] on the sensor
//! variable. When the store evaluates property paths the check is inlined as
//! `?sensors rdf:type/rdfs:subClassOf* oeso:SensingDevice`; otherwise the
//! caller removes the offending results after the query (see
//! [`QueryFragment::post_checks`]).

use chrono::{NaiveDate, Utc};

use crate::error::MappingResult;
use crate::mapping::{DeserializerRegistry, TypedLiteral};
use crate::sparql::{Expr, GroupPattern, Path, Term, TriplePattern, ValuesBlock};
use crate::uri::Uri;
use crate::vocabulary::{oeso, rdf, rdfs};

/// Variable bound to the searched resource.
pub const SUBJECT_VAR: &str = "uri";

/// Variable bound to candidate sensors when searching by sensor.
pub const SENSORS_VAR: &str = "sensors";

const SENSOR_TYPE_VAR: &str = "SensingDeviceType";

/// Optional criteria of an experiment search. Absent fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperimentSearchCriteria {
    pub uri: Option<Uri>,
    pub label: Option<String>,
    pub objective: Option<String>,
    pub comment: Option<String>,
    pub campaign: Option<i64>,
    pub species: Option<Uri>,
    pub is_public: Option<bool>,
    /// `true`: end date is today or earlier; `false`: end date is after today.
    pub is_ended: Option<bool>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub keywords: Vec<String>,
    pub projects: Vec<Uri>,
    pub scientific_supervisors: Vec<Uri>,
    pub technical_supervisors: Vec<Uri>,
    pub groups: Vec<Uri>,
    pub variables: Vec<Uri>,
    pub sensors: Vec<Uri>,
    pub infrastructures: Vec<Uri>,
    pub devices: Vec<Uri>,
}

impl ExperimentSearchCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_uri(mut self, uri: Uri) -> Self {
        self.uri = Some(uri);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_objective(mut self, objective: impl Into<String>) -> Self {
        self.objective = Some(objective.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_campaign(mut self, campaign: i64) -> Self {
        self.campaign = Some(campaign);
        self
    }

    pub fn with_species(mut self, species: Uri) -> Self {
        self.species = Some(species);
        self
    }

    pub fn with_is_public(mut self, is_public: bool) -> Self {
        self.is_public = Some(is_public);
        self
    }

    pub fn with_is_ended(mut self, is_ended: bool) -> Self {
        self.is_ended = Some(is_ended);
        self
    }

    pub fn with_start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn with_end_date(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.extend(keywords.into_iter().map(Into::into));
        self
    }

    pub fn with_projects(mut self, projects: impl IntoIterator<Item = Uri>) -> Self {
        self.projects.extend(projects);
        self
    }

    pub fn with_scientific_supervisors(mut self, users: impl IntoIterator<Item = Uri>) -> Self {
        self.scientific_supervisors.extend(users);
        self
    }

    pub fn with_technical_supervisors(mut self, users: impl IntoIterator<Item = Uri>) -> Self {
        self.technical_supervisors.extend(users);
        self
    }

    pub fn with_groups(mut self, groups: impl IntoIterator<Item = Uri>) -> Self {
        self.groups.extend(groups);
        self
    }

    pub fn with_variables(mut self, variables: impl IntoIterator<Item = Uri>) -> Self {
        self.variables.extend(variables);
        self
    }

    pub fn with_sensors(mut self, sensors: impl IntoIterator<Item = Uri>) -> Self {
        self.sensors.extend(sensors);
        self
    }

    pub fn with_infrastructures(mut self, infrastructures: impl IntoIterator<Item = Uri>) -> Self {
        self.infrastructures.extend(infrastructures);
        self
    }

    pub fn with_devices(mut self, devices: impl IntoIterator<Item = Uri>) -> Self {
        self.devices.extend(devices);
        self
    }
}

/// A type constraint on a variable that the query may not express.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosureCheck {
    /// Variable whose bindings must be instances of `class`.
    pub var: String,
    /// Class IRI, instances of subclasses included.
    pub class: String,
    /// True when the check is part of the compiled patterns.
    pub inlined: bool,
}

/// Patterns, filters and VALUES blocks compiled from search criteria.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFragment {
    pub patterns: Vec<TriplePattern>,
    pub filters: Vec<Expr>,
    pub values: Vec<ValuesBlock>,
    pub closure_checks: Vec<ClosureCheck>,
}

impl QueryFragment {
    /// Returns true when the fragment adds no constraint.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
            && self.filters.is_empty()
            && self.values.is_empty()
            && self.closure_checks.is_empty()
    }

    /// Closure checks the caller must run after the query.
    pub fn post_checks(&self) -> impl Iterator<Item = &ClosureCheck> {
        self.closure_checks.iter().filter(|c| !c.inlined)
    }

    /// Variables the caller must project to run the post-query checks.
    pub fn post_check_vars(&self) -> Vec<String> {
        self.post_checks().map(|c| c.var.clone()).collect()
    }

    /// Appends the fragment to a group pattern.
    pub fn apply(self, mut group: GroupPattern) -> GroupPattern {
        group.values.extend(self.values);
        group.triples.extend(self.patterns);
        group.filters.extend(self.filters);
        group
    }
}

/// Compiles experiment criteria into a [`QueryFragment`].
#[derive(Debug, Clone, Copy)]
pub struct GraphFilterBuilder<'a> {
    registry: &'a DeserializerRegistry,
    supports_property_paths: bool,
}

impl<'a> GraphFilterBuilder<'a> {
    /// Creates a builder rendering literals through `registry`.
    pub fn new(registry: &'a DeserializerRegistry, supports_property_paths: bool) -> Self {
        Self {
            registry,
            supports_property_paths,
        }
    }

    /// Compiles criteria, comparing end dates against today (UTC).
    pub fn compile(&self, criteria: &ExperimentSearchCriteria) -> MappingResult<QueryFragment> {
        self.compile_at(criteria, Utc::now().date_naive())
    }

    /// Compiles criteria against an explicit current date.
    pub fn compile_at(
        &self,
        criteria: &ExperimentSearchCriteria,
        today: NaiveDate,
    ) -> MappingResult<QueryFragment> {
        let mut fragment = QueryFragment::default();
        self.singular(criteria, today, &mut fragment)?;
        self.lists(criteria, &mut fragment)?;
        tracing::debug!(
            patterns = fragment.patterns.len(),
            filters = fragment.filters.len(),
            values = fragment.values.len(),
            post_checks = fragment.post_checks().count(),
            "compiled experiment search fragment"
        );
        Ok(fragment)
    }

    fn singular(
        &self,
        criteria: &ExperimentSearchCriteria,
        today: NaiveDate,
        fragment: &mut QueryFragment,
    ) -> MappingResult<()> {
        if let Some(uri) = &criteria.uri {
            fragment
                .filters
                .push(Expr::Eq(Term::var(SUBJECT_VAR), Term::iri(uri.as_str())));
        }
        if let Some(campaign) = criteria.campaign {
            bind(fragment, oeso::HAS_CAMPAIGN, "campaign");
            let value = self.registry.to_term(&TypedLiteral::Integer(campaign))?;
            fragment.filters.push(Expr::Eq(Term::var("campaign"), value));
        }
        if let Some(species) = &criteria.species {
            bind(fragment, oeso::HAS_SPECIES, "species");
            fragment
                .filters
                .push(Expr::Eq(Term::var("species"), Term::iri(species.as_str())));
        }
        if let Some(is_public) = criteria.is_public {
            bind(fragment, oeso::IS_PUBLIC, "isPublic");
            let value = self.registry.to_term(&TypedLiteral::Boolean(is_public))?;
            fragment.filters.push(Expr::Eq(Term::var("isPublic"), value));
        }

        for (text, predicate, var) in [
            (&criteria.objective, oeso::HAS_OBJECTIVE, "objective"),
            (&criteria.label, rdfs::LABEL, "label"),
            (&criteria.comment, rdfs::COMMENT, "comment"),
        ] {
            if let Some(text) = text {
                bind(fragment, predicate, var);
                fragment
                    .filters
                    .push(Expr::contains_ignore_case(Term::var(var), text));
            }
        }

        let mut end_date_bound = false;
        if let Some(is_ended) = criteria.is_ended {
            bind(fragment, oeso::END_DATE, "endDate");
            end_date_bound = true;
            let today = self.registry.to_term(&TypedLiteral::Date(today))?;
            let end = Term::var("endDate");
            fragment.filters.push(if is_ended {
                Expr::Le(end, today)
            } else {
                Expr::Gt(end, today)
            });
        }
        if let Some(start) = criteria.start_date {
            bind(fragment, oeso::START_DATE, "startDate");
            let value = self.registry.to_term(&TypedLiteral::Date(start))?;
            fragment.filters.push(Expr::Eq(Term::var("startDate"), value));
        }
        if let Some(end) = criteria.end_date {
            if !end_date_bound {
                bind(fragment, oeso::END_DATE, "endDate");
            }
            let value = self.registry.to_term(&TypedLiteral::Date(end))?;
            fragment.filters.push(Expr::Eq(Term::var("endDate"), value));
        }
        Ok(())
    }

    fn lists(
        &self,
        criteria: &ExperimentSearchCriteria,
        fragment: &mut QueryFragment,
    ) -> MappingResult<()> {
        if !criteria.keywords.is_empty() {
            bind(fragment, oeso::HAS_KEYWORD, "keyword");
            let values = criteria
                .keywords
                .iter()
                .map(|k| self.registry.to_term(&TypedLiteral::String(k.clone())))
                .collect::<MappingResult<Vec<_>>>()?;
            fragment.values.push(ValuesBlock::new("keyword", values));
        }

        for (uris, predicate, var) in [
            (&criteria.projects, oeso::HAS_PROJECT, "project"),
            (
                &criteria.scientific_supervisors,
                oeso::HAS_SCIENTIFIC_SUPERVISOR,
                "scientificSupervisor",
            ),
            (
                &criteria.technical_supervisors,
                oeso::HAS_TECHNICAL_SUPERVISOR,
                "technicalSupervisor",
            ),
            (&criteria.groups, oeso::HAS_GROUP, "group"),
            (&criteria.variables, oeso::MEASURES, "variables"),
        ] {
            if !uris.is_empty() {
                bind(fragment, predicate, var);
                fragment.values.push(iri_values(var, uris));
            }
        }

        if !criteria.sensors.is_empty() {
            fragment.patterns.push(TriplePattern::new(
                Term::var(SENSORS_VAR),
                oeso::PARTICIPATES_IN,
                Term::var(SUBJECT_VAR),
            ));
            fragment.values.push(iri_values(SENSORS_VAR, &criteria.sensors));
            self.sensor_closure(fragment);
        }

        for (uris, predicate, var) in [
            (&criteria.infrastructures, oeso::HAS_INFRASTRUCTURE, "infrastructure"),
            (&criteria.devices, oeso::HAS_DEVICE, "devices"),
        ] {
            if !uris.is_empty() {
                bind(fragment, predicate, var);
                fragment.values.push(iri_values(var, uris));
            }
        }
        Ok(())
    }

    fn sensor_closure(&self, fragment: &mut QueryFragment) {
        let inlined = self.supports_property_paths;
        if inlined {
            fragment.patterns.push(TriplePattern::new(
                Term::var(SENSORS_VAR),
                rdf::TYPE,
                Term::var(SENSOR_TYPE_VAR),
            ));
            fragment.patterns.push(TriplePattern::with_path(
                Term::var(SENSOR_TYPE_VAR),
                Path::ZeroOrMore(rdfs::SUB_CLASS_OF.to_string()),
                Term::iri(oeso::SENSING_DEVICE),
            ));
        }
        fragment.closure_checks.push(ClosureCheck {
            var: SENSORS_VAR.to_string(),
            class: oeso::SENSING_DEVICE.to_string(),
            inlined,
        });
    }
}

/// `?uri <predicate> ?var .`
fn bind(fragment: &mut QueryFragment, predicate: &str, var: &str) {
    fragment.patterns.push(TriplePattern::new(
        Term::var(SUBJECT_VAR),
        predicate,
        Term::var(var),
    ));
}

fn iri_values(var: &str, uris: &[Uri]) -> ValuesBlock {
    ValuesBlock::new(var, uris.iter().map(|u| Term::iri(u.as_str())).collect())
}
