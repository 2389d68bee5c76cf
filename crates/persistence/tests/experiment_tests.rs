//! Experiment repository integration tests.
//!
//! The graph store is a fixture: it answers projection queries from
//! registered bindings and search queries from registered rows, so these
//! tests exercise hydration, ordering, closure post-filtering and paging
//! rather than SPARQL evaluation.

mod common;

use std::sync::Arc;

use chrono::NaiveDate;

use silex_persistence::backends::{MemoryDocumentStore, ObjectStoreBlobs};
use silex_persistence::dal::{DataLayer, ExperimentRepository};
use silex_persistence::error::{StorageError, ValidationError};
use silex_persistence::search::{ExperimentSearchCriteria, SENSORS_VAR};
use silex_persistence::sparql::{Binding, SelectQuery};
use silex_persistence::types::{OrderBy, PageRequest};
use silex_persistence::vocabulary::{oeso, xsd};
use silex_persistence::PersistenceConfig;

use common::*;

const EXP_1: &str = "http://example.org/experiment/1";
const EXP_2: &str = "http://example.org/experiment/2";
const EXP_3: &str = "http://example.org/experiment/3";

const CAMERA: &str = "http://example.org/Camera";
const POT: &str = "http://example.org/Pot";

fn repository(graph: Arc<FixtureGraphStore>) -> ExperimentRepository {
    init_tracing();
    DataLayer::new(
        &PersistenceConfig::default(),
        graph,
        Arc::new(MemoryDocumentStore::new()),
        Arc::new(ObjectStoreBlobs::in_memory()),
    )
    .unwrap()
    .experiments
}

fn experiments(graph: FixtureGraphStore) -> FixtureGraphStore {
    graph
        .with_resource(
            EXP_1,
            oeso::EXPERIMENT,
            vec![
                ("label", Binding::lang_literal("Drought 2021", "en")),
                ("startDate", Binding::typed("2021-03-01", xsd::DATE)),
                ("campaign", Binding::typed("2021", xsd::INTEGER)),
                ("species", Binding::uri("http://example.org/species/maize")),
                ("species__name", Binding::literal("Zea mays")),
            ],
        )
        .with_resource(
            EXP_2,
            oeso::EXPERIMENT,
            vec![
                ("label", Binding::literal("")),
                ("species", Binding::uri("http://example.org/species/wheat")),
            ],
        )
        .with_resource(
            EXP_3,
            oeso::EXPERIMENT,
            vec![("label", Binding::lang_literal("Field", "en"))],
        )
}

fn row(experiment: &str) -> Vec<(&str, Binding)> {
    vec![("uri", Binding::uri(experiment))]
}

fn sensor_row<'a>(experiment: &'a str, sensor: &'a str) -> Vec<(&'a str, Binding)> {
    vec![
        ("uri", Binding::uri(experiment)),
        (SENSORS_VAR, Binding::uri(sensor)),
    ]
}

fn ids(page: &[silex_persistence::types::ExperimentModel]) -> Vec<String> {
    page.iter()
        .filter_map(|e| e.uri.as_ref())
        .map(|u| u.to_string())
        .collect()
}

// ============================================================================
// Get
// ============================================================================

#[tokio::test]
async fn test_get_hydrates_single_valued_fields() {
    let repo = repository(Arc::new(experiments(FixtureGraphStore::new(true))));

    let experiment = repo.get(&uri(EXP_1), None).await.unwrap();
    assert_eq!(experiment.label.as_ref().unwrap().value, "Drought 2021");
    assert_eq!(
        experiment.start_date,
        NaiveDate::from_ymd_opt(2021, 3, 1)
    );
    assert_eq!(experiment.campaign, Some(2021));
    let species = experiment.species.unwrap();
    assert_eq!(species.uri, uri("http://example.org/species/maize"));
    assert_eq!(species.rdf_type, uri(oeso::SPECIES));
    assert_eq!(species.name.as_deref(), Some("Zea mays"));
    assert!(experiment.keywords.is_empty());
}

#[tokio::test]
async fn test_get_empty_label_and_unnamed_object() {
    let repo = repository(Arc::new(experiments(FixtureGraphStore::new(true))));

    let experiment = repo.get(&uri(EXP_2), Some("fr")).await.unwrap();
    assert!(experiment.label.is_none());
    assert!(experiment.species.unwrap().name.is_none());
    assert!(experiment.start_date.is_none());
}

#[tokio::test]
async fn test_get_many_keeps_input_order() {
    let repo = repository(Arc::new(experiments(FixtureGraphStore::new(true))));

    let found = repo
        .get_many(
            &[uri(EXP_3), uri("http://example.org/experiment/missing"), uri(EXP_1)],
            None,
        )
        .await
        .unwrap();
    assert_eq!(ids(&found), vec![EXP_3, EXP_1]);

    let err = repo
        .get(&uri("http://example.org/experiment/missing"), None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_get_rejects_resource_of_another_class() {
    for property_paths in [true, false] {
        let graph = experiments(FixtureGraphStore::new(property_paths)).with_variable(
            HEIGHT,
            "Height",
            Some(xsd::DECIMAL),
        );
        let repo = repository(Arc::new(graph));

        let err = repo.get(&uri(HEIGHT), None).await.unwrap_err();
        assert!(err.is_not_found(), "got {err:?}");
        let found = repo.get_many(&[uri(HEIGHT), uri(EXP_1)], None).await.unwrap();
        assert_eq!(ids(&found), vec![EXP_1]);
    }
}

#[tokio::test]
async fn test_get_accepts_subclass_instances() {
    const TRIAL: &str = "http://example.org/Trial";
    const TRIAL_1: &str = "http://example.org/experiment/trial";

    let graph = Arc::new(
        FixtureGraphStore::new(false)
            .with_subclass(TRIAL, oeso::EXPERIMENT)
            .with_resource(TRIAL_1, TRIAL, vec![("label", Binding::literal("Trial"))]),
    );
    let repo = repository(graph.clone());

    let experiment = repo.get(&uri(TRIAL_1), None).await.unwrap();
    assert_eq!(experiment.label.unwrap().value, "Trial");

    let queries = graph.queries();
    assert!(queries.iter().all(|q| !q.pattern.uses_property_paths()));
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn test_search_dedupes_and_paginates() {
    let graph = experiments(FixtureGraphStore::new(true))
        .with_search_row(row(EXP_1))
        .with_search_row(row(EXP_1))
        .with_search_row(row(EXP_2))
        .with_search_row(row(EXP_3));
    let repo = repository(Arc::new(graph));

    let first = repo
        .search(
            &ExperimentSearchCriteria::new(),
            &[],
            PageRequest::new(Some(0), 2),
            None,
        )
        .await
        .unwrap();
    assert_eq!(first.page_info.total, 3);
    assert_eq!(ids(&first.items), vec![EXP_1, EXP_2]);
    assert!(first.page_info.has_next());

    let second = repo
        .search(
            &ExperimentSearchCriteria::new(),
            &[],
            PageRequest::new(Some(1), 2),
            None,
        )
        .await
        .unwrap();
    assert_eq!(ids(&second.items), vec![EXP_3]);
    assert!(!second.page_info.has_next());
}

#[tokio::test]
async fn test_search_query_shape() {
    let graph = Arc::new(experiments(FixtureGraphStore::new(true)).with_search_row(row(EXP_1)));
    let repo = repository(graph.clone());

    repo.search(
        &ExperimentSearchCriteria::new().with_label("drought"),
        &[OrderBy::desc("startDate")],
        PageRequest::all(),
        None,
    )
    .await
    .unwrap();

    let queries = graph.queries();
    let search: &SelectQuery = &queries[0];
    assert!(search.distinct);
    assert!(search.projection.contains(&"order_startDate".to_string()));
    assert_eq!(search.order_by.len(), 1);
    assert!(search.order_by[0].descending);
    assert_eq!(search.pattern.optionals.len(), 1);
    let sparql = search.to_sparql();
    assert!(sparql.contains(oeso::EXPERIMENT));
    assert!(sparql.contains("drought"));
}

#[tokio::test]
async fn test_search_defaults_to_identifier_order() {
    let graph = Arc::new(FixtureGraphStore::new(true));
    let repo = repository(graph.clone());

    let page = repo
        .search(&ExperimentSearchCriteria::new(), &[], PageRequest::all(), None)
        .await
        .unwrap();
    assert!(page.is_empty());

    let queries = graph.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].order_by[0].var, "uri");
    assert!(!queries[0].order_by[0].descending);
}

#[tokio::test]
async fn test_search_rejects_unknown_sort_field() {
    let repo = repository(Arc::new(FixtureGraphStore::new(true)));

    let err = repo
        .search(
            &ExperimentSearchCriteria::new(),
            &[OrderBy::asc("keywords")],
            PageRequest::all(),
            None,
        )
        .await
        .unwrap_err();
    match err {
        StorageError::Validation(ValidationError::UnsupportedSortField { field, .. }) => {
            assert_eq!(field, "keywords");
        }
        other => panic!("expected unsupported sort field, got {other:?}"),
    }
}

#[tokio::test]
async fn test_sensor_closure_filters_before_paging() {
    let graph = Arc::new(
        experiments(sensing_graph())
            .with_type("http://example.org/sensor/cam1", CAMERA)
            .with_type("http://example.org/sensor/pot1", POT)
            .with_type("http://example.org/sensor/cam2", oeso::SENSING_DEVICE)
            .with_search_row(sensor_row(EXP_1, "http://example.org/sensor/cam1"))
            .with_search_row(sensor_row(EXP_2, "http://example.org/sensor/pot1"))
            .with_search_row(sensor_row(EXP_3, "http://example.org/sensor/cam2")),
    );
    let repo = repository(graph.clone());
    let criteria = ExperimentSearchCriteria::new().with_sensors([
        uri("http://example.org/sensor/cam1"),
        uri("http://example.org/sensor/pot1"),
        uri("http://example.org/sensor/cam2"),
    ]);

    let page = repo
        .search(&criteria, &[], PageRequest::new(Some(1), 1), None)
        .await
        .unwrap();
    assert_eq!(page.page_info.total, 2);
    assert_eq!(ids(&page.items), vec![EXP_3]);

    let queries = graph.queries();
    assert!(queries.iter().all(|q| !q.pattern.uses_property_paths()));
    assert!(queries[0].projection.contains(&SENSORS_VAR.to_string()));
}

#[tokio::test]
async fn test_sensor_closure_inlined_with_property_paths() {
    let graph = Arc::new(
        experiments(FixtureGraphStore::new(true))
            .with_search_row(sensor_row(EXP_1, "http://example.org/sensor/cam1")),
    );
    let repo = repository(graph.clone());

    let page = repo
        .search(
            &ExperimentSearchCriteria::new().with_sensors([uri("http://example.org/sensor/cam1")]),
            &[],
            PageRequest::all(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(ids(&page.items), vec![EXP_1]);

    // search + projection only; no closure check query
    let queries = graph.queries();
    assert_eq!(queries.len(), 2);
    assert!(queries[0].pattern.uses_property_paths());
    assert!(!queries[0].projection.contains(&SENSORS_VAR.to_string()));
}
