//! A pre-populated [`FixtureGraphStore`] standing in for a small student/goal
//! graph, shared by `graphrag-core`'s integration tests and the CLI's
//! offline mode.

use std::collections::BTreeSet;

use graphrag_core::model::{ResultRow, Scalar};
use graphrag_core::providers::graph_store::SchemaIntrospection;
use graphrag_graphstore::FixtureGraphStore;

/// Builds a fixture store with one student, two goals, and one retrievable
/// chunk — enough to exercise the template fast path end to end (§8
/// Scenario A).
#[must_use]
pub fn goal_tracker_fixture() -> FixtureGraphStore {
    let schema = SchemaIntrospection {
        labels: vec!["Student".to_string(), "Goal".to_string()],
        relationships: vec!["HAS_GOAL".to_string()],
        properties: vec![
            ("Student".to_string(), "fullName".to_string()),
            ("Goal".to_string(), "title".to_string()),
        ],
    };

    let mut node_ids = BTreeSet::new();
    node_ids.insert("goal-1".to_string());
    node_ids.insert("goal-2".to_string());

    FixtureGraphStore::new(schema)
        .with_query_response(
            "HAS_GOAL",
            vec![
                ResultRow {
                    columns: vec!["title".to_string()],
                    values: vec![Scalar::from("Read ten books this term")],
                    node_ids: Some(node_ids.clone()),
                },
                ResultRow {
                    columns: vec!["title".to_string()],
                    values: vec![Scalar::from("Improve times-tables fluency")],
                    node_ids: Some(node_ids),
                },
            ],
        )
        .with_vector_hits("graphrag_chunks", vec![("chunk-1".to_string(), 0.92)])
        .with_chunk(
            "chunk-1",
            "Isabella Thomas set a reading goal of ten books this term.",
            "progress-report-2026-01",
        )
}
