//! An in-memory, canned-response [`GraphStore`] for tests and the CLI's
//! offline mode. Grounded on the teacher's test-double style (a struct you
//! configure with expected responses rather than a trait object you mock
//! per-call).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use graphrag_core::guardrail::MUTATION_KEYWORDS;
use graphrag_core::model::{ResultRow, Scalar};
use graphrag_core::providers::graph_store::{SchemaIntrospection, TxMode};
use graphrag_core::providers::GraphStore;
use graphrag_core::{Error, Result};
use parking_lot::RwLock;

/// A query response is keyed by a substring match against the Cypher text —
/// good enough for canned fixtures without parsing Cypher.
struct QueryResponse {
    matches: String,
    rows: Vec<ResultRow>,
}

/// A chunk keyed by its id, as the executor/augmentor would see it.
struct Chunk {
    text: String,
    source_doc_id: String,
}

/// An in-memory graph store with no real graph behind it: schema
/// introspection, query results, vector-search hits, and chunk lookups are
/// all pre-programmed. Read-only mode is enforced the same way the
/// guardrail enforces it: scanning for mutation keywords (§4.8 "belt-and-
/// braces with C7").
pub struct FixtureGraphStore {
    schema: SchemaIntrospection,
    query_responses: RwLock<Vec<QueryResponse>>,
    vector_hits: RwLock<HashMap<String, Vec<(String, f32)>>>,
    chunks: RwLock<HashMap<String, Chunk>>,
}

impl FixtureGraphStore {
    #[must_use]
    pub fn new(schema: SchemaIntrospection) -> Self {
        Self {
            schema,
            query_responses: RwLock::new(Vec::new()),
            vector_hits: RwLock::new(HashMap::new()),
            chunks: RwLock::new(HashMap::new()),
        }
    }

    /// Program a response: any query whose text contains `matches` returns
    /// `rows`. Responses are checked in registration order; the first match
    /// wins.
    #[must_use]
    pub fn with_query_response(self, matches: impl Into<String>, rows: Vec<ResultRow>) -> Self {
        self.query_responses.write().push(QueryResponse {
            matches: matches.into(),
            rows,
        });
        self
    }

    #[must_use]
    pub fn with_vector_hits(self, index: impl Into<String>, hits: Vec<(String, f32)>) -> Self {
        self.vector_hits.write().insert(index.into(), hits);
        self
    }

    #[must_use]
    pub fn with_chunk(
        self,
        chunk_id: impl Into<String>,
        text: impl Into<String>,
        source_doc_id: impl Into<String>,
    ) -> Self {
        self.chunks.write().insert(
            chunk_id.into(),
            Chunk {
                text: text.into(),
                source_doc_id: source_doc_id.into(),
            },
        );
        self
    }
}

#[async_trait]
impl GraphStore for FixtureGraphStore {
    async fn query(
        &self,
        cypher: &str,
        _params: &std::collections::BTreeMap<String, Scalar>,
        mode: TxMode,
        _timeout: Duration,
    ) -> Result<Vec<ResultRow>> {
        if mode == TxMode::ReadOnly {
            let upper = cypher.to_uppercase();
            for keyword in MUTATION_KEYWORDS {
                if upper.contains(keyword) {
                    return Err(Error::WriteBlocked);
                }
            }
        }

        let responses = self.query_responses.read();
        for response in responses.iter() {
            if cypher.contains(&response.matches) {
                return Ok(response.rows.clone());
            }
        }
        Ok(Vec::new())
    }

    async fn introspect_schema(&self) -> Result<SchemaIntrospection> {
        Ok(self.schema.clone())
    }

    async fn create_vector_index(&self, _name: &str, _dimension: usize) -> Result<()> {
        Ok(())
    }

    async fn drop_vector_index(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn vector_search(
        &self,
        index: &str,
        _embedding: &[f32],
        k: usize,
    ) -> Result<Vec<(String, f32)>> {
        let hits = self.vector_hits.read();
        Ok(hits
            .get(index)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .take(k)
            .collect())
    }

    async fn fetch_chunk(&self, chunk_id: &str) -> Result<Option<(String, String)>> {
        let chunks = self.chunks.read();
        Ok(chunks
            .get(chunk_id)
            .map(|c| (c.text.clone(), c.source_doc_id.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> SchemaIntrospection {
        SchemaIntrospection {
            labels: vec!["Student".to_string(), "Goal".to_string()],
            relationships: vec!["HAS_GOAL".to_string()],
            properties: vec![("Student".to_string(), "fullName".to_string())],
        }
    }

    #[tokio::test]
    async fn returns_the_first_matching_canned_response() {
        let store = FixtureGraphStore::new(schema()).with_query_response(
            "HAS_GOAL",
            vec![ResultRow {
                columns: vec!["goal".to_string()],
                values: vec![Scalar::from("be kind")],
                node_ids: None,
            }],
        );
        let rows = store
            .query(
                "MATCH (s)-[:HAS_GOAL]->(g) RETURN g",
                &std::collections::BTreeMap::new(),
                TxMode::ReadOnly,
                Duration::from_secs(1),
            )
            .await
            .expect("query");
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn rejects_write_queries_in_read_only_mode() {
        let store = FixtureGraphStore::new(schema());
        let err = store
            .query(
                "MATCH (s:Student) DETACH DELETE s",
                &std::collections::BTreeMap::new(),
                TxMode::ReadOnly,
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::WriteBlocked));
    }

    #[tokio::test]
    async fn unmatched_queries_return_empty_rows_rather_than_erroring() {
        let store = FixtureGraphStore::new(schema());
        let rows = store
            .query(
                "MATCH (n) RETURN n",
                &std::collections::BTreeMap::new(),
                TxMode::ReadOnly,
                Duration::from_secs(1),
            )
            .await
            .expect("query");
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn chunk_and_vector_fixtures_round_trip() {
        let store = FixtureGraphStore::new(schema())
            .with_vector_hits("chunks", vec![("chunk_1".to_string(), 0.9)])
            .with_chunk("chunk_1", "goal text", "doc_1");
        let hits = store.vector_search("chunks", &[1.0], 5).await.expect("search");
        assert_eq!(hits, vec![("chunk_1".to_string(), 0.9)]);
        let chunk = store.fetch_chunk("chunk_1").await.expect("fetch").expect("present");
        assert_eq!(chunk, ("goal text".to_string(), "doc_1".to_string()));
    }
}
