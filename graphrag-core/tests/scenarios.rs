//! Integration tests against the named scenarios of the testable-properties
//! section: the template fast-path, a guardrail block, generator field
//! normalisation, validator rejection of unparameterised write attempts, an
//! embedding dimension switch, and citation verification.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use graphrag_core::audit::AuditSink;
use graphrag_core::catalog::SchemaCatalog;
use graphrag_core::embedder::SchemaEmbedder;
use graphrag_core::error::ReasonCode;
use graphrag_core::model::{
    AllowList, CandidateSource, QueryPlan, ResultRow, RetrievedChunk, Scalar,
};
use graphrag_core::pipeline::Pipeline;
use graphrag_core::providers::graph_store::{SchemaIntrospection, TxMode};
use graphrag_core::providers::llm::JsonCompletionRequest;
use graphrag_core::providers::{EmbeddingProvider, GraphStore, LlmProvider};
use graphrag_core::{generator, summariser, validator, Error, Policy};
use serde_json::json;
use test_utils::ScriptedLlmProvider;

struct ScenarioStore;

#[async_trait]
impl GraphStore for ScenarioStore {
    async fn query(
        &self,
        cypher: &str,
        _params: &BTreeMap<String, Scalar>,
        _mode: TxMode,
        _timeout: Duration,
    ) -> graphrag_core::Result<Vec<ResultRow>> {
        if cypher.contains("Goal") && !cypher.contains("elementId") {
            Ok(vec![ResultRow {
                columns: vec!["goal".to_string(), "status".to_string()],
                values: vec![Scalar::from("read ten books"), Scalar::from("active")],
                node_ids: None,
            }])
        } else {
            Ok(Vec::new())
        }
    }
    async fn introspect_schema(&self) -> graphrag_core::Result<SchemaIntrospection> {
        Ok(SchemaIntrospection {
            labels: vec!["Student".to_string(), "Goal".to_string()],
            relationships: vec!["HAS_GOAL".to_string()],
            properties: vec![("Student".to_string(), "fullName".to_string())],
        })
    }
    async fn create_vector_index(&self, _name: &str, _dimension: usize) -> graphrag_core::Result<()> {
        Ok(())
    }
    async fn drop_vector_index(&self, _name: &str) -> graphrag_core::Result<()> {
        Ok(())
    }
    async fn vector_search(
        &self,
        _index: &str,
        _embedding: &[f32],
        _k: usize,
    ) -> graphrag_core::Result<Vec<(String, f32)>> {
        Ok(Vec::new())
    }
    async fn fetch_chunk(&self, _chunk_id: &str) -> graphrag_core::Result<Option<(String, String)>> {
        Ok(None)
    }
}

struct ScenarioLlm;

#[async_trait]
impl LlmProvider for ScenarioLlm {
    async fn complete_json(
        &self,
        request: &JsonCompletionRequest,
    ) -> graphrag_core::Result<serde_json::Value> {
        if request.schema_description.contains("names") {
            Ok(json!({"names": ["Isabella Thomas"], "date_ranges": [], "topics": []}))
        } else {
            Ok(json!({"summary": "Isabella has a reading goal.", "citations": []}))
        }
    }
    fn name(&self) -> &str {
        "scenario-llm"
    }
}

struct ScenarioEmbedding;

#[async_trait]
impl EmbeddingProvider for ScenarioEmbedding {
    async fn embed_batch(&self, texts: &[String]) -> graphrag_core::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0; 8]).collect())
    }
    fn embedding_dimension(&self) -> usize {
        8
    }
    fn model_name(&self) -> &str {
        "scenario-embedding-stub"
    }
}

async fn scenario_pipeline() -> Pipeline {
    let catalog = Arc::new(SchemaCatalog::new());
    let store: Arc<dyn GraphStore> = Arc::new(ScenarioStore);
    catalog.refresh(store.as_ref()).await.expect("schema refresh");
    Pipeline::new(
        catalog,
        Arc::new(SchemaEmbedder::new()),
        store,
        Arc::new(ScenarioLlm),
        Arc::new(ScenarioEmbedding),
        AuditSink::disabled(),
        Vec::new(),
        Policy::default(),
    )
}

#[tokio::test]
async fn scenario_a_template_fast_path_returns_rows_and_a_successful_outcome() {
    let pipeline = scenario_pipeline().await;
    let response = pipeline
        .ask("What are the goals for Isabella Thomas?")
        .await
        .expect("template fast-path scenario succeeds");

    assert!(response.cypher.contains("HAS_GOAL"));
    assert!(response.cypher.contains("$student"));
    assert_eq!(response.params.get("limit"), Some(&Scalar::Int(20)));
    assert_eq!(response.rows.len(), 1);
    assert_eq!(response.rows[0].columns, vec!["goal".to_string(), "status".to_string()]);
}

#[tokio::test]
async fn scenario_b_guardrail_block_short_circuits_before_any_downstream_stage() {
    let pipeline = scenario_pipeline().await;
    let err = pipeline
        .ask("DROP DATABASE neo4j;")
        .await
        .expect_err("mutation keyword must be blocked by the guardrail");

    assert_eq!(err.reason_code(), ReasonCode::GuardrailBlocked);
}

#[tokio::test]
async fn scenario_e_embedding_dimension_switch_drops_and_recreates_the_index() {
    struct DimProvider(usize);

    #[async_trait]
    impl EmbeddingProvider for DimProvider {
        async fn embed_batch(&self, texts: &[String]) -> graphrag_core::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0; self.0]).collect())
        }
        fn embedding_dimension(&self) -> usize {
            self.0
        }
        fn model_name(&self) -> &str {
            "dim-switch-stub"
        }
    }

    let embedder = SchemaEmbedder::new();
    let store = ScenarioStore;
    let allow_list = {
        let mut allow_list = AllowList::default();
        allow_list.labels.insert("Student".to_string());
        allow_list
    };

    embedder
        .refresh(&allow_list, &Vec::new(), &DimProvider(8), &store)
        .await
        .expect("initial refresh at dimension 8");
    assert_eq!(embedder.dimension(), 8);

    embedder
        .refresh(&allow_list, &Vec::new(), &DimProvider(768), &store)
        .await
        .expect("refresh after provider dimension change");
    assert_eq!(embedder.dimension(), 768);

    let nearest = embedder.nearest(&vec![1.0; 768], graphrag_core::model::TermKind::Label, 1);
    assert_eq!(nearest.len(), 1, "KNN queries succeed at the new dimension");
}

fn student_allow_list() -> AllowList {
    let mut allow_list = AllowList::default();
    allow_list.labels.insert("Student".to_string());
    allow_list
        .properties
        .entry("Student".to_string())
        .or_default()
        .insert("fullName".to_string());
    allow_list
}

fn general_plan(params: BTreeMap<String, graphrag_core::model::Scalar>) -> QueryPlan {
    let mut plan = QueryPlan::fallback("who is John Doe?");
    plan.params = params;
    plan
}

#[tokio::test]
async fn scenario_c_llm_field_names_are_normalised_to_cypher_and_params() {
    let llm = ScriptedLlmProvider::new("test-llm").with_response(json!({
        "query": "MATCH (s:Student {fullName:$name}) RETURN s LIMIT $limit",
        "parameters": {"name": "John Doe", "limit": 10}
    }));
    let plan = general_plan(BTreeMap::new());
    let allow_list = student_allow_list();

    let candidate = generator::generate(&plan, &allow_list, &llm)
        .await
        .expect("generation should succeed on the first attempt, no retry");

    assert_eq!(candidate.source, CandidateSource::Llm);
    assert!(candidate.text.contains("RETURN s LIMIT $limit"));
    assert_eq!(
        candidate.params.get("name"),
        Some(&graphrag_core::model::Scalar::from("John Doe"))
    );
}

#[tokio::test]
async fn scenario_d_unparameterised_write_attempt_is_rejected_before_execution() {
    let llm = ScriptedLlmProvider::new("test-llm").with_response(json!({
        "cypher": "MATCH (s:Student {fullName: 'John'}) DETACH DELETE s RETURN s",
        "params": {}
    }));
    let plan = general_plan(BTreeMap::new());
    let allow_list = student_allow_list();

    let candidate = generator::generate(&plan, &allow_list, &llm)
        .await
        .expect("generator only produces candidates, validation happens later");

    let policy = Policy::default();
    let err = validator::validate(candidate, &allow_list, &policy).unwrap_err();
    assert!(matches!(
        err,
        Error::ValidationWriteBanned(_) | Error::ValidationUnparameterised
    ));
}

#[tokio::test]
async fn scenario_f_unknown_citation_marks_verification_failed_without_erroring() {
    let llm = ScriptedLlmProvider::new("test-llm").with_response(json!({
        "summary": "Isabella has a math goal [chunk_999].",
        "citations": []
    }));

    let chunks = vec![
        RetrievedChunk {
            chunk_id: "chunk_1".to_string(),
            text: "chunk one".to_string(),
            source_doc_id: "doc".to_string(),
            similarity: 0.9,
        },
        RetrievedChunk {
            chunk_id: "chunk_2".to_string(),
            text: "chunk two".to_string(),
            source_doc_id: "doc".to_string(),
            similarity: 0.8,
        },
    ];

    let output = summariser::summarise("does Isabella have a math goal?", &[], &chunks, &llm)
        .await
        .expect("citation mismatch never fails the summary, only its verification");

    assert_eq!(
        output.verification.status,
        graphrag_core::model::VerificationStatus::Failed
    );
    assert_eq!(output.verification.unknown_citations, vec!["chunk_999".to_string()]);
}
