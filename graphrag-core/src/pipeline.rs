//! The orchestrator: folds a question through the seven pipeline stages
//! (guardrail → plan → generate → validate → execute → augment →
//! summarise), writing one audit event per stage plus a terminal event,
//! all under a single per-request trace id (§2 Data flow, §4 state
//! machine).

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use uuid::Uuid;

use crate::audit::AuditSink;
use crate::catalog::SchemaCatalog;
use crate::embedder::SchemaEmbedder;
use crate::executor::Executor;
use crate::model::{
    AuditEvent, GraphContextNode, Outcome, ResultRow, RetrievedChunk, Scalar, Verification,
};
use crate::providers::{EmbeddingProvider, GraphStore, LlmProvider};
use crate::rate_limiter::{RateLimitedLlm, RateLimiter};
use crate::semantic_mapper::SemanticMapper;
use crate::{augmentor, generator, guardrail, planner, validator, Error, Policy, Result};

/// The public response shape handed back to the (out-of-scope) HTTP layer
/// (§6 Public request surface).
#[derive(Debug, Clone)]
pub struct Response {
    pub question: String,
    pub summary: String,
    pub cypher: String,
    pub params: BTreeMap<String, Scalar>,
    pub rows: Vec<ResultRow>,
    pub chunks: Vec<RetrievedChunk>,
    pub extra_context: Vec<GraphContextNode>,
    pub citations: Vec<String>,
    pub verification: Verification,
    pub trace_id: Uuid,
    pub audit_id: Uuid,
}

/// Every collaborator the pipeline needs, wired once at startup and shared
/// read-only across concurrent requests via `Arc` (§5 Shared resources).
pub struct Pipeline {
    catalog: Arc<SchemaCatalog>,
    embedder: Arc<SchemaEmbedder>,
    store: Arc<dyn GraphStore>,
    llm: Arc<dyn LlmProvider>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    audit: AuditSink,
    rate_limiter: RateLimiter,
    synonyms: crate::embedder::SynonymTable,
    policy: Policy,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        catalog: Arc<SchemaCatalog>,
        embedder: Arc<SchemaEmbedder>,
        store: Arc<dyn GraphStore>,
        llm: Arc<dyn LlmProvider>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        audit: AuditSink,
        synonyms: crate::embedder::SynonymTable,
        policy: Policy,
    ) -> Self {
        let rate_limiter = RateLimiter::new(policy.llm_rate_limit_per_minute);
        Self {
            catalog,
            embedder,
            store,
            llm,
            embedding_provider,
            audit,
            rate_limiter,
            synonyms,
            policy,
        }
    }

    /// Run the full pipeline for one question, bounded by
    /// `policy.request_budget` (§5 Suspension points).
    pub async fn ask(&self, question: &str) -> Result<Response> {
        let trace_id = Uuid::new_v4();
        match tokio::time::timeout(self.policy.request_budget, self.ask_inner(trace_id, question))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                self.record(trace_id, "pipeline", Outcome::Error, Some(Error::QueryTimeout), None);
                Err(Error::QueryTimeout)
            }
        }
    }

    async fn ask_inner(&self, trace_id: Uuid, question: &str) -> Result<Response> {
        // C3: guardrail.
        match guardrail::check(question) {
            guardrail::Verdict::Block(reason) => {
                let err = Error::GuardrailBlocked(reason);
                self.record(trace_id, "guardrail", Outcome::Blocked, Some(&err), Some(question));
                return Err(err);
            }
            guardrail::Verdict::Allow => {
                self.record(trace_id, "guardrail", Outcome::Passed, None, None);
            }
        }

        // Shared snapshot for the lifetime of this request (§3 Ownership).
        let allow_list = self.catalog.current();

        let rate_limited_llm = RateLimitedLlm::new(self.llm.as_ref(), &self.rate_limiter, "llm");
        let semantic_mapper = SemanticMapper::new(
            &self.embedder,
            self.embedding_provider.as_ref(),
            &self.synonyms,
            self.policy.retriever_top_k,
        );

        // C4: planner.
        let plan = planner::plan(question, &rate_limited_llm, &semantic_mapper, &self.policy).await;
        self.record(trace_id, "planner", Outcome::Passed, None, Some(&plan.intent));

        // C6: generator.
        let candidate = match generator::generate(&plan, &allow_list, &rate_limited_llm).await {
            Ok(candidate) => {
                self.record(trace_id, "generator", Outcome::Passed, None, Some(&candidate.text));
                candidate
            }
            Err(e) => {
                self.record(trace_id, "generator", Outcome::Error, Some(&e), None);
                return Err(e);
            }
        };

        // C7: validator.
        let candidate = match validator::validate(candidate, &allow_list, &self.policy) {
            Ok(candidate) => {
                self.record(trace_id, "validator", Outcome::Passed, None, Some(&candidate.text));
                candidate
            }
            Err(e) => {
                self.record(trace_id, "validator", Outcome::Blocked, Some(&e), None);
                return Err(e);
            }
        };

        // C8: executor.
        let executor = Executor::new(self.store.as_ref());
        let outcome = match executor.execute(&candidate, &self.policy).await {
            Ok(outcome) => {
                self.record_truncatable(trace_id, "executor", outcome.rows.len(), outcome.truncated);
                outcome
            }
            Err(e) => {
                self.record(trace_id, "executor", Outcome::Error, Some(&e), None);
                return Err(e);
            }
        };

        // C9: augmentor. Fail-open by construction — `augment` never errors.
        let anchors = collect_anchors(&outcome.rows);
        let augmentation = augmentor::augment(
            question,
            &anchors,
            self.store.as_ref(),
            self.embedding_provider.as_ref(),
            &self.policy,
        )
        .await;
        self.record(
            trace_id,
            "augmentor",
            Outcome::Passed,
            None,
            Some(&format!("{} chunks", augmentation.chunks.len())),
        );

        // C10: summariser.
        let summary = match crate::summariser::summarise(
            question,
            &outcome.rows,
            &augmentation.chunks,
            &rate_limited_llm,
        )
        .await
        {
            Ok(summary) => summary,
            Err(e) => {
                self.record(trace_id, "summariser", Outcome::Error, Some(&e), None);
                return Err(e);
            }
        };

        if summary.verification.status == crate::model::VerificationStatus::Failed {
            self.record(
                trace_id,
                "summariser",
                Outcome::Passed,
                Some(&Error::CitationUnverified),
                Some(&summary.verification.unknown_citations.join(",")),
            );
        } else {
            self.record(trace_id, "summariser", Outcome::Passed, None, None);
        }

        let audit_id = Uuid::new_v4();
        self.record(trace_id, "audited", Outcome::Passed, None, None);

        Ok(Response {
            question: question.to_string(),
            summary: summary.summary,
            cypher: candidate.text,
            params: candidate.params,
            rows: outcome.rows,
            chunks: augmentation.chunks,
            extra_context: augmentation.extra_context,
            citations: summary.citations,
            verification: summary.verification,
            trace_id,
            audit_id,
        })
    }

    fn record(
        &self,
        trace_id: Uuid,
        stage: &str,
        outcome: Outcome,
        error: Option<&Error>,
        preview: Option<&str>,
    ) {
        self.audit.record(AuditEvent {
            trace_id,
            timestamp: chrono::Utc::now(),
            stage: stage.to_string(),
            outcome,
            reason_code: error.map(Error::reason_code),
            payload_preview: preview.map(|p| truncate_preview(p, 200)),
        });
    }

    fn record_truncatable(&self, trace_id: Uuid, stage: &str, row_count: usize, truncated: bool) {
        self.audit.record(AuditEvent {
            trace_id,
            timestamp: chrono::Utc::now(),
            stage: stage.to_string(),
            outcome: Outcome::Passed,
            reason_code: None,
            payload_preview: Some(format!("rows={row_count} truncated={truncated}")),
        });
    }
}

fn collect_anchors(rows: &[ResultRow]) -> BTreeSet<String> {
    let mut anchors = BTreeSet::new();
    for row in rows {
        if let Some(ids) = &row.node_ids {
            anchors.extend(ids.iter().cloned());
        }
    }
    anchors
}

fn truncate_preview(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        text.to_string()
    } else {
        let mut truncated: String = text.chars().take(max_len).collect();
        truncated.push('…');
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReasonCode;
    use crate::providers::graph_store::{SchemaIntrospection, TxMode};
    use crate::providers::llm::JsonCompletionRequest;
    use async_trait::async_trait;
    use std::time::Duration;

    struct StubStore;

    #[async_trait]
    impl GraphStore for StubStore {
        async fn query(
            &self,
            cypher: &str,
            _params: &BTreeMap<String, Scalar>,
            _mode: TxMode,
            _timeout: Duration,
        ) -> Result<Vec<ResultRow>> {
            if cypher.contains("Goal") && !cypher.contains("elementId") {
                Ok(vec![ResultRow {
                    columns: vec!["goal".to_string(), "status".to_string()],
                    values: vec![Scalar::from("be kind"), Scalar::from("active")],
                    node_ids: None,
                }])
            } else {
                Ok(Vec::new())
            }
        }
        async fn introspect_schema(&self) -> Result<SchemaIntrospection> {
            Ok(SchemaIntrospection {
                labels: vec!["Student".to_string(), "Goal".to_string()],
                relationships: vec!["HAS_GOAL".to_string()],
                properties: vec![("Student".to_string(), "fullName".to_string())],
            })
        }
        async fn create_vector_index(&self, _name: &str, _dimension: usize) -> Result<()> {
            Ok(())
        }
        async fn drop_vector_index(&self, _name: &str) -> Result<()> {
            Ok(())
        }
        async fn vector_search(
            &self,
            _index: &str,
            _embedding: &[f32],
            _k: usize,
        ) -> Result<Vec<(String, f32)>> {
            Ok(Vec::new())
        }
        async fn fetch_chunk(&self, _chunk_id: &str) -> Result<Option<(String, String)>> {
            Ok(None)
        }
    }

    struct StubLlm;

    #[async_trait]
    impl LlmProvider for StubLlm {
        async fn complete_json(
            &self,
            request: &JsonCompletionRequest,
        ) -> Result<serde_json::Value> {
            if request.schema_description.contains("names") {
                Ok(serde_json::json!({"names": ["Isabella Thomas"], "date_ranges": [], "topics": []}))
            } else {
                Ok(serde_json::json!({"summary": "Isabella has a goal.", "citations": []}))
            }
        }
        fn name(&self) -> &str {
            "stub"
        }
    }

    struct StubEmbedding;

    #[async_trait]
    impl EmbeddingProvider for StubEmbedding {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0; 8]).collect())
        }
        fn embedding_dimension(&self) -> usize {
            8
        }
        fn model_name(&self) -> &str {
            "stub"
        }
    }

    async fn pipeline() -> Pipeline {
        let catalog = Arc::new(SchemaCatalog::new());
        let store: Arc<dyn GraphStore> = Arc::new(StubStore);
        catalog.refresh(store.as_ref()).await.expect("refresh");
        Pipeline::new(
            catalog,
            Arc::new(SchemaEmbedder::new()),
            store,
            Arc::new(StubLlm),
            Arc::new(StubEmbedding),
            AuditSink::disabled(),
            Vec::new(),
            Policy::default(),
        )
    }

    #[tokio::test]
    async fn template_fast_path_scenario_succeeds_end_to_end() {
        let pipeline = pipeline().await;
        let response = pipeline
            .ask("What are the goals for Isabella Thomas?")
            .await
            .expect("ask succeeds");
        assert_eq!(response.rows.len(), 1);
        assert!(response.cypher.contains("HAS_GOAL"));
    }

    #[tokio::test]
    async fn guardrail_block_short_circuits_before_any_other_stage() {
        let pipeline = pipeline().await;
        let err = pipeline.ask("DROP DATABASE neo4j;").await.unwrap_err();
        assert_eq!(err.reason_code(), ReasonCode::GuardrailBlocked);
    }
}
