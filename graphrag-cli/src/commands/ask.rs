use std::sync::Arc;

use anyhow::Context;
use graphrag_core::audit::{AuditSink, AuditSinkConfig};
use graphrag_core::catalog::SchemaCatalog;
use graphrag_core::embedder::SchemaEmbedder;
use graphrag_core::pipeline::Pipeline;
use serde_json::json;
use test_utils::{goal_tracker_fixture, DeterministicEmbeddingProvider, ScriptedLlmProvider};

use crate::config::CliConfig;

/// Run one question through the pipeline.
///
/// This command always runs against the bundled fixture graph (see
/// `test-utils::goal_tracker_fixture`) and a scripted LLM seeded for that
/// fixture — it demonstrates the full seven-stage pipeline without
/// requiring real graph or LLM credentials. Wiring a production
/// [`graphrag_core::providers::LlmProvider`] is left to embedders of this
/// crate's library code; this binary does not ship one.
pub async fn run(question: &str, config: &CliConfig) -> anyhow::Result<()> {
    let catalog = Arc::new(SchemaCatalog::new());
    let embedder = Arc::new(SchemaEmbedder::new());
    let store = Arc::new(goal_tracker_fixture());
    let embedding_provider = Arc::new(DeterministicEmbeddingProvider);
    let llm = Arc::new(
        ScriptedLlmProvider::new("demo-llm")
            .with_response(json!({
                "names": ["Isabella Thomas"],
                "date_ranges": [],
                "topics": []
            }))
            .with_response(json!({
                "summary": "Isabella Thomas has two goals on record: reading ten books this term and improving times-tables fluency.",
                "citations": ["chunk-1"]
            })),
    );

    catalog
        .refresh(store.as_ref())
        .await
        .context("refreshing the schema catalog against the fixture store")?;
    embedder
        .refresh(
            &catalog.current(),
            &Vec::new(),
            embedding_provider.as_ref(),
            store.as_ref(),
        )
        .await
        .context("refreshing the schema embedder against the fixture store")?;

    let audit = match &config.audit_log_path {
        Some(path) => AuditSink::new(AuditSinkConfig {
            enabled: true,
            path: path.clone().into(),
        }),
        None => AuditSink::disabled(),
    };

    let pipeline = Pipeline::new(
        catalog,
        embedder,
        store,
        llm,
        embedding_provider,
        audit,
        Vec::new(),
        config.policy.clone(),
    );

    let response = pipeline.ask(question).await?;

    println!("{}", response.summary);
    println!();
    println!("cypher: {}", response.cypher);
    println!("rows returned: {}", response.rows.len());
    println!("extra context nodes: {}", response.extra_context.len());
    println!("citations: {:?}", response.citations);
    println!("verification: {:?}", response.verification.status);
    println!("trace_id: {}", response.trace_id);

    Ok(())
}
