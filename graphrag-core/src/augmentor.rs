//! Retriever / Augmentor (C9): vector-similarity chunk retrieval plus a
//! small-radius graph expansion around the executor's result anchors.
//! Entirely fail-open — a missing or empty chunk index returns empty
//! results rather than failing the request (§4.9 Invariants).

use std::collections::BTreeSet;

use crate::model::{GraphContextNode, RetrievedChunk, Scalar};
use crate::providers::{EmbeddingProvider, GraphStore};
use crate::Policy;

const CHUNK_VECTOR_INDEX: &str = "graphrag_chunks";
const SIMILARITY_THRESHOLD: f32 = 0.0;

/// Chunks plus extra one-hop graph context, ready to hand to the summariser.
#[derive(Debug, Clone, Default)]
pub struct Augmentation {
    pub chunks: Vec<RetrievedChunk>,
    pub extra_context: Vec<GraphContextNode>,
}

/// Embed `question`, run a chunk vector-KNN search, and expand one hop
/// around each anchor node id from the executor's output (§4.9).
pub async fn augment(
    question: &str,
    anchors: &BTreeSet<String>,
    store: &dyn GraphStore,
    embedding_provider: &dyn EmbeddingProvider,
    policy: &Policy,
) -> Augmentation {
    let chunks = retrieve_chunks(question, store, embedding_provider, policy)
        .await
        .unwrap_or_default();
    let mut extra_context = expand_chunk_hierarchy(&chunks, store, policy)
        .await
        .unwrap_or_default();
    extra_context.extend(expand_anchors(anchors, store).await.unwrap_or_default());
    Augmentation {
        chunks,
        extra_context,
    }
}

async fn retrieve_chunks(
    question: &str,
    store: &dyn GraphStore,
    embedding_provider: &dyn EmbeddingProvider,
    policy: &Policy,
) -> crate::Result<Vec<RetrievedChunk>> {
    let embedding = embedding_provider.embed_text(question).await?;
    let hits = store
        .vector_search(CHUNK_VECTOR_INDEX, &embedding, policy.retriever_top_k)
        .await?;
    let mut chunks = Vec::with_capacity(hits.len());
    for (chunk_id, similarity) in hits {
        if similarity < SIMILARITY_THRESHOLD {
            continue;
        }
        if let Some((text, source_doc_id)) = store.fetch_chunk(&chunk_id).await? {
            chunks.push(RetrievedChunk {
                chunk_id,
                text,
                source_doc_id,
                similarity,
            });
        }
    }
    Ok(chunks)
}

/// For each retrieved chunk, follow its parent/child hierarchy (parent
/// document, sibling sections, ...) out to `policy.max_traversal_depth`
/// hops, collecting labels+ids only — no properties, no chunk text. Uses
/// the same unbounded-relationship-type, bounded-depth wildcard pattern as
/// [`expand_anchors`] since hierarchy edges vary by ingestion pipeline and
/// are never schema-allow-listed themselves.
async fn expand_chunk_hierarchy(
    chunks: &[RetrievedChunk],
    store: &dyn GraphStore,
    policy: &Policy,
) -> crate::Result<Vec<GraphContextNode>> {
    let mut nodes = Vec::new();
    for chunk in chunks {
        let cypher = format!(
            "MATCH (c:Chunk)-[*1..{}]-(rel) WHERE elementId(c) = $chunk_id \
             RETURN labels(rel) AS labels, elementId(rel) AS id LIMIT 10",
            policy.max_traversal_depth.max(1)
        );
        let params = [(
            "chunk_id".to_string(),
            crate::model::Scalar::from(chunk.chunk_id.as_str()),
        )]
        .into_iter()
        .collect();
        let rows = store
            .query(
                &cypher,
                &params,
                crate::providers::graph_store::TxMode::ReadOnly,
                std::time::Duration::from_secs(5),
            )
            .await?;
        for row in rows {
            let labels = row
                .columns
                .iter()
                .position(|c| c == "labels")
                .and_then(|idx| row.values.get(idx))
                .map(scalar_to_labels)
                .unwrap_or_default();
            let node_id = row
                .columns
                .iter()
                .position(|c| c == "id")
                .and_then(|idx| row.values.get(idx))
                .and_then(|v| match v {
                    Scalar::String(s) => Some(s.clone()),
                    _ => None,
                })
                .unwrap_or_else(|| chunk.chunk_id.clone());
            nodes.push(GraphContextNode { node_id, labels });
        }
    }
    Ok(nodes)
}

/// Traverse one hop outward from each anchor, collecting labels+ids only —
/// no properties, per §4.9 step 4.
async fn expand_anchors(
    anchors: &BTreeSet<String>,
    store: &dyn GraphStore,
) -> crate::Result<Vec<GraphContextNode>> {
    let mut nodes = Vec::new();
    for anchor in anchors {
        let cypher = "MATCH (a)-[]-(b) WHERE elementId(a) = $anchor RETURN labels(b) AS labels, elementId(b) AS id LIMIT 10";
        let params = [("anchor".to_string(), crate::model::Scalar::from(anchor.as_str()))]
            .into_iter()
            .collect();
        let rows = store
            .query(
                cypher,
                &params,
                crate::providers::graph_store::TxMode::ReadOnly,
                std::time::Duration::from_secs(5),
            )
            .await?;
        for row in rows {
            let labels = row
                .columns
                .iter()
                .position(|c| c == "labels")
                .and_then(|idx| row.values.get(idx))
                .map(scalar_to_labels)
                .unwrap_or_default();
            nodes.push(GraphContextNode {
                node_id: anchor.clone(),
                labels,
            });
        }
    }
    Ok(nodes)
}

/// `labels(b)` comes back as a list of strings; anything else collapses to
/// an empty label set rather than panicking.
fn scalar_to_labels(value: &Scalar) -> Vec<String> {
    match value {
        Scalar::List(items) => items
            .iter()
            .filter_map(|item| match item {
                Scalar::String(s) => Some(s.clone()),
                _ => None,
            })
            .collect(),
        Scalar::String(s) => vec![s.clone()],
        _ => Vec::new(),
    }
}
