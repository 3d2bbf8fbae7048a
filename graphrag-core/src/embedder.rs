//! Schema Embedder (C2): vectorises schema terms and synonyms, and keeps a
//! vector index whose dimension tracks whatever the active embedding
//! provider currently produces.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::model::{AllowList, SchemaTerm, TermKind};
use crate::providers::{EmbeddingProvider, GraphStore};
use crate::similarity::top_k;
use crate::{Error, Result};

const SCHEMA_VECTOR_INDEX: &str = "graphrag_schema_terms";

/// A configured synonym table: for every canonical label/relationship/
/// property, the extra natural-language terms a question might use instead.
/// Supplied at construction time; the embedder never invents synonyms.
pub type SynonymTable = Vec<(String, TermKind, Vec<String>)>;

struct Index {
    dimension: usize,
    terms: Vec<SchemaTerm>,
}

/// Owns the current embedded schema-term index and knows how to rebuild it
/// from an [`AllowList`] plus a synonym table.
pub struct SchemaEmbedder {
    index: RwLock<Arc<Index>>,
}

impl SchemaEmbedder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            index: RwLock::new(Arc::new(Index {
                dimension: 0,
                terms: Vec::new(),
            })),
        }
    }

    /// For each term in `allow_list` plus its configured synonyms, obtain an
    /// embedding and upsert a row. If the first embedding's length differs
    /// from the currently-declared index dimension, the index is dropped
    /// and recreated at the new dimension (§4.2 Dimension handling) — the
    /// dimension therefore tracks the active provider, not a config
    /// constant. An empty provider response is a fatal refresh error.
    pub async fn refresh(
        &self,
        allow_list: &AllowList,
        synonyms: &SynonymTable,
        provider: &dyn EmbeddingProvider,
        store: &dyn GraphStore,
    ) -> Result<()> {
        let mut terms: Vec<(String, TermKind, String, Vec<String>)> = Vec::new();
        for label in &allow_list.labels {
            terms.push((label.clone(), TermKind::Label, label.clone(), Vec::new()));
        }
        for rel in &allow_list.relationships {
            terms.push((rel.clone(), TermKind::Relationship, rel.clone(), Vec::new()));
        }
        for (label, props) in &allow_list.properties {
            for prop in props {
                terms.push((
                    prop.clone(),
                    TermKind::Property,
                    format!("{label}.{prop}"),
                    Vec::new(),
                ));
            }
        }
        for (canonical_id, kind, syns) in synonyms {
            if let Some(entry) = terms
                .iter_mut()
                .find(|(_, k, id, _)| k == kind && id == canonical_id)
            {
                entry.3 = syns.clone();
            }
        }

        let mut texts: Vec<String> = Vec::new();
        for (term, _, _, syns) in &terms {
            texts.push(term.clone());
            texts.extend(syns.iter().cloned());
        }

        let embeddings = provider.embed_batch(&texts).await?;
        let first_dimension = embeddings
            .first()
            .map(Vec::len)
            .ok_or_else(|| Error::UpstreamUnavailable("embedding provider returned no vectors".into()))?;

        let previous_dimension = self.index.read().dimension;
        if previous_dimension != 0 && previous_dimension != first_dimension {
            store.drop_vector_index(SCHEMA_VECTOR_INDEX).await?;
            store
                .create_vector_index(SCHEMA_VECTOR_INDEX, first_dimension)
                .await?;
        } else if previous_dimension == 0 {
            store
                .create_vector_index(SCHEMA_VECTOR_INDEX, first_dimension)
                .await?;
        }

        let mut embedded_terms = Vec::with_capacity(terms.len());
        let mut cursor = 0;
        for (term, kind, canonical_id, syns) in terms {
            let embedding = embeddings
                .get(cursor)
                .cloned()
                .ok_or_else(|| Error::UpstreamUnavailable("embedding count mismatch".into()))?;
            cursor += 1 + syns.len();
            embedded_terms.push(SchemaTerm {
                term,
                kind,
                canonical_id,
                embedding,
                synonyms: syns,
            });
        }

        *self.index.write() = Arc::new(Index {
            dimension: first_dimension,
            terms: embedded_terms,
        });
        Ok(())
    }

    /// The k terms of the given kind with highest cosine similarity to
    /// `embedding` (§4.2 Retrieval operation). Ties broken lexicographically
    /// on `canonical_id`.
    #[must_use]
    pub fn nearest(&self, embedding: &[f32], kind: TermKind, k: usize) -> Vec<(String, f32)> {
        let index = self.index.read().clone();
        let candidates = index
            .terms
            .iter()
            .filter(|t| t.kind == kind)
            .map(|t| (t.canonical_id.clone(), t.embedding.clone()));
        top_k(embedding, candidates, k, |id| id.clone())
            .into_iter()
            .map(|scored| (scored.item, scored.score))
            .collect()
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.index.read().dimension
    }
}

impl Default for SchemaEmbedder {
    fn default() -> Self {
        Self::new()
    }
}
