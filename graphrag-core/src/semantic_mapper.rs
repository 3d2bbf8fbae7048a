//! Semantic Mapper (C5): maps a user-supplied term to schema labels via the
//! schema embedder's vector index, falling back to substring matching over
//! configured synonyms when the embedder is unavailable.

use crate::embedder::SchemaEmbedder;
use crate::model::TermKind;
use crate::providers::EmbeddingProvider;

/// A fallback synonym table used only when the embedding provider cannot be
/// reached: `(canonical_id, kind, synonyms)`.
pub type SynonymFallback<'a> = &'a [(String, TermKind, Vec<String>)];

/// Wraps the schema embedder and the embedding provider used to embed user
/// terms at query time. Constructed fresh per request from shared `Arc`s —
/// cheap, holds no state of its own.
pub struct SemanticMapper<'a> {
    embedder: &'a SchemaEmbedder,
    provider: &'a dyn EmbeddingProvider,
    fallback: SynonymFallback<'a>,
    top_k: usize,
}

impl<'a> SemanticMapper<'a> {
    #[must_use]
    pub fn new(
        embedder: &'a SchemaEmbedder,
        provider: &'a dyn EmbeddingProvider,
        fallback: SynonymFallback<'a>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            provider,
            fallback,
            top_k,
        }
    }

    /// Embed `user_term`, query the schema embedder's index for the top-k
    /// matches of `kind`, and return them ordered by descending score
    /// (§4.5). Falls back to case-insensitive substring matching over
    /// configured synonyms (score fixed at 0.5) if embedding fails.
    #[must_use]
    pub fn map_sync(&self, user_term: &str, kind: TermKind) -> Vec<(String, f32)> {
        self.substring_fallback(user_term, kind)
    }

    /// Async variant used when an embedding call is available; `map_sync` is
    /// the fallback-only path kept for callers with no async context.
    pub async fn map(&self, user_term: &str, kind: TermKind) -> Vec<(String, f32)> {
        match self.provider.embed_text(user_term).await {
            Ok(embedding) => self.embedder.nearest(&embedding, kind, self.top_k),
            Err(_) => self.substring_fallback(user_term, kind),
        }
    }

    fn substring_fallback(&self, user_term: &str, kind: TermKind) -> Vec<(String, f32)> {
        let needle = user_term.to_lowercase();
        let mut hits: Vec<(String, f32)> = self
            .fallback
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .filter(|(_, _, synonyms)| {
                synonyms.iter().any(|s| s.to_lowercase().contains(&needle))
            })
            .map(|(id, _, _)| (id.clone(), 0.5))
            .collect();
        hits.sort_by(|a, b| a.0.cmp(&b.0));
        hits.truncate(self.top_k);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_fallback_matches_case_insensitively() {
        let embedder = SchemaEmbedder::new();
        struct DummyProvider;
        #[async_trait::async_trait]
        impl EmbeddingProvider for DummyProvider {
            async fn embed_batch(&self, _texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
                Ok(Vec::new())
            }
            fn embedding_dimension(&self) -> usize {
                0
            }
            fn model_name(&self) -> &str {
                "dummy"
            }
        }
        let fallback = vec![(
            "Student".to_string(),
            TermKind::Label,
            vec!["pupil".to_string(), "learner".to_string()],
        )];
        let provider = DummyProvider;
        let mapper = SemanticMapper::new(&embedder, &provider, &fallback, 5);
        let hits = mapper.map_sync("PUPIL", TermKind::Label);
        assert_eq!(hits, vec![("Student".to_string(), 0.5)]);
    }
}
