use async_trait::async_trait;

use crate::Result;

/// A provider of text embeddings (§6 Embedding provider). Grounded on the
/// teacher's `EmbeddingProvider` trait, narrowed to the batch contract the
/// spec requires: `embed(list of strings) -> list of vectors`, dimensions
/// uniform within one call.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of strings, preserving input order 1:1. All returned
    /// vectors within one call share the same length.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single string; the default forwards to [`Self::embed_batch`].
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        Ok(vectors.pop().unwrap_or_default())
    }

    /// The dimension of vectors this provider currently produces. May change
    /// across provider swaps (§4.2 Dimension handling) — callers must not
    /// assume this is a compile-time constant.
    fn embedding_dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}
