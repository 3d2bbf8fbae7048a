//! A deterministic [`EmbeddingProvider`] for offline testing (§6's "dev
//! stub returning deterministic 8-dimensional vectors derived from input
//! length" requirement, verbatim).

use async_trait::async_trait;
use graphrag_core::providers::EmbeddingProvider;
use graphrag_core::Result;

const DIMENSION: usize = 8;

/// Embeds every string into an 8-dimensional vector derived from its length
/// and byte content, so the same input always embeds to the same vector and
/// different inputs usually embed to different ones — enough to exercise
/// `top_k`/`nearest` without a real model.
pub struct DeterministicEmbeddingProvider;

fn embed_one(text: &str) -> Vec<f32> {
    let len = text.len() as f32;
    let byte_sum: u32 = text.bytes().map(u32::from).sum();
    (0..DIMENSION)
        .map(|i| {
            let phase = (i as f32) + 1.0;
            ((len + byte_sum as f32) / phase).sin()
        })
        .collect()
}

#[async_trait]
impl EmbeddingProvider for DeterministicEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| embed_one(text)).collect())
    }

    fn embedding_dimension(&self) -> usize {
        DIMENSION
    }

    fn model_name(&self) -> &str {
        "deterministic-stub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_input_embeds_identically() {
        let provider = DeterministicEmbeddingProvider;
        let a = provider.embed_text("hello").await.unwrap();
        let b = provider.embed_text("hello").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), DIMENSION);
    }

    #[tokio::test]
    async fn different_inputs_usually_embed_differently() {
        let provider = DeterministicEmbeddingProvider;
        let a = provider.embed_text("goals").await.unwrap();
        let b = provider.embed_text("assignments").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let provider = DeterministicEmbeddingProvider;
        let inputs = vec!["one".to_string(), "two".to_string()];
        let batch = provider.embed_batch(&inputs).await.unwrap();
        let single_one = provider.embed_text("one").await.unwrap();
        assert_eq!(batch[0], single_one);
    }
}
