//! Vector similarity utilities shared by the schema embedder (C2), the
//! semantic mapper (C5), and the retriever (C9).

/// Cosine similarity normalised from `[-1, 1]` to `[0, 1]`, matching the
/// spec's "score in `[0,1]`" requirement (§4.2) directly rather than
/// returning a raw cosine.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let cosine = (dot / (norm_a * norm_b)).clamp(-1.0, 1.0);
    (cosine + 1.0) / 2.0
}

/// A scored candidate out of a similarity search, with a tie-break key for
/// deterministic ordering when scores are equal (§4.2: "Tie-break on
/// lexicographic `canonical_id`").
#[derive(Debug, Clone, PartialEq)]
pub struct Scored<T> {
    pub item: T,
    pub score: f32,
}

/// Sort `candidates` by descending similarity to `query`, breaking ties by
/// `tie_break_key`, and keep the top `k`.
pub fn top_k<T: Clone>(
    query: &[f32],
    candidates: impl IntoIterator<Item = (T, Vec<f32>)>,
    k: usize,
    tie_break_key: impl Fn(&T) -> String,
) -> Vec<Scored<T>> {
    let mut scored: Vec<Scored<T>> = candidates
        .into_iter()
        .map(|(item, embedding)| Scored {
            score: cosine_similarity(query, &embedding),
            item,
        })
        .collect();
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| tie_break_key(&a.item).cmp(&tie_break_key(&b.item)))
    });
    scored.truncate(k);
    scored
}
