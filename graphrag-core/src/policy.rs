use std::time::Duration;

/// The bundle of runtime limits a request is evaluated against: timeouts,
/// result caps, traversal depth, and the thresholds used by the semantic
/// mapper and retriever.
///
/// `mode`/`allow_writes` are deliberately not fields here — they are
/// operational toggles for the admin surface, not tunable limits, and live
/// alongside a `Policy` rather than inside it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Per-query timeout for graph-store execution (§4.8).
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Overall per-request deadline across all suspension points (§5).
    #[serde(with = "duration_secs")]
    pub request_budget: Duration,
    /// Maximum rows the executor will materialise (§4.8, §8 boundaries).
    pub max_cypher_results: usize,
    /// Maximum upper bound allowed on a variable-length path quantifier (§4.7).
    pub max_traversal_depth: usize,
    /// LLM calls allowed per minute per rate-limit key (§4.12).
    pub llm_rate_limit_per_minute: u32,
    /// Minimum semantic-mapping score to keep a mapping (§4.4, §9 Open Questions).
    pub semantic_mapping_threshold: f32,
    /// Top-k candidates considered by the semantic mapper and retriever (§4.5, §4.9).
    pub retriever_top_k: usize,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            request_budget: Duration::from_secs(30),
            max_cypher_results: 25,
            max_traversal_depth: 2,
            llm_rate_limit_per_minute: 60,
            semantic_mapping_threshold: 0.7,
            retriever_top_k: 5,
        }
    }
}

/// Operational mode toggles for the admin surface (§6). The executor rejects
/// writes unless both are set to the write-enabling values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum Mode {
    #[default]
    ReadOnly,
    Admin,
}

mod duration_secs {
    use std::time::Duration;

    pub fn serialize<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_defaults() {
        let policy = Policy::default();
        assert_eq!(policy.timeout, Duration::from_secs(10));
        assert_eq!(policy.max_cypher_results, 25);
        assert_eq!(policy.max_traversal_depth, 2);
        assert_eq!(policy.llm_rate_limit_per_minute, 60);
        assert!((policy.semantic_mapping_threshold - 0.7).abs() < f32::EPSILON);
        assert_eq!(policy.retriever_top_k, 5);
    }

    #[test]
    fn round_trips_through_toml() {
        let policy = Policy::default();
        let text = toml::to_string(&policy).expect("serialise");
        let back: Policy = toml::from_str(&text).expect("deserialise");
        assert_eq!(back.max_cypher_results, policy.max_cypher_results);
    }
}
