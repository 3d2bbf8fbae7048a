//! Shared data types that flow between pipeline stages.
//!
//! Per §9's "dynamic structures → static schemas" design note, every type
//! here is a tagged record; nothing in the pipeline passes a bag of
//! `serde_json::Value`s between stages once it has crossed an LLM boundary.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A scalar value that may appear as a Cypher parameter or a result column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<Scalar>),
    Null,
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

/// The kind of schema term a [`SchemaTerm`] embeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermKind {
    Label,
    Relationship,
    Property,
}

/// The authoritative set of schema identifiers the validator and generator
/// may use during one request (§3 Allow-list). Immutable between admin
/// refreshes; a new snapshot fully replaces the old one, never mutates it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllowList {
    pub labels: BTreeSet<String>,
    pub relationships: BTreeSet<String>,
    /// label -> property names observed on that label.
    pub properties: BTreeMap<String, BTreeSet<String>>,
    /// Stable hash over the sorted (label, relationship, property) triples.
    pub fingerprint: [u8; 32],
}

impl AllowList {
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    #[must_use]
    pub fn has_relationship(&self, rel: &str) -> bool {
        self.relationships.contains(rel)
    }
}

/// A single embedded schema term plus its configured synonyms (§3 SchemaTerm).
/// Created by the embedder during bootstrap or admin refresh; never mutated
/// in place, only replaced atomically alongside the rest of the index.
#[derive(Debug, Clone)]
pub struct SchemaTerm {
    pub term: String,
    pub kind: TermKind,
    pub canonical_id: String,
    pub embedding: Vec<f32>,
    pub synonyms: Vec<String>,
}

/// A mapping the semantic mapper produced from one user-supplied term to a
/// schema label, with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMapping {
    pub user_term: String,
    pub schema_label: String,
    pub score: f32,
}

/// Structured output of the planner (§3 QueryPlan, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPlan {
    pub intent: String,
    pub anchor_entity: Option<String>,
    pub params: BTreeMap<String, Scalar>,
    pub confidence: f32,
    pub question: String,
    pub entity_mappings: Vec<EntityMapping>,
}

impl QueryPlan {
    /// The fallback plan produced when entity extraction fails validation
    /// twice (§4.4 Failure).
    #[must_use]
    pub fn fallback(question: &str) -> Self {
        Self {
            intent: "general_rag_query".to_string(),
            anchor_entity: None,
            params: BTreeMap::new(),
            confidence: 0.0,
            question: question.to_string(),
            entity_mappings: Vec::new(),
        }
    }
}

/// Where a [`CypherCandidate`] came from — the template fast-path or the LLM
/// fallback (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Template,
    Llm,
}

/// A generated, not-yet-validated `(query, params)` pair (§3 CypherCandidate).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CypherCandidate {
    pub text: String,
    pub params: BTreeMap<String, Scalar>,
    pub source: CandidateSource,
}

/// One row of a query result, column-order preserved (§3 ResultRow).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRow {
    pub columns: Vec<String>,
    pub values: Vec<Scalar>,
    pub node_ids: Option<BTreeSet<String>>,
}

/// A chunk of source text retrieved by vector similarity (§3 RetrievedChunk).
/// `chunk_id` is the only identifier the summariser is allowed to cite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk_id: String,
    pub text: String,
    pub source_doc_id: String,
    pub similarity: f32,
}

/// Extra one-hop graph context collected around a result anchor (§4.9 step 4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphContextNode {
    pub node_id: String,
    pub labels: Vec<String>,
}

/// The outcome of one pipeline stage, for audit purposes (§3 AuditEvent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Blocked,
    Error,
}

/// An append-only audit record (§3 AuditEvent, §4.11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub trace_id: uuid::Uuid,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub stage: String,
    pub outcome: Outcome,
    pub reason_code: Option<crate::error::ReasonCode>,
    /// Truncated preview of the stage's payload, bounded per §6 (typically
    /// 200 chars).
    pub payload_preview: Option<String>,
}

/// Citation verification result attached to a summary (§4.10 step 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verification {
    pub status: VerificationStatus,
    pub unknown_citations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Ok,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_plan_has_zero_confidence_and_general_intent() {
        let plan = QueryPlan::fallback("anything");
        assert_eq!(plan.intent, "general_rag_query");
        assert!(plan.anchor_entity.is_none());
        assert_eq!(plan.confidence, 0.0);
    }

    #[test]
    fn allow_list_membership_checks() {
        let mut allow_list = AllowList::default();
        allow_list.labels.insert("Student".to_string());
        assert!(allow_list.has_label("Student"));
        assert!(!allow_list.has_label("Teacher"));
    }
}
