//! Planner (C4): turns a question into a [`QueryPlan`] — intent, entities,
//! and canonical parameters.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::model::{EntityMapping, QueryPlan, Scalar, TermKind};
use crate::providers::llm::JsonCompletionRequest;
use crate::providers::LlmProvider;
use crate::semantic_mapper::SemanticMapper;
use crate::Policy;

/// `(keywords that must all appear, intent name)`. Checked in order; the
/// first full match wins. Falls through to `general_rag_query` when nothing
/// matches (§4.4 step 1).
const INTENT_RULES: &[(&[&str], &str)] = &[(&["goal"], "goals_for_student")];

#[derive(Debug, Deserialize)]
struct ExtractedEntities {
    #[serde(default)]
    names: Vec<String>,
    #[serde(default)]
    date_ranges: Vec<DateRange>,
    #[serde(default)]
    topics: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DateRange {
    from: String,
    to: String,
}

/// Detect the intent for a question by keyword match (§4.4 step 1).
#[must_use]
pub fn detect_intent(question: &str) -> &'static str {
    let lower = question.to_lowercase();
    let has_proper_name = question
        .split_whitespace()
        .any(|w| w.chars().next().is_some_and(char::is_uppercase) && w.len() > 1);
    for (keywords, intent) in INTENT_RULES {
        if keywords.iter().all(|kw| lower.contains(kw)) && has_proper_name {
            return intent;
        }
    }
    "general_rag_query"
}

/// Strip honorifics and collapse whitespace, preserving the case of the
/// remaining name (§8 round-trip: `normalise("Dr. Jane  Doe ") ==
/// normalise("jane doe") == "Jane Doe"` modulo case policy — this
/// implementation's case policy is "preserve input case").
#[must_use]
pub fn normalise_name(raw: &str) -> String {
    const HONORIFICS: &[&str] = &["Mr.", "Mrs.", "Ms.", "Dr.", "Mr", "Mrs", "Ms", "Dr"];
    let mut words: Vec<&str> = raw.split_whitespace().collect();
    words.retain(|w| !HONORIFICS.iter().any(|h| h.eq_ignore_ascii_case(w)));
    words.join(" ")
}

/// Build a [`QueryPlan`] for `question`. Tries LLM entity extraction up to
/// twice; on two consecutive validation failures, falls back to
/// `general_rag_query` with zero confidence (§4.4 Failure) rather than
/// surfacing an error — planning never fails the request outright.
pub async fn plan(
    question: &str,
    llm: &dyn LlmProvider,
    semantic_mapper: &SemanticMapper<'_>,
    policy: &Policy,
) -> QueryPlan {
    let intent = detect_intent(question);

    let extracted = extract_entities(question, llm).await;
    let Some(extracted) = extracted else {
        return QueryPlan::fallback(question);
    };

    let mut entity_mappings = Vec::new();
    let mut params: BTreeMap<String, Scalar> = BTreeMap::new();
    let mut anchor_entity = None;

    for raw_name in &extracted.names {
        let normalised = normalise_name(raw_name);
        let mappings = semantic_mapper.map(&normalised, TermKind::Label).await;
        if let Some((schema_label, score)) = mappings.first() {
            if *score >= policy.semantic_mapping_threshold {
                entity_mappings.push(EntityMapping {
                    user_term: normalised.clone(),
                    schema_label: schema_label.clone(),
                    score: *score,
                });
            }
        }
        if anchor_entity.is_none() {
            anchor_entity = Some(normalised.clone());
            params.insert("student_name".to_string(), Scalar::from(normalised));
        }
    }

    if let Some(range) = extracted.date_ranges.first() {
        params.insert("from".to_string(), Scalar::from(range.from.clone()));
        params.insert("to".to_string(), Scalar::from(range.to.clone()));
    }

    params.insert("limit".to_string(), Scalar::Int(20));

    QueryPlan {
        intent: intent.to_string(),
        anchor_entity,
        params,
        confidence: if entity_mappings.is_empty() { 0.5 } else { 0.9 },
        question: question.to_string(),
        entity_mappings,
    }
}

/// Call the LLM's structured extraction endpoint, retrying once on
/// validation failure. Returns `None` after two total failures (§4.4).
async fn extract_entities(question: &str, llm: &dyn LlmProvider) -> Option<ExtractedEntities> {
    for _ in 0..2 {
        let request = JsonCompletionRequest::new(
            format!("Extract names, date ranges, and topics from: {question}"),
            "{names: [string], date_ranges: [{from, to}], topics: [string]}",
        );
        let Ok(value) = llm.complete_json(&request).await else {
            continue;
        };
        if let Ok(entities) = serde_json::from_value::<ExtractedEntities>(value) {
            return Some(entities);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_goals_intent_with_a_proper_name() {
        assert_eq!(
            detect_intent("What are the goals for Isabella Thomas?"),
            "goals_for_student"
        );
    }

    #[test]
    fn falls_through_to_general_rag_query() {
        assert_eq!(detect_intent("what time is it"), "general_rag_query");
    }

    #[test]
    fn strips_honorifics_and_preserves_name_case() {
        assert_eq!(normalise_name("Dr. Jane  Doe "), "Jane Doe");
        assert_eq!(normalise_name("Jane Doe"), "Jane Doe");
    }
}
