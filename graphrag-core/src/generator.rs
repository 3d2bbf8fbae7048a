//! Query Generator (C6): template fast-path first, LLM fallback second.
//! Grounded closely on the field-normalisation and markdown-fence-stripping
//! pattern of a Cypher-generation QA chain: the LLM's raw response is
//! coerced toward the expected shape before it is trusted.

use std::collections::BTreeMap;

use regex::Regex;
use serde_json::Value;

use crate::model::{AllowList, CandidateSource, CypherCandidate, QueryPlan, Scalar};
use crate::providers::llm::JsonCompletionRequest;
use crate::providers::LlmProvider;
use crate::{Error, Result};

/// One entry in the template registry: a pre-written, validated Cypher text
/// with named parameters, mapped to a specific intent (§GLOSSARY Template).
///
/// `param_mapping` is the canonical→legacy translation described in §9 Name
/// canonicalisation: the plan's canonical parameter name on the left, the
/// name this template's text actually uses on the right.
pub struct Template {
    pub intent: &'static str,
    pub text: &'static str,
    pub param_mapping: &'static [(&'static str, &'static str)],
}

/// The fixed template registry (§4.6 Template fast-path). The column
/// projection uses `coalesce` over several title-like properties rather
/// than a single explicit alias, per the column-projection policy decided
/// in SPEC_FULL.md §9.
pub const TEMPLATES: &[Template] = &[Template {
    intent: "goals_for_student",
    text: "MATCH (s:Student {fullName: $student})-[:HAS_GOAL]->(g:Goal) \
           RETURN coalesce(g.title, g.name, g.label) AS goal, g.status AS status \
           LIMIT $limit",
    param_mapping: &[("student_name", "student"), ("limit", "limit")],
}];

fn find_template(intent: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.intent == intent)
}

/// Every `$name` occurrence in `text`, in first-seen order, deduplicated.
#[must_use]
pub fn scan_params(text: &str) -> Vec<String> {
    let re = Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").expect("static regex");
    let mut seen = Vec::new();
    for cap in re.captures_iter(text) {
        let name = cap[1].to_string();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// Generate a candidate query for `plan`. Tries the template fast-path
/// first; falls back to the LLM path when no template matches the intent.
pub async fn generate(
    plan: &QueryPlan,
    allow_list: &AllowList,
    llm: &dyn LlmProvider,
) -> Result<CypherCandidate> {
    if let Some(template) = find_template(&plan.intent) {
        return generate_from_template(template, plan);
    }
    generate_from_llm(plan, allow_list, llm).await
}

fn generate_from_template(template: &Template, plan: &QueryPlan) -> Result<CypherCandidate> {
    let required = scan_params(template.text);
    let mut params = BTreeMap::new();
    for template_name in &required {
        let canonical_name = template
            .param_mapping
            .iter()
            .find(|(_, legacy)| legacy == template_name)
            .map(|(canonical, _)| *canonical)
            .unwrap_or(template_name.as_str());
        let value = plan
            .params
            .get(canonical_name)
            .cloned()
            .ok_or_else(|| Error::TemplateParamMissing(template_name.clone()))?;
        params.insert(template_name.clone(), value);
    }
    Ok(CypherCandidate {
        text: template.text.to_string(),
        params,
        source: CandidateSource::Template,
    })
}

/// Rename `query`→`cypher` and `parameters`→`params` if present. Per the
/// SPEC_FULL.md §9 decision, when both the canonical and legacy key are
/// present the canonical key wins and the legacy one is dropped. Idempotent:
/// applying this to an already-canonical object is a no-op (§8).
#[must_use]
pub fn normalise_fields(mut value: Value) -> Value {
    if let Value::Object(map) = &mut value {
        if let Some(query) = map.remove("query") {
            map.entry("cypher").or_insert(query);
        }
        if let Some(parameters) = map.remove("parameters") {
            map.entry("params").or_insert(parameters);
        }
    }
    value
}

#[derive(Debug, serde::Deserialize)]
struct RawCandidate {
    cypher: String,
    #[serde(default)]
    params: BTreeMap<String, Scalar>,
}

async fn generate_from_llm(
    plan: &QueryPlan,
    allow_list: &AllowList,
    llm: &dyn LlmProvider,
) -> Result<CypherCandidate> {
    let hint = allow_list_hint(allow_list);
    let mut violation_diff = String::new();
    let mut last_error = String::new();

    for _attempt in 0..3 {
        let prompt = format!(
            "Question: {}\nPlan intent: {}\nSchema hint: {hint}\n\
             Respond with a JSON object with exactly two keys: cypher, params.{violation_diff}",
            plan.question, plan.intent
        );
        let request = JsonCompletionRequest::new(prompt, "{cypher: string, params: object}")
            .with_temperature(0.0);

        let raw = match llm.complete_json(&request).await {
            Ok(value) => value,
            Err(e) => {
                last_error = e.to_string();
                violation_diff = format!("\nPrevious attempt errored: {last_error}");
                continue;
            }
        };

        let normalised = normalise_fields(raw);
        match serde_json::from_value::<RawCandidate>(normalised) {
            Ok(candidate) => {
                return Ok(CypherCandidate {
                    text: candidate.cypher,
                    params: candidate.params,
                    source: CandidateSource::Llm,
                })
            }
            Err(e) => {
                last_error = e.to_string();
                violation_diff =
                    format!("\nPrevious attempt violated the schema: {last_error}. Fix and retry.");
            }
        }
    }

    Err(Error::LlmStructuredFailure(last_error))
}

fn allow_list_hint(allow_list: &AllowList) -> String {
    format!(
        "labels=[{}] relationships=[{}]",
        allow_list.labels.iter().cloned().collect::<Vec<_>>().join(", "),
        allow_list
            .relationships
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_params_deduplicates_and_preserves_order() {
        let params = scan_params("MATCH (n {a: $x, b: $y, c: $x}) RETURN n LIMIT $limit");
        assert_eq!(params, vec!["x", "y", "limit"]);
    }

    #[test]
    fn normalise_fields_renames_legacy_keys() {
        let input = serde_json::json!({"query": "MATCH (n) RETURN n", "parameters": {"a": 1}});
        let normalised = normalise_fields(input);
        assert_eq!(normalised["cypher"], "MATCH (n) RETURN n");
        assert_eq!(normalised["params"]["a"], 1);
        assert!(normalised.get("query").is_none());
        assert!(normalised.get("parameters").is_none());
    }

    #[test]
    fn normalise_fields_is_a_no_op_on_canonical_input() {
        let input = serde_json::json!({"cypher": "MATCH (n) RETURN n", "params": {}});
        assert_eq!(normalise_fields(input.clone()), input);
    }

    #[test]
    fn normalise_fields_prefers_canonical_when_both_present() {
        let input = serde_json::json!({
            "cypher": "canonical",
            "query": "legacy",
            "params": {},
            "parameters": {"dropped": true},
        });
        let normalised = normalise_fields(input);
        assert_eq!(normalised["cypher"], "canonical");
        assert_eq!(normalised["params"], serde_json::json!({}));
    }

    #[test]
    fn normalising_twice_is_idempotent() {
        let input = serde_json::json!({"query": "MATCH (n) RETURN n", "parameters": {}});
        let once = normalise_fields(input);
        let twice = normalise_fields(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn template_fast_path_maps_canonical_to_legacy_param_names() {
        let mut plan = QueryPlan::fallback("q");
        plan.intent = "goals_for_student".to_string();
        plan.params.insert("student_name".to_string(), Scalar::from("Isabella Thomas"));
        plan.params.insert("limit".to_string(), Scalar::Int(20));
        let template = find_template("goals_for_student").expect("template exists");
        let candidate = generate_from_template(template, &plan).expect("generate");
        assert_eq!(candidate.params.get("student"), Some(&Scalar::from("Isabella Thomas")));
        assert_eq!(candidate.source, CandidateSource::Template);
    }

    #[test]
    fn template_fast_path_errors_on_missing_required_param() {
        let plan = QueryPlan::fallback("q");
        let template = find_template("goals_for_student").expect("template exists");
        let err = generate_from_template(template, &{
            let mut p = plan;
            p.intent = "goals_for_student".to_string();
            p
        })
        .unwrap_err();
        assert!(matches!(err, Error::TemplateParamMissing(_)));
    }
}
