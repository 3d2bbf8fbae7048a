//! Query Validator (C7): the defensive gate between a generated candidate
//! and execution. Six fail-fast checks, each with its own closed reason
//! code; none of them do I/O.

use regex::Regex;

use crate::guardrail::MUTATION_KEYWORDS;
use crate::model::{AllowList, CypherCandidate, Scalar};
use crate::{Error, Policy, Result};

/// Strip `//` line comments before keyword matching (§4.7 check 1).
fn strip_comments(text: &str) -> String {
    text.lines()
        .map(|line| line.split("//").next().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n")
}

fn check_write_ban(text: &str) -> Result<()> {
    let stripped = strip_comments(text);
    let upper = stripped.to_uppercase();
    for keyword in MUTATION_KEYWORDS {
        let pattern = format!(r"\b{keyword}\b");
        if Regex::new(&pattern).expect("static regex").is_match(&upper) {
            return Err(Error::ValidationWriteBanned((*keyword).to_string()));
        }
    }
    Ok(())
}

/// Any quoted string literal in the text is an unparameterised value — every
/// value position must be a `$name` instead (§4.7 check 2).
fn check_parameterisation(text: &str) -> Result<()> {
    let re = Regex::new(r#"'[^']*'|"[^"]*""#).expect("static regex");
    if re.is_match(text) {
        return Err(Error::ValidationUnparameterised);
    }
    Ok(())
}

fn check_allow_list(text: &str, allow_list: &AllowList) -> Result<()> {
    let label_re = Regex::new(r"[(]\s*\w*:([A-Za-z_][A-Za-z0-9_]*)").expect("static regex");
    for cap in label_re.captures_iter(text) {
        let label = &cap[1];
        if !allow_list.has_label(label) {
            return Err(Error::ValidationUnknownLabel(label.to_string()));
        }
    }

    let rel_re = Regex::new(r"\[\s*\w*:([A-Za-z_][A-Za-z0-9_]*)").expect("static regex");
    for cap in rel_re.captures_iter(text) {
        let rel = &cap[1];
        if !allow_list.has_relationship(rel) {
            return Err(Error::ValidationUnknownRel(rel.to_string()));
        }
    }
    Ok(())
}

fn check_traversal_depth(text: &str, policy: &Policy) -> Result<()> {
    let unbound = Regex::new(r"\*\s*\]").expect("static regex");
    let bounded = Regex::new(r"\*\s*\d*\s*\.\.\s*(\d+)").expect("static regex");

    let mut any_quantifier = false;
    for cap in bounded.captures_iter(text) {
        any_quantifier = true;
        let upper: usize = cap[1].parse().unwrap_or(usize::MAX);
        if upper > policy.max_traversal_depth {
            return Err(Error::ValidationDepthExceeded(format!(
                "upper bound {upper} exceeds cap {}",
                policy.max_traversal_depth
            )));
        }
    }
    if !any_quantifier && unbound.is_match(text) {
        return Err(Error::ValidationDepthExceeded(
            "unbounded '*' quantifier".to_string(),
        ));
    }
    Ok(())
}

/// Ensure a `LIMIT` clause is present and within the cap, auto-injecting
/// `LIMIT $limit` when absent (§4.7 check 5). Returns the (possibly
/// modified) candidate text and params.
fn enforce_result_cap(
    mut candidate: CypherCandidate,
    policy: &Policy,
) -> Result<CypherCandidate> {
    let limit_param_re = Regex::new(r"LIMIT\s+\$(\w+)").expect("static regex");
    let limit_literal_re = Regex::new(r"LIMIT\s+(\d+)").expect("static regex");

    if let Some(cap) = limit_literal_re.captures(&candidate.text) {
        let literal: usize = cap[1].parse().unwrap_or(usize::MAX);
        if literal > policy.max_cypher_results {
            return Err(Error::ValidationLimitMissing);
        }
        return Ok(candidate);
    }

    if limit_param_re.is_match(&candidate.text) {
        return Ok(candidate);
    }

    candidate.text = format!("{} LIMIT $limit", candidate.text.trim_end());
    candidate
        .params
        .insert("limit".to_string(), Scalar::Int(policy.max_cypher_results as i64));
    Ok(candidate)
}

fn check_param_coverage(candidate: &CypherCandidate) -> Result<()> {
    for name in crate::generator::scan_params(&candidate.text) {
        if !candidate.params.contains_key(&name) {
            return Err(Error::ValidationParamUnbound(name));
        }
    }
    Ok(())
}

/// Run all six checks, in order, fail-fast. Returns the accepted (possibly
/// limit-injected) candidate or the first violation's reason.
pub fn validate(
    candidate: CypherCandidate,
    allow_list: &AllowList,
    policy: &Policy,
) -> Result<CypherCandidate> {
    check_write_ban(&candidate.text)?;
    check_parameterisation(&candidate.text)?;
    check_allow_list(&candidate.text, allow_list)?;
    check_traversal_depth(&candidate.text, policy)?;
    let candidate = enforce_result_cap(candidate, policy)?;
    check_param_coverage(&candidate)?;
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CandidateSource;

    fn allow_list() -> AllowList {
        let mut a = AllowList::default();
        a.labels.insert("Student".to_string());
        a.labels.insert("Goal".to_string());
        a.relationships.insert("HAS_GOAL".to_string());
        a
    }

    fn candidate(text: &str, params: &[(&str, Scalar)]) -> CypherCandidate {
        CypherCandidate {
            text: text.to_string(),
            params: params.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            source: CandidateSource::Llm,
        }
    }

    #[test]
    fn accepts_a_well_formed_template_candidate() {
        let cand = candidate(
            "MATCH (s:Student {fullName: $student})-[:HAS_GOAL]->(g:Goal) RETURN g LIMIT $limit",
            &[("student", Scalar::from("Isabella Thomas")), ("limit", Scalar::Int(20))],
        );
        assert!(validate(cand, &allow_list(), &Policy::default()).is_ok());
    }

    #[test]
    fn rejects_mutation_keyword() {
        let cand = candidate("MATCH (s:Student) DETACH DELETE s", &[]);
        let err = validate(cand, &allow_list(), &Policy::default()).unwrap_err();
        assert!(matches!(err, Error::ValidationWriteBanned(_)));
    }

    #[test]
    fn rejects_unparameterised_string_literal() {
        let cand = candidate(
            "MATCH (s:Student {fullName: 'John'}) RETURN s LIMIT 10",
            &[],
        );
        let err = validate(cand, &allow_list(), &Policy::default()).unwrap_err();
        assert!(matches!(err, Error::ValidationUnparameterised));
    }

    #[test]
    fn rejects_unknown_label() {
        let cand = candidate("MATCH (t:Teacher) RETURN t LIMIT 10", &[]);
        let err = validate(cand, &allow_list(), &Policy::default()).unwrap_err();
        assert!(matches!(err, Error::ValidationUnknownLabel(_)));
    }

    #[test]
    fn rejects_unknown_relationship() {
        let cand = candidate(
            "MATCH (s:Student)-[:TEACHES]->(g:Goal) RETURN g LIMIT 10",
            &[],
        );
        let err = validate(cand, &allow_list(), &Policy::default()).unwrap_err();
        assert!(matches!(err, Error::ValidationUnknownRel(_)));
    }

    #[test]
    fn accepts_bounded_traversal_at_the_cap() {
        let cand = candidate(
            "MATCH (s:Student)-[:HAS_GOAL*1..2]->(g:Goal) RETURN g LIMIT 10",
            &[],
        );
        assert!(validate(cand, &allow_list(), &Policy::default()).is_ok());
    }

    #[test]
    fn rejects_traversal_beyond_the_cap() {
        let cand = candidate(
            "MATCH (s:Student)-[:HAS_GOAL*1..3]->(g:Goal) RETURN g LIMIT 10",
            &[],
        );
        let err = validate(cand, &allow_list(), &Policy::default()).unwrap_err();
        assert!(matches!(err, Error::ValidationDepthExceeded(_)));
    }

    #[test]
    fn rejects_unbounded_star() {
        let cand = candidate(
            "MATCH (s:Student)-[:HAS_GOAL*]->(g:Goal) RETURN g LIMIT 10",
            &[],
        );
        let err = validate(cand, &allow_list(), &Policy::default()).unwrap_err();
        assert!(matches!(err, Error::ValidationDepthExceeded(_)));
    }

    #[test]
    fn auto_injects_limit_when_missing() {
        let cand = candidate("MATCH (s:Student) RETURN s", &[]);
        let accepted = validate(cand, &allow_list(), &Policy::default()).expect("accepted");
        assert!(accepted.text.contains("LIMIT $limit"));
        assert_eq!(accepted.params.get("limit"), Some(&Scalar::Int(25)));
    }

    #[test]
    fn rejects_limit_literal_above_the_cap() {
        let cand = candidate("MATCH (s:Student) RETURN s LIMIT 1000", &[]);
        let err = validate(cand, &allow_list(), &Policy::default()).unwrap_err();
        assert!(matches!(err, Error::ValidationLimitMissing));
    }

    #[test]
    fn rejects_unbound_parameter_reference() {
        let cand = candidate("MATCH (s:Student {fullName: $name}) RETURN s LIMIT 10", &[]);
        let err = validate(cand, &allow_list(), &Policy::default()).unwrap_err();
        assert!(matches!(err, Error::ValidationParamUnbound(name) if name == "name"));
    }
}
