//! Guardrail (C3): a pure, no-I/O heuristic check run before anything else
//! touches the question. Fails open on internal error — a guardrail bug must
//! never become a denial-of-service against legitimate questions, but a
//! successful match always blocks.

use regex::Regex;

/// Mutation keywords that indicate an attempt to write to the graph. Shared
/// with the validator (C7), which rejects the same set outside string
/// literals (§4.7 Write-ban).
pub const MUTATION_KEYWORDS: &[&str] = &[
    "CREATE", "MERGE", "DELETE", "SET", "REMOVE", "DROP", "DETACH",
];

const MAX_QUESTION_LEN: usize = 2000;

/// The guardrail's verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Block(String),
}

/// Run the heuristic check over a raw question string.
#[must_use]
pub fn check(question: &str) -> Verdict {
    let sanitised = sanitise(question);

    if sanitised.len() > MAX_QUESTION_LEN {
        return Verdict::Block("question exceeds maximum length".to_string());
    }

    let upper = sanitised.to_uppercase();
    let mutation_hits = MUTATION_KEYWORDS
        .iter()
        .filter(|kw| contains_whole_word(&upper, kw))
        .count();
    if mutation_hits >= 1 {
        return Verdict::Block(format!(
            "question contains graph mutation keyword(s) ({mutation_hits} match(es))"
        ));
    }

    if contains_whole_word(&upper, "DROP TABLE")
        || sanitised.contains("';")
        || sanitised.contains("--")
        || upper.contains("UNION SELECT")
    {
        return Verdict::Block("question contains an injection marker".to_string());
    }

    if sanitised.contains("```") {
        return Verdict::Block("question contains a code-fenced execution marker".to_string());
    }

    Verdict::Allow
}

/// Strip control characters, collapse runs of whitespace, and trim.
fn sanitise(question: &str) -> String {
    let stripped: String = question.chars().filter(|c| !c.is_control()).collect();
    let collapsed = Regex::new(r"\s+")
        .expect("static regex")
        .replace_all(&stripped, " ")
        .to_string();
    collapsed.trim().to_string()
}

fn contains_whole_word(haystack: &str, word: &str) -> bool {
    let pattern = format!(r"\b{}\b", regex::escape(word));
    Regex::new(&pattern)
        .map(|re| re.is_match(haystack))
        .unwrap_or(false)
}
