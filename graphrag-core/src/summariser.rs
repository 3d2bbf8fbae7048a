//! Summariser (C10): asks the LLM for a structured summary with citations,
//! then verifies every citation against the chunks actually shown to it.
//! An unverified citation is never fatal — the answer still returns, marked
//! `verification.status = failed` (§4.10 step 3, §7).

use std::collections::BTreeSet;

use regex::Regex;

use crate::generator::normalise_fields;
use crate::model::{ResultRow, RetrievedChunk, Verification, VerificationStatus};
use crate::providers::llm::JsonCompletionRequest;
use crate::providers::LlmProvider;
use crate::{Error, Result};

#[derive(Debug, serde::Deserialize)]
struct RawSummary {
    summary: String,
    #[serde(default)]
    citations: Vec<String>,
}

/// The summariser's output: prose, the citations the LLM declared, and the
/// verification result.
#[derive(Debug, Clone)]
pub struct SummaryOutput {
    pub summary: String,
    pub citations: Vec<String>,
    pub verification: Verification,
}

/// Build the prompt, call the LLM (temperature may be nonzero, unlike the
/// generator's temperature-0 call), and verify citations. Retries up to 3
/// total attempts on structural failure, the same field-normalisation
/// policy as the generator (C6).
pub async fn summarise(
    question: &str,
    rows: &[ResultRow],
    chunks: &[RetrievedChunk],
    llm: &dyn LlmProvider,
) -> Result<SummaryOutput> {
    let prompt = build_prompt(question, rows, chunks);
    let mut violation_diff = String::new();
    let mut last_error = String::new();

    for _attempt in 0..3 {
        let request = JsonCompletionRequest::new(
            format!("{prompt}{violation_diff}"),
            "{summary: string, citations: [string]}",
        )
        .with_temperature(0.3);

        let raw = match llm.complete_json(&request).await {
            Ok(value) => value,
            Err(e) => {
                last_error = e.to_string();
                violation_diff = format!("\nPrevious attempt errored: {last_error}");
                continue;
            }
        };

        let normalised = normalise_fields(raw);
        match serde_json::from_value::<RawSummary>(normalised) {
            Ok(parsed) => {
                let verification = verify_citations(&parsed.summary, &parsed.citations, chunks);
                return Ok(SummaryOutput {
                    summary: parsed.summary,
                    citations: parsed.citations,
                    verification,
                });
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

fn build_prompt(question: &str, rows: &[ResultRow], chunks: &[RetrievedChunk]) -> String {
    let mut table = String::new();
    for row in rows {
        table.push_str(&format!("{:?}\n", row.values));
    }
    let mut chunk_list = String::new();
    for chunk in chunks {
        chunk_list.push_str(&format!("[{}] {}\n", chunk.chunk_id, chunk.text));
    }
    format!(
        "Question: {question}\nRows:\n{table}\nChunks:\n{chunk_list}\n\
         Respond with a JSON object with exactly two keys: summary, citations."
    )
}

/// Extract every `[chunk_id]` token from `summary` plus the declared
/// `citations` list; any id not present in `chunks` is unknown. The summary
/// is still returned regardless of verification outcome.
fn verify_citations(
    summary: &str,
    citations: &[String],
    chunks: &[RetrievedChunk],
) -> Verification {
    let known: BTreeSet<&str> = chunks.iter().map(|c| c.chunk_id.as_str()).collect();
    let token_re = Regex::new(r"\[([^\]]+)\]").expect("static regex");

    let mut referenced: BTreeSet<String> = citations.iter().cloned().collect();
    for cap in token_re.captures_iter(summary) {
        referenced.insert(cap[1].to_string());
    }

    let unknown: Vec<String> = referenced
        .into_iter()
        .filter(|id| !known.contains(id.as_str()))
        .collect();

    if unknown.is_empty() {
        Verification {
            status: VerificationStatus::Ok,
            unknown_citations: Vec::new(),
        }
    } else {
        Verification {
            status: VerificationStatus::Failed,
            unknown_citations: unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str) -> RetrievedChunk {
        RetrievedChunk {
            chunk_id: id.to_string(),
            text: "text".to_string(),
            source_doc_id: "doc".to_string(),
            similarity: 0.9,
        }
    }

    #[test]
    fn verification_passes_when_all_citations_are_known() {
        let chunks = vec![chunk("chunk_1"), chunk("chunk_2")];
        let verification = verify_citations(
            "Isabella has a math goal [chunk_1].",
            &["chunk_1".to_string()],
            &chunks,
        );
        assert_eq!(verification.status, VerificationStatus::Ok);
        assert!(verification.unknown_citations.is_empty());
    }

    #[test]
    fn verification_fails_on_unknown_citation_but_does_not_panic() {
        let chunks = vec![chunk("chunk_1"), chunk("chunk_2")];
        let verification = verify_citations(
            "Isabella has a math goal [chunk_999].",
            &[],
            &chunks,
        );
        assert_eq!(verification.status, VerificationStatus::Failed);
        assert_eq!(verification.unknown_citations, vec!["chunk_999".to_string()]);
    }
}
