use async_trait::async_trait;
use serde_json::Value;

use crate::Result;

/// One call to the LLM provider's structured-completion endpoint (§6).
/// Narrower than a general chat/completion surface: every call in this
/// pipeline wants a single JSON object back, validated against a schema the
/// caller already knows.
#[derive(Debug, Clone)]
pub struct JsonCompletionRequest {
    pub prompt: String,
    /// A human-readable description of the expected JSON shape, included in
    /// the prompt and used for provider-side JSON-mode constraints where
    /// supported.
    pub schema_description: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub json_mode: bool,
}

impl JsonCompletionRequest {
    #[must_use]
    pub fn new(prompt: impl Into<String>, schema_description: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            schema_description: schema_description.into(),
            max_output_tokens: 1024,
            temperature: 0.0,
            json_mode: true,
        }
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// A provider capable of turning a prompt into a JSON object (§6 LLM
/// provider). Scoped down from a general chat/tool-call surface to exactly
/// what this pipeline's three LLM boundaries need: entity extraction (C4),
/// query generation (C6), and summarisation (C10).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Issue one structured-completion call. Returns the raw parsed JSON
    /// value; field-name normalisation and schema validation are the
    /// caller's responsibility (C6/C10 apply it identically, see
    /// `generator::normalise_fields`).
    async fn complete_json(&self, request: &JsonCompletionRequest) -> Result<Value>;

    /// A short name for observability (`llm_calls_total{kind}` in §6 uses
    /// the caller's stage name, not this — this is the provider/model name).
    fn name(&self) -> &str;
}
