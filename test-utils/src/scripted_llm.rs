//! A scripted [`LlmProvider`] that returns queued responses in order.
//! Grounded on the dashflow `FakeLLM` pattern: push expected responses in
//! before the test runs, then let the code under test drain them.

use async_trait::async_trait;
use graphrag_core::providers::llm::JsonCompletionRequest;
use graphrag_core::providers::LlmProvider;
use graphrag_core::{Error, Result};
use parking_lot::Mutex;
use serde_json::Value;

/// One queued outcome: either a JSON value to return, or an error to
/// surface, letting tests exercise retry paths (generator/summariser both
/// retry up to three times on structured failure).
pub enum Scripted {
    Value(Value),
    Error(Error),
}

pub struct ScriptedLlmProvider {
    name: String,
    responses: Mutex<std::collections::VecDeque<Scripted>>,
}

impl ScriptedLlmProvider {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Mutex::new(std::collections::VecDeque::new()),
        }
    }

    #[must_use]
    pub fn with_response(self, value: Value) -> Self {
        self.responses.lock().push_back(Scripted::Value(value));
        self
    }

    #[must_use]
    pub fn with_error(self, error: Error) -> Self {
        self.responses.lock().push_back(Scripted::Error(error));
        self
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlmProvider {
    async fn complete_json(&self, _request: &JsonCompletionRequest) -> Result<Value> {
        let next = self.responses.lock().pop_front();
        match next {
            Some(Scripted::Value(value)) => Ok(value),
            Some(Scripted::Error(error)) => Err(error),
            None => Err(Error::LlmStructuredFailure(
                "scripted provider ran out of queued responses".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
