//! Chat-completion abstraction used by the enhancement, summary and
//! temporal-parsing stages.

use {
    crate::error::EngineError,
    async_trait::async_trait,
    std::time::Duration,
};

/// One chat completion call. Stages fill in their own prompts and sampling.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Ask the provider for a JSON object rather than prose.
    pub json_response: bool,
}

/// A chat completion backend. Implementations are injected into the
/// pipelines so tests can script responses.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name for logs, e.g. "openai".
    fn name(&self) -> &str;

    /// Run one completion and return the assistant text.
    async fn complete(&self, request: &ChatRequest) -> anyhow::Result<String>;
}

/// Run a completion under a deadline, mapping failures onto the engine
/// taxonomy with `stage` as the label.
pub async fn complete_with_timeout(
    provider: &dyn LlmProvider,
    request: &ChatRequest,
    stage: &'static str,
    timeout_ms: u64,
) -> Result<String, EngineError> {
    match tokio::time::timeout(Duration::from_millis(timeout_ms), provider.complete(request)).await
    {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(error)) => Err(EngineError::Chat(error)),
        Err(_) => Err(EngineError::Timeout { stage, timeout_ms }),
    }
}
