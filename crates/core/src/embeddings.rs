//! Embedding abstraction shared by capture and recall.

use {
    crate::error::EngineError,
    async_trait::async_trait,
    std::time::Duration,
};

/// Turns text into a dense vector. Capture and recall must use the same
/// implementation or similarities are meaningless.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    /// Model identifier, e.g. "text-embedding-3-small".
    fn model_name(&self) -> &str;

    /// Output dimensionality of the model.
    fn dimensions(&self) -> usize;
}

/// Embed under a deadline, mapping failures onto the engine taxonomy.
pub async fn embed_with_timeout(
    provider: &dyn EmbeddingProvider,
    text: &str,
    timeout_ms: u64,
) -> Result<Vec<f32>, EngineError> {
    match tokio::time::timeout(Duration::from_millis(timeout_ms), provider.embed(text)).await {
        Ok(Ok(vector)) => Ok(vector),
        Ok(Err(error)) => Err(EngineError::Embedding(error)),
        Err(_) => Err(EngineError::Timeout { stage: "embedding", timeout_ms }),
    }
}
