//! OpenAI embedding backend.

use {
    crate::embeddings::EmbeddingProvider,
    anyhow::anyhow,
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

const API_BASE: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "text-embedding-3-small";
const DEFAULT_DIMENSIONS: usize = 1536;

/// Embedding client for the OpenAI API (or any compatible endpoint).
#[derive(Clone)]
pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    api_key: Secret<String>,
    base_url: String,
    model: String,
    dims: usize,
}

impl std::fmt::Debug for OpenAiEmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbeddingProvider")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dims", &self.dims)
            .finish()
    }
}

impl OpenAiEmbeddingProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: Secret::new(api_key),
            base_url: API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            dims: DEFAULT_DIMENSIONS,
        }
    }

    /// Use a different model. `dims` must match what the model emits; a
    /// response with any other length is rejected.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>, dims: usize) -> Self {
        self.model = model.into();
        self.dims = dims;
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let body = EmbeddingRequest { model: self.model.clone(), input: text.to_string() };

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("OpenAI embedding request failed: {status} - {detail}"));
        }

        let parsed: EmbeddingResponse = response.json().await?;
        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|entry| entry.embedding)
            .ok_or_else(|| anyhow!("empty embedding response"))?;

        if vector.len() != self.dims {
            return Err(anyhow!(
                "embedding dimension mismatch: expected {}, got {}",
                self.dims,
                vector.len()
            ));
        }
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

// ── API Types ────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata() {
        let provider = OpenAiEmbeddingProvider::new("sk-test".into());
        assert_eq!(provider.model_name(), DEFAULT_MODEL);
        assert_eq!(provider.dimensions(), DEFAULT_DIMENSIONS);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let provider = OpenAiEmbeddingProvider::new("sk-secret".into());
        let debug = format!("{provider:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-secret"));
    }

    #[tokio::test]
    async fn test_embed_parses_vector() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": [{"embedding": [0.1, 0.2, 0.3]}]}"#)
            .create_async()
            .await;

        let provider = OpenAiEmbeddingProvider::new("sk-test".into())
            .with_model("test-model", 3)
            .with_base_url(server.url());
        let vector = provider.embed("hello").await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": [{"embedding": [0.1, 0.2]}]}"#)
            .create_async()
            .await;

        let provider = OpenAiEmbeddingProvider::new("sk-test".into())
            .with_model("test-model", 3)
            .with_base_url(server.url());
        let error = provider.embed("hello").await.unwrap_err();
        assert!(error.to_string().contains("dimension mismatch"));
    }

    #[tokio::test]
    async fn test_error_status_surfaces_code_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/embeddings")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let provider =
            OpenAiEmbeddingProvider::new("sk-test".into()).with_base_url(server.url());
        let error = provider.embed("hello").await.unwrap_err();
        let message = error.to_string();
        assert!(message.contains("500"), "message was: {message}");
    }
}
