//! Typed configuration schema. Every section has working defaults, so a
//! missing or empty config file still yields a runnable setup.

use {
    mnema_core::config::EngineConfig,
    serde::{Deserialize, Serialize},
};

/// Root of `mnema.{toml,yaml,json}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MnemaConfig {
    pub gateway: GatewaySection,
    pub llm: LlmSection,
    pub embedding: EmbeddingSection,
    pub engine: EngineConfig,
}

/// HTTP gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    pub host: String,
    pub port: u16,
    /// Bearer token required on every API call. The `MNEMA_TOKEN` env var
    /// takes precedence over this field.
    pub token: Option<String>,
    /// Owner id all capture and recall is scoped to.
    pub owner_id: String,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 7700, token: None, owner_id: "local".into() }
    }
}

/// Chat completion backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// API key. The `OPENAI_API_KEY` env var is used when unset; a
    /// `${OPENAI_API_KEY}` placeholder also works.
    pub api_key: Option<String>,
    /// Override for OpenAI-compatible endpoints.
    pub base_url: Option<String>,
    pub model: String,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self { api_key: None, base_url: None, model: "gpt-4o-mini".into() }
    }
}

/// Embedding backend. Capture and recall share this model; changing it
/// invalidates stored vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSection {
    /// Falls back to the llm section's key, then `OPENAI_API_KEY`.
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub dimensions: usize,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: "text-embedding-3-small".into(),
            dimensions: 1536,
        }
    }
}
