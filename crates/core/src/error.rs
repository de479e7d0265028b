//! Error taxonomy for the capture and recall pipelines.

/// Failures surfaced by the engine. The gateway maps these onto HTTP
/// statuses: `NotFound` to 404, `Validation` to 400, everything else to 500.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("memory {0} not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("chat completion failed: {0:#}")]
    Chat(anyhow::Error),

    #[error("embedding request failed: {0:#}")]
    Embedding(anyhow::Error),

    /// The model answered, but not in the shape the stage demands.
    #[error("{stage} returned a malformed response: {detail}")]
    MalformedResponse { stage: &'static str, detail: String },

    #[error("{stage} timed out after {timeout_ms}ms")]
    Timeout { stage: &'static str, timeout_ms: u64 },

    #[error("store operation failed: {0:#}")]
    Store(anyhow::Error),
}

impl EngineError {
    /// Whether a retry has a chance of succeeding. Malformed responses and
    /// validation failures are deterministic and never retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Chat(e) | Self::Embedding(e) => is_transient_message(&format!("{e:#}")),
            _ => false,
        }
    }
}

/// Upstream failures worth retrying, matched on the provider's error text.
fn is_transient_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    const MARKERS: &[&str] = &[
        "429",
        "rate limit",
        "500",
        "502",
        "503",
        "504",
        "server error",
        "bad gateway",
        "service unavailable",
        "gateway timeout",
        "timed out",
        "connection reset",
        "connection refused",
    ];
    MARKERS.iter().any(|marker| lower.contains(marker))
}
