use {
    crate::retry::RetryConfig,
    serde::{Deserialize, Serialize},
};

/// Tuning knobs for the capture and recall pipelines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Results at or below this cosine similarity are discarded.
    pub similarity_threshold: f32,
    /// Result count when a recall request does not name a limit.
    pub default_limit: usize,
    /// How many recent memories to score when no date filter applies.
    pub recency_window: usize,
    /// Days added on each side of a parsed date range to absorb timezone
    /// drift around midnight.
    pub date_slack_days: i64,
    /// Deadline for a single chat completion call.
    pub chat_timeout_ms: u64,
    /// Deadline for a single embedding call.
    pub embed_timeout_ms: u64,
    /// Buffered capacity of the background ingest queue.
    pub queue_capacity: usize,
    /// Worker tasks draining the ingest queue.
    pub workers: usize,
    /// Backoff schedule for transient upstream failures during capture.
    /// Kept last so the TOML rendering stays valid.
    pub retry: RetryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.3,
            default_limit: 20,
            recency_window: 500,
            date_slack_days: 1,
            chat_timeout_ms: 30_000,
            embed_timeout_ms: 15_000,
            queue_capacity: 128,
            workers: 2,
            retry: RetryConfig::default(),
        }
    }
}
