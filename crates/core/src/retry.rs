//! Bounded retry with jittered exponential backoff for upstream calls.

use {
    crate::error::EngineError,
    rand::Rng,
    serde::{Deserialize, Serialize},
    std::{future::Future, time::Duration},
    tracing::warn,
};

/// Backoff schedule. Delays grow as `initial * multiplier^attempt`, gain up
/// to 10% jitter, and never exceed `max_delay_ms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt, so `3` means four calls at most.
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay before re-running the call that just failed `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> u64 {
        let base = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let jitter = base * 0.1 * rand::rng().random_range(0.0..1.0);
        ((base + jitter) as u64).min(self.max_delay_ms)
    }
}

/// Run `call` until it succeeds, fails permanently, or exhausts the retry
/// budget. Only errors reporting as transient are retried.
pub async fn retry_transient<T, Fut>(
    config: &RetryConfig,
    op: &'static str,
    mut call: impl FnMut() -> Fut,
) -> Result<T, EngineError>
where
    Fut: Future<Output = Result<T, EngineError>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if !error.is_transient() || attempt >= config.max_retries {
                    return Err(error);
                }
                let delay_ms = config.delay_for(attempt);
                attempt += 1;
                warn!(
                    op,
                    attempt,
                    max_retries = config.max_retries,
                    delay_ms,
                    error = %error,
                    "transient failure, backing off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        std::sync::atomic::{AtomicU32, Ordering},
    };

    #[test]
    fn default_schedule() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_delay_ms, 500);
        assert_eq!(config.max_delay_ms, 30_000);
        assert!((config.backoff_multiplier - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn delay_grows_within_jitter_band() {
        let config = RetryConfig::default();
        let first = config.delay_for(0);
        assert!((500..=550).contains(&first), "first delay was {first}");
        let third = config.delay_for(2);
        assert!((2000..=2200).contains(&third), "third delay was {third}");
    }

    #[test]
    fn delay_is_capped() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for(30), 30_000);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_transient(&RetryConfig::default(), "test-op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(EngineError::Chat(anyhow::anyhow!("HTTP 503 - overloaded")))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failures_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient(&RetryConfig::default(), "test-op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(EngineError::Chat(anyhow::anyhow!("HTTP 401 - bad key"))) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_budget_is_bounded() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig { max_retries: 2, ..RetryConfig::default() };
        let result: Result<(), _> = retry_transient(&config, "test-op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(EngineError::Embedding(anyhow::anyhow!("429 rate limited"))) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
