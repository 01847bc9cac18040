//! Retry with exponential backoff and jitter.

use std::future::Future;
use std::time::Duration;

use crate::error::ScouterError;

/// Retry policy configuration.
///
/// The wait before retry `k` (0-based) is `min(base_delay * 2^k, max_delay)`
/// plus a random jitter in `[0, max_jitter)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for the exponential part of the delay.
    pub max_delay: Duration,
    /// Upper bound for the random jitter added to every delay.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            max_jitter: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Policy with the given attempt budget and default delays.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Policy that never waits between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    /// Deterministic part of the delay before retry `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2f64.powi(attempt.min(30) as i32);
        let secs = (self.base_delay.as_secs_f64() * factor).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.backoff(attempt) + self.max_jitter.mul_f64(rand_factor())
    }

    /// Wait before the retry following `error`. A provider-supplied
    /// `Retry-After` is a floor.
    fn delay_after(&self, attempt: u32, error: &ScouterError) -> Duration {
        let delay = self.delay(attempt);
        match error {
            ScouterError::RateLimited {
                retry_after_ms: Some(ms),
            } => delay.max(Duration::from_millis(*ms)),
            _ => delay,
        }
    }

    /// Execute an async operation with retry.
    ///
    /// Non-retryable errors are returned as-is on the first failure. When the
    /// attempt budget runs out the last error is wrapped in
    /// [`ScouterError::MaxRetriesExceeded`].
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, ScouterError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ScouterError>>,
    {
        if self.max_attempts == 0 {
            return Err(ScouterError::Configuration(
                "retry policy must allow at least one attempt".into(),
            ));
        }

        let mut attempt = 0;
        loop {
            let e = match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(attempt = attempt + 1, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            if attempt + 1 >= self.max_attempts {
                tracing::error!(
                    max_attempts = self.max_attempts,
                    error = %e,
                    "All retry attempts failed"
                );
                return Err(ScouterError::MaxRetriesExceeded {
                    attempts: self.max_attempts,
                    source: Box::new(e),
                });
            }

            let sleep_duration = self.delay_after(attempt, &e);
            tracing::warn!(
                attempt = attempt + 1,
                max_attempts = self.max_attempts,
                delay_ms = sleep_duration.as_millis() as u64,
                error = %e,
                "Retrying after error"
            );
            tokio::time::sleep(sleep_duration).await;
            attempt += 1;
        }
    }
}

/// Simple pseudo-random factor [0, 1) without pulling in rand crate.
fn rand_factor() -> f64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
        .hash(&mut hasher);
    std::thread::current().id().hash(&mut hasher);

    let hash = hasher.finish();
    (hash % 10000) as f64 / 10000.0
}
