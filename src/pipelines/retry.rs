use std::future::Future;
use std::time::Duration;

use crate::config::{BackoffStrategy, RetryConfig};
use crate::error::UpstreamError;

/// Closed classification of a generator failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Quota / too-many-requests / overloaded. Retry after backing off.
    RateLimited,
    /// The call succeeded but produced no text. Retry after backing off.
    Empty,
    /// Anything else. Not retried.
    Other,
}

impl FailureKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::RateLimited | FailureKind::Empty)
    }
}

const RATE_LIMIT_MARKERS: &[&str] = &[
    "too many requests",
    "quota",
    "429",
    "503",
    "rate limit",
    "resource exhausted",
    "resource_exhausted",
];

/// Classify an upstream failure by status code, then by message markers
pub fn classify(err: &UpstreamError) -> FailureKind {
    if matches!(err.status, Some(429) | Some(503)) {
        return FailureKind::RateLimited;
    }
    let msg = err.message.to_lowercase();
    if RATE_LIMIT_MARKERS.iter().any(|marker| msg.contains(marker)) {
        FailureKind::RateLimited
    } else {
        FailureKind::Other
    }
}

/// Delay calculator between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base_delay_ms: u64,
    max_delay_ms: u64,
    strategy: BackoffStrategy,
}

impl Backoff {
    pub fn new(base_delay_ms: u64, max_delay_ms: u64, strategy: BackoffStrategy) -> Self {
        Backoff {
            base_delay_ms,
            max_delay_ms,
            strategy,
        }
    }

    /// Delay after the given failed attempt (1-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let attempt = attempt.max(1);
        let delay = match self.strategy {
            BackoffStrategy::Linear => self.base_delay_ms.saturating_mul(attempt as u64),
            BackoffStrategy::Exponential => {
                let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
                self.base_delay_ms.saturating_mul(factor)
            }
        };
        delay.min(self.max_delay_ms)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(2000, 30_000, BackoffStrategy::Linear)
    }
}

/// Bounded attempt count plus the backoff between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Backoff::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy::new(
            config.max_attempts,
            Backoff::new(config.base_delay_ms, config.max_delay_ms, config.strategy),
        )
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the policy's
/// attempts are used up. `op` receives the 1-indexed attempt number. The
/// last error is returned on failure.
///
/// The backoff sleep only suspends the calling task; dropping the returned
/// future cancels both the sleep and any in-flight attempt.
pub async fn with_retry<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    is_retryable: R,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt = attempt, "Call succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if is_retryable(&e) && attempt < policy.max_attempts => {
                let delay_ms = policy.backoff.delay_for_attempt(attempt);
                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay_ms,
                    "Call failed, retrying with backoff"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    attempt = attempt,
                    retryable = is_retryable(&e),
                    "Call failed, giving up"
                );
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_classify_by_status() {
        assert_eq!(classify(&UpstreamError::new("x").with_status(429)), FailureKind::RateLimited);
        assert_eq!(classify(&UpstreamError::new("x").with_status(503)), FailureKind::RateLimited);
        assert_eq!(classify(&UpstreamError::new("x").with_status(400)), FailureKind::Other);
    }

    #[test]
    fn test_classify_by_message() {
        assert_eq!(classify(&UpstreamError::new("You exceeded your current quota")), FailureKind::RateLimited);
        assert_eq!(classify(&UpstreamError::new("Too Many Requests")), FailureKind::RateLimited);
        assert_eq!(classify(&UpstreamError::new("got HTTP 503 from upstream")), FailureKind::RateLimited);
        assert_eq!(classify(&UpstreamError::new("RESOURCE_EXHAUSTED")), FailureKind::RateLimited);
        assert_eq!(classify(&UpstreamError::new("API key not valid")), FailureKind::Other);
        assert!(!FailureKind::Other.is_retryable());
        assert!(FailureKind::Empty.is_retryable());
    }

    #[test]
    fn test_linear_backoff() {
        let backoff = Backoff::new(2000, 30_000, BackoffStrategy::Linear);
        assert_eq!(backoff.delay_for_attempt(1), 2000);
        assert_eq!(backoff.delay_for_attempt(2), 4000);
        assert_eq!(backoff.delay_for_attempt(3), 6000);
        assert_eq!(backoff.delay_for_attempt(100), 30_000);
    }

    #[test]
    fn test_exponential_backoff() {
        let backoff = Backoff::new(100, 5000, BackoffStrategy::Exponential);
        assert_eq!(backoff.delay_for_attempt(1), 100);
        assert_eq!(backoff.delay_for_attempt(2), 200);
        assert_eq!(backoff.delay_for_attempt(3), 400);
        assert_eq!(backoff.delay_for_attempt(4), 800);
        assert_eq!(backoff.delay_for_attempt(80), 5000);
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::from(&RetryConfig::default());
        assert_eq!(policy, RetryPolicy::default());
        assert_eq!(RetryPolicy::new(0, Backoff::default()).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_stops_on_non_retryable() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = with_retry(
            &RetryPolicy::default(),
            |e: &String| e == "retry",
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("fatal".to_string()) }
            },
        )
        .await;
        assert_eq!(result, Err("fatal".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_recovers() {
        let result: Result<u32, String> = with_retry(
            &RetryPolicy::default(),
            |_: &String| true,
            |attempt| async move {
                if attempt < 3 {
                    Err(format!("attempt {} failed", attempt))
                } else {
                    Ok(attempt)
                }
            },
        )
        .await;
        assert_eq!(result, Ok(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_exhausts_attempts() {
        let start = tokio::time::Instant::now();
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = with_retry(
            &RetryPolicy::default(),
            |_: &String| true,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("quota".to_string()) }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 2000 + 4000, no sleep after the final attempt
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(6000));
        assert!(elapsed < Duration::from_millis(6100));
    }
}
