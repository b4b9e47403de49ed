//! Bounded retry with exponential backoff and jitter.
//!
//! Only service resolution retries. Dispatched calls never do; a failed call
//! is surfaced to the caller as-is.

use crate::config::LocatorConfig;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How long and how often resolution keeps looking for a live instance.
#[derive(Debug, Clone)]
pub struct ResolvePolicy {
    /// Maximum number of attempts (including the first one). Never below 1.
    pub max_attempts: u32,
    /// Initial delay between attempts.
    pub base_delay: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
    /// Whether to add random jitter to delays.
    pub jitter: bool,
    /// Upper bound on the whole resolution, attempts and delays included.
    pub timeout: Duration,
}

impl Default for ResolvePolicy {
    fn default() -> Self {
        Self {
            max_attempts: LocatorConfig::RESOLVE_MAX_ATTEMPTS,
            base_delay: LocatorConfig::RESOLVE_BASE_DELAY,
            max_delay: LocatorConfig::RESOLVE_MAX_DELAY,
            jitter: true,
            timeout: LocatorConfig::RESOLVE_TIMEOUT,
        }
    }
}

impl ResolvePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the maximum delay cap.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enable or disable jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Set the overall resolution timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Delay after attempt `attempt` (0-indexed): doubling from
    /// `base_delay`, capped at `max_delay`.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        let capped = self.base_delay.saturating_mul(factor).min(self.max_delay);
        if !self.jitter {
            return capped;
        }

        // Scaled into 0.5..1.5 of the nominal delay, never past the cap
        let scale = rand::rng().random_range(0.5..1.5);
        capped.mul_f64(scale).min(self.max_delay)
    }
}

/// What a retry loop did.
#[derive(Debug, Clone, Default)]
pub struct RetryStats {
    pub attempts: u32,
    pub total_delay: Duration,
}

/// Run `operation` until it succeeds, fails with an error `should_retry`
/// rejects, or `policy.max_attempts` attempts are spent.
///
/// The overall `policy.timeout` is enforced by the caller.
pub async fn retry_async<F, Fut, T, E>(
    policy: &ResolvePolicy,
    mut operation: F,
    should_retry: impl Fn(&E) -> bool,
) -> (Result<T, E>, RetryStats)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut stats = RetryStats::default();

    loop {
        stats.attempts += 1;

        let err = match operation().await {
            Ok(value) => return (Ok(value), stats),
            Err(e) => e,
        };

        if !should_retry(&err) {
            debug!("Giving up on non-retryable error: {}", err);
            return (Err(err), stats);
        }
        if stats.attempts >= max_attempts {
            warn!("Giving up after {} attempt(s): {}", stats.attempts, err);
            return (Err(err), stats);
        }

        let delay = policy.calculate_delay(stats.attempts - 1);
        debug!(
            "Attempt {}/{} failed ({}), next in {:?}",
            stats.attempts, max_attempts, err, delay
        );
        stats.total_delay += delay;
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_delay_calculation_no_jitter() {
        let policy = ResolvePolicy::new()
            .with_base_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(10))
            .with_jitter(false);

        assert_eq!(policy.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(policy.calculate_delay(1), Duration::from_millis(200));
        assert_eq!(policy.calculate_delay(2), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let policy = ResolvePolicy::new()
            .with_base_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(3))
            .with_jitter(false);

        assert_eq!(policy.calculate_delay(4), Duration::from_secs(3));
    }

    #[test]
    fn test_delay_with_jitter_stays_in_band() {
        let policy = ResolvePolicy::new()
            .with_base_delay(Duration::from_secs(2))
            .with_max_delay(Duration::from_secs(60))
            .with_jitter(true);

        for _ in 0..20 {
            let delay = policy.calculate_delay(0);
            assert!(
                delay >= Duration::from_secs(1) && delay <= Duration::from_secs(3),
                "Delay {:?} should be between 1s and 3s",
                delay
            );
        }
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        let policy = ResolvePolicy::new().with_max_attempts(0);
        assert_eq!(policy.max_attempts, 1);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let policy = ResolvePolicy::new()
            .with_max_attempts(3)
            .with_base_delay(Duration::from_millis(5))
            .with_jitter(false);

        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let (result, stats) = retry_async(
            &policy,
            || {
                let counter = counter_clone.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("not yet".to_string())
                    } else {
                        Ok(7)
                    }
                }
            },
            |_: &String| true,
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.total_delay, Duration::from_millis(15));
    }

    #[tokio::test]
    async fn test_retry_exhausted_is_bounded() {
        let policy = ResolvePolicy::new()
            .with_max_attempts(4)
            .with_base_delay(Duration::from_millis(1))
            .with_jitter(false);

        let (result, stats) = retry_async(
            &policy,
            || async { Err::<i32, _>("never".to_string()) },
            |_: &String| true,
        )
        .await;

        assert_eq!(stats.attempts, 4);
        assert_eq!(result.unwrap_err(), "never");
    }

    #[tokio::test]
    async fn test_retry_stops_on_non_retryable() {
        let policy = ResolvePolicy::new().with_max_attempts(5);

        let (result, stats) = retry_async(
            &policy,
            || async { Err::<i32, _>("permanent".to_string()) },
            |e: &String| !e.contains("permanent"),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(stats.attempts, 1);
    }
}
