//! Bounded retry around remote-store calls.
//!
//! Only [`StoreError::Transient`] is retried. Everything else returns on the first
//! failure. After `max_attempts` transient failures the call fails with
//! [`StoreError::RemoteUnavailable`].

use crate::error::StoreError;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 15;
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;
pub const DEFAULT_MAX_DELAY_MS: u64 = 8_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed,
    /// `base * 2^attempt`, capped at `max_delay`, plus up to a quarter of jitter.
    Exponential,
}

impl std::str::FromStr for Backoff {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(Backoff::Fixed),
            "exponential" | "exp" => Ok(Backoff::Exponential),
            other => Err(format!("invalid backoff: {} (expected fixed or exponential)", other)),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            backoff: Backoff::Exponential,
        }
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            backoff: Backoff::Fixed,
        }
    }

    /// No sleeping between attempts. For tests and in-process stores.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::fixed(max_attempts, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (0-based: the wait after the first failure is attempt 0).
    pub fn delay_for(&self, attempt: u32, jitter_seed: u64) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.base_delay,
            Backoff::Exponential => {
                let base_ms = self.base_delay.as_millis().min(u64::MAX as u128) as u64;
                let max_ms = self.max_delay.as_millis().min(u64::MAX as u128) as u64;
                let exp = 1u64 << attempt.min(16);
                let without_jitter = base_ms.saturating_mul(exp).min(max_ms);
                if without_jitter == 0 {
                    return Duration::ZERO;
                }
                let jitter = jitter_seed
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add((attempt as u64).wrapping_mul(0x9E3779B97F4A7C15));
                let jitter_ms = jitter % (without_jitter / 4).max(1);
                Duration::from_millis(without_jitter.saturating_add(jitter_ms))
            }
        }
    }
}

fn jitter_seed() -> u64 {
    chrono::Utc::now().timestamp_subsec_nanos() as u64
}

/// Run `op` under `policy`. `op_name` only feeds logs and the terminal error.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, op_name: &str, mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last = String::new();
    for attempt in 0..max_attempts {
        match op().await {
            Ok(v) => {
                if attempt > 0 {
                    tracing::debug!(op = %op_name, attempts = attempt + 1, "succeeded after retry");
                }
                return Ok(v);
            }
            Err(StoreError::Transient(msg)) => {
                last = msg;
                if attempt + 1 < max_attempts {
                    let delay = policy.delay_for(attempt, jitter_seed());
                    tracing::warn!(
                        op = %op_name,
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %last,
                        "transient remote error, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
            Err(e) => return Err(e),
        }
    }
    tracing::error!(op = %op_name, attempts = max_attempts, error = %last, "retry budget exhausted");
    Err(StoreError::RemoteUnavailable {
        op: op_name.to_string(),
        attempts: max_attempts,
        last,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    async fn flaky(calls: &AtomicU32, failures: u32) -> Result<&'static str, StoreError> {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        if n < failures {
            Err(StoreError::Transient("quota exceeded".into()))
        } else {
            Ok("done")
        }
    }

    #[tokio::test]
    async fn succeeds_after_k_transient_failures() {
        let policy = RetryPolicy::immediate(15);
        for k in [0u32, 1, 5, 14] {
            let calls = AtomicU32::new(0);
            let out = with_retry(&policy, "flaky", || flaky(&calls, k)).await.unwrap();
            assert_eq!(out, "done");
            assert_eq!(calls.load(Ordering::SeqCst), k + 1);
        }
    }

    #[tokio::test]
    async fn exhausts_after_exactly_max_attempts() {
        let policy = RetryPolicy::immediate(15);
        let calls = AtomicU32::new(0);
        let err = with_retry(&policy, "always", || flaky(&calls, u32::MAX)).await.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 15);
        match err {
            StoreError::RemoteUnavailable { op, attempts, last } => {
                assert_eq!(op, "always");
                assert_eq!(attempts, 15);
                assert_eq!(last, "quota exceeded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn non_transient_is_not_retried() {
        let policy = RetryPolicy::immediate(15);
        let calls = AtomicU32::new(0);
        let err = with_retry(&policy, "bad", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(StoreError::Request("malformed range".into())) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::Request(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn exponential_delay_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 15,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1_000),
            backoff: Backoff::Exponential,
        };
        let d0 = policy.delay_for(0, 7);
        let d3 = policy.delay_for(3, 7);
        let d10 = policy.delay_for(10, 7);
        assert!(d0 >= Duration::from_millis(100) && d0 < Duration::from_millis(125));
        assert!(d3 >= Duration::from_millis(800) && d3 < Duration::from_millis(1_000));
        assert!(d10 >= Duration::from_millis(1_000) && d10 < Duration::from_millis(1_250));
    }

    #[test]
    fn fixed_delay_is_flat() {
        let policy = RetryPolicy::fixed(10, Duration::from_secs(2));
        assert_eq!(policy.delay_for(0, 1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(9, 99), Duration::from_secs(2));
    }

    #[test]
    fn backoff_parse() {
        assert_eq!("Fixed".parse::<Backoff>().unwrap(), Backoff::Fixed);
        assert_eq!("exponential".parse::<Backoff>().unwrap(), Backoff::Exponential);
        assert!("linear".parse::<Backoff>().is_err());
    }
}
