//! CAS retry policy
//!
//! A read-modify-write sequence against the store fails with
//! `VersionMismatch` when another writer got there first. The whole
//! sequence (read, compute, conditional write) is retried with exponential
//! backoff; any other error aborts immediately.

use masterdata_core::error::{Error, Result};
use std::time::Duration;

/// Retry policy for conditional writes
///
/// The defaults are tuned for heavy single-key contention: with N threads
/// hammering one counter the loser of each round needs roughly one retry
/// per competitor, so a generous budget with millisecond backoff keeps
/// worst-case latency low without spinning.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum retries before giving up
    pub max_retries: u32,
    /// First backoff delay
    pub base_delay: Duration,
    /// Backoff ceiling
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 200,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(50),
        }
    }
}

impl RetryConfig {
    /// Override the retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Override the first backoff delay
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }
}

/// Run `op` until it succeeds, retrying on `VersionMismatch`
///
/// `op` must re-read its inputs on every attempt — the point of the retry
/// is to recompute against the state the winning writer left behind.
pub fn with_cas_retry<T, F>(config: &RetryConfig, mut op: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut delay = config.base_delay;
    let mut attempt = 0u32;
    loop {
        match op() {
            Err(Error::VersionMismatch { .. }) if attempt < config.max_retries => {
                attempt += 1;
                tracing::debug!(attempt, "conditional write conflicted, retrying");
                std::thread::sleep(delay);
                delay = (delay * 2).min(config.max_delay);
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_passes_through() {
        let result = with_cas_retry(&RetryConfig::default(), || Ok(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_retries_version_mismatch_until_success() {
        let mut attempts = 0;
        let config = RetryConfig::default().with_base_delay(Duration::from_micros(10));
        let result = with_cas_retry(&config, || {
            attempts += 1;
            if attempts < 4 {
                Err(Error::VersionMismatch {
                    expected: 1,
                    actual: 2,
                })
            } else {
                Ok("done")
            }
        });
        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts, 4);
    }

    #[test]
    fn test_non_retryable_error_aborts_immediately() {
        let mut attempts = 0;
        let result: Result<()> = with_cas_retry(&RetryConfig::default(), || {
            attempts += 1;
            Err(Error::Conflict("duplicate".into()))
        });
        assert!(matches!(result, Err(Error::Conflict(_))));
        assert_eq!(attempts, 1);
    }

    #[test]
    fn test_budget_exhaustion_returns_last_error() {
        let config = RetryConfig::default()
            .with_max_retries(3)
            .with_base_delay(Duration::from_micros(10));
        let mut attempts = 0;
        let result: Result<()> = with_cas_retry(&config, || {
            attempts += 1;
            Err(Error::VersionMismatch {
                expected: 1,
                actual: 2,
            })
        });
        assert!(matches!(result, Err(Error::VersionMismatch { .. })));
        assert_eq!(attempts, 4, "initial attempt plus three retries");
    }
}
