//! Retry logic with exponential backoff for network operations.

use crate::error::Result;
use tokio::time::Duration;

/// Maximum backoff between two attempts
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// How often and how patiently to retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = try once)
    pub max_retries: u32,
    /// Wait before the first retry; doubled for each further retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Default delays with the given retry count
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
            .min(MAX_BACKOFF)
    }
}

/// Retry an async operation with exponential backoff.
///
/// Only errors for which [`ReleaseError::is_recoverable`] holds are retried;
/// anything else is returned at once.
///
/// [`ReleaseError::is_recoverable`]: crate::error::ReleaseError::is_recoverable
pub async fn retry_with_backoff<F, T, Fut>(
    mut operation: F,
    policy: RetryPolicy,
    operation_name: &str,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempts = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempts > 0 {
                    log::info!("{operation_name} succeeded after {attempts} retry(ies)");
                }
                return Ok(result);
            }
            Err(e) => {
                if !e.is_recoverable() || attempts >= policy.max_retries {
                    return Err(e);
                }

                attempts += 1;
                let wait = policy.delay_for(attempts);
                log::warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:.1}s",
                    operation_name,
                    attempts,
                    policy.max_retries + 1,
                    e,
                    wait.as_secs_f64()
                );
                tokio::time::sleep(wait).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ManifestError, RegistryError, ReleaseError};
    use std::path::PathBuf;

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
        }
    }

    fn transient() -> ReleaseError {
        ReleaseError::Registry(RegistryError::Status {
            url: "https://api.nuget.org/v3/index.json".to_string(),
            status: 503,
        })
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let mut calls = 0;
        let result = retry_with_backoff(
            || {
                calls += 1;
                let attempt = calls;
                async move {
                    if attempt < 3 {
                        Err(transient())
                    } else {
                        Ok(attempt)
                    }
                }
            },
            fast(3),
            "lookup",
        )
        .await;

        assert_eq!(result.ok(), Some(3));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let mut calls = 0;
        let result: Result<()> = retry_with_backoff(
            || {
                calls += 1;
                async { Err(transient()) }
            },
            fast(2),
            "lookup",
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_unrecoverable_is_not_retried() {
        let mut calls = 0;
        let result: Result<()> = retry_with_backoff(
            || {
                calls += 1;
                async {
                    Err(ReleaseError::Manifest(ManifestError::Invalid {
                        path: PathBuf::from("lib.release.json"),
                        reason: "bad".to_string(),
                    }))
                }
            },
            fast(5),
            "lookup",
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(30), MAX_BACKOFF);
    }
}
