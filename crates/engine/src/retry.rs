//! Bounded fixed-delay retry for operations on a possibly locked tab.
//!
//! Only [`ResourceError::Locked`] is retried. Any other failure ends the loop
//! at once and is handed back for the caller to classify.

use std::future::Future;
use std::time::Duration;

use tabsweep_config::RetryConfig;
use tabsweep_core::ResourceError;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    pub delay: Duration,
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            delay: config.delay(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetryError {
    #[error("still locked after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: ResourceError },

    #[error(transparent)]
    Aborted(ResourceError),
}

impl RetryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RetryError::Aborted(e) if e.is_not_found())
    }
}

/// Run `op` until it succeeds, fails with a non-transient error, or has been
/// tried `policy.max_attempts` times.
pub async fn retry_transient<T, F, Fut>(
    policy: RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ResourceError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    error = %e,
                    "Resource locked, retrying"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) if e.is_transient() => {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: e,
                });
            }
            Err(e) => return Err(RetryError::Aborted(e)),
        }
    }
}
