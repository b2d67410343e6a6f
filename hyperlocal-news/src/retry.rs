use crate::types::Result;
use backoff::backoff::{Backoff, Constant};
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Bounded retry with a fixed pause between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Same attempt bound, no sleeping. Meant for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Run `op` until it succeeds, the attempt budget is spent, or it fails
    /// with an error that is not worth retrying. Returns the last error.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut backoff = Constant::new(self.delay);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts && e.is_retryable() => {
                    warn!("{} attempt {}/{} failed: {}", label, attempt, max_attempts, e);
                    if let Some(delay) = backoff.next_backoff() {
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                    attempt += 1;
                }
                Err(e) => {
                    error!("{} failed after {} attempts: {}", label, attempt, e);
                    return Err(e);
                }
            }
        }
    }
}
