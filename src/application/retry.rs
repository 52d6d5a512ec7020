//! Bounded retry and timeout policy for oracle calls.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use tracing::warn;

use crate::application::{ApplicationError, ApplicationResult};

/// Per-call limits applied around every decompose/resolve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    /// Attempts including the first one
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    /// Timeout for a single attempt
    pub timeout: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            timeout: Duration::from_secs(120),
        }
    }
}

impl CallPolicy {
    /// Run `op` under the timeout, retrying transient failures with exponential backoff.
    ///
    /// Timeouts and non-transient errors are returned immediately.
    pub async fn run<T, F, Fut>(&self, label: &str, op: F) -> ApplicationResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ApplicationResult<T>>,
    {
        let attempts = &AtomicUsize::new(0);
        let op = &op;
        let max_attempts = self.max_attempts.max(1);
        let timeout = self.timeout;
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_max_elapsed_time(None)
            .build();

        backoff::future::retry(backoff, move || async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let result = match tokio::time::timeout(timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(ApplicationError::Timeout {
                    secs: timeout.as_secs(),
                }),
            };
            match result {
                Ok(value) => Ok(value),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    warn!(label, attempt, %e, "transient oracle failure, retrying");
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await
    }
}
