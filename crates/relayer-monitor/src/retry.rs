//! Retry-with-backoff for the per-chain poll loops: a small number of
//! inline retries for transient RPC failures before the loop gives up for
//! this tick and tries again next time, rather than blocking the whole
//! actor on a wedged node.

use std::time::Duration;

use relayer_chain::ClientError;

#[derive(Clone, Copy, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub factor: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(5),
            factor: 2,
        }
    }
}

impl RetryConfig {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay * self.factor.saturating_pow(attempt)
    }
}

/// Runs `op`, retrying up to `config.max_retries` times on a transient
/// [`ClientError`] with exponentially increasing delay, honoring a
/// server-provided `retry_after` when present. A permanent error is never
/// retried.
pub async fn retry_with_backoff<F, Fut, T>(
    config: RetryConfig,
    op_name: &str,
    mut op: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ClientError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < config.max_retries => {
                let delay = err
                    .retry_after()
                    .unwrap_or_else(|| config.delay_for_attempt(attempt));
                tracing::warn!(
                    op = op_name,
                    attempt,
                    delay_secs = delay.as_secs(),
                    error = %err,
                    "retrying transient chain RPC failure",
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            factor: 2,
        };
        let result = retry_with_backoff(config, "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ClientError::transient("not yet"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let config = RetryConfig {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            factor: 2,
        };
        let result: Result<(), ClientError> =
            retry_with_backoff(config, "test", || async { Err(ClientError::transient("nope")) })
                .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn never_retries_permanent_errors() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::default();
        let result: Result<(), ClientError> = retry_with_backoff(config, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ClientError::permanent("bad request")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
