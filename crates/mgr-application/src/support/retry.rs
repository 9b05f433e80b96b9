//! Bounded exponential backoff for transient backend failures.
//!
//! The repository contracts surface retryable failures as
//! `Error::TransientBackend`; this helper is the single place the service
//! layer recovers them. Schedule: 100 ms base, factor 2, 5 attempts,
//! 10 % jitter.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use mgr_domain::constants::storage::{
    RETRY_BACKOFF_FACTOR, RETRY_INITIAL_DELAY_MS, RETRY_JITTER, RETRY_MAX_ATTEMPTS,
};
use mgr_domain::error::Result;

/// Run `op` until it succeeds, fails non-transiently, or exhausts attempts.
///
/// # Errors
///
/// Returns the last error once attempts are exhausted, or the first
/// non-transient error immediately.
pub async fn with_backoff<T, F, Fut>(context: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt + 1 < RETRY_MAX_ATTEMPTS => {
                attempt += 1;
                let delay = backoff_delay(attempt);
                mgr_domain::warn!(
                    context,
                    "transient backend failure, retrying",
                    &format!("attempt {attempt}, sleeping {delay:?}: {err}")
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let base = RETRY_INITIAL_DELAY_MS as f64 * RETRY_BACKOFF_FACTOR.powi(attempt as i32 - 1);
    let jitter = rand::rng().random_range(-RETRY_JITTER..=RETRY_JITTER);
    Duration::from_millis((base * (1.0 + jitter)).max(1.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use mgr_domain::error::Error;

    #[tokio::test]
    async fn returns_first_success() {
        let calls = AtomicU32::new(0);
        let result = with_backoff("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Error>(42) }
        })
        .await;
        assert_eq!(result.expect("ok"), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_backoff("test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Error::transient("flaky"))
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.expect("ok"), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_conflicts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_backoff("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::conflict("taken")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_backoff("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::transient("down")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), RETRY_MAX_ATTEMPTS);
    }
}
