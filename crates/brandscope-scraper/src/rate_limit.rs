//! Retry with exponential back-off and jitter for the image-lookup client.
//!
//! This is the only open-ended retry loop in the crate. Page navigation uses
//! the fixed-delay [`crate::page::goto_with_retry`] instead, and completion
//! calls are never retried.

use std::future::Future;
use std::time::Duration;

use crate::error::ScrapeError;

const MAX_DELAY_MS: u64 = 60_000;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// Retriable: [`ScrapeError::RateLimited`] (HTTP 429) and network-level
/// failures (timeouts, connection errors). Everything else, including
/// [`ScrapeError::PaginationLimit`] and non-429 statuses, stops immediately.
pub(crate) fn is_retriable(err: &ScrapeError) -> bool {
    match err {
        ScrapeError::RateLimited { .. } => true,
        ScrapeError::Http(e) => e.is_timeout() || e.is_connect(),
        _ => false,
    }
}

/// Sleep before retry number `attempt` (1-based), honouring a server-sent
/// `Retry-After` when it is longer than the computed back-off.
fn backoff_delay_ms(err: &ScrapeError, attempt: u32, backoff_base_ms: u64) -> u64 {
    let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
    let capped = computed.min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;

    match err {
        ScrapeError::RateLimited {
            retry_after_secs, ..
        } => jittered.max(retry_after_secs.saturating_mul(1000).min(MAX_DELAY_MS)),
        _ => jittered,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient
/// errors.
///
/// Back-off schedule with `backoff_base_ms = 1_000`:
///
/// | Retry | Sleep before it              |
/// |-------|------------------------------|
/// | 1     | 1 000 ms × 2⁰ ± 25 % jitter  |
/// | 2     | 1 000 ms × 2¹ ± 25 % jitter  |
/// | 3     | 1 000 ms × 2² ± 25 % jitter  |
///
/// Delay is capped at 60 s. When all retries are exhausted the last error is
/// returned.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ScrapeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay_ms = backoff_delay_ms(&err, attempt, backoff_base_ms);
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient image-host error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
