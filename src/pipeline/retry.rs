//! Fixed-backoff retry with a per-attempt timeout.
//!
//! Every remote call in the pipeline (OCR, reshape, vision CSV, writing) goes
//! through [`with_retry`]. All failures are treated as retryable: HTTP errors,
//! transport errors, undecodable bodies and timeouts alike. The pause between
//! attempts is constant and there is no pause after the final attempt.
//!
//! Only the last attempt's failure is returned; earlier failures are logged.

use crate::config::RetryPolicy;
use crate::error::UpstreamError;
use std::fmt::Display;
use std::future::Future;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Run `op` until it succeeds or `policy.max_attempts` is exhausted.
///
/// `op` receives the 1-indexed attempt number. Each attempt is bounded by
/// `policy.timeout()`; an attempt that times out is dropped (its future is
/// cancelled) and counts as a failure.
pub async fn with_retry<T, E, F, Fut>(
    service: &'static str,
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, UpstreamError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let err = match timeout(policy.timeout(), op(attempt)).await {
            Ok(Ok(value)) => {
                if attempt > 1 {
                    debug!("{}: succeeded on attempt {}", service, attempt);
                }
                return Ok(value);
            }
            Ok(Err(e)) => UpstreamError::Failed {
                service,
                attempts: attempt,
                detail: e.to_string(),
            },
            Err(_) => UpstreamError::Timeout {
                service,
                timeout_ms: policy.timeout_ms,
                attempts: attempt,
            },
        };

        if attempt >= max_attempts {
            warn!("{}: giving up after {} attempts: {}", service, attempt, err);
            return Err(err);
        }

        warn!(
            "{}: attempt {}/{} failed ({}), retrying in {}ms",
            service, attempt, max_attempts, err, policy.backoff_ms
        );
        sleep(policy.backoff()).await;
        attempt += 1;
    }
}
