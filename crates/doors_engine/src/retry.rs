use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;

use doors_core::RetryPolicy;

use crate::sink::Reporter;

/// Future borrowing the state an attempt works on.
pub type AttemptFuture<'s, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 's>>;

/// Runs `op` until it succeeds or the policy's attempts are used up.
///
/// Each attempt is announced as `attempting {description} (try n/max)`; the
/// wait after failed attempt `n` is `policy.delay_after(n)`. The last error is
/// returned unchanged.
pub async fn attempt<S, T, E, F>(
    description: &str,
    policy: RetryPolicy,
    reporter: Reporter<'_>,
    state: &mut S,
    mut op: F,
) -> Result<T, E>
where
    S: ?Sized,
    E: Display,
    F: for<'s> FnMut(&'s mut S) -> AttemptFuture<'s, T, E>,
{
    let max = policy.max_attempts.max(1);
    let mut n = 1;
    loop {
        reporter.info(format!("attempting {description} (try {n}/{max})"));
        match op(state).await {
            Ok(value) => return Ok(value),
            Err(err) if n >= max => {
                reporter.error(format!("{description} failed after {max} attempts: {err}"));
                return Err(err);
            }
            Err(err) => {
                reporter.warn(format!("{description} failed (attempt {n}): {err}, retrying"));
                tokio::time::sleep(policy.delay_after(n)).await;
                n += 1;
            }
        }
    }
}
