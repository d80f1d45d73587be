use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio::time::timeout;
use tracing::debug;
use tracing::warn;

use crate::BackoffPolicy;
use crate::Error;
use crate::Result;

/// Retries `task` with a per-attempt timeout and capped exponential backoff.
///
/// Once `policy.max_retries` attempts have failed, returns
/// [`Error::RetryTaskFailed`] naming the last error. `max_retries == 0`
/// retries until success.
pub(crate) async fn task_with_timeout_and_exponential_backoff<F, T, P>(
    task: F,
    policy: BackoffPolicy,
) -> Result<P>
where
    F: Fn() -> T,
    T: Future<Output = Result<P>>,
{
    retry_with_backoff(task, policy, |_| true).await
}

/// Like [`task_with_timeout_and_exponential_backoff`], but an error for which
/// `is_retryable` returns false is returned as is, without further attempts.
/// Attempt timeouts are offered to `is_retryable` as [`Error::RetryTimeout`].
pub(crate) async fn retry_with_backoff<F, T, P, R>(
    task: F,
    policy: BackoffPolicy,
    is_retryable: R,
) -> Result<P>
where
    F: Fn() -> T,
    T: Future<Output = Result<P>>,
    R: Fn(&Error) -> bool,
{
    let mut attempts = 0;
    let mut delay = Duration::from_millis(policy.base_delay_ms);
    let max_delay = Duration::from_millis(policy.max_delay_ms);

    loop {
        let error = match timeout(policy.timeout(), task()).await {
            Ok(Ok(r)) => {
                return Ok(r);
            }
            Ok(Err(error)) => {
                debug!("attempt {} failed with error: {:?}", attempts + 1, &error);
                error
            }
            Err(_) => {
                debug!("attempt {} timed out after {:?}", attempts + 1, policy.timeout());
                Error::RetryTimeout
            }
        };
        attempts += 1;

        if !is_retryable(&error) {
            warn!("Task failed with a non-retryable error after {} attempt(s)", attempts);
            return Err(error);
        }
        if policy.max_retries != 0 && attempts >= policy.max_retries {
            warn!("Task failed after {} retries", attempts);
            return Err(Error::RetryTaskFailed(format!(
                "Task failed after {attempts} attempt(s), last error: {error}"
            )));
        }

        sleep(delay).await;
        delay = (delay * 2).min(max_delay);
    }
}

/// Spawns `fut` as a detached background unit.
///
/// Callers may await the handle under a timeout; on expiry the task keeps
/// running and is simply no longer waited for.
pub(crate) fn spawn_task<Fut>(
    name: &str,
    fut: Fut,
) -> JoinHandle<()>
where
    Fut: Future<Output = ()> + Send + 'static,
{
    let name = name.to_string();
    tokio::spawn(async move {
        fut.await;
        debug!("background task {name} finished");
    })
}

/// Awaits `handle` for at most `bound`. Returns `false` when the wait was
/// abandoned.
pub(crate) async fn wait_at_most(
    handle: JoinHandle<()>,
    bound: Duration,
) -> bool {
    match timeout(bound, handle).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!("background task failed: {:?}", e);
            true
        }
        Err(_) => false,
    }
}
