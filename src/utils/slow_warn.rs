use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{Level, warn};

/// Runs a backend call and logs a warning if it takes longer than `threshold`.
/// The call is never cancelled; its result is returned unchanged.
///
/// `describe` is only evaluated once the threshold has passed and warn-level
/// logging is enabled.
pub async fn warn_if_slow<F, T, M>(describe: M, threshold: Duration, future: F) -> T
where
    F: Future<Output = T>,
    M: FnOnce() -> String,
{
    if threshold.is_zero() || !tracing::enabled!(Level::WARN) {
        return future.await;
    }

    tokio::pin!(future);

    tokio::select! {
        biased;
        result = &mut future => result,
        _ = sleep(threshold) => {
            let start = Instant::now();
            let what = describe();
            warn!(threshold_secs = threshold.as_secs_f32(), "backend call still running: {what}");
            let result = future.await;
            warn!(
                elapsed_secs = start.elapsed().as_secs_f32() + threshold.as_secs_f32(),
                "backend call finished: {what}"
            );
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fast_call_returns_result() {
        let value = warn_if_slow(|| "fast".to_string(), Duration::from_secs(5), async { 7 }).await;
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_is_not_cancelled() {
        let value = warn_if_slow(|| "slow".to_string(), Duration::from_millis(10), async {
            sleep(Duration::from_millis(50)).await;
            "done"
        })
        .await;
        assert_eq!(value, "done");
    }

    #[tokio::test]
    async fn test_zero_threshold_disables_watch() {
        let value = warn_if_slow(|| unreachable!(), Duration::ZERO, async { 1 }).await;
        assert_eq!(value, 1);
    }
}
