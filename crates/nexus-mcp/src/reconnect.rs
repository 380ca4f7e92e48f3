//! Reconnection strategy with exponential backoff.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Progress callback for reconnection waits:
/// `(attempt, max_attempts, remaining)`.
pub type BackoffProgressFn = dyn Fn(u32, u32, Duration) + Send + Sync;

/// Exponential backoff with a delay cap.
///
/// `delay(n) = min(initial_delay * multiplier^(n-1), max_delay)` for
/// attempts `n >= 1`. No jitter is applied.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Maximum number of reconnection attempts.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the delay.
    pub max_delay: Duration,
    /// Multiplier applied per attempt.
    pub multiplier: f64,
    /// How often progress is reported during a wait.
    pub progress_interval: Duration,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            progress_interval: Duration::from_secs(2),
        }
    }
}

impl ExponentialBackoff {
    /// Calculate the delay for the given attempt number (1-indexed).
    ///
    /// Attempt numbers below 1 yield the initial delay.
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // float backoff math, capped by max_delay
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return self.initial_delay.min(self.max_delay);
        }
        let exponent = attempt.saturating_sub(1);
        let factor = self.multiplier.powi(i32::try_from(exponent).unwrap_or(i32::MAX));
        let secs = self.initial_delay.as_secs_f64() * factor;
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }

    /// Whether another attempt should be made.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt <= self.max_attempts
    }

    /// Wait before the next reconnection attempt, reporting progress.
    ///
    /// Sleeps for `delay(attempt)` in `progress_interval` slices, invoking
    /// `on_progress(attempt, max_attempts, remaining)` between slices.
    /// Returns `false` immediately if the cancellation token fires or the
    /// attempt number exceeds `max_attempts`; `true` once the full delay
    /// has elapsed.
    pub async fn wait_before_retry(
        &self,
        attempt: u32,
        cancel: &CancellationToken,
        on_progress: Option<&BackoffProgressFn>,
    ) -> bool {
        if !self.should_retry(attempt) {
            return false;
        }

        let delay = self.delay(attempt);
        info!(
            attempt,
            max_attempts = self.max_attempts,
            delay_secs = delay.as_secs_f64(),
            "Waiting before reconnection attempt"
        );

        if let Some(cb) = on_progress {
            cb(attempt, self.max_attempts, delay);
        }

        let mut remaining = delay;
        while !remaining.is_zero() {
            if cancel.is_cancelled() {
                info!("Reconnection wait cancelled");
                return false;
            }

            let slice = remaining.min(self.progress_interval);
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("Reconnection wait cancelled");
                    return false;
                },
                () = tokio::time::sleep(slice) => {},
            }

            remaining = remaining.saturating_sub(slice);
            if !remaining.is_zero() {
                debug!(
                    attempt,
                    remaining_secs = remaining.as_secs_f64(),
                    "Reconnection pending"
                );
                if let Some(cb) = on_progress {
                    cb(attempt, self.max_attempts, remaining);
                }
            }
        }

        !cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn strategy() -> ExponentialBackoff {
        ExponentialBackoff {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
            progress_interval: Duration::from_millis(500),
        }
    }

    #[test]
    fn test_delay_growth_and_cap() {
        let s = strategy();
        assert_eq!(s.delay(1), Duration::from_secs(1));
        assert_eq!(s.delay(2), Duration::from_secs(2));
        assert_eq!(s.delay(3), Duration::from_secs(4));
        assert_eq!(s.delay(4), Duration::from_secs(8));
        // Capped from here on
        assert_eq!(s.delay(5), Duration::from_secs(8));
        assert_eq!(s.delay(20), Duration::from_secs(8));
    }

    #[test]
    fn test_delay_is_monotonic_and_bounded() {
        let s = strategy();
        for n in 1..30 {
            assert!(s.delay(n) <= s.max_delay);
            assert!(s.delay(n.saturating_add(1)) >= s.delay(n));
        }
    }

    #[test]
    fn test_delay_attempt_zero() {
        let s = strategy();
        assert_eq!(s.delay(0), s.initial_delay);
    }

    #[test]
    fn test_should_retry() {
        let s = strategy();
        assert!(s.should_retry(1));
        assert!(s.should_retry(5));
        assert!(!s.should_retry(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_completes_and_reports_progress() {
        let s = strategy();
        let cancel = CancellationToken::new();
        let ticks = Arc::new(AtomicU32::new(0));
        let ticks_clone = Arc::clone(&ticks);
        let cb = move |_a: u32, _m: u32, _r: Duration| {
            ticks_clone.fetch_add(1, Ordering::SeqCst);
        };

        let resumed = s.wait_before_retry(2, &cancel, Some(&cb)).await;
        assert!(resumed);
        // 2s delay / 500ms interval: initial tick plus intermediate ones
        assert!(ticks.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_cancelled_returns_false() {
        let s = strategy();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let resumed = s.wait_before_retry(1, &cancel, None).await;
        assert!(!resumed);
    }

    #[tokio::test]
    async fn test_wait_past_max_attempts_returns_false() {
        let s = strategy();
        let cancel = CancellationToken::new();
        assert!(!s.wait_before_retry(6, &cancel, None).await);
    }
}
