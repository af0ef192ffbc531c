//! Shared exponential backoff
//!
//! One [`Backoff`] is shared by every worker: each transient failure lengthens
//! the next wait (`min * factor^failures`, capped at `max`) and a successful
//! fetch resets it.

use std::sync::Mutex;
use std::time::Duration;

/// Default first wait
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(5);

/// Default wait ceiling (two hours)
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(2 * 60 * 60);

/// Default growth factor between consecutive waits
pub const DEFAULT_FACTOR: u32 = 2;

/// Stateful wait policy
#[derive(Debug)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    factor: u32,
    failures: Mutex<u32>,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_DELAY, DEFAULT_MAX_DELAY, DEFAULT_FACTOR)
    }
}

impl Backoff {
    pub fn new(min: Duration, max: Duration, factor: u32) -> Self {
        Self {
            min,
            max,
            factor: factor.max(1),
            failures: Mutex::new(0),
        }
    }

    /// Delay the next call to [`wait`](Self::wait) would sleep for
    pub fn next_delay(&self) -> Duration {
        let failures = *self.failures.lock().unwrap_or_else(|e| e.into_inner());
        self.delay_for(failures)
    }

    fn delay_for(&self, failures: u32) -> Duration {
        let multiplier = self.factor.checked_pow(failures).unwrap_or(u32::MAX);
        self.min
            .checked_mul(multiplier)
            .unwrap_or(self.max)
            .min(self.max)
    }

    /// Records a failure and sleeps for the current delay
    ///
    /// The lock is released before sleeping, so concurrent callers each wait
    /// their own (increasing) delay.
    pub async fn wait(&self) {
        let delay = {
            let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
            let delay = self.delay_for(*failures);
            *failures = failures.saturating_add(1);
            delay
        };

        tracing::debug!("Backing off for {:?}", delay);
        tokio::time::sleep(delay).await;
    }

    /// Forgets earlier failures after a successful request
    pub fn reset(&self) {
        *self.failures.lock().unwrap_or_else(|e| e.into_inner()) = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_and_caps() {
        let backoff = Backoff::new(Duration::from_secs(5), Duration::from_secs(30), 2);
        assert_eq!(backoff.delay_for(0), Duration::from_secs(5));
        assert_eq!(backoff.delay_for(1), Duration::from_secs(10));
        assert_eq!(backoff.delay_for(2), Duration::from_secs(20));
        assert_eq!(backoff.delay_for(3), Duration::from_secs(30));
        assert_eq!(backoff.delay_for(200), Duration::from_secs(30));
    }

    #[test]
    fn test_default_ceiling() {
        let backoff = Backoff::default();
        assert_eq!(backoff.next_delay(), DEFAULT_MIN_DELAY);
        assert_eq!(backoff.delay_for(40), DEFAULT_MAX_DELAY);
    }

    #[tokio::test]
    async fn test_wait_then_reset() {
        let backoff = Backoff::new(Duration::ZERO, Duration::ZERO, 2);
        backoff.wait().await;
        backoff.wait().await;
        assert_eq!(*backoff.failures.lock().unwrap(), 2);

        backoff.reset();
        assert_eq!(*backoff.failures.lock().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_sleeps_for_the_current_delay() {
        let backoff = Backoff::new(Duration::from_secs(5), Duration::from_secs(60), 2);
        let start = tokio::time::Instant::now();

        backoff.wait().await;
        backoff.wait().await;

        assert_eq!(start.elapsed(), Duration::from_secs(15));
        assert_eq!(backoff.next_delay(), Duration::from_secs(20));
    }
}
