//! Minimum spacing between outbound requests.

use std::time::Duration;

use tokio::time::{sleep, Instant};

/// Enforces a minimum interval between successive calls.
///
/// The first call passes immediately. Each later call sleeps until
/// `min_interval` has elapsed since the previous one started.
#[derive(Debug, Clone)]
pub struct Throttle {
    min_interval: Duration,
    last_call: Option<Instant>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait for the next slot and claim it.
    pub async fn acquire(&mut self) {
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::debug!("Throttling request for {wait:?}");
                sleep(wait).await;
            }
        }
        self.last_call = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_call_is_immediate() {
        let mut throttle = Throttle::new(Duration::from_secs(10));
        let start = Instant::now();
        throttle.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successive_calls_are_spaced() {
        let mut throttle = Throttle::new(Duration::from_secs(10));
        let start = Instant::now();
        throttle.acquire().await;
        throttle.acquire().await;
        throttle.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(20));
        assert!(start.elapsed() < Duration::from_secs(21));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_interval_passed() {
        let mut throttle = Throttle::new(Duration::from_secs(10));
        throttle.acquire().await;
        sleep(Duration::from_secs(15)).await;

        let before = Instant::now();
        throttle.acquire().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }
}
