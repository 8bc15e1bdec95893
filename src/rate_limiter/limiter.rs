//! Sliding-window admission control.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

use super::clock::{Clock, SystemClock};
use super::window::AdmissionWindow;
use crate::config::{EndpointLimit, HOUR_WINDOW, MINUTE_WINDOW};

/// Outcome of an admission check, mirrored onto the `X-RateLimit-*` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// The hourly quota
    pub limit: u32,
    pub remaining: u32,
    /// Unix seconds at which the binding window frees a slot
    pub reset: u64,
    /// Seconds to wait before retrying; zero when admitted
    pub retry_after: u64,
}

type Key = (String, String);

/// Per-(client, endpoint) limiter over trailing one-minute and one-hour windows.
///
/// One mutex guards the whole map. Check-and-record is atomic per call, so two
/// concurrent requests can never both take the last slot.
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<Key, AdmissionWindow>>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        RateLimiter {
            windows: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Checks one request and records it when admitted.
    ///
    /// The minute window is consulted first; an hour rejection reports zero
    /// remaining. Rejected requests are never recorded.
    pub async fn check(
        &self,
        client: &str,
        endpoint: &str,
        max_per_minute: u32,
        max_per_hour: u32,
    ) -> RateLimitDecision {
        let now = self.clock.now();
        let mut windows = self.windows.lock().await;
        let window = windows
            .entry((client.to_string(), endpoint.to_string()))
            .or_default();
        window.prune(now, HOUR_WINDOW);

        let (minute_count, oldest_in_minute) = window.within(now, MINUTE_WINDOW);
        let (hour_count, oldest_in_hour) = window.within(now, HOUR_WINDOW);
        let hour_count = hour_count as u32;

        if minute_count as u32 >= max_per_minute {
            let frees_at = oldest_in_minute.unwrap_or(now) + MINUTE_WINDOW;
            log::info!("Rate limit (minute) hit for {client} on {endpoint}");
            return RateLimitDecision {
                allowed: false,
                limit: max_per_hour,
                remaining: max_per_hour.saturating_sub(hour_count),
                reset: frees_at.as_secs(),
                retry_after: frees_at.saturating_sub(now).as_secs() + 1,
            };
        }

        if hour_count >= max_per_hour {
            let frees_at = oldest_in_hour.unwrap_or(now) + HOUR_WINDOW;
            log::info!("Rate limit (hour) hit for {client} on {endpoint}");
            return RateLimitDecision {
                allowed: false,
                limit: max_per_hour,
                remaining: 0,
                reset: frees_at.as_secs(),
                retry_after: frees_at.saturating_sub(now).as_secs() + 1,
            };
        }

        window.record(now);
        RateLimitDecision {
            allowed: true,
            limit: max_per_hour,
            remaining: max_per_hour.saturating_sub(hour_count + 1),
            reset: (now + HOUR_WINDOW).as_secs(),
            retry_after: 0,
        }
    }

    /// [`check`](Self::check) against a configured endpoint quota.
    pub async fn check_endpoint(&self, client: &str, limit: &EndpointLimit) -> RateLimitDecision {
        self.check(
            client,
            limit.endpoint,
            limit.max_per_minute,
            limit.max_per_hour,
        )
        .await
    }

    /// Drops timestamps older than one hour and keys left empty.
    ///
    /// Returns the number of keys removed.
    pub async fn sweep(&self) -> usize {
        sweep_windows(&self.windows, self.clock.now()).await
    }

    /// Number of tracked (client, endpoint) keys.
    pub async fn tracked_keys(&self) -> usize {
        self.windows.lock().await.len()
    }

    /// Starts the periodic sweep in a background task.
    ///
    /// The task runs every `sweep_interval` until the returned token is cancelled.
    pub fn start_sweeper(&self, sweep_interval: Duration) -> CancellationToken {
        let windows = Arc::clone(&self.windows);
        let clock = Arc::clone(&self.clock);
        let shutdown = CancellationToken::new();
        let stop = shutdown.clone();
        let mut ticker = interval(sweep_interval);

        tokio::spawn(async move {
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = sweep_windows(&windows, clock.now()).await;
                        if removed > 0 {
                            log::debug!("Rate limiter sweep removed {removed} idle key(s)");
                        }
                    }
                    _ = stop.cancelled() => {
                        log::debug!("Rate limiter sweeper shutting down");
                        break;
                    }
                }
            }
        });

        shutdown
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

async fn sweep_windows(windows: &Mutex<HashMap<Key, AdmissionWindow>>, now: Duration) -> usize {
    let mut windows = windows.lock().await;
    let before = windows.len();
    windows.retain(|_, window| {
        window.prune(now, HOUR_WINDOW);
        !window.is_empty()
    });
    before - windows.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limiter::ManualClock;

    const T0: Duration = Duration::from_secs(1_700_000_000);

    fn limiter() -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(T0));
        (RateLimiter::with_clock(clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_admits_up_to_minute_quota() {
        let (limiter, clock) = limiter();
        for i in 0..5u32 {
            let d = limiter.check("1.2.3.4", "scan", 5, 30).await;
            assert!(d.allowed);
            assert_eq!(d.limit, 30);
            assert_eq!(d.remaining, 30 - i - 1);
            assert_eq!(d.reset, T0.as_secs() + 3_600 + i as u64);
            assert_eq!(d.retry_after, 0);
            clock.advance(Duration::from_secs(1));
        }

        // Now at T0+5; the oldest admission (T0) frees at T0+60
        let d = limiter.check("1.2.3.4", "scan", 5, 30).await;
        assert!(!d.allowed);
        assert_eq!(d.retry_after, 56);
        assert_eq!(d.reset, T0.as_secs() + 60);
        assert_eq!(d.remaining, 25);
    }

    #[tokio::test]
    async fn test_readmitted_after_window_advances() {
        let (limiter, clock) = limiter();
        for _ in 0..3 {
            assert!(limiter.check("c", "report", 3, 10).await.allowed);
        }
        assert!(!limiter.check("c", "report", 3, 10).await.allowed);

        clock.advance(Duration::from_secs(59));
        assert!(!limiter.check("c", "report", 3, 10).await.allowed);

        // The boundary is exclusive: exactly 60s later the slot is free
        clock.advance(Duration::from_secs(1));
        assert!(limiter.check("c", "report", 3, 10).await.allowed);
    }

    #[tokio::test]
    async fn test_retry_after_truncates_fraction() {
        let (limiter, clock) = limiter();
        assert!(limiter.check("c", "e", 1, 10).await.allowed);
        clock.advance(Duration::from_millis(10_500));
        let d = limiter.check("c", "e", 1, 10).await;
        // 49.5s left -> trunc 49 + 1
        assert_eq!(d.retry_after, 50);
    }

    #[tokio::test]
    async fn test_hour_quota() {
        let (limiter, clock) = limiter();
        for _ in 0..3 {
            assert!(limiter.check("c", "checkout", 5, 3).await.allowed);
            clock.advance(Duration::from_secs(120));
        }
        let d = limiter.check("c", "checkout", 5, 3).await;
        assert!(!d.allowed);
        assert_eq!(d.remaining, 0);
        // Oldest at T0, now T0+360
        assert_eq!(d.retry_after, 3_600 - 360 + 1);
        assert_eq!(d.reset, T0.as_secs() + 3_600);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let (limiter, _) = limiter();
        assert!(limiter.check("a", "scan", 1, 10).await.allowed);
        assert!(!limiter.check("a", "scan", 1, 10).await.allowed);
        assert!(limiter.check("b", "scan", 1, 10).await.allowed);
        assert!(limiter.check("a", "report", 1, 10).await.allowed);
    }

    #[tokio::test]
    async fn test_rejections_are_not_recorded() {
        let (limiter, clock) = limiter();
        assert!(limiter.check("c", "e", 1, 100).await.allowed);
        for _ in 0..10 {
            assert!(!limiter.check("c", "e", 1, 100).await.allowed);
        }
        clock.advance(Duration::from_secs(60));
        let d = limiter.check("c", "e", 1, 100).await;
        assert!(d.allowed);
        assert_eq!(d.remaining, 98);
    }

    #[tokio::test]
    async fn test_sweep_drops_stale_keys() {
        let (limiter, clock) = limiter();
        limiter.check("old", "scan", 5, 30).await;
        clock.advance(Duration::from_secs(1_800));
        limiter.check("new", "scan", 5, 30).await;
        clock.advance(Duration::from_secs(1_801));

        assert_eq!(limiter.sweep().await, 1);
        assert_eq!(limiter.tracked_keys().await, 1);
    }

    #[tokio::test]
    async fn test_check_endpoint_uses_configured_quota() {
        let (limiter, _) = limiter();
        let limit = crate::config::REPORT_LIMIT;
        for _ in 0..limit.max_per_minute {
            assert!(limiter.check_endpoint("c", &limit).await.allowed);
        }
        assert!(!limiter.check_endpoint("c", &limit).await.allowed);
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_cancel() {
        let (limiter, clock) = limiter();
        limiter.check("c", "scan", 5, 30).await;
        clock.advance(Duration::from_secs(7_200));

        let token = limiter.start_sweeper(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(limiter.tracked_keys().await, 0);
        token.cancel();
    }
}
