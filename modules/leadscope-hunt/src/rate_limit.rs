//! Rolling-window rate limiter for task starts. Independent of the worker
//! pool: a task can be pool-ready but rate-blocked. Thread-safe for
//! concurrent acquisition across a phase's tasks.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

pub struct RateLimiter {
    /// Max task starts per window. 0 = unlimited.
    max_per_window: u32,
    window: Duration,
    starts: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_per_window: u32, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            starts: Mutex::new(VecDeque::new()),
        }
    }

    /// Conventional per-minute construction.
    pub fn per_minute(max_per_minute: u32) -> Self {
        Self::new(max_per_minute, Duration::from_secs(60))
    }

    /// Wait until a start slot is free in the rolling window, then claim it.
    pub async fn acquire(&self) {
        if self.max_per_window == 0 {
            return;
        }
        loop {
            let wait = {
                let mut starts = self.starts.lock().expect("rate limiter lock poisoned");
                let now = Instant::now();
                while let Some(&front) = starts.front() {
                    if front + self.window <= now {
                        starts.pop_front();
                    } else {
                        break;
                    }
                }
                if (starts.len() as u32) < self.max_per_window {
                    starts.push_back(now);
                    return;
                }
                // Oldest start leaves the window first.
                *starts.front().expect("non-empty") + self.window - now
            };
            debug!(wait_ms = wait.as_millis() as u64, "Rate limited, waiting");
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn allows_up_to_limit_without_waiting() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn blocks_past_the_limit_until_window_rolls() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        // Third start must wait for the first to roll out of the window.
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_limit_means_unlimited() {
        let limiter = RateLimiter::new(0, Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..1000 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_acquires_never_exceed_window_capacity() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(5, Duration::from_secs(10)));
        let started = Arc::new(std::sync::atomic::AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = limiter.clone();
            let started = started.clone();
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                started.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }));
        }

        // Let the first batch through.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(started.load(std::sync::atomic::Ordering::SeqCst), 5);

        // After the window rolls, the rest proceed.
        tokio::time::sleep(Duration::from_secs(10)).await;
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(started.load(std::sync::atomic::Ordering::SeqCst), 8);
    }
}
