//! Sliding-window rate limiter with statistics tracking
//!
//! Two wait paths exist. Preemptive: before a request goes out, expired
//! timestamps are pruned and, if the window is full, the caller sleeps until
//! the oldest slot frees. Reactive: the client reports a 429 and the wait it
//! served. Waits never fail a request; they are counted and surfaced for
//! status reporting.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// Point-in-time snapshot of rate limiting activity
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStats {
    pub total_requests: u64,
    /// Times the limiter made a caller wait before sending
    pub preemptive_waits: u64,
    /// Times the upstream answered 429
    pub reactive_waits: u64,
    pub total_wait_seconds: f64,
    pub last_wait_at: Option<DateTime<Utc>>,
    pub last_wait_seconds: f64,
    pub session_start: DateTime<Utc>,
}

impl RateLimitStats {
    fn new() -> Self {
        Self {
            total_requests: 0,
            preemptive_waits: 0,
            reactive_waits: 0,
            total_wait_seconds: 0.0,
            last_wait_at: None,
            last_wait_seconds: 0.0,
            session_start: Utc::now(),
        }
    }

    pub fn total_waits(&self) -> u64 {
        self.preemptive_waits + self.reactive_waits
    }

    pub fn is_rate_limited(&self) -> bool {
        self.total_waits() > 0
    }
}

struct LimiterState {
    requests: VecDeque<Instant>,
    stats: RateLimitStats,
}

/// Sliding-window limiter shared by one provider client
pub struct RateLimiter {
    name: &'static str,
    max_requests: usize,
    window: Duration,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(name: &'static str, max_requests: usize, window: Duration) -> Self {
        Self {
            name,
            max_requests,
            window,
            state: Mutex::new(LimiterState {
                requests: VecDeque::new(),
                stats: RateLimitStats::new(),
            }),
        }
    }

    pub fn per_minute(name: &'static str, max_requests: usize) -> Self {
        Self::new(name, max_requests, Duration::from_secs(60))
    }

    /// Wait until a request slot is available. Never fails.
    ///
    /// The lock is never held across the sleep; waiters re-check the window
    /// after waking because another task may have taken the freed slot.
    pub async fn acquire(&self) {
        let mut counted = false;
        loop {
            let wait = {
                let mut state = self.state.lock().expect("limiter lock poisoned");
                if !counted {
                    state.stats.total_requests += 1;
                    counted = true;
                }

                let now = Instant::now();
                while state
                    .requests
                    .front()
                    .map(|first| now.duration_since(*first) >= self.window)
                    .unwrap_or(false)
                {
                    state.requests.pop_front();
                }

                if state.requests.len() < self.max_requests {
                    state.requests.push_back(now);
                    return;
                }

                let oldest = *state.requests.front().expect("window is full");
                let wait = self.window.saturating_sub(now.duration_since(oldest));
                state.stats.preemptive_waits += 1;
                state.stats.total_wait_seconds += wait.as_secs_f64();
                state.stats.last_wait_at = Some(Utc::now());
                state.stats.last_wait_seconds = wait.as_secs_f64();
                info!(
                    "{} rate limit approaching, waiting {:.1}s (waits this session: {})",
                    self.name,
                    wait.as_secs_f64(),
                    state.stats.total_waits()
                );
                wait
            };

            tokio::time::sleep(wait).await;
        }
    }

    /// Record a reactive wait after an upstream 429
    pub fn record_reactive_wait(&self, wait: Duration) {
        let mut state = self.state.lock().expect("limiter lock poisoned");
        state.stats.reactive_waits += 1;
        state.stats.total_wait_seconds += wait.as_secs_f64();
        state.stats.last_wait_at = Some(Utc::now());
        state.stats.last_wait_seconds = wait.as_secs_f64();
        info!(
            "{} rate limit hit (429), waiting {:.0}s (waits this session: {})",
            self.name,
            wait.as_secs_f64(),
            state.stats.total_waits()
        );
    }

    pub fn stats(&self) -> RateLimitStats {
        self.state.lock().expect("limiter lock poisoned").stats.clone()
    }

    /// Reset statistics, e.g. at the start of a generation run
    pub fn reset_stats(&self) {
        self.state.lock().expect("limiter lock poisoned").stats = RateLimitStats::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_under_limit_never_waits() {
        let limiter = RateLimiter::per_minute("test", 10);
        for _ in 0..10 {
            limiter.acquire().await;
        }
        let stats = limiter.stats();
        assert_eq!(stats.total_requests, 10);
        assert_eq!(stats.preemptive_waits, 0);
        assert!(!stats.is_rate_limited());
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_over_limit_waits_and_counts() {
        let limiter = RateLimiter::new("test", 30, Duration::from_secs(60));
        for _ in 0..35 {
            limiter.acquire().await;
        }
        let stats = limiter.stats();
        assert_eq!(stats.total_requests, 35);
        assert!(stats.preemptive_waits >= 5);
        assert!(stats.last_wait_seconds > 0.0);
        assert!(stats.total_wait_seconds >= 0.0);
        assert!(stats.total_requests >= stats.preemptive_waits + stats.reactive_waits);
    }

    #[tokio::test]
    async fn reactive_waits_accumulate() {
        let limiter = RateLimiter::per_minute("test", 30);
        limiter.record_reactive_wait(Duration::from_secs(60));
        let stats = limiter.stats();
        assert_eq!(stats.reactive_waits, 1);
        assert!((stats.total_wait_seconds - 60.0).abs() < 1e-9);
        assert!(stats.last_wait_at.is_some());
    }
}
