//! TTL response cache with per-key single-flight
//!
//! Concurrent misses for the same key must not fan out to the upstream API:
//! the first caller claims the key by parking a completion signal in the map,
//! performs the fetch outside the lock, then publishes the value and wakes
//! waiters. Waiters re-check the map after waking because a failed fetch
//! leaves the key empty.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, Notify};
use tracing::debug;

/// Tiered TTL by date proximity, for per-day fetches
///
/// Past days are effectively frozen; today moves constantly (flex times,
/// live scores); the tail of the window only changes when schedules shift.
pub fn tiered_ttl_for_date(target: NaiveDate) -> Duration {
    let today = Local::now().date_naive();
    let days_out = (target - today).num_days();

    match days_out {
        days if days < 0 => Duration::from_secs(7 * 24 * 3600),
        0 => Duration::from_secs(30 * 60),
        1 => Duration::from_secs(4 * 3600),
        2..=7 => Duration::from_secs(8 * 3600),
        _ => Duration::from_secs(24 * 3600),
    }
}

/// TTL for teams/conferences listings
pub const TTL_TEAMS: Duration = Duration::from_secs(24 * 3600);
/// TTL for league "next events"
pub const TTL_NEXT_EVENTS: Duration = Duration::from_secs(3600);
/// TTL for team search results
pub const TTL_SEARCH: Duration = Duration::from_secs(24 * 3600);

enum Slot {
    Ready { value: Value, expires_at: Instant },
    Pending(Arc<Notify>),
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Response cache keyed by operation + arguments
pub struct ResponseCache {
    slots: Mutex<HashMap<String, Slot>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Build a cache key from operation name and arguments
    pub fn key(parts: &[&str]) -> String {
        parts.join(":").to_lowercase()
    }

    /// Return the cached value for `key`, or run `fetch` exactly once across
    /// all concurrent callers and cache a `Some` result for `ttl`
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Option<Value>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Option<Value>>,
    {
        let mut fetch = Some(fetch);

        loop {
            enum Action {
                Hit(Value),
                Wait(Arc<Notify>),
                Claimed,
            }

            let action = {
                let mut slots = self.slots.lock().await;
                match slots.get(key) {
                    Some(Slot::Ready { value, expires_at }) if *expires_at > Instant::now() => {
                        Action::Hit(value.clone())
                    }
                    Some(Slot::Pending(notify)) => Action::Wait(notify.clone()),
                    _ => {
                        slots.insert(
                            key.to_string(),
                            Slot::Pending(Arc::new(Notify::new())),
                        );
                        Action::Claimed
                    }
                }
            };

            match action {
                Action::Hit(value) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!("cache hit: {key}");
                    return Some(value);
                }
                Action::Wait(notify) => {
                    notify.notified().await;
                }
                Action::Claimed => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    let Some(fetch) = fetch.take() else {
                        // Unreachable: a call claims at most once. Still
                        // release the slot so waiters never hang.
                        let mut slots = self.slots.lock().await;
                        if let Some(Slot::Pending(notify)) = slots.remove(key) {
                            notify.notify_waiters();
                        }
                        return None;
                    };

                    // The wire call happens with no lock held
                    let result = fetch().await;

                    let mut slots = self.slots.lock().await;
                    let previous = match &result {
                        Some(value) => slots.insert(
                            key.to_string(),
                            Slot::Ready {
                                value: value.clone(),
                                expires_at: Instant::now() + ttl,
                            },
                        ),
                        None => slots.remove(key),
                    };
                    if let Some(Slot::Pending(notify)) = previous {
                        notify.notify_waiters();
                    }
                    return result;
                }
            }
        }
    }

    /// Peek without fetching
    pub async fn get(&self, key: &str) -> Option<Value> {
        let slots = self.slots.lock().await;
        match slots.get(key) {
            Some(Slot::Ready { value, expires_at }) if *expires_at > Instant::now() => {
                Some(value.clone())
            }
            _ => None,
        }
    }

    pub async fn clear(&self) {
        self.slots.lock().await.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.slots.lock().await.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn second_lookup_hits_cache() {
        let cache = ResponseCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            let value = cache
                .get_or_fetch("k", Duration::from_secs(60), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Some(json!({"ok": true}))
                })
                .await;
            assert_eq!(value, Some(json!({"ok": true})));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_fetch() {
        let cache = Arc::new(ResponseCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch("shared", Duration::from_secs(60), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Some(json!(42))
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Some(json!(42)));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        let cache = ResponseCache::new();
        let value = cache
            .get_or_fetch("missing", Duration::from_secs(60), || async { None })
            .await;
        assert!(value.is_none());
        assert!(cache.get("missing").await.is_none());

        // Next caller retries the fetch
        let value = cache
            .get_or_fetch("missing", Duration::from_secs(60), || async {
                Some(json!(1))
            })
            .await;
        assert_eq!(value, Some(json!(1)));
    }

    #[test]
    fn ttl_tiers_by_date_proximity() {
        let today = Local::now().date_naive();
        assert_eq!(
            tiered_ttl_for_date(today - ChronoDuration::days(10)),
            Duration::from_secs(7 * 24 * 3600)
        );
        assert_eq!(tiered_ttl_for_date(today), Duration::from_secs(1800));
        assert_eq!(
            tiered_ttl_for_date(today + ChronoDuration::days(1)),
            Duration::from_secs(4 * 3600)
        );
        assert_eq!(
            tiered_ttl_for_date(today + ChronoDuration::days(5)),
            Duration::from_secs(8 * 3600)
        );
        assert_eq!(
            tiered_ttl_for_date(today + ChronoDuration::days(12)),
            Duration::from_secs(24 * 3600)
        );
    }
}
