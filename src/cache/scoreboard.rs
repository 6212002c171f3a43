//! Per-generation scoreboard cache
//!
//! Scoped to one generation run and cleared at its start, this cache stops
//! a hundred parallel team workers from each fetching the same league/day
//! scoreboard. Reads use double-checked locking: a fast read, then a
//! synchronized re-check that claims the key before fetching. The fetch
//! itself runs with no lock held; waiters park on a completion signal
//! stored in the map.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::{Mutex, Notify};

use crate::models::Event;
use crate::utils::DateTimeParser;

enum Slot {
    Ready(Arc<Vec<Event>>),
    Pending(Arc<Notify>),
}

pub struct ScoreboardCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl ScoreboardCache {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn key(sport: &str, league: &str, date: NaiveDate) -> String {
        format!("{sport}:{league}:{}", DateTimeParser::format_yyyymmdd(date))
    }

    /// Get the scoreboard for (sport, league, date), fetching at most once
    ///
    /// A failed fetch resolves every waiter with None and leaves the key
    /// empty so a later caller can retry.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        sport: &str,
        league: &str,
        date: NaiveDate,
        fetch: F,
    ) -> Option<Arc<Vec<Event>>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Option<Vec<Event>>>,
    {
        let key = Self::key(sport, league, date);
        let mut fetch = Some(fetch);

        loop {
            enum Action {
                Hit(Arc<Vec<Event>>),
                Wait(Arc<Notify>),
                Claimed,
            }

            let action = {
                let mut slots = self.slots.lock().await;
                match slots.get(&key) {
                    Some(Slot::Ready(events)) => Action::Hit(events.clone()),
                    Some(Slot::Pending(notify)) => Action::Wait(notify.clone()),
                    None => {
                        slots.insert(key.clone(), Slot::Pending(Arc::new(Notify::new())));
                        Action::Claimed
                    }
                }
            };

            match action {
                Action::Hit(events) => return Some(events),
                Action::Wait(notify) => notify.notified().await,
                Action::Claimed => {
                    let Some(fetch) = fetch.take() else {
                        // Unreachable: a call claims at most once. Still
                        // release the slot so waiters never hang.
                        let mut slots = self.slots.lock().await;
                        if let Some(Slot::Pending(notify)) = slots.remove(&key) {
                            notify.notify_waiters();
                        }
                        return None;
                    };
                    let result = fetch().await.map(Arc::new);

                    let mut slots = self.slots.lock().await;
                    let previous = match &result {
                        Some(events) => slots.insert(key.clone(), Slot::Ready(events.clone())),
                        None => slots.remove(&key),
                    };
                    if let Some(Slot::Pending(notify)) = previous {
                        notify.notify_waiters();
                    }
                    return result;
                }
            }
        }
    }

    /// Clear all entries; called at the start of each generation run
    pub async fn clear(&self) {
        self.slots.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.lock().await.is_empty()
    }
}

impl Default for ScoreboardCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn parallel_workers_share_one_fetch_per_day() {
        let cache = Arc::new(ScoreboardCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let date = NaiveDate::from_ymd_opt(2025, 12, 7).unwrap();

        let mut handles = Vec::new();
        for _ in 0..12 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch("football", "nfl", date, move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Some(Vec::new())
                    })
                    .await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_some());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn clear_resets_between_generations() {
        let cache = ScoreboardCache::new();
        let date = NaiveDate::from_ymd_opt(2025, 12, 7).unwrap();
        cache
            .get_or_fetch("football", "nfl", date, || async { Some(Vec::new()) })
            .await;
        assert!(!cache.is_empty().await);
        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
