//! Six-hour TTL cache for team season statistics
//!
//! Property: for any (team, league) the cache returns the same value within
//! the TTL window unless explicitly invalidated.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::models::TeamStats;

const STATS_TTL: Duration = Duration::from_secs(6 * 3600);

pub struct StatsCache {
    entries: Mutex<HashMap<(String, String), (TeamStats, Instant)>>,
    ttl: Duration,
}

impl StatsCache {
    pub fn new() -> Self {
        Self::with_ttl(STATS_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn get(&self, team_id: &str, league: &str) -> Option<TeamStats> {
        let entries = self.entries.lock().expect("stats cache lock poisoned");
        entries
            .get(&(team_id.to_string(), league.to_string()))
            .filter(|(_, cached_at)| cached_at.elapsed() < self.ttl)
            .map(|(stats, _)| stats.clone())
    }

    pub fn insert(&self, team_id: &str, league: &str, stats: TeamStats) {
        let mut entries = self.entries.lock().expect("stats cache lock poisoned");
        entries.insert(
            (team_id.to_string(), league.to_string()),
            (stats, Instant::now()),
        );
    }

    /// Drop one entry before its TTL expires
    pub fn invalidate(&self, team_id: &str, league: &str) {
        let mut entries = self.entries.lock().expect("stats cache lock poisoned");
        entries.remove(&(team_id.to_string(), league.to_string()));
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .expect("stats cache lock poisoned")
            .clear();
    }
}

impl Default for StatsCache {
    fn default() -> Self {
        Self::new()
    }
}
