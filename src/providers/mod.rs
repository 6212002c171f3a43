//! Upstream sports data providers
//!
//! Each provider wraps one upstream HTTP API behind the [`SportsProvider`]
//! trait, returning values projected into the provider-neutral model. All
//! clients share the same discipline: a sliding-window rate limiter, a TTL
//! response cache with per-key single-flight, bounded retries with linear
//! backoff, and graceful degradation to "no data" on transient failures.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::models::event::Conference;
use crate::models::{Event, LeagueMapping, Team, TeamStats};

pub mod cache;
pub mod espn;
pub mod rate_limiter;
pub mod registry;
pub mod tsdb;

pub use cache::{tiered_ttl_for_date, ResponseCache};
pub use rate_limiter::{RateLimitStats, RateLimiter};
pub use registry::ProviderRegistry;

/// One row of league standings in the provider-neutral shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandingEntry {
    pub team_id: String,
    pub team_name: String,
    pub record_summary: String,
    pub playoff_seed: Option<u32>,
    pub games_back: f64,
    pub conference: Option<String>,
}

/// The capability set every data provider exposes
///
/// Failure semantics: transient upstream failures surface as errors only
/// after the retry budget; rate-limit waits never fail a call. A provider
/// that cannot answer returns empty/None rather than guessing.
#[async_trait]
pub trait SportsProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the league-mapping store reports support for this league
    fn supports_league(&self, league: &str) -> bool;

    /// All events for a league on a date
    async fn list_events(&self, league: &str, date: NaiveDate)
        -> Result<Vec<Event>, ProviderError>;

    /// A team's schedule; implementations may return the full season and
    /// leave windowing to the caller
    async fn get_team_schedule(
        &self,
        team_id: &str,
        league: &str,
        days_ahead: u32,
    ) -> Result<Vec<Event>, ProviderError>;

    /// Scoreboard for a league and date, with same-day signals (live scores,
    /// odds, expanded broadcasts) the schedule endpoints omit
    async fn get_scoreboard(
        &self,
        league: &str,
        date: NaiveDate,
    ) -> Result<Vec<Event>, ProviderError>;

    async fn get_team_info(
        &self,
        team_id: &str,
        league: &str,
    ) -> Result<Option<Team>, ProviderError>;

    async fn get_team_stats(
        &self,
        team_id: &str,
        league: &str,
    ) -> Result<Option<TeamStats>, ProviderError>;

    async fn get_standings(&self, league: &str) -> Result<Vec<StandingEntry>, ProviderError>;

    async fn list_teams(&self, league: &str) -> Result<Vec<Team>, ProviderError>;

    async fn list_conferences(&self, league: &str) -> Result<Vec<Conference>, ProviderError>;

    async fn list_conference_teams(
        &self,
        league: &str,
        conference_id: &str,
    ) -> Result<Vec<Team>, ProviderError>;

    fn rate_limit_stats(&self) -> RateLimitStats;

    fn reset_rate_limit_stats(&self);

    async fn clear_cache(&self);
}

/// In-memory view of the league-provider mapping table
///
/// Loaded at startup and replaced wholesale when mappings change; readers
/// always see a consistent map.
pub struct LeagueMappingStore {
    mappings: RwLock<HashMap<(String, String), LeagueMapping>>,
}

impl LeagueMappingStore {
    pub fn new(rows: Vec<LeagueMapping>) -> Self {
        let store = Self {
            mappings: RwLock::new(HashMap::new()),
        };
        store.replace_all(rows);
        store
    }

    pub fn empty() -> Self {
        Self {
            mappings: RwLock::new(HashMap::new()),
        }
    }

    pub fn replace_all(&self, rows: Vec<LeagueMapping>) {
        let map = rows
            .into_iter()
            .map(|row| ((row.league.to_lowercase(), row.provider.clone()), row))
            .collect();
        *self.mappings.write().expect("mapping lock poisoned") = map;
    }

    pub fn get(&self, league: &str, provider: &str) -> Option<LeagueMapping> {
        self.mappings
            .read()
            .expect("mapping lock poisoned")
            .get(&(league.to_lowercase(), provider.to_string()))
            .cloned()
    }

    pub fn supports(&self, league: &str, provider: &str) -> bool {
        self.get(league, provider)
            .map(|mapping| mapping.enabled)
            .unwrap_or(false)
    }

    /// Enabled leagues mapped for a provider
    pub fn leagues_for(&self, provider: &str) -> Vec<String> {
        let mut leagues: Vec<String> = self
            .mappings
            .read()
            .expect("mapping lock poisoned")
            .values()
            .filter(|mapping| mapping.enabled && mapping.provider == provider)
            .map(|mapping| mapping.league.clone())
            .collect();
        leagues.sort();
        leagues
    }

    /// Display name fallback: mapping display name, then provider league
    /// name, then the uppercased code
    pub fn display_name(&self, league: &str) -> String {
        let mappings = self.mappings.read().expect("mapping lock poisoned");
        mappings
            .values()
            .filter(|mapping| mapping.league.eq_ignore_ascii_case(league))
            .find_map(|mapping| {
                mapping
                    .display_name
                    .clone()
                    .or_else(|| mapping.provider_league_name.clone())
            })
            .unwrap_or_else(|| league.to_uppercase())
    }

    /// Sport for a league, from any provider's mapping
    pub fn sport_for(&self, league: &str) -> Option<String> {
        let mappings = self.mappings.read().expect("mapping lock poisoned");
        mappings
            .values()
            .find(|mapping| mapping.league.eq_ignore_ascii_case(league))
            .map(|mapping| mapping.sport.clone())
    }

    /// Keywords marking a league as single-event; empty when it is not one
    pub fn single_event_keywords(&self, league: &str) -> Vec<String> {
        let mappings = self.mappings.read().expect("mapping lock poisoned");
        mappings
            .values()
            .filter(|mapping| mapping.enabled)
            .filter(|mapping| mapping.league.eq_ignore_ascii_case(league))
            .find(|mapping| !mapping.single_event_keywords.is_empty())
            .map(|mapping| mapping.single_event_keywords.clone())
            .unwrap_or_default()
    }

    /// All enabled single-event leagues with their keywords
    pub fn single_event_leagues(&self) -> Vec<(String, Vec<String>)> {
        let mappings = self.mappings.read().expect("mapping lock poisoned");
        let mut leagues: Vec<(String, Vec<String>)> = mappings
            .values()
            .filter(|mapping| mapping.enabled && !mapping.single_event_keywords.is_empty())
            .map(|mapping| {
                (
                    mapping.league.clone(),
                    mapping.single_event_keywords.clone(),
                )
            })
            .collect();
        leagues.sort();
        leagues.dedup();
        leagues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(league: &str, provider: &str, enabled: bool) -> LeagueMapping {
        LeagueMapping {
            league: league.to_string(),
            provider: provider.to_string(),
            provider_league_id: Some(league.to_string()),
            provider_league_name: Some(format!("{} League", league.to_uppercase())),
            sport: "basketball".to_string(),
            display_name: None,
            logo_url: None,
            enabled,
            single_event_keywords: Vec::new(),
        }
    }

    #[test]
    fn store_lookup_is_case_insensitive() {
        let store = LeagueMappingStore::new(vec![mapping("nba", "espn", true)]);
        assert!(store.supports("NBA", "espn"));
        assert!(!store.supports("nba", "tsdb"));
    }

    #[test]
    fn disabled_mappings_do_not_support() {
        let store = LeagueMappingStore::new(vec![mapping("nba", "espn", false)]);
        assert!(!store.supports("nba", "espn"));
        assert!(store.leagues_for("espn").is_empty());
    }

    #[test]
    fn display_name_falls_back_to_uppercase_code() {
        let store = LeagueMappingStore::new(vec![mapping("nba", "espn", true)]);
        assert_eq!(store.display_name("nba"), "NBA League");
        assert_eq!(store.display_name("xfl"), "XFL");
    }

    #[test]
    fn single_event_leagues_come_from_mapping_keywords() {
        let mut ufc = mapping("ufc", "espn", true);
        ufc.sport = "mma".to_string();
        ufc.single_event_keywords = vec!["ufc".to_string(), "fight night".to_string()];
        let store = LeagueMappingStore::new(vec![mapping("nba", "espn", true), ufc]);

        assert_eq!(
            store.single_event_keywords("UFC"),
            vec!["ufc".to_string(), "fight night".to_string()]
        );
        assert!(store.single_event_keywords("nba").is_empty());
        assert_eq!(
            store.single_event_leagues(),
            vec![(
                "ufc".to_string(),
                vec!["ufc".to_string(), "fight night".to_string()]
            )]
        );
    }

    #[test]
    fn disabled_single_event_league_is_ignored() {
        let mut ufc = mapping("ufc", "espn", false);
        ufc.single_event_keywords = vec!["ufc".to_string()];
        let store = LeagueMappingStore::new(vec![ufc]);
        assert!(store.single_event_keywords("ufc").is_empty());
        assert!(store.single_event_leagues().is_empty());
    }
}
