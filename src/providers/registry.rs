//! Provider registry
//!
//! The single place providers are wired up. Everything else reaches
//! providers through a registry handle constructed at startup; there is no
//! global. Lower priority is tried first, and `get_for_league` returns the
//! first enabled provider whose league-mapping store reports support.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::SportsProvider;

struct RegisteredProvider {
    name: &'static str,
    priority: i32,
    enabled: bool,
    provider: Arc<dyn SportsProvider>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    pub name: &'static str,
    pub priority: i32,
    pub enabled: bool,
}

#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<RegisteredProvider>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: &'static str,
        priority: i32,
        enabled: bool,
        provider: Arc<dyn SportsProvider>,
    ) {
        debug!("Registered provider: {name} (priority={priority}, enabled={enabled})");
        self.providers.push(RegisteredProvider {
            name,
            priority,
            enabled,
            provider,
        });
        self.providers.sort_by_key(|entry| entry.priority);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SportsProvider>> {
        self.providers
            .iter()
            .find(|entry| entry.enabled && entry.name == name)
            .map(|entry| entry.provider.clone())
    }

    /// Enabled providers in priority order
    pub fn get_all(&self) -> Vec<Arc<dyn SportsProvider>> {
        self.providers
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| entry.provider.clone())
            .collect()
    }

    /// First enabled provider supporting a league
    pub fn get_for_league(&self, league: &str) -> Option<Arc<dyn SportsProvider>> {
        self.get_all()
            .into_iter()
            .find(|provider| provider.supports_league(league))
    }

    pub fn info(&self) -> Vec<ProviderInfo> {
        self.providers
            .iter()
            .map(|entry| ProviderInfo {
                name: entry.name,
                priority: entry.priority,
                enabled: entry.enabled,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::models::event::Conference;
    use crate::models::{Event, Team, TeamStats};
    use crate::providers::rate_limiter::{RateLimitStats, RateLimiter};
    use crate::providers::StandingEntry;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    struct FakeProvider {
        name: &'static str,
        leagues: Vec<&'static str>,
        limiter: RateLimiter,
    }

    impl FakeProvider {
        fn new(name: &'static str, leagues: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                name,
                leagues,
                limiter: RateLimiter::per_minute(name, 100),
            })
        }
    }

    #[async_trait]
    impl SportsProvider for FakeProvider {
        fn name(&self) -> &'static str {
            self.name
        }
        fn supports_league(&self, league: &str) -> bool {
            self.leagues.contains(&league)
        }
        async fn list_events(
            &self,
            _league: &str,
            _date: NaiveDate,
        ) -> Result<Vec<Event>, ProviderError> {
            Ok(Vec::new())
        }
        async fn get_team_schedule(
            &self,
            _team_id: &str,
            _league: &str,
            _days_ahead: u32,
        ) -> Result<Vec<Event>, ProviderError> {
            Ok(Vec::new())
        }
        async fn get_scoreboard(
            &self,
            _league: &str,
            _date: NaiveDate,
        ) -> Result<Vec<Event>, ProviderError> {
            Ok(Vec::new())
        }
        async fn get_team_info(
            &self,
            _team_id: &str,
            _league: &str,
        ) -> Result<Option<Team>, ProviderError> {
            Ok(None)
        }
        async fn get_team_stats(
            &self,
            _team_id: &str,
            _league: &str,
        ) -> Result<Option<TeamStats>, ProviderError> {
            Ok(None)
        }
        async fn get_standings(&self, _league: &str) -> Result<Vec<StandingEntry>, ProviderError> {
            Ok(Vec::new())
        }
        async fn list_teams(&self, _league: &str) -> Result<Vec<Team>, ProviderError> {
            Ok(Vec::new())
        }
        async fn list_conferences(
            &self,
            _league: &str,
        ) -> Result<Vec<Conference>, ProviderError> {
            Ok(Vec::new())
        }
        async fn list_conference_teams(
            &self,
            _league: &str,
            _conference_id: &str,
        ) -> Result<Vec<Team>, ProviderError> {
            Ok(Vec::new())
        }
        fn rate_limit_stats(&self) -> RateLimitStats {
            self.limiter.stats()
        }
        fn reset_rate_limit_stats(&self) {
            self.limiter.reset_stats();
        }
        async fn clear_cache(&self) {}
    }

    #[test]
    fn priority_order_and_league_routing() {
        let mut registry = ProviderRegistry::new();
        registry.register("backup", 10, true, FakeProvider::new("backup", vec!["nfl", "aus.1"]));
        registry.register("primary", 0, true, FakeProvider::new("primary", vec!["nfl"]));

        let all = registry.get_all();
        assert_eq!(all[0].name(), "primary");
        assert_eq!(all[1].name(), "backup");

        assert_eq!(registry.get_for_league("nfl").unwrap().name(), "primary");
        assert_eq!(registry.get_for_league("aus.1").unwrap().name(), "backup");
        assert!(registry.get_for_league("xfl").is_none());
    }

    #[test]
    fn disabled_providers_are_skipped() {
        let mut registry = ProviderRegistry::new();
        registry.register("off", 0, false, FakeProvider::new("off", vec!["nfl"]));
        assert!(registry.get("off").is_none());
        assert!(registry.get_for_league("nfl").is_none());
    }
}
