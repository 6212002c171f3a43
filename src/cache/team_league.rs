//! Process-wide team/league reverse index
//!
//! Two indexes back the matcher's league shortlisting: normalized team name
//! to the (league, team, sport) rows that carry it, and team id to its
//! multi-league memberships (soccer clubs playing domestic league + cup +
//! European competition). Refresh builds a whole new snapshot off to the
//! side and swaps it in atomically; readers never observe a partial update.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::matching::team_matcher::normalize_search_name;
use crate::models::TeamLeagueRow;
use crate::providers::{LeagueMappingStore, ProviderRegistry};

#[derive(Default)]
pub struct TeamLeagueSnapshot {
    by_name: HashMap<String, Vec<TeamLeagueRow>>,
    by_league: HashMap<String, Vec<TeamLeagueRow>>,
    leagues_by_team: HashMap<String, BTreeSet<String>>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl TeamLeagueSnapshot {
    pub fn build(
        rows: Vec<TeamLeagueRow>,
        extra_memberships: Vec<(String, String)>,
    ) -> Self {
        let mut snapshot = Self {
            refreshed_at: Some(Utc::now()),
            ..Default::default()
        };

        for row in rows {
            let normalized = normalize_search_name(&row.team_name);
            if normalized.is_empty() {
                continue;
            }
            snapshot
                .leagues_by_team
                .entry(row.team_id.clone())
                .or_default()
                .insert(row.league.clone());
            snapshot
                .by_league
                .entry(row.league.clone())
                .or_default()
                .push(row.clone());
            snapshot.by_name.entry(normalized).or_default().push(row);
        }

        for (team_id, league) in extra_memberships {
            snapshot
                .leagues_by_team
                .entry(team_id)
                .or_default()
                .insert(league);
        }

        snapshot
    }

    /// Rows whose normalized name matches the query
    ///
    /// Exact lookup first; when that misses, fall back to a scan accepting
    /// entries the query is a prefix of. The shortlist feeds the full fuzzy
    /// matcher, so approximate is fine here.
    pub fn lookup_name(&self, raw_name: &str) -> Vec<&TeamLeagueRow> {
        let normalized = normalize_search_name(raw_name);
        if normalized.is_empty() {
            return Vec::new();
        }

        if let Some(rows) = self.by_name.get(&normalized) {
            return rows.iter().collect();
        }

        self.by_name
            .iter()
            .filter(|(name, _)| name.starts_with(&normalized) && normalized.len() >= 4)
            .flat_map(|(_, rows)| rows.iter())
            .collect()
    }

    /// Leagues in which both team names resolve
    pub fn find_candidate_leagues(&self, team1: &str, team2: &str) -> Vec<String> {
        let leagues1: BTreeSet<&str> = self
            .lookup_name(team1)
            .into_iter()
            .map(|row| row.league.as_str())
            .collect();
        if leagues1.is_empty() {
            return Vec::new();
        }
        let leagues2: BTreeSet<&str> = self
            .lookup_name(team2)
            .into_iter()
            .map(|row| row.league.as_str())
            .collect();

        leagues1
            .intersection(&leagues2)
            .map(|league| league.to_string())
            .collect()
    }

    /// All leagues a team belongs to
    pub fn leagues_for_team(&self, team_id: &str) -> Vec<String> {
        self.leagues_by_team
            .get(team_id)
            .map(|leagues| leagues.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn teams_in_league(&self, league: &str) -> Vec<TeamLeagueRow> {
        self.by_league.get(league).cloned().unwrap_or_default()
    }

    pub fn team_count(&self) -> usize {
        self.by_league.values().map(Vec::len).sum()
    }
}

/// Handle to the current snapshot
pub struct TeamLeagueCache {
    snapshot: RwLock<Arc<TeamLeagueSnapshot>>,
}

impl TeamLeagueCache {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(TeamLeagueSnapshot::default())),
        }
    }

    /// Current snapshot; cheap, and stable for as long as the Arc is held
    pub fn snapshot(&self) -> Arc<TeamLeagueSnapshot> {
        self.snapshot
            .read()
            .expect("team/league cache lock poisoned")
            .clone()
    }

    pub fn install(&self, snapshot: TeamLeagueSnapshot) {
        *self
            .snapshot
            .write()
            .expect("team/league cache lock poisoned") = Arc::new(snapshot);
    }

    /// Rebuild the snapshot from provider team lists
    ///
    /// Fans out one `list_teams` per (provider, league) over a bounded
    /// worker pool, skipping providers without enabled mappings. Returns
    /// the rows so the caller can persist them.
    pub async fn refresh_from_providers(
        &self,
        registry: &ProviderRegistry,
        mappings: &LeagueMappingStore,
        soccer_memberships: Vec<(String, String)>,
        workers: usize,
    ) -> anyhow::Result<Vec<TeamLeagueRow>> {
        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        let mut tasks = tokio::task::JoinSet::new();

        for provider in registry.get_all() {
            let leagues = mappings.leagues_for(provider.name());
            if leagues.is_empty() {
                continue;
            }
            for league in leagues {
                let provider = provider.clone();
                let semaphore = semaphore.clone();
                tasks.spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok()?;
                    match provider.list_teams(&league).await {
                        Ok(teams) => Some((provider.name().to_string(), league, teams)),
                        Err(err) => {
                            warn!(
                                "Team list refresh failed for {} via {}: {err}",
                                league,
                                provider.name()
                            );
                            None
                        }
                    }
                });
            }
        }

        let mut rows = Vec::new();
        let mut seen = BTreeSet::new();
        while let Some(joined) = tasks.join_next().await {
            let Ok(Some((provider_name, league, teams))) = joined else {
                continue;
            };
            let sport = mappings
                .get(&league, &provider_name)
                .map(|mapping| mapping.sport)
                .unwrap_or_default();
            for team in teams {
                // First provider wins per (league, team)
                if !seen.insert((league.clone(), team.id.clone())) {
                    continue;
                }
                rows.push(TeamLeagueRow {
                    league: league.clone(),
                    team_id: team.id,
                    team_name: team.name,
                    team_abbrev: team.abbreviation,
                    team_short_name: team.short_name,
                    sport: sport.clone(),
                });
            }
        }

        info!("Team/league cache refreshed: {} rows", rows.len());
        self.install(TeamLeagueSnapshot::build(rows.clone(), soccer_memberships));
        Ok(rows)
    }
}

impl Default for TeamLeagueCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(league: &str, team_id: &str, name: &str, sport: &str) -> TeamLeagueRow {
        TeamLeagueRow {
            league: league.to_string(),
            team_id: team_id.to_string(),
            team_name: name.to_string(),
            team_abbrev: None,
            team_short_name: None,
            sport: sport.to_string(),
        }
    }

    fn snapshot() -> TeamLeagueSnapshot {
        TeamLeagueSnapshot::build(
            vec![
                row("nfl", "10", "Tennessee Titans", "football"),
                row("college-football", "2633", "Tennessee Volunteers", "football"),
                row("mens-college-basketball", "2633", "Tennessee Volunteers", "basketball"),
                row("nba", "15", "Memphis Grizzlies", "basketball"),
                row("mens-college-basketball", "235", "Memphis Tigers", "basketball"),
            ],
            vec![
                ("86".to_string(), "esp.1".to_string()),
                ("86".to_string(), "uefa.champions".to_string()),
            ],
        )
    }

    #[test]
    fn team_names_repeat_across_leagues() {
        let snapshot = snapshot();
        let rows = snapshot.lookup_name("Tennessee Volunteers");
        let leagues: Vec<&str> = rows.iter().map(|row| row.league.as_str()).collect();
        assert!(leagues.contains(&"college-football"));
        assert!(leagues.contains(&"mens-college-basketball"));
    }

    #[test]
    fn candidate_leagues_require_both_teams() {
        let snapshot = snapshot();
        let leagues =
            snapshot.find_candidate_leagues("Tennessee Volunteers", "Memphis Tigers");
        assert_eq!(leagues, vec!["mens-college-basketball".to_string()]);
        assert!(snapshot
            .find_candidate_leagues("Tennessee Titans", "Memphis Tigers")
            .is_empty());
    }

    #[test]
    fn multi_league_memberships_are_tracked() {
        let snapshot = snapshot();
        let leagues = snapshot.leagues_for_team("86");
        assert_eq!(
            leagues,
            vec!["esp.1".to_string(), "uefa.champions".to_string()]
        );
    }

    #[test]
    fn install_swaps_whole_snapshot() {
        let cache = TeamLeagueCache::new();
        assert_eq!(cache.snapshot().team_count(), 0);
        cache.install(snapshot());
        assert_eq!(cache.snapshot().team_count(), 5);
    }
}
