//! TheSportsDB API client
//!
//! Free-tier constraints shape everything here: 30 requests/minute overall,
//! so the limiter runs at 25/min for headroom and caching is aggressive.
//! Per-day event lookups route by league NAME (eventsday.php) while next-event
//! lookups route by league ID; both come from the league-mapping store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::ProviderError;
use crate::models::event::Conference;
use crate::models::{Event, EventState, EventStatus, SeasonType, Team, TeamStats, Venue};
use crate::utils::DateTimeParser;

use super::cache::{tiered_ttl_for_date, ResponseCache, TTL_NEXT_EVENTS, TTL_SEARCH, TTL_TEAMS};
use super::rate_limiter::{RateLimitStats, RateLimiter};
use super::{LeagueMappingStore, SportsProvider, StandingEntry};

const TSDB_BASE_URL: &str = "https://www.thesportsdb.com/api/v1/json";

/// Free test key published by TheSportsDB
const FREE_API_KEY: &str = "123";

pub struct TsdbClient {
    http: reqwest::Client,
    mappings: Arc<LeagueMappingStore>,
    limiter: RateLimiter,
    cache: ResponseCache,
    explicit_key: Option<String>,
    retry_count: u32,
    retry_delay: Duration,
}

impl TsdbClient {
    pub fn new(
        mappings: Arc<LeagueMappingStore>,
        api_key: Option<String>,
        requests_per_minute: u32,
        timeout: Duration,
        retry_count: u32,
        retry_delay: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            http,
            mappings,
            limiter: RateLimiter::per_minute("tsdb", requests_per_minute as usize),
            cache: ResponseCache::new(),
            explicit_key: api_key,
            retry_count,
            retry_delay,
        }
    }

    /// Key resolution: explicit config -> TSDB_API_KEY env -> free key
    fn api_key(&self) -> String {
        if let Some(key) = &self.explicit_key {
            return key.clone();
        }
        std::env::var("TSDB_API_KEY").unwrap_or_else(|_| FREE_API_KEY.to_string())
    }

    pub fn is_premium(&self) -> bool {
        self.api_key() != FREE_API_KEY
    }

    fn endpoint_url(&self, endpoint: &str, params: &[(&str, &str)]) -> String {
        let mut url = format!("{TSDB_BASE_URL}/{}/{endpoint}", self.api_key());
        if !params.is_empty() {
            let query: Vec<String> = params
                .iter()
                .map(|(name, value)| format!("{name}={}", urlencoding::encode(value)))
                .collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }

    async fn request(&self, url: &str) -> Result<Value, ProviderError> {
        self.limiter.acquire().await;

        let mut attempt = 0;
        loop {
            let response = match self.http.get(url).send().await {
                Ok(response) => response,
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.retry_count {
                        if err.is_timeout() {
                            return Err(ProviderError::timeout(url));
                        }
                        return Err(ProviderError::network(url, err.to_string()));
                    }
                    warn!("TSDB request failed (attempt {attempt}): {err}");
                    tokio::time::sleep(self.retry_delay * attempt).await;
                    continue;
                }
            };

            if response.status().as_u16() == 429 {
                let wait = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|header| header.to_str().ok())
                    .and_then(|value| value.parse::<u64>().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(Duration::from_secs(60));
                self.limiter.record_reactive_wait(wait);
                tokio::time::sleep(wait).await;
                continue;
            }

            if !response.status().is_success() {
                attempt += 1;
                let status = response.status().as_u16();
                if attempt >= self.retry_count {
                    return Err(ProviderError::Http {
                        provider: "tsdb".to_string(),
                        status,
                        message: format!("GET {url}"),
                    });
                }
                tokio::time::sleep(self.retry_delay * attempt).await;
                continue;
            }

            return response
                .json::<Value>()
                .await
                .map_err(|err| ProviderError::malformed("tsdb", err.to_string()));
        }
    }

    async fn request_cached(
        &self,
        key: String,
        ttl: Duration,
        url: String,
    ) -> Result<Value, ProviderError> {
        let fetched = self
            .cache
            .get_or_fetch(&key, ttl, || async {
                match self.request(&url).await {
                    Ok(value) => Some(value),
                    Err(err) => {
                        debug!("TSDB fetch failed for {url}: {err}");
                        None
                    }
                }
            })
            .await;
        fetched.ok_or_else(|| ProviderError::network(&url, "no data after retries"))
    }

    fn league_name(&self, league: &str) -> Option<String> {
        self.mappings
            .get(league, "tsdb")
            .and_then(|mapping| mapping.provider_league_name)
    }

    fn league_id(&self, league: &str) -> Option<String> {
        self.mappings
            .get(league, "tsdb")
            .and_then(|mapping| mapping.provider_league_id)
    }

    fn sport_for(&self, league: &str) -> String {
        self.mappings
            .get(league, "tsdb")
            .map(|mapping| mapping.sport)
            .unwrap_or_else(|| "sports".to_string())
    }

    /// Search for a team by name; results cached for 24 hours
    pub async fn search_team(&self, name: &str) -> Result<Vec<Team>, ProviderError> {
        let key = ResponseCache::key(&["tsdb", "searchteam", &name.to_lowercase()]);
        let url = self.endpoint_url("searchteams.php", &[("t", name)]);
        let value = self.request_cached(key, TTL_SEARCH, url).await?;
        Ok(project_team_list(value.get("teams")))
    }
}

fn tsdb_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn tsdb_score(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_u64().map(|n| n as u32),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn project_team_list(value: Option<&Value>) -> Vec<Team> {
    value
        .and_then(Value::as_array)
        .map(|teams| teams.iter().filter_map(project_tsdb_team).collect())
        .unwrap_or_default()
}

fn project_tsdb_team(raw: &Value) -> Option<Team> {
    let id = tsdb_string(raw.get("idTeam"))?;
    let name = tsdb_string(raw.get("strTeam"))?;
    Some(Team {
        id,
        short_name: tsdb_string(raw.get("strTeamShort")).or_else(|| Some(name.clone())),
        abbreviation: tsdb_string(raw.get("strTeamShort")),
        slug: None,
        location: None,
        logo_url: tsdb_string(raw.get("strBadge")).or_else(|| tsdb_string(raw.get("strTeamBadge"))),
        color: None,
        rank: None,
        name,
    })
}

fn project_tsdb_event(raw: &Value, sport: &str, league: &str) -> Option<Event> {
    let id = tsdb_string(raw.get("idEvent"))?;

    // strTimestamp is UTC when present; otherwise combine dateEvent+strTime
    let start = tsdb_string(raw.get("strTimestamp"))
        .and_then(|ts| DateTimeParser::parse_flexible(&ts).ok())
        .or_else(|| {
            let date = tsdb_string(raw.get("dateEvent"))?;
            let time = tsdb_string(raw.get("strTime")).unwrap_or_else(|| "00:00:00".to_string());
            DateTimeParser::parse_flexible(&format!("{date} {time}")).ok()
        })?;

    let home_team = Team {
        id: tsdb_string(raw.get("idHomeTeam")).unwrap_or_default(),
        name: tsdb_string(raw.get("strHomeTeam"))?,
        ..Default::default()
    };
    let away_team = Team {
        id: tsdb_string(raw.get("idAwayTeam")).unwrap_or_default(),
        name: tsdb_string(raw.get("strAwayTeam"))?,
        ..Default::default()
    };

    let status_str = tsdb_string(raw.get("strStatus")).unwrap_or_default();
    let state = match status_str.as_str() {
        "Match Finished" | "FT" | "AOT" => EventState::Final,
        "Postponed" => EventState::Postponed,
        "Cancelled" => EventState::Cancelled,
        "Not Started" | "NS" | "" => EventState::Pre,
        _ => EventState::InProgress,
    };
    let status = EventStatus {
        state,
        completed: state == EventState::Final,
        detail: Some(status_str).filter(|s| !s.is_empty()),
        period: None,
    };

    let (home_score, away_score) = if state == EventState::Pre {
        (None, None)
    } else {
        (
            tsdb_score(raw.get("intHomeScore")),
            tsdb_score(raw.get("intAwayScore")),
        )
    };

    Some(Event {
        id,
        league: league.to_string(),
        sport: sport.to_string(),
        name: tsdb_string(raw.get("strEvent")),
        short_name: None,
        start,
        home_team,
        away_team,
        home_score,
        away_score,
        home_record: None,
        away_record: None,
        venue: Venue {
            name: tsdb_string(raw.get("strVenue")),
            city: tsdb_string(raw.get("strCity")),
            state: None,
            indoor: false,
        },
        broadcasts: Vec::new(),
        season_type: SeasonType::Regular,
        status,
        odds: None,
        conference_competition: false,
        source_league: None,
        leaders: Vec::new(),
    })
}

#[async_trait]
impl SportsProvider for TsdbClient {
    fn name(&self) -> &'static str {
        "tsdb"
    }

    fn supports_league(&self, league: &str) -> bool {
        self.mappings.supports(league, "tsdb")
    }

    async fn list_events(
        &self,
        league: &str,
        date: NaiveDate,
    ) -> Result<Vec<Event>, ProviderError> {
        let league_name = self
            .league_name(league)
            .ok_or_else(|| ProviderError::UnsupportedLeague {
                league: league.to_string(),
            })?;
        let date_str = date.format("%Y-%m-%d").to_string();
        let key = ResponseCache::key(&["tsdb", "eventsday", league, &date_str]);
        // eventsday.php routes by league NAME, not id
        let url = self.endpoint_url("eventsday.php", &[("d", &date_str), ("l", &league_name)]);
        let value = self
            .request_cached(key, tiered_ttl_for_date(date), url)
            .await?;

        let sport = self.sport_for(league);
        Ok(value
            .get("events")
            .and_then(Value::as_array)
            .map(|events| {
                events
                    .iter()
                    .filter_map(|raw| project_tsdb_event(raw, &sport, league))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_team_schedule(
        &self,
        team_id: &str,
        league: &str,
        _days_ahead: u32,
    ) -> Result<Vec<Event>, ProviderError> {
        let sport = self.sport_for(league);

        // Free tier has no combined schedule endpoint; merge next and last
        let next_url = self.endpoint_url("eventsnext.php", &[("id", team_id)]);
        let last_url = self.endpoint_url("eventslast.php", &[("id", team_id)]);

        let mut events = Vec::new();
        for (url, field) in [(next_url, "events"), (last_url, "results")] {
            match self.request(&url).await {
                Ok(value) => {
                    if let Some(list) = value.get(field).and_then(Value::as_array) {
                        events.extend(
                            list.iter()
                                .filter_map(|raw| project_tsdb_event(raw, &sport, league)),
                        );
                    }
                }
                Err(err) if err.is_transient() => {
                    debug!("TSDB schedule fetch degraded for team {team_id}: {err}");
                }
                Err(err) => return Err(err),
            }
        }
        events.sort_by_key(|event| event.start);
        events.dedup_by(|a, b| a.id == b.id);
        Ok(events)
    }

    async fn get_scoreboard(
        &self,
        league: &str,
        date: NaiveDate,
    ) -> Result<Vec<Event>, ProviderError> {
        self.list_events(league, date).await
    }

    async fn get_team_info(
        &self,
        team_id: &str,
        league: &str,
    ) -> Result<Option<Team>, ProviderError> {
        let _ = league;
        // lookupteam.php is unreliable on the free tier; callers preferring
        // reliability should use search_team
        let url = self.endpoint_url("lookupteam.php", &[("id", team_id)]);
        let value = self.request(&url).await?;
        Ok(value
            .get("teams")
            .and_then(Value::as_array)
            .and_then(|teams| teams.first())
            .and_then(project_tsdb_team))
    }

    async fn get_team_stats(
        &self,
        _team_id: &str,
        _league: &str,
    ) -> Result<Option<TeamStats>, ProviderError> {
        // TSDB exposes no season statistics on the free tier
        Ok(None)
    }

    async fn get_standings(&self, _league: &str) -> Result<Vec<StandingEntry>, ProviderError> {
        Ok(Vec::new())
    }

    async fn list_teams(&self, league: &str) -> Result<Vec<Team>, ProviderError> {
        let league_name = self
            .league_name(league)
            .ok_or_else(|| ProviderError::UnsupportedLeague {
                league: league.to_string(),
            })?;
        let key = ResponseCache::key(&["tsdb", "teams", league]);
        // search_all_teams.php works on the free tier where the id-routed
        // lookup does not
        let url = self.endpoint_url("search_all_teams.php", &[("l", &league_name)]);
        let value = self.request_cached(key, TTL_TEAMS, url).await?;
        Ok(project_team_list(value.get("teams")))
    }

    async fn list_conferences(&self, _league: &str) -> Result<Vec<Conference>, ProviderError> {
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

    async fn clear_cache(&self) {
        self.cache.clear().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn projects_event_from_timestamp() {
        let raw = json!({
            "idEvent": "2052711",
            "strEvent": "Perth Glory vs Wellington Phoenix",
            "strTimestamp": "2025-12-12T10:55:00",
            "idHomeTeam": "134712",
            "strHomeTeam": "Perth Glory",
            "idAwayTeam": "134713",
            "strAwayTeam": "Wellington Phoenix",
            "strStatus": "Not Started",
            "strVenue": "HBF Park"
        });
        let event = project_tsdb_event(&raw, "soccer", "aus.1").unwrap();
        assert_eq!(event.id, "2052711");
        assert_eq!(event.home_team.name, "Perth Glory");
        assert_eq!(event.status.state, EventState::Pre);
        assert_eq!(event.home_score, None);
        assert_eq!(event.venue.name.as_deref(), Some("HBF Park"));
    }

    #[test]
    fn projects_finished_event_with_string_scores() {
        let raw = json!({
            "idEvent": "2052712",
            "dateEvent": "2025-12-05",
            "strTime": "20:00:00",
            "idHomeTeam": "1",
            "strHomeTeam": "Home FC",
            "idAwayTeam": "2",
            "strAwayTeam": "Away FC",
            "strStatus": "Match Finished",
            "intHomeScore": "2",
            "intAwayScore": "1"
        });
        let event = project_tsdb_event(&raw, "soccer", "eng.1").unwrap();
        assert!(event.is_final());
        assert_eq!(event.home_score, Some(2));
        assert_eq!(event.away_score, Some(1));
    }

    #[test]
    fn event_without_teams_is_skipped() {
        let raw = json!({"idEvent": "1", "dateEvent": "2025-12-05"});
        assert!(project_tsdb_event(&raw, "soccer", "eng.1").is_none());
    }

    #[test]
    fn free_key_is_default() {
        let mappings = Arc::new(LeagueMappingStore::empty());
        let client = TsdbClient::new(
            mappings,
            None,
            25,
            Duration::from_secs(10),
            3,
            Duration::from_secs(1),
        );
        // Explicit key wins over everything
        if std::env::var("TSDB_API_KEY").is_err() {
            assert!(!client.is_premium());
        }
        let keyed = TsdbClient::new(
            Arc::new(LeagueMappingStore::empty()),
            Some("abc123".to_string()),
            25,
            Duration::from_secs(10),
            3,
            Duration::from_secs(1),
        );
        assert!(keyed.is_premium());
    }
}
