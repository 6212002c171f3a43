//! ESPN site API client
//!
//! Fetches schedules, scoreboards, team info/stats, teams, and conferences
//! from ESPN's public site API and projects the responses into the
//! provider-neutral model. ESPN's JSON is treated as an opaque tree; every
//! projection tolerates missing fields and the several shapes ESPN uses for
//! scores, records, and broadcasts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::stats::StatsCache;
use crate::errors::ProviderError;
use crate::models::event::{Conference, LeaderCategory};
use crate::models::{
    Event, EventState, EventStatus, Odds, SeasonType, Team, TeamRecord, TeamStats, Venue,
};
use crate::utils::DateTimeParser;

use super::cache::{tiered_ttl_for_date, ResponseCache, TTL_TEAMS};
use super::rate_limiter::{RateLimitStats, RateLimiter};
use super::{LeagueMappingStore, SportsProvider, StandingEntry};

const SITE_BASE_URL: &str = "https://site.api.espn.com/apis/site/v2/sports";
const STANDINGS_BASE_URL: &str = "https://site.api.espn.com/apis/v2/sports";
const CORE_BASE_URL: &str = "https://sports.core.api.espn.com/v2/sports";

const COLLEGE_LEAGUES: [&str; 3] = [
    "college-football",
    "mens-college-basketball",
    "womens-college-basketball",
];

pub struct EspnClient {
    http: reqwest::Client,
    mappings: Arc<LeagueMappingStore>,
    limiter: RateLimiter,
    cache: ResponseCache,
    stats_cache: StatsCache,
    retry_count: u32,
    retry_delay: Duration,
}

impl EspnClient {
    pub fn new(
        mappings: Arc<LeagueMappingStore>,
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
            // ESPN publishes no hard budget; keep a wide window so bursts
            // from parallel team workers still spread out
            limiter: RateLimiter::per_minute("espn", 300),
            cache: ResponseCache::new(),
            stats_cache: StatsCache::new(),
            retry_count,
            retry_delay,
        }
    }

    fn api_path(&self, league: &str) -> Result<(String, String), ProviderError> {
        let mapping = self
            .mappings
            .get(league, "espn")
            .filter(|mapping| mapping.enabled)
            .ok_or_else(|| ProviderError::UnsupportedLeague {
                league: league.to_string(),
            })?;
        let league_id = mapping
            .provider_league_id
            .ok_or_else(|| ProviderError::UnsupportedLeague {
                league: league.to_string(),
            })?;
        Ok((mapping.sport, league_id))
    }

    /// GET a URL with rate limiting, bounded retries, and reactive 429 waits
    ///
    /// A 429 is waited out (honoring Retry-After, else 60 s) and retried
    /// without consuming the retry budget; only genuine failures count.
    async fn get_json(&self, url: &str) -> Result<Value, ProviderError> {
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
                    warn!("ESPN request failed (attempt {attempt}): {err}");
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
                if status == 404 {
                    return Err(ProviderError::NotFound {
                        resource: url.to_string(),
                    });
                }
                if attempt >= self.retry_count {
                    return Err(ProviderError::Http {
                        provider: "espn".to_string(),
                        status,
                        message: format!("GET {url}"),
                    });
                }
                warn!("ESPN HTTP {status} (attempt {attempt}) for {url}");
                tokio::time::sleep(self.retry_delay * attempt).await;
                continue;
            }

            return response
                .json::<Value>()
                .await
                .map_err(|err| ProviderError::malformed("espn", err.to_string()));
        }
    }

    async fn get_json_cached(
        &self,
        key: String,
        ttl: Duration,
        url: String,
    ) -> Result<Value, ProviderError> {
        let fetched = self
            .cache
            .get_or_fetch(&key, ttl, || async {
                match self.get_json(&url).await {
                    Ok(value) => Some(value),
                    Err(err) => {
                        debug!("ESPN fetch failed for {url}: {err}");
                        None
                    }
                }
            })
            .await;
        fetched.ok_or_else(|| ProviderError::network(&url, "no data after retries"))
    }

    /// Resolve a conference/division group name via the core API
    async fn group_name(
        &self,
        sport: &str,
        league_id: &str,
        group_id: &str,
    ) -> Option<(String, String)> {
        let url = format!("{CORE_BASE_URL}/{sport}/leagues/{league_id}/groups/{group_id}");
        let key = ResponseCache::key(&["espn", "group", sport, league_id, group_id]);
        let value = self
            .cache
            .get_or_fetch(&key, TTL_TEAMS, || async { self.get_json(&url).await.ok() })
            .await?;

        let name = value
            .get("shortName")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .or_else(|| value.get("name").and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();
        let abbrev = value
            .get("abbreviation")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if name.is_empty() {
            None
        } else {
            Some((name, abbrev))
        }
    }

    async fn fetch_team_stats(
        &self,
        team_id: &str,
        league: &str,
    ) -> Result<Option<TeamStats>, ProviderError> {
        let (sport, league_id) = self.api_path(league)?;
        let url = format!("{SITE_BASE_URL}/{sport}/{league_id}/teams/{team_id}");
        let value = self.get_json(&url).await?;
        let Some(team) = value.get("team") else {
            return Ok(None);
        };

        let mut stats = TeamStats::default();

        let record_items = team
            .pointer("/record/items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for item in &record_items {
            let record_type = item.get("type").and_then(Value::as_str).unwrap_or("");
            let summary = item
                .get("summary")
                .and_then(Value::as_str)
                .unwrap_or_default();
            match record_type {
                "total" => {
                    stats.record = TeamRecord::from_summary(summary);
                    if let Some(items) = item.get("stats").and_then(Value::as_array) {
                        for stat in items {
                            let name = stat.get("name").and_then(Value::as_str).unwrap_or("");
                            let number = stat.get("value").and_then(Value::as_f64).unwrap_or(0.0);
                            match name {
                                "wins" => stats.record.wins = number as u32,
                                "losses" => stats.record.losses = number as u32,
                                "ties" => stats.record.ties = number as u32,
                                "winPercent" => stats.record.win_percent = number,
                                "streak" => stats.streak_count = number as i32,
                                "avgPointsFor" => stats.ppg = number,
                                "avgPointsAgainst" => stats.papg = number,
                                "playoffSeed" => {
                                    if number > 0.0 {
                                        stats.playoff_seed = Some(number as u32);
                                    }
                                }
                                "gamesBehind" => stats.games_back = number,
                                _ => {}
                            }
                        }
                    }
                }
                "home" => stats.home_record = summary.to_string(),
                "road" => stats.away_record = summary.to_string(),
                "division" => stats.division_record = summary.to_string(),
                _ => {}
            }
        }

        // ESPN reports 99 for unranked college teams
        stats.rank = team
            .get("rank")
            .and_then(Value::as_u64)
            .filter(|rank| (1..=25).contains(rank))
            .map(|rank| rank as u32);

        // Conference/division resolution. groups.id is the division unless
        // isConference says otherwise; groups.parent.id is the conference.
        let groups = team.get("groups").cloned().unwrap_or(Value::Null);
        let group_id = json_string(groups.get("id"));
        let parent_id = json_string(groups.pointer("/parent/id"));
        let is_conference = groups
            .get("isConference")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let is_college = COLLEGE_LEAGUES.contains(&league_id.as_str());

        if is_conference {
            if let Some(id) = &group_id {
                if let Some((name, abbrev)) = self.group_name(&sport, &league_id, id).await {
                    stats.conference_name = name;
                    stats.conference_abbrev = abbrev;
                }
            }
        } else {
            if let Some(id) = &group_id {
                if let Some((name, _)) = self.group_name(&sport, &league_id, id).await {
                    stats.division_name = name;
                }
            }
            if let Some(id) = &parent_id {
                if let Some((name, abbrev)) = self.group_name(&sport, &league_id, id).await {
                    stats.conference_abbrev = abbrev;
                    // Pro fans care about the division; college fans about
                    // the conference
                    if is_college || stats.division_name.is_empty() {
                        stats.conference_name = name;
                    } else {
                        stats.conference_name = stats.division_name.clone();
                    }
                }
            }
        }

        Ok(Some(stats))
    }
}

#[async_trait]
impl SportsProvider for EspnClient {
    fn name(&self) -> &'static str {
        "espn"
    }

    fn supports_league(&self, league: &str) -> bool {
        self.mappings.supports(league, "espn")
    }

    async fn list_events(
        &self,
        league: &str,
        date: NaiveDate,
    ) -> Result<Vec<Event>, ProviderError> {
        self.get_scoreboard(league, date).await
    }

    async fn get_team_schedule(
        &self,
        team_id: &str,
        league: &str,
        _days_ahead: u32,
    ) -> Result<Vec<Event>, ProviderError> {
        let (sport, league_id) = self.api_path(league)?;
        let url = format!("{SITE_BASE_URL}/{sport}/{league_id}/teams/{team_id}/schedule");
        let key = ResponseCache::key(&["espn", "schedule", league, team_id]);
        let value = self
            .get_json_cached(key, Duration::from_secs(30 * 60), url)
            .await?;

        let events = value
            .get("events")
            .and_then(Value::as_array)
            .map(|events| {
                events
                    .iter()
                    .filter_map(|raw| project_event(raw, &sport, league))
                    .collect()
            })
            .unwrap_or_default();
        Ok(events)
    }

    async fn get_scoreboard(
        &self,
        league: &str,
        date: NaiveDate,
    ) -> Result<Vec<Event>, ProviderError> {
        let (sport, league_id) = self.api_path(league)?;
        let date_str = DateTimeParser::format_yyyymmdd(date);
        let url = format!("{SITE_BASE_URL}/{sport}/{league_id}/scoreboard?dates={date_str}");
        let key = ResponseCache::key(&["espn", "scoreboard", league, &date_str]);
        let value = self
            .get_json_cached(key, tiered_ttl_for_date(date), url)
            .await?;

        let events = value
            .get("events")
            .and_then(Value::as_array)
            .map(|events| {
                events
                    .iter()
                    .filter_map(|raw| project_event(raw, &sport, league))
                    .collect()
            })
            .unwrap_or_default();
        Ok(events)
    }

    async fn get_team_info(
        &self,
        team_id: &str,
        league: &str,
    ) -> Result<Option<Team>, ProviderError> {
        let (sport, league_id) = self.api_path(league)?;
        let url = format!("{SITE_BASE_URL}/{sport}/{league_id}/teams/{team_id}");
        let value = match self.get_json(&url).await {
            Ok(value) => value,
            Err(ProviderError::NotFound { .. }) => return Ok(None),
            Err(err) => return Err(err),
        };
        Ok(value.get("team").map(project_team))
    }

    async fn get_team_stats(
        &self,
        team_id: &str,
        league: &str,
    ) -> Result<Option<TeamStats>, ProviderError> {
        if let Some(cached) = self.stats_cache.get(team_id, league) {
            return Ok(Some(cached));
        }

        let stats = self.fetch_team_stats(team_id, league).await?;
        if let Some(stats) = &stats {
            self.stats_cache.insert(team_id, league, stats.clone());
        }
        Ok(stats)
    }

    async fn get_standings(&self, league: &str) -> Result<Vec<StandingEntry>, ProviderError> {
        let (sport, league_id) = self.api_path(league)?;
        let url = format!("{STANDINGS_BASE_URL}/{sport}/{league_id}/standings");
        let key = ResponseCache::key(&["espn", "standings", league]);
        let value = self.get_json_cached(key, TTL_TEAMS, url).await?;

        let mut entries = Vec::new();
        collect_standing_entries(&value, None, &mut entries);
        Ok(entries)
    }

    async fn list_teams(&self, league: &str) -> Result<Vec<Team>, ProviderError> {
        let (sport, league_id) = self.api_path(league)?;
        let url = format!("{SITE_BASE_URL}/{sport}/{league_id}/teams?limit=500");
        let key = ResponseCache::key(&["espn", "teams", league]);
        let value = self.get_json_cached(key, TTL_TEAMS, url).await?;

        let mut teams = Vec::new();
        if let Some(sports) = value.get("sports").and_then(Value::as_array) {
            for sport_obj in sports {
                let leagues = sport_obj
                    .get("leagues")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                for league_obj in leagues {
                    let league_teams = league_obj
                        .get("teams")
                        .and_then(Value::as_array)
                        .cloned()
                        .unwrap_or_default();
                    for wrapper in league_teams {
                        if let Some(raw) = wrapper.get("team") {
                            teams.push(project_team(raw));
                        }
                    }
                }
            }
        }
        Ok(teams)
    }

    async fn list_conferences(&self, league: &str) -> Result<Vec<Conference>, ProviderError> {
        let (sport, league_id) = self.api_path(league)?;
        if !COLLEGE_LEAGUES.contains(&league_id.as_str()) {
            return Ok(Vec::new());
        }

        // The standings response lists all current conferences as children,
        // which tracks realignment without a hardcoded list
        let url = format!("{STANDINGS_BASE_URL}/{sport}/{league_id}/standings");
        let key = ResponseCache::key(&["espn", "conferences", league]);
        let value = self.get_json_cached(key, TTL_TEAMS, url).await?;

        let mut conferences: Vec<Conference> = value
            .get("children")
            .and_then(Value::as_array)
            .map(|children| {
                children
                    .iter()
                    .filter_map(|child| {
                        let id = json_string(child.get("id"))?;
                        let name = child
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string();
                        Some(Conference {
                            id,
                            name,
                            abbreviation: child
                                .get("abbreviation")
                                .and_then(Value::as_str)
                                .map(String::from),
                            logo_url: None,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        conferences.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(conferences)
    }

    async fn list_conference_teams(
        &self,
        league: &str,
        conference_id: &str,
    ) -> Result<Vec<Team>, ProviderError> {
        let (sport, league_id) = self.api_path(league)?;
        let season = Utc::now().year();
        let url = format!(
            "{CORE_BASE_URL}/{sport}/leagues/{league_id}/seasons/{season}/types/2/groups/{conference_id}/teams?limit=50"
        );
        let key = ResponseCache::key(&["espn", "confteams", league, conference_id]);
        let value = self.get_json_cached(key, TTL_TEAMS, url).await?;

        // The core API answers with $ref links that each need a follow-up
        let mut teams = Vec::new();
        let refs: Vec<String> = value
            .get("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        item.get("$ref").and_then(Value::as_str).map(String::from)
                    })
                    .collect()
            })
            .unwrap_or_default();

        for team_ref in refs {
            match self.get_json(&team_ref).await {
                Ok(raw) => teams.push(project_team(&raw)),
                Err(err) => warn!("Failed to fetch conference team {team_ref}: {err}"),
            }
        }
        Ok(teams)
    }

    fn rate_limit_stats(&self) -> RateLimitStats {
        self.limiter.stats()
    }

    fn reset_rate_limit_stats(&self) {
        self.limiter.reset_stats();
    }

    async fn clear_cache(&self) {
        self.cache.clear().await;
        self.stats_cache.clear();
    }
}

fn json_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Scores arrive as an integer, a numeric string, or an object with a
/// numeric sub-field
fn parse_score(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_u64().map(|n| n as u32),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(map) => map
            .get("value")
            .and_then(Value::as_f64)
            .map(|v| v as u32)
            .or_else(|| {
                map.get("displayValue")
                    .and_then(Value::as_str)
                    .and_then(|s| s.trim().parse().ok())
            }),
        _ => None,
    }
}

/// Broadcast lists mix plain strings, `{names: [..]}`, and `{name: ..}`
fn parse_broadcasts(competition: &Value) -> Vec<String> {
    let mut broadcasts = Vec::new();
    if let Some(list) = competition.get("broadcasts").and_then(Value::as_array) {
        for entry in list {
            match entry {
                Value::String(name) => broadcasts.push(name.clone()),
                Value::Object(_) => {
                    if let Some(names) = entry.get("names").and_then(Value::as_array) {
                        broadcasts
                            .extend(names.iter().filter_map(Value::as_str).map(String::from));
                    } else if let Some(name) = entry.get("name").and_then(Value::as_str) {
                        broadcasts.push(name.to_string());
                    }
                }
                _ => {}
            }
        }
    }
    broadcasts
}

/// Records appear under `record` (schedule API) or `records` (scoreboard
/// API), as an array of typed entries or a bare object
fn parse_record(competitor: &Value) -> Option<TeamRecord> {
    let records = competitor
        .get("records")
        .or_else(|| competitor.get("record"))?;

    let entries: Vec<&Value> = match records {
        Value::Array(list) => list.iter().collect(),
        Value::Object(_) => vec![records],
        _ => return None,
    };

    for entry in entries {
        let entry_type = entry.get("type").and_then(Value::as_str).unwrap_or("");
        let entry_name = entry.get("name").and_then(Value::as_str).unwrap_or("");
        if entry_type == "total" || entry_name == "overall" || entry_type.is_empty() {
            let summary = entry
                .get("summary")
                .and_then(Value::as_str)
                .or_else(|| entry.get("displayValue").and_then(Value::as_str))
                .unwrap_or("0-0");
            return Some(TeamRecord::from_summary(summary));
        }
    }
    None
}

/// Odds arrays may contain nulls; the first usable entry wins
fn parse_odds(competition: &Value) -> Option<Odds> {
    let odds_list = competition.get("odds").and_then(Value::as_array)?;
    let primary = odds_list
        .iter()
        .find(|entry| entry.is_object())?;
    Some(Odds {
        provider: primary
            .pointer("/provider/name")
            .and_then(Value::as_str)
            .map(String::from),
        spread: primary
            .get("details")
            .and_then(Value::as_str)
            .map(String::from),
        over_under: primary.get("overUnder").and_then(Value::as_f64),
        home_moneyline: primary
            .pointer("/homeTeamOdds/moneyLine")
            .and_then(Value::as_i64),
        away_moneyline: primary
            .pointer("/awayTeamOdds/moneyLine")
            .and_then(Value::as_i64),
    })
}

fn parse_status(competition: &Value) -> EventStatus {
    let status_type = competition.pointer("/status/type").cloned().unwrap_or(Value::Null);
    let name = status_type
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_uppercase();
    let state_str = status_type.get("state").and_then(Value::as_str).unwrap_or("");
    let completed = status_type
        .get("completed")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let state = if name.contains("POSTPONED") {
        EventState::Postponed
    } else if name.contains("CANCEL") {
        EventState::Cancelled
    } else if completed || name.contains("FINAL") || state_str == "post" {
        EventState::Final
    } else if state_str == "in" {
        EventState::InProgress
    } else {
        EventState::Pre
    };

    EventStatus {
        state,
        completed: completed || state == EventState::Final,
        detail: status_type
            .get("detail")
            .and_then(Value::as_str)
            .or_else(|| status_type.get("shortDetail").and_then(Value::as_str))
            .map(String::from),
        period: competition
            .pointer("/status/period")
            .and_then(Value::as_u64)
            .map(|period| period as u32),
    }
}

fn parse_season_type(raw: &Value) -> SeasonType {
    let season = raw.get("season").cloned().unwrap_or(Value::Null);
    if let Some(slug) = season.get("slug").and_then(Value::as_str) {
        if slug.contains("pre") {
            return SeasonType::Preseason;
        }
        if slug.contains("post") || slug.contains("playoff") {
            return SeasonType::Postseason;
        }
        return SeasonType::Regular;
    }
    match season.get("type").and_then(Value::as_u64) {
        Some(1) => SeasonType::Preseason,
        Some(3) => SeasonType::Postseason,
        _ => SeasonType::Regular,
    }
}

pub(crate) fn project_team(raw: &Value) -> Team {
    let logo = raw
        .get("logo")
        .and_then(Value::as_str)
        .map(String::from)
        .or_else(|| {
            raw.pointer("/logos/0/href")
                .and_then(Value::as_str)
                .map(String::from)
        });

    Team {
        id: json_string(raw.get("id")).unwrap_or_default(),
        name: raw
            .get("displayName")
            .and_then(Value::as_str)
            .or_else(|| raw.get("name").and_then(Value::as_str))
            .unwrap_or_default()
            .to_string(),
        abbreviation: raw
            .get("abbreviation")
            .and_then(Value::as_str)
            .map(String::from),
        short_name: raw
            .get("shortDisplayName")
            .and_then(Value::as_str)
            .or_else(|| raw.get("shortName").and_then(Value::as_str))
            .map(String::from),
        slug: raw.get("slug").and_then(Value::as_str).map(String::from),
        location: raw
            .get("location")
            .and_then(Value::as_str)
            .map(String::from),
        logo_url: logo,
        color: raw.get("color").and_then(Value::as_str).map(String::from),
        rank: raw
            .get("rank")
            .and_then(Value::as_u64)
            .filter(|rank| (1..=25).contains(rank))
            .map(|rank| rank as u32),
    }
}

fn parse_leaders(competition: &Value) -> Vec<LeaderCategory> {
    let mut leaders = Vec::new();
    let sources = competition
        .get("leaders")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    for category in sources {
        let name = category
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let entries = category
            .get("leaders")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if let Some(top) = entries.first() {
            leaders.push(LeaderCategory {
                // Per-game categories are plain names; season aggregates end
                // in a rate suffix like "PerGame"
                season_aggregate: name.ends_with("PerGame") || name.starts_with("total"),
                name,
                team_id: json_string(top.pointer("/team/id")).unwrap_or_default(),
                player_name: top
                    .pointer("/athlete/displayName")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                display_value: top
                    .get("displayValue")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }
    }
    leaders
}

/// Project one raw ESPN event into the neutral model
///
/// Returns None when the event is missing the fields nothing downstream can
/// work without (id, date, two competitors); everything else is optional.
pub(crate) fn project_event(raw: &Value, sport: &str, league: &str) -> Option<Event> {
    let id = json_string(raw.get("id"))?;
    let start = raw
        .get("date")
        .and_then(Value::as_str)
        .and_then(|date| DateTimeParser::parse_flexible(date).ok())?;

    let competition = raw.pointer("/competitions/0")?;
    let competitors = competition.get("competitors").and_then(Value::as_array)?;
    if competitors.len() < 2 {
        return None;
    }

    let home_raw = competitors
        .iter()
        .find(|c| c.get("homeAway").and_then(Value::as_str) == Some("home"))
        .unwrap_or(&competitors[0]);
    let away_raw = competitors
        .iter()
        .find(|c| c.get("homeAway").and_then(Value::as_str) == Some("away"))
        .unwrap_or(&competitors[1]);

    let mut home_team = home_raw.get("team").map(project_team).unwrap_or_default();
    let mut away_team = away_raw.get("team").map(project_team).unwrap_or_default();

    // Scoreboard responses carry poll ranks on the competitor
    for (competitor, team) in [(home_raw, &mut home_team), (away_raw, &mut away_team)] {
        if team.rank.is_none() {
            team.rank = competitor
                .pointer("/curatedRank/current")
                .and_then(Value::as_u64)
                .filter(|rank| (1..=25).contains(rank))
                .map(|rank| rank as u32);
        }
    }

    let status = parse_status(competition);
    let mut home_score = parse_score(home_raw.get("score"));
    let mut away_score = parse_score(away_raw.get("score"));
    // Scores are absent iff the game has not started
    if status.state == EventState::Pre {
        home_score = None;
        away_score = None;
    }

    let venue = competition.get("venue").map(|venue| Venue {
        name: venue
            .get("fullName")
            .and_then(Value::as_str)
            .or_else(|| venue.get("shortName").and_then(Value::as_str))
            .map(String::from),
        city: venue
            .pointer("/address/city")
            .and_then(Value::as_str)
            .map(String::from),
        state: venue
            .pointer("/address/state")
            .and_then(Value::as_str)
            .map(String::from),
        indoor: venue
            .get("indoor")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    });

    Some(Event {
        id,
        league: league.to_string(),
        sport: sport.to_string(),
        name: raw.get("name").and_then(Value::as_str).map(String::from),
        short_name: raw
            .get("shortName")
            .and_then(Value::as_str)
            .map(String::from),
        start,
        home_record: parse_record(home_raw),
        away_record: parse_record(away_raw),
        home_team,
        away_team,
        home_score,
        away_score,
        venue: venue.unwrap_or_default(),
        broadcasts: parse_broadcasts(competition),
        season_type: parse_season_type(raw),
        status,
        odds: parse_odds(competition),
        conference_competition: competition
            .get("conferenceCompetition")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        source_league: None,
        leaders: parse_leaders(competition),
    })
}

fn collect_standing_entries(node: &Value, conference: Option<&str>, out: &mut Vec<StandingEntry>) {
    if let Some(children) = node.get("children").and_then(Value::as_array) {
        for child in children {
            let name = child.get("name").and_then(Value::as_str);
            collect_standing_entries(child, name.or(conference), out);
        }
    }

    let entries = node
        .pointer("/standings/entries")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for entry in entries {
        let Some(team) = entry.get("team") else {
            continue;
        };
        let mut standing = StandingEntry {
            team_id: json_string(team.get("id")).unwrap_or_default(),
            team_name: team
                .get("displayName")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            record_summary: String::new(),
            playoff_seed: None,
            games_back: 0.0,
            conference: conference.map(String::from),
        };
        if let Some(stats) = entry.get("stats").and_then(Value::as_array) {
            for stat in stats {
                let name = stat.get("name").and_then(Value::as_str).unwrap_or("");
                match name {
                    "overall" => {
                        if let Some(summary) = stat.get("displayValue").and_then(Value::as_str) {
                            standing.record_summary = summary.to_string();
                        }
                    }
                    "playoffSeed" => {
                        standing.playoff_seed = stat
                            .get("value")
                            .and_then(Value::as_f64)
                            .filter(|seed| *seed > 0.0)
                            .map(|seed| seed as u32);
                    }
                    "gamesBehind" => {
                        standing.games_back =
                            stat.get("value").and_then(Value::as_f64).unwrap_or(0.0);
                    }
                    _ => {}
                }
            }
        }
        out.push(standing);
    }
}
