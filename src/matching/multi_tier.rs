//! Multi-tier stream-to-event matching
//!
//! Tiered detection flow:
//!   Tier 1: league indicator + teams ("NHL: Bruins vs Rangers")
//!   Tier 2: sport indicator + teams, tried across that sport's leagues
//!   Tier 3a/3b/3c: teams resolved via the team/league cache, disambiguated
//!            by date+time, time-only, or closest-to-now
//!   Tier 4a/4b: one team resolved, opponent found by searching its schedule
//!   Single-event leagues: keyword + exactly one event that day (UFC cards)
//!
//! A schedule lookup confirms every tier: teams alone never match a stream,
//! there must be a game. When the first-choice team pair has no game, up to
//! N alternate pairings from `all_matches` are tried (the "Maryland" could
//! be Terrapins / Eastern Shore / Loyola problem).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use tracing::{debug, warn};

use crate::cache::TeamLeagueSnapshot;
use crate::models::{Event, Team, TeamAlias};
use crate::providers::{LeagueMappingStore, ProviderRegistry};

use super::classifier::{ClassifiedStream, Classifier, StreamCategory};
use super::normalizer::Normalizer;
use super::team_matcher::{TeamIndex, TeamMatch};
use super::MatchTier;

/// Days ahead a schedule search covers; 30 days absorbs most scheduling
const SEARCH_DAYS_AHEAD: i64 = 30;
/// Days back, for in-progress games only
const SEARCH_DAYS_BACK: i64 = 1;

/// Supplies schedule/event data to the matcher
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn team_schedule(&self, team_id: &str, league: &str) -> Vec<Event>;
    async fn league_events(&self, league: &str, date: NaiveDate) -> Vec<Event>;
}

/// Production event source backed by the provider registry
pub struct RegistryEventSource {
    registry: Arc<ProviderRegistry>,
}

impl RegistryEventSource {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl EventSource for RegistryEventSource {
    async fn team_schedule(&self, team_id: &str, league: &str) -> Vec<Event> {
        let Some(provider) = self.registry.get_for_league(league) else {
            return Vec::new();
        };
        match provider
            .get_team_schedule(team_id, league, SEARCH_DAYS_AHEAD as u32)
            .await
        {
            Ok(events) => events,
            Err(err) => {
                debug!("Schedule lookup failed for {team_id} in {league}: {err}");
                Vec::new()
            }
        }
    }

    async fn league_events(&self, league: &str, date: NaiveDate) -> Vec<Event> {
        let Some(provider) = self.registry.get_for_league(league) else {
            return Vec::new();
        };
        match provider.list_events(league, date).await {
            Ok(events) => events,
            Err(err) => {
                debug!("League events lookup failed for {league}: {err}");
                Vec::new()
            }
        }
    }
}

/// Supplies per-league team indexes (cache first, provider fallback handled
/// by the caller that built the snapshot)
pub trait TeamIndexProvider: Send + Sync {
    fn index_for(&self, league: &str) -> Option<Arc<TeamIndex>>;
}

/// Index provider over the team/league cache snapshot, building per-league
/// indexes lazily and memoizing them for the matcher's lifetime
pub struct SnapshotIndexProvider {
    snapshot: Arc<TeamLeagueSnapshot>,
    aliases: HashMap<String, Vec<TeamAlias>>,
    built: Mutex<HashMap<String, Arc<TeamIndex>>>,
}

impl SnapshotIndexProvider {
    pub fn new(snapshot: Arc<TeamLeagueSnapshot>, aliases: Vec<TeamAlias>) -> Self {
        let mut by_league: HashMap<String, Vec<TeamAlias>> = HashMap::new();
        for alias in aliases {
            by_league.entry(alias.league.clone()).or_default().push(alias);
        }
        Self {
            snapshot,
            aliases: by_league,
            built: Mutex::new(HashMap::new()),
        }
    }
}

impl TeamIndexProvider for SnapshotIndexProvider {
    fn index_for(&self, league: &str) -> Option<Arc<TeamIndex>> {
        {
            let built = self.built.lock().expect("index cache lock poisoned");
            if let Some(index) = built.get(league) {
                return Some(index.clone());
            }
        }

        let rows = self.snapshot.teams_in_league(league);
        if rows.is_empty() {
            return None;
        }
        let aliases = self.aliases.get(league).cloned().unwrap_or_default();
        let index = Arc::new(TeamIndex::from_cache_rows(league, rows, aliases));

        let mut built = self.built.lock().expect("index cache lock poisoned");
        Some(built.entry(league.to_string()).or_insert(index).clone())
    }
}

/// A single-event league and the stream keywords that identify it
#[derive(Debug, Clone)]
pub struct SingleEventLeague {
    pub league: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Leagues considered during matching (the group's candidate set)
    pub candidate_leagues: Vec<String>,
    pub include_final_events: bool,
    pub single_event_leagues: Vec<SingleEventLeague>,
    /// Cap on alternate pairings tried per side during disambiguation
    pub max_alternates: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            candidate_leagues: Vec::new(),
            include_final_events: false,
            single_event_leagues: Vec::new(),
            max_alternates: 5,
        }
    }
}

/// A successful stream match
#[derive(Debug, Clone)]
pub struct StreamMatch {
    pub event: Event,
    pub league: String,
    pub tier: MatchTier,
    pub away_team_id: Option<String>,
    pub home_team_id: Option<String>,
    pub disambiguated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    Placeholder,
    NoTeams,
    NoLeagueDetected,
    NoGameFound,
    GameCompleted,
}

#[derive(Debug, Clone)]
pub struct MatchMiss {
    pub reason: MissReason,
    pub detail: Option<String>,
}

#[derive(Debug, Clone)]
pub enum MatchOutcome {
    Matched(StreamMatch),
    Miss(MatchMiss),
}

impl MatchOutcome {
    fn miss(reason: MissReason, detail: Option<String>) -> Self {
        Self::Miss(MatchMiss { reason, detail })
    }

    pub fn matched(&self) -> Option<&StreamMatch> {
        match self {
            Self::Matched(matched) => Some(matched),
            Self::Miss(_) => None,
        }
    }
}

/// League indicator aliases: stream shorthand to canonical league code
const LEAGUE_ALIASES: [(&str, &str); 6] = [
    ("ncaam", "mens-college-basketball"),
    ("ncaab", "mens-college-basketball"),
    ("ncaaw", "womens-college-basketball"),
    ("ncaaf", "college-football"),
    ("cfb", "college-football"),
    ("epl", "eng.1"),
];

const SPORT_WORDS: [&str; 5] = ["hockey", "basketball", "football", "baseball", "soccer"];

struct ResolvedPair {
    away: TeamMatch,
    home: TeamMatch,
}

pub struct MultiTierMatcher {
    normalizer: Normalizer,
    classifier: Classifier,
    events: Arc<dyn EventSource>,
    indexes: Arc<dyn TeamIndexProvider>,
    snapshot: Arc<TeamLeagueSnapshot>,
    mappings: Arc<LeagueMappingStore>,
    config: MatcherConfig,
}

impl MultiTierMatcher {
    pub fn new(
        normalizer: Normalizer,
        classifier: Classifier,
        events: Arc<dyn EventSource>,
        indexes: Arc<dyn TeamIndexProvider>,
        snapshot: Arc<TeamLeagueSnapshot>,
        mappings: Arc<LeagueMappingStore>,
        config: MatcherConfig,
    ) -> Self {
        Self {
            normalizer,
            classifier,
            events,
            indexes,
            snapshot,
            mappings,
            config,
        }
    }

    /// Match one stream name to an event across the candidate leagues
    pub async fn match_stream(&self, stream_name: &str, now: DateTime<Utc>) -> MatchOutcome {
        let today = now.date_naive();
        let normalized = self.normalizer.normalize(stream_name, today);
        let classified = self.classifier.classify(stream_name, &normalized, today);

        if classified.category == StreamCategory::Placeholder {
            return MatchOutcome::miss(MissReason::Placeholder, None);
        }

        // Single-event leagues match by keyword, no team names needed
        if let Some(matched) = self
            .try_single_event_leagues(stream_name, &classified, now)
            .await
        {
            return MatchOutcome::Matched(matched);
        }

        let (away_raw, home_raw) = match (&classified.away_raw, &classified.home_raw) {
            (Some(away), Some(home)) => (away.clone(), home.clone()),
            _ => {
                // Separator-less fallback handled per league during tier
                // walks via two_teams_anywhere
                (String::new(), String::new())
            }
        };
        let has_raw_pair = !away_raw.is_empty() && !home_raw.is_empty();

        // Tier 1: explicit league indicator
        if let Some(league) = self.detect_league_indicator(stream_name) {
            if let Some(matched) = self
                .try_league(&league, &normalized.canonical, &classified, now, MatchTier::Tier1)
                .await
            {
                return MatchOutcome::Matched(matched);
            }
        }

        // Tier 2: sport indicator narrows the league list
        if let Some(sport) = self.detect_sport_indicator(stream_name) {
            for league in self.leagues_of_sport(&sport) {
                if let Some(matched) = self
                    .try_league(&league, &normalized.canonical, &classified, now, MatchTier::Tier2)
                    .await
                {
                    return MatchOutcome::Matched(matched);
                }
            }
        }

        // Tier 3: candidate leagues from the team/league cache
        if has_raw_pair {
            let mut candidates = self.snapshot.find_candidate_leagues(&away_raw, &home_raw);
            candidates.retain(|league| self.league_enabled(league));

            match self
                .try_candidate_leagues(&candidates, &normalized.canonical, &classified, now)
                .await
            {
                Some(matched) => return MatchOutcome::Matched(matched),
                None => {}
            }

            // Tier 4: one resolvable team carries the search
            if let Some(matched) = self.try_one_team(&away_raw, &home_raw, &classified, now).await
            {
                return MatchOutcome::Matched(matched);
            }

            return MatchOutcome::miss(
                MissReason::NoGameFound,
                Some(format!("'{away_raw}' vs '{home_raw}'")),
            );
        }

        // No separator: walk every enabled league with the two-teams-anywhere
        // fallback before giving up
        for league in &self.config.candidate_leagues {
            if let Some(matched) = self
                .try_league(league, &normalized.canonical, &classified, now, MatchTier::Tier3c)
                .await
            {
                return MatchOutcome::Matched(matched);
            }
        }

        MatchOutcome::miss(MissReason::NoTeams, Some(normalized.canonical))
    }

    /// Targeted re-match in a known league, used by the stream match cache
    /// to skip the multi-league tier walk for streams seen last generation
    pub async fn match_in_league(
        &self,
        league: &str,
        stream_name: &str,
        tier: MatchTier,
        now: DateTime<Utc>,
    ) -> Option<StreamMatch> {
        let today = now.date_naive();
        let normalized = self.normalizer.normalize(stream_name, today);
        let classified = self.classifier.classify(stream_name, &normalized, today);
        if classified.category == StreamCategory::Placeholder {
            return None;
        }
        self.try_league(league, &normalized.canonical, &classified, now, tier)
            .await
    }

    fn league_enabled(&self, league: &str) -> bool {
        self.config
            .candidate_leagues
            .iter()
            .any(|enabled| enabled.eq_ignore_ascii_case(league))
    }

    /// Explicit league hint in the raw stream name ("NHL:", "NFL Game Pass")
    fn detect_league_indicator(&self, stream_name: &str) -> Option<String> {
        let lower = stream_name.to_lowercase();

        for league in &self.config.candidate_leagues {
            if contains_token(&lower, &league.to_lowercase()) {
                return Some(league.clone());
            }
        }
        for (alias, league) in LEAGUE_ALIASES {
            if contains_token(&lower, alias) && self.league_enabled(league) {
                return Some(league.to_string());
            }
        }
        None
    }

    /// Sport word in the stream name, without a specific league
    fn detect_sport_indicator(&self, stream_name: &str) -> Option<String> {
        let lower = stream_name.to_lowercase();
        SPORT_WORDS
            .iter()
            .find(|sport| contains_token(&lower, sport))
            .map(|sport| sport.to_string())
    }

    fn leagues_of_sport(&self, sport: &str) -> Vec<String> {
        self.config
            .candidate_leagues
            .iter()
            .filter(|league| {
                self.mappings
                    .sport_for(league)
                    .map(|league_sport| league_sport.eq_ignore_ascii_case(sport))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    fn resolve_pair(&self, league: &str, canonical: &str, classified: &ClassifiedStream) -> Option<ResolvedPair> {
        let index = self.indexes.index_for(league)?;
        match (&classified.away_raw, &classified.home_raw) {
            (Some(away_raw), Some(home_raw)) => {
                let away = index.best_match(away_raw)?;
                let home = index.best_match(home_raw)?;
                if away.team.id == home.team.id {
                    return None;
                }
                Some(ResolvedPair { away, home })
            }
            _ => {
                let (away, home) = index.two_teams_anywhere(canonical)?;
                Some(ResolvedPair {
                    away: TeamMatch {
                        team: away,
                        tier: 2,
                        match_length: 0,
                        primary: true,
                        via_alias: false,
                    },
                    home: TeamMatch {
                        team: home,
                        tier: 2,
                        match_length: 0,
                        primary: true,
                        via_alias: false,
                    },
                })
            }
        }
    }

    async fn try_league(
        &self,
        league: &str,
        canonical: &str,
        classified: &ClassifiedStream,
        now: DateTime<Utc>,
        tier: MatchTier,
    ) -> Option<StreamMatch> {
        if !self.league_enabled(league) {
            return None;
        }
        let pair = self.resolve_pair(league, canonical, classified)?;

        if let Some(event) = self
            .find_event(
                &pair.away.team.id,
                &pair.home.team.id,
                league,
                classified.date,
                classified.time,
                now,
            )
            .await
        {
            return Some(StreamMatch {
                event,
                league: league.to_string(),
                tier,
                away_team_id: Some(pair.away.team.id),
                home_team_id: Some(pair.home.team.id),
                disambiguated: false,
            });
        }

        // First-choice pair has no game: try alternate pairings
        self.disambiguate_pair(league, classified, now, tier).await
    }

    async fn try_candidate_leagues(
        &self,
        candidates: &[String],
        canonical: &str,
        classified: &ClassifiedStream,
        now: DateTime<Utc>,
    ) -> Option<StreamMatch> {
        let tier = match (classified.date, classified.time) {
            (Some(_), Some(_)) => MatchTier::Tier3a,
            (None, Some(_)) => MatchTier::Tier3b,
            _ => MatchTier::Tier3c,
        };

        // Resolve the pair in every candidate league and keep those with an
        // actual scheduled game, then pick the one closest to the stream time
        let mut with_games: Vec<(String, StreamMatch, i64)> = Vec::new();
        for league in candidates {
            let Some(pair) = self.resolve_pair(league, canonical, classified) else {
                continue;
            };
            let Some(event) = self
                .find_event(
                    &pair.away.team.id,
                    &pair.home.team.id,
                    league,
                    classified.date,
                    classified.time,
                    now,
                )
                .await
            else {
                continue;
            };

            let time_diff = classified
                .time
                .map(|target| time_distance_minutes(&event, target))
                .unwrap_or(i64::MAX);
            with_games.push((
                league.clone(),
                StreamMatch {
                    event,
                    league: league.clone(),
                    tier,
                    away_team_id: Some(pair.away.team.id),
                    home_team_id: Some(pair.home.team.id),
                    disambiguated: false,
                },
                time_diff,
            ));
        }

        if with_games.is_empty() {
            // No league had a game for the first-choice pair; alternates
            for league in candidates {
                if let Some(matched) = self.disambiguate_pair(league, classified, now, tier).await {
                    return Some(matched);
                }
            }
            return None;
        }

        with_games.sort_by_key(|(_, _, diff)| *diff);
        let (league, matched, diff) = with_games.into_iter().next()?;
        if diff != i64::MAX {
            debug!("Multi-league disambiguation chose {league} (time diff {diff}m)");
        }
        Some(matched)
    }

    /// Alternate home/away pairings from `all_matches` for the same raw
    /// strings; the first pairing with a scheduled game wins
    async fn disambiguate_pair(
        &self,
        league: &str,
        classified: &ClassifiedStream,
        now: DateTime<Utc>,
        tier: MatchTier,
    ) -> Option<StreamMatch> {
        let (away_raw, home_raw) = match (&classified.away_raw, &classified.home_raw) {
            (Some(away), Some(home)) => (away, home),
            _ => return None,
        };
        let index = self.indexes.index_for(league)?;
        let away_candidates = index.all_matches(away_raw, self.config.max_alternates);
        let home_candidates = index.all_matches(home_raw, self.config.max_alternates);
        if away_candidates.len() <= 1 && home_candidates.len() <= 1 {
            return None;
        }

        let mut tried = std::collections::HashSet::new();
        if let (Some(first_away), Some(first_home)) =
            (away_candidates.first(), home_candidates.first())
        {
            // The first pairing was already tried by the caller
            tried.insert((first_away.team.id.clone(), first_home.team.id.clone()));
        }

        for away in &away_candidates {
            for home in &home_candidates {
                if away.team.id == home.team.id {
                    continue;
                }
                if !tried.insert((away.team.id.clone(), home.team.id.clone())) {
                    continue;
                }
                if let Some(event) = self
                    .find_event(
                        &away.team.id,
                        &home.team.id,
                        league,
                        classified.date,
                        classified.time,
                        now,
                    )
                    .await
                {
                    debug!(
                        "Pair disambiguation: '{away_raw}' vs '{home_raw}' -> '{}' vs '{}'",
                        away.team.name, home.team.name
                    );
                    return Some(StreamMatch {
                        event,
                        league: league.to_string(),
                        tier,
                        away_team_id: Some(away.team.id.clone()),
                        home_team_id: Some(home.team.id.clone()),
                        disambiguated: true,
                    });
                }
            }
        }
        None
    }

    /// Tier 4: one side resolves; search that team's schedule and fuzzy-match
    /// opponents against the unresolved side
    async fn try_one_team(
        &self,
        away_raw: &str,
        home_raw: &str,
        classified: &ClassifiedStream,
        now: DateTime<Utc>,
    ) -> Option<StreamMatch> {
        for league in &self.config.candidate_leagues {
            let Some(index) = self.indexes.index_for(league) else {
                continue;
            };
            let away = index.best_match(away_raw);
            let home = index.best_match(home_raw);

            let (resolved, unresolved_raw, resolved_is_away) = match (&away, &home) {
                (Some(_), Some(_)) | (None, None) => continue,
                (Some(away), None) => (away.clone(), home_raw, true),
                (None, Some(home)) => (home.clone(), away_raw, false),
            };

            let schedule = self.events.team_schedule(&resolved.team.id, league).await;
            let windowed = window_events(&schedule, now);

            // Score each opponent against the unresolved raw string
            let opponents: Vec<Team> = windowed
                .iter()
                .filter_map(|event| event.opponent_of(&resolved.team.id).cloned())
                .collect();
            if opponents.is_empty() {
                continue;
            }
            let opponent_index = TeamIndex::build(league, opponents, Vec::new());
            let Some(opponent) = opponent_index.best_match(unresolved_raw) else {
                continue;
            };

            let mut involving: Vec<&Event> = windowed
                .iter()
                .filter(|event| {
                    event.involves_team(&resolved.team.id)
                        && event.involves_team(&opponent.team.id)
                })
                .copied()
                .collect();
            if involving.is_empty() {
                continue;
            }

            let tier = if classified.date.is_some() || classified.time.is_some() {
                MatchTier::Tier4a
            } else {
                MatchTier::Tier4b
            };

            let chosen = match classified.date {
                Some(date) => {
                    involving.retain(|event| event.start.date_naive() == date);
                    match classified.time {
                        Some(target) => involving
                            .into_iter()
                            .min_by_key(|event| time_distance_minutes(event, target)),
                        None => involving.into_iter().min_by_key(|event| event.start),
                    }
                }
                None => involving
                    .into_iter()
                    .min_by_key(|event| (event.start - now).num_seconds().abs()),
            }?;

            let (away_id, home_id) = if resolved_is_away {
                (Some(resolved.team.id.clone()), Some(opponent.team.id.clone()))
            } else {
                (Some(opponent.team.id.clone()), Some(resolved.team.id.clone()))
            };

            return Some(StreamMatch {
                event: chosen.clone(),
                league: league.clone(),
                tier,
                away_team_id: away_id,
                home_team_id: home_id,
                disambiguated: false,
            });
        }
        None
    }

    async fn try_single_event_leagues(
        &self,
        stream_name: &str,
        classified: &ClassifiedStream,
        now: DateTime<Utc>,
    ) -> Option<StreamMatch> {
        let lower = stream_name.to_lowercase();
        for single in &self.config.single_event_leagues {
            if !self.league_enabled(&single.league) {
                continue;
            }
            if !single
                .keywords
                .iter()
                .any(|keyword| lower.contains(keyword.as_str()))
            {
                continue;
            }

            let target_date = classified.date.unwrap_or_else(|| now.date_naive());
            let events = self.events.league_events(&single.league, target_date).await;
            match events.len() {
                1 => {
                    let event = events.into_iter().next()?;
                    return Some(StreamMatch {
                        event,
                        league: single.league.clone(),
                        tier: MatchTier::SingleEvent,
                        away_team_id: None,
                        home_team_id: None,
                        disambiguated: false,
                    });
                }
                count => {
                    if count > 1 {
                        warn!(
                            "Single-event league {} has {count} events on {target_date}, skipping",
                            single.league
                        );
                    }
                }
            }
        }
        None
    }

    /// Search team1's schedule for a game against team2
    ///
    /// Selection: exact date (closest time for double-headers), else today's
    /// games, else nearest upcoming. Completed games from previous days are
    /// always skipped; completed games from today only pass when configured.
    async fn find_event(
        &self,
        team1_id: &str,
        team2_id: &str,
        league: &str,
        date: Option<NaiveDate>,
        time: Option<NaiveTime>,
        now: DateTime<Utc>,
    ) -> Option<Event> {
        let schedule = self.events.team_schedule(team1_id, league).await;
        if schedule.is_empty() {
            return None;
        }
        let today = now.date_naive();

        let mut matching: Vec<&Event> = window_events(&schedule, now)
            .into_iter()
            .filter(|event| event.involves_team(team2_id))
            .filter(|event| {
                if event.is_final() {
                    let event_day = event.start.date_naive();
                    if event_day < today {
                        return false;
                    }
                    if event_day == today && !self.config.include_final_events {
                        return false;
                    }
                }
                true
            })
            .collect();

        if matching.is_empty() {
            return None;
        }
        matching.sort_by_key(|event| event.start);

        if let Some(target_date) = date {
            let date_matches: Vec<&&Event> = matching
                .iter()
                .filter(|event| event.start.date_naive() == target_date)
                .collect();
            if !date_matches.is_empty() {
                let chosen = match time {
                    Some(target) if date_matches.len() > 1 => date_matches
                        .into_iter()
                        .min_by_key(|event| time_distance_minutes(event, target))?,
                    _ => date_matches.into_iter().next()?,
                };
                return Some((*chosen).clone());
            }
        }

        // Today's games first (even already started), then nearest upcoming
        if let Some(todays) = matching
            .iter()
            .find(|event| event.start.date_naive() == today)
        {
            return Some((*todays).clone());
        }
        if let Some(upcoming) = matching.iter().find(|event| event.start >= now) {
            return Some((*upcoming).clone());
        }
        matching.last().map(|event| (*event).clone())
    }
}

fn window_events(schedule: &[Event], now: DateTime<Utc>) -> Vec<&Event> {
    let past_cutoff = now - Duration::days(SEARCH_DAYS_BACK);
    let future_cutoff = now + Duration::days(SEARCH_DAYS_AHEAD);
    schedule
        .iter()
        .filter(|event| event.start >= past_cutoff && event.start <= future_cutoff)
        .collect()
}

/// Minutes between an event's start time-of-day and a target time
fn time_distance_minutes(event: &Event, target: NaiveTime) -> i64 {
    use chrono::Timelike;
    let event_minutes = (event.start.time().hour() * 60 + event.start.time().minute()) as i64;
    let target_minutes = (target.hour() * 60 + target.minute()) as i64;
    (event_minutes - target_minutes).abs()
}

/// Whether `token` appears delimited by non-alphanumerics in `text`
fn contains_token(text: &str, token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    let mut search_from = 0;
    while let Some(rel_pos) = text[search_from..].find(token) {
        let pos = search_from + rel_pos;
        let before_ok = pos == 0
            || !text[..pos]
                .chars()
                .next_back()
                .map(char::is_alphanumeric)
                .unwrap_or(false);
        let end = pos + token.len();
        let after_ok = end == text.len()
            || !text[end..]
                .chars()
                .next()
                .map(char::is_alphanumeric)
                .unwrap_or(false);
        if before_ok && after_ok {
            return true;
        }
        search_from = pos + 1;
    }
    false
}
