//! Timeline invariants over full generation runs
//!
//! For every generated channel: adjacent programs are gap-free, no program
//! is empty, every program starts inside the window, and re-running with
//! identical inputs reproduces the non-filler programs byte for byte.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use teamguide::cache::{ScoreboardCache, TeamLeagueCache};
use teamguide::config::Config;
use teamguide::epg::orchestrator::{EpgOrchestrator, TeamChannel};
use teamguide::errors::ProviderError;
use teamguide::models::event::Conference;
use teamguide::models::{
    Event, EventState, EventStatus, LeagueMapping, ProgramKind, Team, TeamChannelConfig,
    TeamStats, Template, Venue,
};
use teamguide::providers::rate_limiter::{RateLimitStats, RateLimiter};
use teamguide::providers::{
    LeagueMappingStore, ProviderRegistry, SportsProvider, StandingEntry,
};
use teamguide::templates::TemplateResolver;

struct FixtureProvider {
    schedule: Vec<Event>,
    scoreboards: HashMap<NaiveDate, Vec<Event>>,
    limiter: RateLimiter,
}

#[async_trait]
impl SportsProvider for FixtureProvider {
    fn name(&self) -> &'static str {
        "fixture"
    }
    fn supports_league(&self, league: &str) -> bool {
        league == "nfl"
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
        _team_id: &str,
        _league: &str,
        _days_ahead: u32,
    ) -> Result<Vec<Event>, ProviderError> {
        Ok(self.schedule.clone())
    }
    async fn get_scoreboard(
        &self,
        _league: &str,
        date: NaiveDate,
    ) -> Result<Vec<Event>, ProviderError> {
        Ok(self.scoreboards.get(&date).cloned().unwrap_or_default())
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
        Ok(Some(TeamStats {
            streak_count: 2,
            ..Default::default()
        }))
    }
    async fn get_standings(&self, _league: &str) -> Result<Vec<StandingEntry>, ProviderError> {
        Ok(Vec::new())
    }
    async fn list_teams(&self, _league: &str) -> Result<Vec<Team>, ProviderError> {
        Ok(Vec::new())
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
    async fn clear_cache(&self) {}
}

fn detroit(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    "America/Detroit"
        .parse::<Tz>()
        .unwrap()
        .with_ymd_and_hms(y, mo, d, h, mi, 0)
        .unwrap()
        .with_timezone(&Utc)
}

fn lions_event(id: &str, start: DateTime<Utc>, state: EventState) -> Event {
    Event {
        id: id.to_string(),
        league: "nfl".to_string(),
        sport: "football".to_string(),
        name: Some("Chicago Bears at Detroit Lions".to_string()),
        short_name: Some("CHI @ DET".to_string()),
        start,
        home_team: Team {
            id: "8".to_string(),
            name: "Detroit Lions".to_string(),
            abbreviation: Some("DET".to_string()),
            ..Default::default()
        },
        away_team: Team {
            id: "3".to_string(),
            name: "Chicago Bears".to_string(),
            abbreviation: Some("CHI".to_string()),
            ..Default::default()
        },
        home_score: (state == EventState::Final).then_some(31),
        away_score: (state == EventState::Final).then_some(17),
        home_record: None,
        away_record: None,
        venue: Venue::default(),
        broadcasts: vec!["FOX".to_string()],
        season_type: Default::default(),
        status: EventStatus {
            state,
            completed: state == EventState::Final,
            detail: None,
            period: None,
        },
        odds: None,
        conference_competition: false,
        source_league: None,
        leaders: Vec::new(),
    }
}

fn orchestrator(provider: FixtureProvider, days_ahead: u32) -> EpgOrchestrator {
    let mut registry = ProviderRegistry::new();
    registry.register("fixture", 0, true, Arc::new(provider));
    let mappings = Arc::new(LeagueMappingStore::new(vec![LeagueMapping {
        league: "nfl".to_string(),
        provider: "fixture".to_string(),
        provider_league_id: Some("nfl".to_string()),
        provider_league_name: Some("NFL".to_string()),
        sport: "football".to_string(),
        display_name: Some("NFL".to_string()),
        logo_url: None,
        enabled: true,
        single_event_keywords: Vec::new(),
    }]));
    let mut epg_config = Config::default().epg;
    epg_config.days_ahead = days_ahead;
    epg_config.timezone = "America/Detroit".to_string();
    EpgOrchestrator::new(
        Arc::new(registry),
        mappings,
        Arc::new(ScoreboardCache::new()),
        Arc::new(TeamLeagueCache::new()),
        Arc::new(TemplateResolver::standard()),
        epg_config,
    )
}

fn lions_channel() -> TeamChannel {
    let mut template = Template::named("default");
    template.title = "{team_name} Football".to_string();
    TeamChannel {
        config: TeamChannelConfig {
            id: Uuid::nil(),
            team_id: "8".to_string(),
            league: "nfl".to_string(),
            sport: "football".to_string(),
            team_name: "Detroit Lions".to_string(),
            team_abbrev: Some("DET".to_string()),
            team_logo_url: None,
            channel_id: "detroit-lions".to_string(),
            template_id: None,
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        },
        template,
    }
}

fn provider(schedule: Vec<Event>) -> FixtureProvider {
    FixtureProvider {
        schedule,
        scoreboards: HashMap::new(),
        limiter: RateLimiter::per_minute("fixture", 1000),
    }
}

#[tokio::test]
async fn timeline_is_gap_free_and_windowed() {
    let now = detroit(2025, 12, 7, 0, 0);
    let schedule = vec![
        lions_event("401", detroit(2025, 12, 7, 13, 0), EventState::Pre),
        lions_event("402", detroit(2025, 12, 9, 20, 15), EventState::Pre),
    ];
    let orchestrator = orchestrator(provider(schedule), 3);
    let output = orchestrator.generate(vec![lions_channel()], now, 42).await;

    assert_eq!(output.report.channels_failed, 0);
    let timeline = &output.programs["detroit-lions"];
    assert!(!timeline.is_empty());

    // Invariant 1: adjacent programs touch exactly; none are empty
    for pair in timeline.windows(2) {
        assert_eq!(pair[0].end, pair[1].start, "gap or overlap in timeline");
    }
    for program in timeline {
        assert!(program.start < program.end, "empty program");
    }

    // Invariant 2: every start inside [epg_start, epg_start + days_ahead)
    let window_end = detroit(2025, 12, 10, 0, 0);
    for program in timeline {
        assert!(program.start >= now);
        assert!(program.start < window_end);
    }

    // Both games made it into the guide
    let games: Vec<_> = timeline
        .iter()
        .filter(|p| p.kind == ProgramKind::Game)
        .collect();
    assert_eq!(games.len(), 2);
    assert!(games.iter().all(|p| p.title == "Detroit Lions Football"));
}

#[tokio::test]
async fn rerun_with_identical_inputs_is_deterministic() {
    let now = detroit(2025, 12, 7, 0, 0);
    let schedule = vec![lions_event("401", detroit(2025, 12, 7, 13, 0), EventState::Pre)];

    let first = orchestrator(provider(schedule.clone()), 2)
        .generate(vec![lions_channel()], now, 42)
        .await;
    let second = orchestrator(provider(schedule), 2)
        .generate(vec![lions_channel()], now, 42)
        .await;

    let a = &first.programs["detroit-lions"];
    let b = &second.programs["detroit-lions"];
    assert_eq!(a.len(), b.len());
    for (left, right) in a.iter().zip(b.iter()) {
        assert_eq!(left.start, right.start);
        assert_eq!(left.end, right.end);
        assert_eq!(left.title, right.title);
        assert_eq!(left.subtitle, right.subtitle);
        assert_eq!(left.description, right.description);
        assert_eq!(left.kind, right.kind);
    }
}

#[tokio::test]
async fn recent_in_progress_game_pulls_run_start_back() {
    // A game started two hours ago; the run must start at its start time so
    // the in-progress game is on the guide
    let now = detroit(2025, 12, 7, 15, 0);
    let in_progress = lions_event("401", detroit(2025, 12, 7, 13, 0), EventState::InProgress);
    let orchestrator = orchestrator(provider(vec![in_progress]), 2);
    let output = orchestrator.generate(vec![lions_channel()], now, 42).await;

    let timeline = &output.programs["detroit-lions"];
    assert_eq!(timeline[0].start, detroit(2025, 12, 7, 13, 0));
    assert_eq!(timeline[0].kind, ProgramKind::Game);
}

#[tokio::test]
async fn empty_schedule_still_fills_the_window() {
    let now = detroit(2025, 12, 7, 0, 0);
    let orchestrator = orchestrator(provider(Vec::new()), 2);
    let output = orchestrator.generate(vec![lions_channel()], now, 42).await;

    let timeline = &output.programs["detroit-lions"];
    // Two idle days, four six-hour blocks each
    assert_eq!(timeline.len(), 8);
    for pair in timeline.windows(2) {
        assert_eq!(pair[0].end, pair[1].start);
    }
    assert!(timeline.iter().all(|p| p.is_filler()));
}
