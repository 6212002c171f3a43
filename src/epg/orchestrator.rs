//! EPG orchestration
//!
//! For each active team channel, in parallel under a bounded worker pool:
//! fetch the schedule, merge soccer multi-league fixtures, discover and
//! enrich events from daily scoreboards, build template contexts, emit game
//! programs, and fill the gaps. Each team's timeline comes back strictly
//! ordered and gap-free; teams are independent of each other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cache::{ScoreboardCache, TeamLeagueCache};
use crate::config::EpgConfig;
use crate::epg::context::{ContextBuilder, TeamIdentity, TemplateContext};
use crate::epg::filler::{FillerGenerator, FillerSettings, GameSpan};
use crate::models::{
    ChannelError, Event, FillerType, GenerationReport, Program, ProgramKind, TeamChannelConfig,
    Template,
};
use crate::providers::{LeagueMappingStore, ProviderRegistry, SportsProvider};
use crate::templates::{select_description, TemplateResolver};
use crate::utils::DateTimeParser;

/// How far back a recent game start pulls the whole run's start time
const EPG_START_LOOKBACK_HOURS: i64 = 6;
/// Extended schedule window for next/last context and streaks
const EXTENDED_WINDOW_DAYS: i64 = 30;

/// A team channel with its merged template
#[derive(Debug, Clone)]
pub struct TeamChannel {
    pub config: TeamChannelConfig,
    pub template: Template,
}

pub struct GenerationOutput {
    /// channel id -> ordered, gap-free program list
    pub programs: HashMap<String, Vec<Program>>,
    pub report: GenerationReport,
}

pub struct EpgOrchestrator {
    registry: Arc<ProviderRegistry>,
    mappings: Arc<LeagueMappingStore>,
    scoreboard_cache: Arc<ScoreboardCache>,
    team_league: Arc<TeamLeagueCache>,
    resolver: Arc<TemplateResolver>,
    config: EpgConfig,
    api_calls: Arc<AtomicU64>,
}

impl EpgOrchestrator {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        mappings: Arc<LeagueMappingStore>,
        scoreboard_cache: Arc<ScoreboardCache>,
        team_league: Arc<TeamLeagueCache>,
        resolver: Arc<TemplateResolver>,
        config: EpgConfig,
    ) -> Self {
        Self {
            registry,
            mappings,
            scoreboard_cache,
            team_league,
            resolver,
            config,
            api_calls: Arc::new(AtomicU64::new(0)),
        }
    }

    fn timezone(&self) -> Tz {
        self.config
            .timezone
            .parse()
            .unwrap_or(chrono_tz::America::New_York)
    }

    /// Generate EPG data for all given team channels
    pub async fn generate(
        &self,
        teams: Vec<TeamChannel>,
        now: DateTime<Utc>,
        rng_seed: u64,
    ) -> GenerationOutput {
        let started = std::time::Instant::now();
        info!(
            "Starting EPG generation: {} teams, {} days ahead",
            teams.len(),
            self.config.days_ahead
        );

        self.scoreboard_cache.clear().await;
        self.api_calls.store(0, Ordering::Relaxed);
        for provider in self.registry.get_all() {
            provider.reset_rate_limit_stats();
        }

        let tz = self.timezone();
        let epg_start = self.calculate_epg_start(&teams, now, tz).await;
        info!(
            "EPG starts at {}",
            epg_start.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z")
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_workers.max(1)));
        let mut tasks: JoinSet<(String, Result<Vec<Program>, String>)> = JoinSet::new();

        for (idx, team) in teams.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let orchestrator = self.clone_handle();
            let channel_seed = rng_seed.wrapping_add(idx as u64);
            tasks.spawn(async move {
                let channel_id = team.config.channel_id.clone();
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (channel_id, Err("worker pool closed".to_string())),
                };
                let result = orchestrator
                    .process_team(&team, epg_start, now, channel_seed)
                    .await;
                (channel_id, result)
            });
        }

        let mut programs = HashMap::new();
        let mut errors = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((channel_id, Ok(timeline))) => {
                    programs.insert(channel_id, timeline);
                }
                Ok((channel_id, Err(message))) => {
                    warn!("Channel {channel_id} failed: {message}");
                    errors.push(ChannelError {
                        channel_id,
                        message,
                    });
                }
                Err(join_error) => {
                    errors.push(ChannelError {
                        channel_id: "unknown".to_string(),
                        message: join_error.to_string(),
                    });
                }
            }
        }

        let all: Vec<&Program> = programs.values().flatten().collect();
        let report = GenerationReport {
            channels_generated: programs.len(),
            channels_failed: errors.len(),
            per_channel_errors: errors,
            num_programs: all.len(),
            num_events: all
                .iter()
                .filter(|p| p.kind == ProgramKind::Game)
                .count(),
            num_pregame: all
                .iter()
                .filter(|p| p.filler_type() == Some(FillerType::Pregame))
                .count(),
            num_postgame: all
                .iter()
                .filter(|p| p.filler_type() == Some(FillerType::Postgame))
                .count(),
            num_idle: all
                .iter()
                .filter(|p| p.filler_type() == Some(FillerType::Idle))
                .count(),
            api_calls: self.api_calls.load(Ordering::Relaxed),
            generation_seconds: started.elapsed().as_secs_f64(),
        };

        info!(
            "EPG generation complete: {} channels, {} programs, {} events, {} api calls in {:.1}s",
            report.channels_generated,
            report.num_programs,
            report.num_events,
            report.api_calls,
            report.generation_seconds
        );

        GenerationOutput { programs, report }
    }

    fn clone_handle(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            mappings: self.mappings.clone(),
            scoreboard_cache: self.scoreboard_cache.clone(),
            team_league: self.team_league.clone(),
            resolver: self.resolver.clone(),
            config: self.config.clone(),
            api_calls: self.api_calls.clone(),
        }
    }

    /// Run start time: when any active team had a game start in the last six
    /// hours, the run starts at the earliest such start so the in-progress
    /// game is on the guide; otherwise the top of the current hour
    async fn calculate_epg_start(
        &self,
        teams: &[TeamChannel],
        now: DateTime<Utc>,
        tz: Tz,
    ) -> DateTime<Utc> {
        let lookback = now - Duration::hours(EPG_START_LOOKBACK_HOURS);
        let mut earliest: Option<DateTime<Utc>> = None;

        for team in teams {
            let Some(provider) = self.registry.get_for_league(&team.config.league) else {
                continue;
            };
            let schedule = self
                .fetch_schedule(&provider, &team.config.team_id, &team.config.league)
                .await;
            for event in schedule {
                if event.start >= lookback && event.start <= now {
                    earliest = Some(match earliest {
                        Some(current) if current <= event.start => current,
                        _ => event.start,
                    });
                }
            }
        }

        earliest.unwrap_or_else(|| {
            DateTimeParser::round_to_hour(now.with_timezone(&tz)).with_timezone(&Utc)
        })
    }

    async fn fetch_schedule(
        &self,
        provider: &Arc<dyn SportsProvider>,
        team_id: &str,
        league: &str,
    ) -> Vec<Event> {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
        match provider
            .get_team_schedule(team_id, league, self.config.days_ahead)
            .await
        {
            Ok(events) => events,
            Err(err) => {
                debug!("Schedule fetch failed for {team_id} in {league}: {err}");
                Vec::new()
            }
        }
    }

    fn game_duration(&self, team: &TeamChannel) -> Duration {
        let hours = team
            .template
            .duration_hours
            .or_else(|| {
                self.config
                    .sport_durations
                    .get(&team.config.sport.to_lowercase())
                    .copied()
            })
            .unwrap_or(self.config.default_game_duration_hours);
        Duration::seconds((hours * 3600.0) as i64)
    }

    async fn process_team(
        &self,
        team: &TeamChannel,
        epg_start: DateTime<Utc>,
        now: DateTime<Utc>,
        rng_seed: u64,
    ) -> Result<Vec<Program>, String> {
        let league = &team.config.league;
        let provider = self
            .registry
            .get_for_league(league)
            .ok_or_else(|| format!("no provider supports league '{league}'"))?;

        let tz = self.timezone();
        let window_end = {
            let start_date = epg_start.with_timezone(&tz).date_naive();
            let end_date = start_date + Duration::days(i64::from(self.config.days_ahead.max(1)));
            tz.from_local_datetime(&end_date.and_hms_opt(0, 0, 0).expect("midnight is valid"))
                .earliest()
                .map(|local| local.with_timezone(&Utc))
                .unwrap_or(epg_start + Duration::days(i64::from(self.config.days_ahead)))
        };

        // Schedule, merged across every league the club plays in
        let mut schedule = self
            .fetch_schedule(&provider, &team.config.team_id, league)
            .await;
        if team.config.sport.eq_ignore_ascii_case("soccer") {
            let memberships = self
                .team_league
                .snapshot()
                .leagues_for_team(&team.config.team_id);
            for other_league in memberships {
                if other_league.eq_ignore_ascii_case(league) {
                    continue;
                }
                let extra = self
                    .fetch_schedule(&provider, &team.config.team_id, &other_league)
                    .await;
                for mut event in extra {
                    if !schedule.iter().any(|existing| existing.id == event.id) {
                        event.source_league = Some(other_league.clone());
                        schedule.push(event);
                    }
                }
            }
        }
        schedule.sort_by_key(|event| event.start);

        // Extended window feeds streaks, H2H, and next/last context
        let extended: Vec<Event> = schedule
            .iter()
            .filter(|event| {
                event.start >= now - Duration::days(EXTENDED_WINDOW_DAYS)
                    && event.start <= now + Duration::days(EXTENDED_WINDOW_DAYS)
            })
            .cloned()
            .collect();

        let mut window_events: Vec<Event> = schedule
            .iter()
            .filter(|event| event.start >= epg_start && event.start < window_end)
            .cloned()
            .collect();

        // Scoreboard discovery and enrichment, one fetch per league-day
        // shared across all team workers
        self.discover_from_scoreboards(team, &provider, epg_start, window_end, &mut window_events)
            .await;

        let mut extended = extended;
        self.enrich_past_scores(team, &provider, now, &mut extended)
            .await;

        // Season stats, with multi-league memberships attached
        self.api_calls.fetch_add(1, Ordering::Relaxed);
        let mut team_stats = match provider
            .get_team_stats(&team.config.team_id, league)
            .await
        {
            Ok(stats) => stats,
            Err(err) => {
                debug!("Team stats unavailable for {}: {err}", team.config.team_id);
                None
            }
        };
        if let Some(stats) = &mut team_stats {
            stats.leagues = self
                .team_league
                .snapshot()
                .leagues_for_team(&team.config.team_id);
        }

        // Base template context
        let identity = TeamIdentity {
            team_id: team.config.team_id.clone(),
            league: league.clone(),
            league_name: self.mappings.display_name(league),
            sport: team.config.sport.clone(),
            team_name: team.config.team_name.clone(),
            team_abbrev: team.config.team_abbrev.clone().unwrap_or_default(),
            logo_url: team.config.team_logo_url.clone(),
            channel_id: team.config.channel_id.clone(),
        };
        let mut base_ctx = TemplateContext::new(identity, tz, now);
        base_ctx.team_stats = team_stats;
        base_ctx.use_12_hour_clock = self.config.use_12_hour_clock;
        base_ctx.show_timezone = self.config.show_timezone;

        // Contexts for every event in the extended window; opponent stats
        // are cached inside the builder, one call per unique opponent
        let builder = ContextBuilder::new(Some(provider.clone()));
        let duration = self.game_duration(team);
        let mut extended_spans = Vec::new();
        for event in &extended {
            let context = builder
                .build_game_context(
                    event,
                    &team.config.team_id,
                    league,
                    &team.config.sport,
                    &extended,
                    now,
                )
                .await;
            extended_spans.push(GameSpan {
                start: event.start,
                end: event.start + duration,
                context,
            });
        }

        let mut window_spans = Vec::new();
        for event in &window_events {
            let context = builder
                .build_game_context(
                    event,
                    &team.config.team_id,
                    league,
                    &team.config.sport,
                    &extended,
                    now,
                )
                .await;
            window_spans.push(GameSpan {
                start: event.start,
                end: event.start + duration,
                context,
            });
        }

        // Game programs
        let mut rng = fastrand::Rng::with_seed(rng_seed);
        let mut programs: Vec<Program> = Vec::new();
        for span in &window_spans {
            let mut ctx = base_ctx.clone();
            ctx.game = Some(span.context.clone());
            ctx.next_game = extended_spans
                .iter()
                .filter(|other| other.start > span.start)
                .min_by_key(|other| other.start)
                .map(|other| other.context.clone());
            ctx.last_game = extended_spans
                .iter()
                .filter(|other| other.start < span.start)
                .max_by_key(|other| other.start)
                .map(|other| other.context.clone());

            let description_template = select_description(
                &team.template.description,
                &team.template.conditional_descriptions,
                &ctx,
                &mut rng,
            )
            .to_string();

            programs.push(Program {
                tvg_id: team.config.channel_id.clone(),
                start: span.start,
                end: span.end,
                title: self.resolver.resolve(&team.template.title, &ctx),
                subtitle: self.resolver.resolve(&team.template.subtitle, &ctx),
                description: self.resolver.resolve(&description_template, &ctx),
                art_url: team
                    .template
                    .art_url
                    .as_ref()
                    .map(|template| self.resolver.resolve(template, &ctx))
                    .filter(|resolved| !resolved.is_empty())
                    .or_else(|| team.config.team_logo_url.clone()),
                categories: vec![
                    base_ctx.team.sport.clone(),
                    base_ctx.team.league_name.clone(),
                ],
                kind: ProgramKind::Game,
            });
        }

        // Filler over the remaining gaps
        let filler = FillerGenerator::new(
            &self.resolver,
            &team.template,
            tz,
            FillerSettings {
                midnight_crossover_mode: self.config.midnight_crossover_mode,
            },
        );
        programs.extend(filler.generate(
            &team.config.channel_id,
            &base_ctx,
            &window_spans,
            &extended_spans,
            epg_start,
            self.config.days_ahead,
        ));

        programs.sort_by_key(|program| program.start);
        normalize_timeline(&mut programs);
        Ok(programs)
    }

    /// Walk each day's scoreboard: merge events the schedule omitted
    /// (common for soccer), and refresh the ones it has with same-day
    /// signals (live scores, odds, broadcasts, conference flag)
    async fn discover_from_scoreboards(
        &self,
        team: &TeamChannel,
        provider: &Arc<dyn SportsProvider>,
        epg_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        window_events: &mut Vec<Event>,
    ) {
        let tz = self.timezone();
        let league = team.config.league.clone();
        let sport = team.config.sport.clone();

        let mut day = epg_start.with_timezone(&tz).date_naive();
        let last_day = window_end.with_timezone(&tz).date_naive();
        while day < last_day {
            let api_calls = self.api_calls.clone();
            let provider = provider.clone();
            let fetch_league = league.clone();
            let scoreboard = self
                .scoreboard_cache
                .get_or_fetch(&sport, &league, day, move || async move {
                    api_calls.fetch_add(1, Ordering::Relaxed);
                    match provider.get_scoreboard(&fetch_league, day).await {
                        Ok(events) => Some(events),
                        Err(err) => {
                            debug!("Scoreboard fetch failed for {fetch_league} {day}: {err}");
                            None
                        }
                    }
                })
                .await;

            if let Some(scoreboard) = scoreboard {
                for sb_event in scoreboard.iter() {
                    if !sb_event.involves_team(&team.config.team_id) {
                        continue;
                    }
                    if let Some(existing) = window_events
                        .iter_mut()
                        .find(|event| event.id == sb_event.id)
                    {
                        merge_scoreboard_event(existing, sb_event);
                    } else if sb_event.start >= epg_start && sb_event.start < window_end {
                        debug!(
                            "Discovered {} for {} from scoreboard",
                            sb_event.id, team.config.team_name
                        );
                        let mut discovered = sb_event.clone();
                        discovered
                            .source_league
                            .get_or_insert_with(|| league.clone());
                        window_events.push(discovered);
                    }
                }
            }
            day += Duration::days(1);
        }

        window_events.sort_by_key(|event| event.start);
    }

    /// Fill in final scores for recent past events from daily scoreboards,
    /// bounded to the last N days to cap API traffic
    async fn enrich_past_scores(
        &self,
        team: &TeamChannel,
        provider: &Arc<dyn SportsProvider>,
        now: DateTime<Utc>,
        extended: &mut [Event],
    ) {
        let tz = self.timezone();
        let cutoff = now - Duration::days(i64::from(self.config.past_score_days));

        let days: std::collections::BTreeSet<chrono::NaiveDate> = extended
            .iter()
            .filter(|event| event.start < now && event.start >= cutoff)
            .filter(|event| event.home_score.is_none() || event.away_score.is_none())
            .map(|event| event.start.with_timezone(&tz).date_naive())
            .collect();

        for day in days {
            let api_calls = self.api_calls.clone();
            let provider = provider.clone();
            let league = team.config.league.clone();
            let scoreboard = self
                .scoreboard_cache
                .get_or_fetch(&team.config.sport, &team.config.league, day, move || async move {
                    api_calls.fetch_add(1, Ordering::Relaxed);
                    provider.get_scoreboard(&league, day).await.ok()
                })
                .await;

            if let Some(scoreboard) = scoreboard {
                for event in extended.iter_mut() {
                    if let Some(sb_event) =
                        scoreboard.iter().find(|candidate| candidate.id == event.id)
                    {
                        merge_scoreboard_event(event, sb_event);
                    }
                }
            }
        }
    }
}

/// Overlay same-day scoreboard data on a schedule event
fn merge_scoreboard_event(target: &mut Event, scoreboard: &Event) {
    target.status = scoreboard.status.clone();
    if scoreboard.home_score.is_some() {
        target.home_score = scoreboard.home_score;
    }
    if scoreboard.away_score.is_some() {
        target.away_score = scoreboard.away_score;
    }
    if scoreboard.odds.is_some() {
        target.odds = scoreboard.odds.clone();
    }
    if !scoreboard.broadcasts.is_empty() {
        target.broadcasts = scoreboard.broadcasts.clone();
    }
    if scoreboard.conference_competition {
        target.conference_competition = true;
    }
    if target.home_team.rank.is_none() {
        target.home_team.rank = scoreboard.home_team.rank;
    }
    if target.away_team.rank.is_none() {
        target.away_team.rank = scoreboard.away_team.rank;
    }
    if !scoreboard.leaders.is_empty() {
        target.leaders = scoreboard.leaders.clone();
    }
}

/// Enforce the timeline invariant: strictly ordered, non-empty, gap-free
/// between adjacent programs (overlaps are clamped, empties dropped)
fn normalize_timeline(programs: &mut Vec<Program>) {
    programs.sort_by_key(|program| program.start);
    let mut index = 0;
    while index + 1 < programs.len() {
        let next_start = programs[index + 1].start;
        if programs[index].end > next_start {
            programs[index].end = next_start;
        }
        index += 1;
    }
    programs.retain(|program| program.start < program.end);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::models::event::Conference;
    use crate::models::{EventStatus, LeagueMapping, Team, TeamStats, Venue};
    use crate::providers::rate_limiter::{RateLimitStats, RateLimiter};
    use crate::providers::StandingEntry;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone};
    use uuid::Uuid;

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
            league == "nfl" || league == "aus.1"
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
                streak_count: 3,
                ..Default::default()
            }))
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

    fn lions_event(id: &str, start: DateTime<Utc>) -> Event {
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
            home_score: None,
            away_score: None,
            home_record: None,
            away_record: None,
            venue: Venue::default(),
            broadcasts: vec!["FOX".to_string()],
            season_type: Default::default(),
            status: EventStatus::default(),
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
        let mut config = crate::config::Config::default().epg;
        config.days_ahead = days_ahead;
        config.timezone = "America/Detroit".to_string();
        EpgOrchestrator::new(
            Arc::new(registry),
            mappings,
            Arc::new(ScoreboardCache::new()),
            Arc::new(TeamLeagueCache::new()),
            Arc::new(TemplateResolver::standard()),
            config,
        )
    }

    fn lions_channel() -> TeamChannel {
        let mut template = Template::named("default");
        template.title = "{team_name} Football".to_string();
        TeamChannel {
            config: TeamChannelConfig {
                id: Uuid::new_v4(),
                team_id: "8".to_string(),
                league: "nfl".to_string(),
                sport: "football".to_string(),
                team_name: "Detroit Lions".to_string(),
                team_abbrev: Some("DET".to_string()),
                team_logo_url: None,
                channel_id: "detroit-lions".to_string(),
                template_id: None,
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            template,
        }
    }

    fn detroit(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        "America/Detroit"
            .parse::<Tz>()
            .unwrap()
            .with_ymd_and_hms(y, mo, d, h, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[tokio::test]
    async fn simple_team_epg_scenario() {
        // Scenario A: one Sunday 13:00 game, two-day window
        let now = detroit(2025, 12, 7, 0);
        let game = lions_event("401", detroit(2025, 12, 7, 13));
        let provider = FixtureProvider {
            schedule: vec![game],
            scoreboards: HashMap::new(),
            limiter: RateLimiter::per_minute("fixture", 100),
        };
        let orchestrator = orchestrator(provider, 2);
        let output = orchestrator
            .generate(vec![lions_channel()], now, 7)
            .await;

        assert_eq!(output.report.channels_generated, 1);
        assert_eq!(output.report.channels_failed, 0);
        assert_eq!(output.report.num_events, 1);

        let timeline = &output.programs["detroit-lions"];
        let game_program = timeline
            .iter()
            .find(|p| p.kind == ProgramKind::Game)
            .expect("game program present");
        assert_eq!(game_program.title, "Detroit Lions Football");
        assert_eq!(game_program.start, detroit(2025, 12, 7, 13));
        // NFL duration: 3.5h sport default
        assert_eq!(game_program.end, detroit(2025, 12, 7, 16) + Duration::minutes(30));

        // Invariant 1: gap-free, non-empty, ordered
        for pair in timeline.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert!(pair[0].start < pair[0].end);
        }
        // Invariant 2: all programs inside the window
        let window_end = detroit(2025, 12, 9, 0);
        assert!(timeline.iter().all(|p| p.start >= now && p.start < window_end));
    }

    #[tokio::test]
    async fn scoreboard_discovers_missing_soccer_fixture() {
        // Scenario F: schedule is empty but the day+1 scoreboard has a match
        let now = detroit(2025, 12, 7, 0);
        let discovered = lions_event("777", detroit(2025, 12, 8, 15));
        let mut scoreboards = HashMap::new();
        scoreboards.insert(
            NaiveDate::from_ymd_opt(2025, 12, 8).unwrap(),
            vec![discovered],
        );
        let provider = FixtureProvider {
            schedule: Vec::new(),
            scoreboards,
            limiter: RateLimiter::per_minute("fixture", 100),
        };
        let orchestrator = orchestrator(provider, 2);
        let output = orchestrator
            .generate(vec![lions_channel()], now, 7)
            .await;

        let timeline = &output.programs["detroit-lions"];
        let game = timeline
            .iter()
            .find(|p| p.kind == ProgramKind::Game)
            .expect("discovered game becomes a program");
        assert_eq!(game.start, detroit(2025, 12, 8, 15));
        assert_eq!(
            game.tvg_id, "detroit-lions",
            "discovered event emits on the team channel"
        );
    }

    #[tokio::test]
    async fn missing_provider_reports_channel_error() {
        let now = detroit(2025, 12, 7, 0);
        let provider = FixtureProvider {
            schedule: Vec::new(),
            scoreboards: HashMap::new(),
            limiter: RateLimiter::per_minute("fixture", 100),
        };
        let orchestrator = orchestrator(provider, 1);
        let mut channel = lions_channel();
        channel.config.league = "xfl".to_string();

        let output = orchestrator.generate(vec![channel], now, 7).await;
        assert_eq!(output.report.channels_generated, 0);
        assert_eq!(output.report.channels_failed, 1);
        assert!(output.report.per_channel_errors[0]
            .message
            .contains("no provider"));
    }

    #[test]
    fn normalize_timeline_clamps_overlaps() {
        let make = |start_h: u32, end_h: u32| Program {
            tvg_id: "ch".to_string(),
            start: Utc.with_ymd_and_hms(2025, 12, 7, start_h, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 12, 7, end_h, 0, 0).unwrap(),
            title: String::new(),
            subtitle: String::new(),
            description: String::new(),
            art_url: None,
            categories: Vec::new(),
            kind: ProgramKind::Game,
        };
        let mut programs = vec![make(0, 7), make(6, 12)];
        normalize_timeline(&mut programs);
        assert_eq!(programs.len(), 2);
        assert_eq!(programs[0].end, programs[1].start);
    }
}
