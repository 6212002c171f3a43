//! Template context assembly
//!
//! A `TemplateContext` bundles everything the template resolver can reach:
//! the team's identity and season stats, plus up to three game contexts
//! (current, next, last), each carrying the opponent, head-to-head record,
//! streaks, odds, and player leaders. Derived signals are computed here from
//! the extended schedule; nothing in this module calls the network except
//! the opponent-stats lookup, which is cached per builder instance.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;
use tracing::debug;

use crate::models::{Event, EventState, Odds, Team, TeamStats};
use crate::providers::SportsProvider;

/// Head-to-head record against one opponent, current season
#[derive(Debug, Clone, Default)]
pub struct HeadToHead {
    pub team_wins: u32,
    pub opponent_wins: u32,
    pub games_played: u32,
    /// Most recent meeting's result from our perspective: "Win"/"Loss"/"Tie"
    pub previous_result: Option<String>,
    pub previous_score: Option<String>,
    pub previous_venue: Option<String>,
    pub previous_city: Option<String>,
    pub days_since: Option<i64>,
}

/// Streak data derived from the extended schedule
#[derive(Debug, Clone, Default)]
pub struct Streaks {
    /// Signed: positive = wins, negative = losses; draws break streaks
    pub overall: i32,
    pub home_streak: String,
    pub away_streak: String,
    /// "4-1", or "3-1-1" for draw sports
    pub last_5_record: String,
    pub last_10_record: String,
}

/// Sport-mapped stat leaders for a game
#[derive(Debug, Clone, Default)]
pub struct PlayerLeaders {
    pub scoring_leader_name: String,
    pub scoring_leader_points: String,
    pub passing_leader_name: String,
    pub passing_leader_stats: String,
    pub rushing_leader_name: String,
    pub rushing_leader_stats: String,
    pub receiving_leader_name: String,
    pub receiving_leader_stats: String,
    /// True when values are season aggregates, not a game line
    pub season: bool,
}

/// Context for one game: current, next, or last
#[derive(Debug, Clone, Default)]
pub struct GameContext {
    pub event: Option<Event>,
    pub is_home: bool,
    pub opponent: Option<Team>,
    pub opponent_stats: Option<TeamStats>,
    pub h2h: HeadToHead,
    pub streaks: Streaks,
    pub odds: Option<Odds>,
    pub head_coach: String,
    pub player_leaders: PlayerLeaders,
}

/// The team identity fields templates can reference
#[derive(Debug, Clone, Default)]
pub struct TeamIdentity {
    pub team_id: String,
    pub league: String,
    pub league_name: String,
    pub sport: String,
    pub team_name: String,
    pub team_abbrev: String,
    pub logo_url: Option<String>,
    pub channel_id: String,
}

/// Complete context for template resolution
#[derive(Debug, Clone)]
pub struct TemplateContext {
    pub team: TeamIdentity,
    pub team_stats: Option<TeamStats>,
    /// Current game (base variables); None for idle filler
    pub game: Option<GameContext>,
    /// `.next` suffix context
    pub next_game: Option<GameContext>,
    /// `.last` suffix context
    pub last_game: Option<GameContext>,
    pub timezone: Tz,
    pub use_12_hour_clock: bool,
    pub show_timezone: bool,
    /// Reference instant for "time until" variables
    pub now: DateTime<Utc>,
}

impl TemplateContext {
    pub fn new(team: TeamIdentity, timezone: Tz, now: DateTime<Utc>) -> Self {
        Self {
            team,
            team_stats: None,
            game: None,
            next_game: None,
            last_game: None,
            timezone,
            use_12_hour_clock: true,
            show_timezone: true,
            now,
        }
    }
}

/// Sports where a draw is a normal result
fn sport_has_draws(sport: &str) -> bool {
    sport.eq_ignore_ascii_case("soccer")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GameResult {
    Win,
    Loss,
    Draw,
}

fn result_for(event: &Event, team_id: &str) -> Option<GameResult> {
    if !event.is_final() {
        return None;
    }
    let our_score = event.score_for(team_id)?;
    let their_score = event
        .opponent_of(team_id)
        .and_then(|opponent| event.score_for(&opponent.id))?;
    Some(if our_score > their_score {
        GameResult::Win
    } else if our_score < their_score {
        GameResult::Loss
    } else {
        GameResult::Draw
    })
}

/// Completed games involving the team, most recent first
fn completed_games<'a>(schedule: &'a [Event], team_id: &str, before: DateTime<Utc>) -> Vec<&'a Event> {
    let mut games: Vec<&Event> = schedule
        .iter()
        .filter(|event| event.involves_team(team_id))
        .filter(|event| event.is_final() && event.start < before)
        .collect();
    games.sort_by_key(|event| std::cmp::Reverse(event.start));
    games
}

fn streak_from_results(results: &[GameResult]) -> i32 {
    let mut streak = 0i32;
    for result in results {
        match (result, streak) {
            (GameResult::Win, s) if s >= 0 => streak = s + 1,
            (GameResult::Loss, s) if s <= 0 => streak = s - 1,
            _ => break,
        }
    }
    streak
}

fn record_line(results: &[GameResult], with_draws: bool) -> String {
    let wins = results.iter().filter(|r| **r == GameResult::Win).count();
    let losses = results.iter().filter(|r| **r == GameResult::Loss).count();
    let draws = results.iter().filter(|r| **r == GameResult::Draw).count();
    if with_draws {
        format!("{wins}-{draws}-{losses}")
    } else {
        format!("{wins}-{losses}")
    }
}

fn streak_display(streak: i32) -> String {
    match streak {
        0 => String::new(),
        n if n > 0 => format!("W{n}"),
        n => format!("L{}", -n),
    }
}

/// Compute overall/home/away streaks and last-5/last-10 records from the
/// extended schedule
pub fn calculate_streaks(
    schedule: &[Event],
    team_id: &str,
    sport: &str,
    now: DateTime<Utc>,
) -> Streaks {
    let games = completed_games(schedule, team_id, now);
    let with_draws = sport_has_draws(sport);

    let results: Vec<GameResult> = games
        .iter()
        .filter_map(|event| result_for(event, team_id))
        .collect();
    let home_results: Vec<GameResult> = games
        .iter()
        .filter(|event| event.home_team.id == team_id)
        .filter_map(|event| result_for(event, team_id))
        .collect();
    let away_results: Vec<GameResult> = games
        .iter()
        .filter(|event| event.away_team.id == team_id)
        .filter_map(|event| result_for(event, team_id))
        .collect();

    Streaks {
        overall: streak_from_results(&results),
        home_streak: streak_display(streak_from_results(&home_results)),
        away_streak: streak_display(streak_from_results(&away_results)),
        last_5_record: record_line(&results[..results.len().min(5)], with_draws),
        last_10_record: record_line(&results[..results.len().min(10)], with_draws),
    }
}

/// Compute this-season head-to-head against one opponent
pub fn calculate_h2h(
    schedule: &[Event],
    team_id: &str,
    opponent_id: &str,
    now: DateTime<Utc>,
) -> HeadToHead {
    let meetings: Vec<&Event> = completed_games(schedule, team_id, now)
        .into_iter()
        .filter(|event| event.involves_team(opponent_id))
        .collect();

    let mut h2h = HeadToHead {
        games_played: meetings.len() as u32,
        ..Default::default()
    };

    for event in &meetings {
        match result_for(event, team_id) {
            Some(GameResult::Win) => h2h.team_wins += 1,
            Some(GameResult::Loss) => h2h.opponent_wins += 1,
            _ => {}
        }
    }

    if let Some(latest) = meetings.first() {
        h2h.previous_result = result_for(latest, team_id).map(|result| {
            match result {
                GameResult::Win => "Win",
                GameResult::Loss => "Loss",
                GameResult::Draw => "Tie",
            }
            .to_string()
        });
        if let (Some(ours), Some(theirs)) = (
            latest.score_for(team_id),
            latest
                .opponent_of(team_id)
                .and_then(|opp| latest.score_for(&opp.id)),
        ) {
            h2h.previous_score = Some(format!("{ours}-{theirs}"));
        }
        h2h.previous_venue = latest.venue.name.clone();
        h2h.previous_city = latest.venue.city.clone();
        h2h.days_since = Some((now - latest.start).num_days());
    }

    h2h
}

/// Map a game's leader categories onto the sport-specific slots
///
/// Game lines only appear for completed games; scheduled games fall back to
/// season leaders when the provider sends them.
pub fn extract_player_leaders(event: &Event, team_id: &str) -> PlayerLeaders {
    let mut leaders = PlayerLeaders::default();
    let completed = event.is_final();

    for leader in &event.leaders {
        if !leader.team_id.is_empty() && leader.team_id != team_id {
            continue;
        }
        // Scheduled games only surface season aggregates
        if !completed && !leader.season_aggregate {
            continue;
        }
        leaders.season = leader.season_aggregate && !completed;

        let name = leader.name.to_lowercase();
        if name.contains("passing") {
            leaders.passing_leader_name = leader.player_name.clone();
            leaders.passing_leader_stats = leader.display_value.clone();
        } else if name.contains("rushing") {
            leaders.rushing_leader_name = leader.player_name.clone();
            leaders.rushing_leader_stats = leader.display_value.clone();
        } else if name.contains("receiving") {
            leaders.receiving_leader_name = leader.player_name.clone();
            leaders.receiving_leader_stats = leader.display_value.clone();
        } else if name.contains("point") || name.contains("scor") || name.contains("goal") {
            leaders.scoring_leader_name = leader.player_name.clone();
            leaders.scoring_leader_points = leader.display_value.clone();
        }
    }
    leaders
}

/// Builds game contexts, caching opponent stats per instance so each unique
/// opponent costs one provider call per generation
pub struct ContextBuilder {
    provider: Option<Arc<dyn SportsProvider>>,
    opponent_stats: Mutex<HashMap<String, Option<TeamStats>>>,
}

impl ContextBuilder {
    pub fn new(provider: Option<Arc<dyn SportsProvider>>) -> Self {
        Self {
            provider,
            opponent_stats: Mutex::new(HashMap::new()),
        }
    }

    async fn opponent_stats(&self, opponent_id: &str, league: &str) -> Option<TeamStats> {
        {
            let cache = self.opponent_stats.lock().await;
            if let Some(cached) = cache.get(opponent_id) {
                return cached.clone();
            }
        }

        let fetched = match &self.provider {
            Some(provider) => match provider.get_team_stats(opponent_id, league).await {
                Ok(stats) => stats,
                Err(err) => {
                    debug!("Opponent stats unavailable for {opponent_id}: {err}");
                    None
                }
            },
            None => None,
        };

        let mut cache = self.opponent_stats.lock().await;
        cache.insert(opponent_id.to_string(), fetched.clone());
        fetched
    }

    /// Build the context for one game from the team's perspective
    pub async fn build_game_context(
        &self,
        event: &Event,
        team_id: &str,
        league: &str,
        sport: &str,
        extended_schedule: &[Event],
        now: DateTime<Utc>,
    ) -> GameContext {
        let is_home = event.home_team.id == team_id;
        let opponent = event.opponent_of(team_id).cloned();

        let opponent_stats = match &opponent {
            Some(opponent) => self.opponent_stats(&opponent.id, league).await,
            None => None,
        };

        let h2h = opponent
            .as_ref()
            .map(|opponent| calculate_h2h(extended_schedule, team_id, &opponent.id, now))
            .unwrap_or_default();

        GameContext {
            event: Some(event.clone()),
            is_home,
            opponent,
            opponent_stats,
            h2h,
            streaks: calculate_streaks(extended_schedule, team_id, sport, now),
            odds: event.odds.clone(),
            head_coach: String::new(),
            player_leaders: extract_player_leaders(event, team_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventStatus, Venue};
    use chrono::TimeZone;

    fn team(id: &str, name: &str) -> Team {
        Team {
            id: id.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn final_game(
        id: &str,
        start: DateTime<Utc>,
        home: (&str, u32),
        away: (&str, u32),
    ) -> Event {
        Event {
            id: id.to_string(),
            league: "nfl".to_string(),
            sport: "football".to_string(),
            name: None,
            short_name: None,
            start,
            home_team: team(home.0, home.0),
            away_team: team(away.0, away.0),
            home_score: Some(home.1),
            away_score: Some(away.1),
            home_record: None,
            away_record: None,
            venue: Venue {
                name: Some("Ford Field".to_string()),
                city: Some("Detroit".to_string()),
                state: Some("MI".to_string()),
                indoor: true,
            },
            broadcasts: Vec::new(),
            season_type: Default::default(),
            status: EventStatus {
                state: EventState::Final,
                completed: true,
                detail: None,
                period: None,
            },
            odds: None,
            conference_competition: false,
            source_league: None,
            leaders: Vec::new(),
        }
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, day, 18, 0, 0).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn overall_streak_counts_consecutive_wins() {
        // Most recent three are wins, then a loss
        let schedule = vec![
            final_game("1", at(10), ("det", 10), ("gb", 20)),
            final_game("2", at(15), ("det", 30), ("chi", 10)),
            final_game("3", at(20), ("min", 7), ("det", 21)),
            final_game("4", at(25), ("det", 28), ("lar", 14)),
        ];
        let streaks = calculate_streaks(&schedule, "det", "football", now());
        assert_eq!(streaks.overall, 3);
        assert_eq!(streaks.last_5_record, "3-1");
    }

    #[test]
    fn loss_streak_is_negative() {
        let schedule = vec![
            final_game("1", at(20), ("det", 7), ("gb", 20)),
            final_game("2", at(25), ("chi", 24), ("det", 10)),
        ];
        let streaks = calculate_streaks(&schedule, "det", "football", now());
        assert_eq!(streaks.overall, -2);
    }

    #[test]
    fn home_and_away_streaks_are_split() {
        let schedule = vec![
            // Home win, away loss
            final_game("1", at(20), ("det", 30), ("gb", 10)),
            final_game("2", at(25), ("chi", 24), ("det", 10)),
        ];
        let streaks = calculate_streaks(&schedule, "det", "football", now());
        assert_eq!(streaks.home_streak, "W1");
        assert_eq!(streaks.away_streak, "L1");
    }

    #[test]
    fn draws_break_streaks_and_show_in_soccer_records() {
        let schedule = vec![
            final_game("1", at(10), ("det", 2), ("gb", 2)),
            final_game("2", at(15), ("det", 1), ("chi", 0)),
        ];
        let streaks = calculate_streaks(&schedule, "det", "soccer", now());
        // Win then draw: streak stops at the draw
        assert_eq!(streaks.overall, 1);
        assert_eq!(streaks.last_5_record, "1-1-0");
    }

    #[test]
    fn h2h_tracks_wins_and_latest_meeting() {
        let schedule = vec![
            final_game("1", at(5), ("det", 21), ("gb", 14)),
            final_game("2", at(20), ("gb", 28), ("det", 7)),
            final_game("3", at(25), ("det", 35), ("chi", 10)),
        ];
        let h2h = calculate_h2h(&schedule, "det", "gb", now());
        assert_eq!(h2h.games_played, 2);
        assert_eq!(h2h.team_wins, 1);
        assert_eq!(h2h.opponent_wins, 1);
        // Latest meeting was the away loss
        assert_eq!(h2h.previous_result.as_deref(), Some("Loss"));
        assert_eq!(h2h.previous_score.as_deref(), Some("7-28"));
        assert_eq!(h2h.days_since, Some(10));
    }

    #[test]
    fn h2h_empty_without_meetings() {
        let schedule = vec![final_game("1", at(25), ("det", 35), ("chi", 10))];
        let h2h = calculate_h2h(&schedule, "det", "gb", now());
        assert_eq!(h2h.games_played, 0);
        assert!(h2h.previous_result.is_none());
    }

    #[tokio::test]
    async fn game_context_is_built_from_team_perspective() {
        let game = final_game("1", at(25), ("det", 28), ("gb", 14));
        let builder = ContextBuilder::new(None);
        let ctx = builder
            .build_game_context(&game, "det", "nfl", "football", &[game.clone()], now())
            .await;
        assert!(ctx.is_home);
        assert_eq!(ctx.opponent.as_ref().unwrap().id, "gb");
        assert_eq!(ctx.h2h.team_wins, 1);
    }
}
