//! Conditional description selection
//!
//! A template may attach conditional descriptions, each gated by a
//! condition and carrying a priority (lower wins; 100 is the conventional
//! "always" fallback). All matching candidates at the winning priority are
//! selected among uniformly at random for variety; the RNG is passed in so
//! runs are reproducible under a fixed seed.

use crate::epg::context::{GameContext, TemplateContext};
use crate::models::template::{ConditionKind, ConditionalDescription};
use crate::models::SeasonType;

/// Networks counted as national broadcasts
const NATIONAL_NETWORKS: [&str; 12] = [
    "espn", "abc", "nbc", "cbs", "fox", "tnt", "tbs", "amazon", "prime video", "peacock",
    "nfl network", "apple tv",
];

fn active_game<'a>(ctx: &'a TemplateContext) -> Option<&'a GameContext> {
    ctx.game
        .as_ref()
        .or(ctx.next_game.as_ref())
        .or(ctx.last_game.as_ref())
}

fn numeric_value(value: &Option<String>) -> i32 {
    value
        .as_deref()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(0)
}

fn location_streak(display: &str) -> i32 {
    let Some(count) = display.get(1..).and_then(|digits| digits.parse::<i32>().ok()) else {
        return 0;
    };
    match display.chars().next() {
        Some('W') => count,
        Some('L') => -count,
        _ => 0,
    }
}

/// Evaluate one condition against the context
pub fn evaluate_condition(
    kind: ConditionKind,
    value: &Option<String>,
    ctx: &TemplateContext,
) -> bool {
    let game = active_game(ctx);
    let event = game.and_then(|g| g.event.as_ref());
    let streak = ctx
        .team_stats
        .as_ref()
        .map(|stats| stats.streak_count)
        .unwrap_or(0);

    match kind {
        ConditionKind::WinStreak => {
            let threshold = numeric_value(value);
            threshold > 0 && streak >= threshold
        }
        ConditionKind::LossStreak => {
            let threshold = numeric_value(value);
            threshold > 0 && streak <= -threshold
        }
        ConditionKind::HomeWinStreak => {
            let threshold = numeric_value(value);
            threshold > 0
                && game
                    .map(|g| location_streak(&g.streaks.home_streak) >= threshold)
                    .unwrap_or(false)
        }
        ConditionKind::HomeLossStreak => {
            let threshold = numeric_value(value);
            threshold > 0
                && game
                    .map(|g| location_streak(&g.streaks.home_streak) <= -threshold)
                    .unwrap_or(false)
        }
        ConditionKind::AwayWinStreak => {
            let threshold = numeric_value(value);
            threshold > 0
                && game
                    .map(|g| location_streak(&g.streaks.away_streak) >= threshold)
                    .unwrap_or(false)
        }
        ConditionKind::AwayLossStreak => {
            let threshold = numeric_value(value);
            threshold > 0
                && game
                    .map(|g| location_streak(&g.streaks.away_streak) <= -threshold)
                    .unwrap_or(false)
        }
        ConditionKind::IsRanked => ctx
            .team_stats
            .as_ref()
            .map(|stats| stats.is_ranked())
            .unwrap_or(false),
        ConditionKind::IsRankedOpponent => game
            .map(|g| opponent_rank(g).map(|rank| rank <= 25).unwrap_or(false))
            .unwrap_or(false),
        ConditionKind::IsTopTenMatchup => {
            let ours = ctx.team_stats.as_ref().and_then(|stats| stats.rank);
            let theirs = game.and_then(opponent_rank);
            matches!((ours, theirs), (Some(a), Some(b)) if a <= 10 && b <= 10)
        }
        ConditionKind::IsHome => game.map(|g| g.is_home).unwrap_or(false),
        ConditionKind::IsAway => game.map(|g| !g.is_home).unwrap_or(false),
        ConditionKind::IsPlayoff => event
            .map(|e| e.season_type == SeasonType::Postseason)
            .unwrap_or(false),
        ConditionKind::IsPreseason => event
            .map(|e| e.season_type == SeasonType::Preseason)
            .unwrap_or(false),
        // Only populated by same-day scoreboard enrichment
        ConditionKind::IsConferenceGame => {
            event.map(|e| e.conference_competition).unwrap_or(false)
        }
        ConditionKind::IsRematch => game.map(|g| g.h2h.games_played > 0).unwrap_or(false),
        ConditionKind::IsNationalBroadcast => event
            .map(|e| {
                e.broadcasts.iter().any(|broadcast| {
                    let lower = broadcast.to_lowercase();
                    NATIONAL_NETWORKS
                        .iter()
                        .any(|network| lower.contains(network))
                })
            })
            .unwrap_or(false),
        // Only populated by same-day scoreboard enrichment
        ConditionKind::HasOdds => game.map(|g| g.odds.is_some()).unwrap_or(false),
        ConditionKind::OpponentNameContains => {
            let needle = value.as_deref().unwrap_or("").trim().to_lowercase();
            !needle.is_empty()
                && game
                    .and_then(|g| g.opponent.as_ref())
                    .map(|opponent| opponent.name.to_lowercase().contains(&needle))
                    .unwrap_or(false)
        }
        ConditionKind::Always => true,
    }
}

fn opponent_rank(game: &GameContext) -> Option<u32> {
    game.opponent_stats
        .as_ref()
        .and_then(|stats| stats.rank)
        .or_else(|| game.opponent.as_ref().and_then(|opponent| opponent.rank))
}

/// Pick the description template to use
///
/// Conditions are evaluated in priority order (ascending); the first
/// priority with any satisfied condition wins, and ties at that priority are
/// broken uniformly at random.
pub fn select_description<'a>(
    default_description: &'a str,
    options: &'a [ConditionalDescription],
    ctx: &TemplateContext,
    rng: &mut fastrand::Rng,
) -> &'a str {
    let mut matching: Vec<&ConditionalDescription> = options
        .iter()
        .filter(|option| !option.template.is_empty())
        .filter(|option| evaluate_condition(option.condition, &option.condition_value, ctx))
        .collect();

    if matching.is_empty() {
        return default_description;
    }

    matching.sort_by_key(|option| option.priority);
    let best_priority = matching[0].priority;
    let at_best: Vec<&ConditionalDescription> = matching
        .into_iter()
        .take_while(|option| option.priority == best_priority)
        .collect();

    let chosen = at_best[rng.usize(0..at_best.len())];
    &chosen.template
}
