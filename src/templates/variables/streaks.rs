//! Streak variables

use crate::templates::registry::{Category, SuffixPolicy, VariableRegistry};

use super::any_game;

pub fn register(registry: &mut VariableRegistry) {
    registry.register("streak", Category::Streaks, SuffixPolicy::BaseOnly, |ctx, _| {
        ctx.team_stats
            .as_ref()
            .map(|stats| stats.streak_display())
            .unwrap_or_default()
    });

    registry.register("streak_count", Category::Streaks, SuffixPolicy::BaseOnly, |ctx, _| {
        ctx.team_stats
            .as_ref()
            .map(|stats| stats.streak_count.to_string())
            .unwrap_or_else(|| "0".to_string())
    });

    registry.register("home_streak", Category::Streaks, SuffixPolicy::BaseOnly, |ctx, _| {
        any_game(ctx)
            .map(|game| game.streaks.home_streak.clone())
            .unwrap_or_default()
    });

    registry.register("away_streak", Category::Streaks, SuffixPolicy::BaseOnly, |ctx, _| {
        any_game(ctx)
            .map(|game| game.streaks.away_streak.clone())
            .unwrap_or_default()
    });

    registry.register("last_5_record", Category::Streaks, SuffixPolicy::BaseOnly, |ctx, _| {
        any_game(ctx)
            .map(|game| game.streaks.last_5_record.clone())
            .unwrap_or_default()
    });

    registry.register("last_10_record", Category::Streaks, SuffixPolicy::BaseOnly, |ctx, _| {
        any_game(ctx)
            .map(|game| game.streaks.last_10_record.clone())
            .unwrap_or_default()
    });
}
