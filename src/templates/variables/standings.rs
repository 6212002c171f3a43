//! Standings variables

use crate::templates::registry::{Category, SuffixPolicy, VariableRegistry};

pub fn register(registry: &mut VariableRegistry) {
    registry.register("playoff_seed", Category::Standings, SuffixPolicy::BaseOnly, |ctx, _| {
        ctx.team_stats
            .as_ref()
            .and_then(|stats| stats.playoff_seed)
            .map(|seed| seed.to_string())
            .unwrap_or_default()
    });

    registry.register("games_back", Category::Standings, SuffixPolicy::BaseOnly, |ctx, _| {
        ctx.team_stats
            .as_ref()
            .filter(|stats| stats.games_back > 0.0)
            .map(|stats| format!("{:.1}", stats.games_back))
            .unwrap_or_default()
    });

    registry.register("home_record", Category::Standings, SuffixPolicy::BaseOnly, |ctx, _| {
        ctx.team_stats
            .as_ref()
            .map(|stats| stats.home_record.clone())
            .unwrap_or_default()
    });

    registry.register("away_record", Category::Standings, SuffixPolicy::BaseOnly, |ctx, _| {
        ctx.team_stats
            .as_ref()
            .map(|stats| stats.away_record.clone())
            .unwrap_or_default()
    });

    registry.register(
        "division_record",
        Category::Standings,
        SuffixPolicy::BaseOnly,
        |ctx, _| {
            ctx.team_stats
                .as_ref()
                .map(|stats| stats.division_record.clone())
                .unwrap_or_default()
        },
    );
}
