//! Ranking variables, primarily for college sports
//!
//! An absent rank means unranked and renders as the empty string, never
//! "false" or a sentinel number.

use crate::templates::registry::{Category, SuffixPolicy, VariableRegistry};

use super::bool_str;

fn team_rank(ctx: &crate::epg::context::TemplateContext) -> Option<u32> {
    ctx.team_stats.as_ref().and_then(|stats| stats.rank)
}

fn opponent_rank(game: Option<&crate::epg::context::GameContext>) -> Option<u32> {
    game.and_then(|g| {
        g.opponent_stats
            .as_ref()
            .and_then(|stats| stats.rank)
            .or_else(|| g.opponent.as_ref().and_then(|opponent| opponent.rank))
    })
}

pub fn register(registry: &mut VariableRegistry) {
    registry.register("team_rank", Category::Rankings, SuffixPolicy::BaseOnly, |ctx, _| {
        team_rank(ctx).map(|rank| rank.to_string()).unwrap_or_default()
    });

    registry.register("team_rank_display", Category::Rankings, SuffixPolicy::BaseOnly, |ctx, _| {
        team_rank(ctx).map(|rank| format!("#{rank}")).unwrap_or_default()
    });

    registry.register("is_ranked", Category::Rankings, SuffixPolicy::BaseOnly, |ctx, _| {
        bool_str(team_rank(ctx).is_some())
    });

    registry.register("opponent_rank", Category::Rankings, SuffixPolicy::All, |_, game| {
        opponent_rank(game).map(|rank| rank.to_string()).unwrap_or_default()
    });

    registry.register(
        "opponent_rank_display",
        Category::Rankings,
        SuffixPolicy::All,
        |_, game| {
            opponent_rank(game)
                .map(|rank| format!("#{rank}"))
                .unwrap_or_default()
        },
    );

    registry.register("opponent_is_ranked", Category::Rankings, SuffixPolicy::All, |_, game| {
        bool_str(opponent_rank(game).is_some())
    });

    registry.register("is_ranked_matchup", Category::Rankings, SuffixPolicy::All, |ctx, game| {
        bool_str(team_rank(ctx).is_some() && opponent_rank(game).is_some())
    });

    registry.register(
        "is_top_ten_matchup",
        Category::Rankings,
        SuffixPolicy::All,
        |ctx, game| {
            bool_str(matches!(
                (team_rank(ctx), opponent_rank(game)),
                (Some(ours), Some(theirs)) if ours <= 10 && theirs <= 10
            ))
        },
    );
}
