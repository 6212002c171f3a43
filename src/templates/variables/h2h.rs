//! Head-to-head variables: the season series against the current opponent

use crate::templates::registry::{Category, SuffixPolicy, VariableRegistry};

use super::bool_str;

pub fn register(registry: &mut VariableRegistry) {
    registry.register("h2h_record", Category::HeadToHead, SuffixPolicy::All, |_, game| {
        game.filter(|g| g.h2h.games_played > 0)
            .map(|g| format!("{}-{}", g.h2h.team_wins, g.h2h.opponent_wins))
            .unwrap_or_default()
    });

    registry.register("h2h_team_wins", Category::HeadToHead, SuffixPolicy::All, |_, game| {
        game.filter(|g| g.h2h.games_played > 0)
            .map(|g| g.h2h.team_wins.to_string())
            .unwrap_or_default()
    });

    registry.register(
        "h2h_opponent_wins",
        Category::HeadToHead,
        SuffixPolicy::All,
        |_, game| {
            game.filter(|g| g.h2h.games_played > 0)
                .map(|g| g.h2h.opponent_wins.to_string())
                .unwrap_or_default()
        },
    );

    registry.register(
        "h2h_previous_result",
        Category::HeadToHead,
        SuffixPolicy::All,
        |_, game| {
            game.and_then(|g| g.h2h.previous_result.clone())
                .unwrap_or_default()
        },
    );

    registry.register(
        "h2h_previous_score",
        Category::HeadToHead,
        SuffixPolicy::All,
        |_, game| {
            game.and_then(|g| g.h2h.previous_score.clone())
                .unwrap_or_default()
        },
    );

    registry.register("h2h_days_since", Category::HeadToHead, SuffixPolicy::All, |_, game| {
        game.and_then(|g| g.h2h.days_since)
            .map(|days| days.to_string())
            .unwrap_or_default()
    });

    registry.register("is_rematch", Category::HeadToHead, SuffixPolicy::All, |_, game| {
        bool_str(game.map(|g| g.h2h.games_played > 0).unwrap_or(false))
    });
}
