//! Score variables
//!
//! Scores only exist once a game has started, so every variable here is
//! LAST_ONLY: `{team_score.last}` works, bare `{team_score}` does not.

use crate::templates::registry::{Category, SuffixPolicy, VariableRegistry};

use super::{event_of, scores_for};

pub fn register(registry: &mut VariableRegistry) {
    registry.register("team_score", Category::Scores, SuffixPolicy::LastOnly, |ctx, game| {
        scores_for(ctx, game)
            .map(|(ours, _)| ours.to_string())
            .unwrap_or_default()
    });

    registry.register("opponent_score", Category::Scores, SuffixPolicy::LastOnly, |ctx, game| {
        scores_for(ctx, game)
            .map(|(_, theirs)| theirs.to_string())
            .unwrap_or_default()
    });

    registry.register("score", Category::Scores, SuffixPolicy::LastOnly, |ctx, game| {
        scores_for(ctx, game)
            .map(|(ours, theirs)| format!("{ours}-{theirs}"))
            .unwrap_or_default()
    });

    registry.register("home_score", Category::Scores, SuffixPolicy::LastOnly, |_, game| {
        event_of(game)
            .and_then(|event| event.home_score)
            .map(|score| score.to_string())
            .unwrap_or_default()
    });

    registry.register("away_score", Category::Scores, SuffixPolicy::LastOnly, |_, game| {
        event_of(game)
            .and_then(|event| event.away_score)
            .map(|score| score.to_string())
            .unwrap_or_default()
    });
}
