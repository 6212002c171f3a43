//! Soccer-specific variables
//!
//! Soccer clubs play in several competitions at once; events merged from a
//! multi-league fetch are tagged with the league they were discovered in.

use crate::templates::registry::{Category, SuffixPolicy, VariableRegistry};

use super::{bool_str, event_of};

pub fn register(registry: &mut VariableRegistry) {
    registry.register("source_league", Category::Soccer, SuffixPolicy::All, |_, game| {
        event_of(game)
            .and_then(|event| event.source_league.clone())
            .unwrap_or_default()
    });

    registry.register("is_draw", Category::Soccer, SuffixPolicy::LastOnly, |_, game| {
        bool_str(
            event_of(game)
                .filter(|event| event.is_final())
                .and_then(|event| Some(event.home_score? == event.away_score?))
                .unwrap_or(false),
        )
    });

    registry.register("competitions", Category::Soccer, SuffixPolicy::BaseOnly, |ctx, _| {
        ctx.team_stats
            .as_ref()
            .map(|stats| stats.leagues.join(", "))
            .unwrap_or_default()
    });
}
