//! Conference and division variables

use crate::templates::registry::{Category, SuffixPolicy, VariableRegistry};

use super::{bool_str, event_of};

pub fn register(registry: &mut VariableRegistry) {
    registry.register(
        "conference_name",
        Category::Conference,
        SuffixPolicy::BaseOnly,
        |ctx, _| {
            ctx.team_stats
                .as_ref()
                .map(|stats| stats.conference_name.clone())
                .unwrap_or_default()
        },
    );

    registry.register(
        "conference_abbrev",
        Category::Conference,
        SuffixPolicy::BaseOnly,
        |ctx, _| {
            ctx.team_stats
                .as_ref()
                .map(|stats| stats.conference_abbrev.clone())
                .unwrap_or_default()
        },
    );

    registry.register(
        "division_name",
        Category::Conference,
        SuffixPolicy::BaseOnly,
        |ctx, _| {
            ctx.team_stats
                .as_ref()
                .map(|stats| stats.division_name.clone())
                .unwrap_or_default()
        },
    );

    // conferenceCompetition only arrives via same-day scoreboard enrichment
    registry.register(
        "is_conference_game",
        Category::Conference,
        SuffixPolicy::All,
        |_, game| {
            bool_str(
                event_of(game)
                    .map(|event| event.conference_competition)
                    .unwrap_or(false),
            )
        },
    );
}
