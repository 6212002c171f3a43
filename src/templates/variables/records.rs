//! Record variables

use crate::templates::registry::{Category, SuffixPolicy, VariableRegistry};

pub fn register(registry: &mut VariableRegistry) {
    registry.register("team_record", Category::Records, SuffixPolicy::BaseOnly, |ctx, _| {
        ctx.team_stats
            .as_ref()
            .map(|stats| stats.record.display())
            .unwrap_or_default()
    });

    registry.register("team_wins", Category::Records, SuffixPolicy::BaseOnly, |ctx, _| {
        ctx.team_stats
            .as_ref()
            .map(|stats| stats.record.wins.to_string())
            .unwrap_or_default()
    });

    registry.register("team_losses", Category::Records, SuffixPolicy::BaseOnly, |ctx, _| {
        ctx.team_stats
            .as_ref()
            .map(|stats| stats.record.losses.to_string())
            .unwrap_or_default()
    });

    registry.register("team_ties", Category::Records, SuffixPolicy::BaseOnly, |ctx, _| {
        ctx.team_stats
            .as_ref()
            .map(|stats| stats.record.ties.to_string())
            .unwrap_or_default()
    });

    registry.register("team_win_pct", Category::Records, SuffixPolicy::BaseOnly, |ctx, _| {
        ctx.team_stats
            .as_ref()
            .map(|stats| format!("{:.3}", stats.record.win_percent))
            .unwrap_or_default()
    });

    // Opponent records prefer the fetched opponent stats; the record on the
    // schedule event is often stale
    registry.register("opponent_record", Category::Records, SuffixPolicy::All, |ctx, game| {
        game.and_then(|g| {
            g.opponent_stats
                .as_ref()
                .map(|stats| stats.record.display())
                .or_else(|| {
                    let event = g.event.as_ref()?;
                    let record = if event.home_team.id == ctx.team.team_id {
                        event.away_record.as_ref()
                    } else {
                        event.home_record.as_ref()
                    };
                    record.map(|record| record.display())
                })
        })
        .unwrap_or_default()
    });
}
