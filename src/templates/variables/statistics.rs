//! Scoring statistics variables

use crate::templates::registry::{Category, SuffixPolicy, VariableRegistry};

pub fn register(registry: &mut VariableRegistry) {
    registry.register("ppg", Category::Statistics, SuffixPolicy::BaseOnly, |ctx, _| {
        ctx.team_stats
            .as_ref()
            .filter(|stats| stats.ppg > 0.0)
            .map(|stats| format!("{:.1}", stats.ppg))
            .unwrap_or_default()
    });

    registry.register("papg", Category::Statistics, SuffixPolicy::BaseOnly, |ctx, _| {
        ctx.team_stats
            .as_ref()
            .filter(|stats| stats.papg > 0.0)
            .map(|stats| format!("{:.1}", stats.papg))
            .unwrap_or_default()
    });

    registry.register("opponent_ppg", Category::Statistics, SuffixPolicy::All, |_, game| {
        game.and_then(|g| g.opponent_stats.as_ref())
            .filter(|stats| stats.ppg > 0.0)
            .map(|stats| format!("{:.1}", stats.ppg))
            .unwrap_or_default()
    });

    registry.register("opponent_papg", Category::Statistics, SuffixPolicy::All, |_, game| {
        game.and_then(|g| g.opponent_stats.as_ref())
            .filter(|stats| stats.papg > 0.0)
            .map(|stats| format!("{:.1}", stats.papg))
            .unwrap_or_default()
    });

    registry.register(
        "scoring_leader",
        Category::Statistics,
        SuffixPolicy::All,
        |_, game| {
            game.map(|g| {
                let leaders = &g.player_leaders;
                if leaders.scoring_leader_name.is_empty() {
                    String::new()
                } else {
                    format!(
                        "{} ({})",
                        leaders.scoring_leader_name, leaders.scoring_leader_points
                    )
                }
            })
            .unwrap_or_default()
        },
    );

    registry.register(
        "passing_leader",
        Category::Statistics,
        SuffixPolicy::All,
        |_, game| {
            game.map(|g| {
                let leaders = &g.player_leaders;
                if leaders.passing_leader_name.is_empty() {
                    String::new()
                } else {
                    format!(
                        "{} ({})",
                        leaders.passing_leader_name, leaders.passing_leader_stats
                    )
                }
            })
            .unwrap_or_default()
        },
    );

    registry.register(
        "rushing_leader",
        Category::Statistics,
        SuffixPolicy::All,
        |_, game| {
            game.map(|g| {
                let leaders = &g.player_leaders;
                if leaders.rushing_leader_name.is_empty() {
                    String::new()
                } else {
                    format!(
                        "{} ({})",
                        leaders.rushing_leader_name, leaders.rushing_leader_stats
                    )
                }
            })
            .unwrap_or_default()
        },
    );

    registry.register(
        "receiving_leader",
        Category::Statistics,
        SuffixPolicy::All,
        |_, game| {
            game.map(|g| {
                let leaders = &g.player_leaders;
                if leaders.receiving_leader_name.is_empty() {
                    String::new()
                } else {
                    format!(
                        "{} ({})",
                        leaders.receiving_leader_name, leaders.receiving_leader_stats
                    )
                }
            })
            .unwrap_or_default()
        },
    );
}
