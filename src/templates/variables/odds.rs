//! Odds variables; populated only when same-day scoreboard data carried them

use crate::templates::registry::{Category, SuffixPolicy, VariableRegistry};

use super::bool_str;

pub fn register(registry: &mut VariableRegistry) {
    registry.register("odds_spread", Category::Odds, SuffixPolicy::All, |_, game| {
        game.and_then(|g| g.odds.as_ref())
            .and_then(|odds| odds.spread.clone())
            .unwrap_or_default()
    });

    registry.register("odds_over_under", Category::Odds, SuffixPolicy::All, |_, game| {
        game.and_then(|g| g.odds.as_ref())
            .and_then(|odds| odds.over_under)
            .map(|total| format!("{total}"))
            .unwrap_or_default()
    });

    registry.register("odds_provider", Category::Odds, SuffixPolicy::All, |_, game| {
        game.and_then(|g| g.odds.as_ref())
            .and_then(|odds| odds.provider.clone())
            .unwrap_or_default()
    });

    registry.register("team_moneyline", Category::Odds, SuffixPolicy::All, |_, game| {
        game.and_then(|g| {
            let odds = g.odds.as_ref()?;
            let line = if g.is_home {
                odds.home_moneyline
            } else {
                odds.away_moneyline
            }?;
            Some(format_moneyline(line))
        })
        .unwrap_or_default()
    });

    registry.register("opponent_moneyline", Category::Odds, SuffixPolicy::All, |_, game| {
        game.and_then(|g| {
            let odds = g.odds.as_ref()?;
            let line = if g.is_home {
                odds.away_moneyline
            } else {
                odds.home_moneyline
            }?;
            Some(format_moneyline(line))
        })
        .unwrap_or_default()
    });

    registry.register("has_odds", Category::Odds, SuffixPolicy::All, |_, game| {
        bool_str(game.map(|g| g.odds.is_some()).unwrap_or(false))
    });
}

fn format_moneyline(line: i64) -> String {
    if line > 0 {
        format!("+{line}")
    } else {
        line.to_string()
    }
}
