//! Identity variables: team, opponent, matchup, league

use crate::templates::registry::{Category, SuffixPolicy, VariableRegistry};

use super::{bool_str, event_of};

fn display_sport(sport: &str) -> String {
    let mut chars = sport.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub fn register(registry: &mut VariableRegistry) {
    registry.register("team_name", Category::Identity, SuffixPolicy::BaseOnly, |ctx, _| {
        ctx.team.team_name.clone()
    });

    registry.register("team_abbrev", Category::Identity, SuffixPolicy::BaseOnly, |ctx, _| {
        ctx.team.team_abbrev.clone()
    });

    registry.register("sport", Category::Identity, SuffixPolicy::BaseOnly, |ctx, _| {
        display_sport(&ctx.team.sport)
    });

    registry.register("league", Category::Identity, SuffixPolicy::BaseOnly, |ctx, _| {
        ctx.team.league.clone()
    });

    registry.register("league_name", Category::Identity, SuffixPolicy::BaseOnly, |ctx, _| {
        ctx.team.league_name.clone()
    });

    registry.register("opponent", Category::Identity, SuffixPolicy::All, |_, game| {
        game.and_then(|g| g.opponent.as_ref())
            .map(|opponent| opponent.name.clone())
            .unwrap_or_default()
    });

    registry.register("opponent_abbrev", Category::Identity, SuffixPolicy::All, |_, game| {
        game.and_then(|g| g.opponent.as_ref())
            .and_then(|opponent| opponent.abbreviation.clone())
            .unwrap_or_default()
    });

    // "CHI @ DET" built from abbreviations, names as fallback
    registry.register("matchup", Category::Identity, SuffixPolicy::All, |_, game| {
        event_of(game)
            .map(|event| {
                let away = event
                    .away_team
                    .abbreviation
                    .clone()
                    .unwrap_or_else(|| event.away_team.name.clone());
                let home = event
                    .home_team
                    .abbreviation
                    .clone()
                    .unwrap_or_else(|| event.home_team.name.clone());
                format!("{away} @ {home}")
            })
            .unwrap_or_default()
    });

    registry.register("home_team", Category::Identity, SuffixPolicy::All, |_, game| {
        event_of(game)
            .map(|event| event.home_team.name.clone())
            .unwrap_or_default()
    });

    registry.register("away_team", Category::Identity, SuffixPolicy::All, |_, game| {
        event_of(game)
            .map(|event| event.away_team.name.clone())
            .unwrap_or_default()
    });

    registry.register("is_home", Category::Identity, SuffixPolicy::All, |_, game| {
        bool_str(game.map(|g| g.is_home).unwrap_or(false))
    });

    registry.register("is_away", Category::Identity, SuffixPolicy::All, |_, game| {
        bool_str(game.map(|g| !g.is_home).unwrap_or(false))
    });

    registry.register("vs_at", Category::Identity, SuffixPolicy::All, |_, game| {
        match game.map(|g| g.is_home) {
            Some(true) => "vs".to_string(),
            Some(false) => "@".to_string(),
            None => String::new(),
        }
    });

    registry.register("home_away_text", Category::Identity, SuffixPolicy::All, |_, game| {
        match game.map(|g| g.is_home) {
            Some(true) => "at home".to_string(),
            Some(false) => "on the road".to_string(),
            None => String::new(),
        }
    });
}
