//! Template string resolution
//!
//! Substitutes `{var}`, `{var.next}`, and `{var.last}` references using the
//! variable registry. Unknown variables render as empty and are collected
//! separately so callers can report them once per run.

use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::epg::context::TemplateContext;

use super::registry::{Suffix, VariableRegistry};

fn re_placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{([a-z0-9_]+)(?:\.(next|last))?\}").expect("static pattern compiles")
    })
}

pub struct TemplateResolver {
    registry: Arc<VariableRegistry>,
}

impl TemplateResolver {
    pub fn new(registry: Arc<VariableRegistry>) -> Self {
        Self { registry }
    }

    pub fn standard() -> Self {
        Self::new(Arc::new(VariableRegistry::standard()))
    }

    /// Resolve every placeholder in a template
    pub fn resolve(&self, template: &str, ctx: &TemplateContext) -> String {
        if template.is_empty() {
            return String::new();
        }

        re_placeholder()
            .replace_all(template, |caps: &regex::Captures| {
                let name = &caps[1];
                let suffix = match caps.get(2).map(|m| m.as_str()) {
                    Some("next") => Suffix::Next,
                    Some("last") => Suffix::Last,
                    _ => Suffix::Base,
                };
                self.registry.resolve(name, suffix, ctx).unwrap_or_default()
            })
            .into_owned()
    }

    /// Variable names in the template that the registry does not know
    pub fn unknown_variables(&self, template: &str) -> Vec<String> {
        let mut unknown: Vec<String> = re_placeholder()
            .captures_iter(template)
            .filter_map(|caps| {
                let name = caps[1].to_string();
                if self.registry.contains(&name) {
                    None
                } else {
                    Some(name)
                }
            })
            .collect();
        unknown.sort();
        unknown.dedup();
        unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epg::context::{GameContext, TeamIdentity, TemplateContext};
    use crate::models::{Event, EventState, EventStatus, Team, Venue};
    use chrono::TimeZone;

    fn context() -> TemplateContext {
        let now = chrono::Utc.with_ymd_and_hms(2025, 12, 5, 12, 0, 0).unwrap();
        let tz = "America/Detroit".parse().unwrap();
        let mut ctx = TemplateContext::new(
            TeamIdentity {
                team_id: "8".to_string(),
                league: "nfl".to_string(),
                league_name: "NFL".to_string(),
                sport: "football".to_string(),
                team_name: "Detroit Lions".to_string(),
                team_abbrev: "DET".to_string(),
                logo_url: None,
                channel_id: "detroit-lions".to_string(),
            },
            tz,
            now,
        );

        let event = Event {
            id: "401".to_string(),
            league: "nfl".to_string(),
            sport: "football".to_string(),
            name: Some("Chicago Bears at Detroit Lions".to_string()),
            short_name: Some("CHI @ DET".to_string()),
            start: chrono::Utc.with_ymd_and_hms(2025, 12, 7, 18, 0, 0).unwrap(),
            home_team: Team {
                id: "8".to_string(),
                name: "Detroit Lions".to_string(),
                abbreviation: Some("DET".to_string()),
                ..Default::default()
            },
            away_team: Team {
                id: "3".to_string(),
                name: "Chicago Bears".to_string(),
                abbreviation: Some("CHI".to_string()),
                ..Default::default()
            },
            home_score: None,
            away_score: None,
            home_record: None,
            away_record: None,
            venue: Venue {
                name: Some("Ford Field".to_string()),
                city: Some("Detroit".to_string()),
                state: Some("MI".to_string()),
                indoor: true,
            },
            broadcasts: vec!["FOX".to_string()],
            season_type: Default::default(),
            status: EventStatus {
                state: EventState::Pre,
                completed: false,
                detail: None,
                period: None,
            },
            odds: None,
            conference_competition: false,
            source_league: None,
            leaders: Vec::new(),
        };

        ctx.game = Some(GameContext {
            event: Some(event.clone()),
            is_home: true,
            opponent: Some(event.away_team.clone()),
            ..Default::default()
        });
        ctx.next_game = ctx.game.clone();
        ctx
    }

    #[test]
    fn resolves_identity_variables() {
        let resolver = TemplateResolver::standard();
        let ctx = context();
        assert_eq!(
            resolver.resolve("{team_name} Football", &ctx),
            "Detroit Lions Football"
        );
        assert_eq!(resolver.resolve("{matchup}", &ctx), "CHI @ DET");
        assert_eq!(resolver.resolve("{opponent}", &ctx), "Chicago Bears");
    }

    #[test]
    fn suffix_resolves_against_next_game() {
        let resolver = TemplateResolver::standard();
        let ctx = context();
        assert_eq!(resolver.resolve("{opponent.next}", &ctx), "Chicago Bears");
        // No last game in this context
        assert_eq!(resolver.resolve("{opponent.last}", &ctx), "");
    }

    #[test]
    fn base_only_variable_ignores_suffixes() {
        let resolver = TemplateResolver::standard();
        let ctx = context();
        assert_eq!(resolver.resolve("{team_name.next}", &ctx), "");
    }

    #[test]
    fn unknown_variable_renders_empty_and_is_reported() {
        let resolver = TemplateResolver::standard();
        let ctx = context();
        assert_eq!(resolver.resolve("A{made_up_var}B", &ctx), "AB");
        assert_eq!(
            resolver.unknown_variables("{made_up_var} {team_name}"),
            vec!["made_up_var".to_string()]
        );
    }

    #[test]
    fn unranked_rank_variables_are_empty_not_false() {
        let resolver = TemplateResolver::standard();
        let ctx = context();
        assert_eq!(resolver.resolve("{team_rank}", &ctx), "");
        assert_eq!(resolver.resolve("{team_rank_display}", &ctx), "");
        assert_eq!(resolver.resolve("{is_ranked}", &ctx), "");
    }

    #[test]
    fn datetime_variables_honor_timezone() {
        let resolver = TemplateResolver::standard();
        let ctx = context();
        // 18:00 UTC is 13:00 in Detroit in December
        assert_eq!(resolver.resolve("{game_time_24h}", &ctx), "13:00");
        assert_eq!(resolver.resolve("{game_time_12h}", &ctx), "1:00 PM");
        assert_eq!(resolver.resolve("{game_day}", &ctx), "Sunday");
    }
}
