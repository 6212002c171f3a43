//! Event channel EPG
//!
//! Managed event channels get a short timeline: pregame filler from the top
//! of their day, the event program itself, and postgame filler to midnight.
//! The context is rebuilt from the stored channel row, so this works even
//! when the original provider payload is long gone.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::config::MidnightCrossoverMode;
use crate::models::{Event, EventStatus, ManagedChannel, Program, ProgramKind, Team, Template, Venue};
use crate::templates::TemplateResolver;

use super::context::{GameContext, TeamIdentity, TemplateContext};
use super::filler::{FillerGenerator, FillerSettings, GameSpan};

/// Rebuild a minimal event from a managed channel row
fn event_from_channel(channel: &ManagedChannel, start: DateTime<Utc>) -> Event {
    Event {
        id: channel.event_id.clone(),
        league: channel.league.clone().unwrap_or_default(),
        sport: channel.sport.clone().unwrap_or_default(),
        name: channel.event_name.clone().or_else(|| {
            match (&channel.away_team, &channel.home_team) {
                (Some(away), Some(home)) => Some(format!("{away} @ {home}")),
                _ => None,
            }
        }),
        short_name: None,
        start,
        home_team: Team {
            name: channel.home_team.clone().unwrap_or_default(),
            ..Default::default()
        },
        away_team: Team {
            name: channel.away_team.clone().unwrap_or_default(),
            ..Default::default()
        },
        home_score: None,
        away_score: None,
        home_record: None,
        away_record: None,
        venue: Venue::default(),
        broadcasts: Vec::new(),
        season_type: Default::default(),
        status: EventStatus::default(),
        odds: None,
        conference_competition: false,
        source_league: None,
        leaders: Vec::new(),
    }
}

/// Build the one-day timeline for a managed event channel
pub fn build_event_channel_timeline(
    channel: &ManagedChannel,
    template: &Template,
    resolver: &TemplateResolver,
    timezone: Tz,
    now: DateTime<Utc>,
    duration_hours: f64,
) -> Vec<Program> {
    let Some(start) = channel.event_start else {
        return Vec::new();
    };
    let event = event_from_channel(channel, start);
    let end = start + Duration::seconds((duration_hours * 3600.0) as i64);

    let mut ctx = TemplateContext::new(
        TeamIdentity {
            team_name: event.home_team.name.clone(),
            league: event.league.clone(),
            sport: event.sport.clone(),
            channel_id: channel.tvg_id.clone(),
            ..Default::default()
        },
        timezone,
        now,
    );
    let game_ctx = GameContext {
        event: Some(event.clone()),
        is_home: true,
        opponent: Some(event.away_team.clone()),
        ..Default::default()
    };
    ctx.game = Some(game_ctx.clone());

    let title = resolver.resolve(&template.title, &ctx);
    let mut programs = vec![Program {
        tvg_id: channel.tvg_id.clone(),
        start,
        end,
        title: if title.trim().is_empty() {
            channel.channel_name.clone()
        } else {
            title
        },
        subtitle: resolver.resolve(&template.subtitle, &ctx),
        description: resolver.resolve(&template.description, &ctx),
        art_url: channel.logo_url.clone(),
        categories: vec![event.sport.clone()],
        kind: ProgramKind::Game,
    }];

    // Filler wraps the event within its local day
    let span = GameSpan {
        start,
        end,
        context: game_ctx,
    };
    let day_start = {
        use chrono::TimeZone;
        let local_date = start.with_timezone(&timezone).date_naive();
        timezone
            .from_local_datetime(&local_date.and_hms_opt(0, 0, 0).expect("midnight is valid"))
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or(start)
    };
    let filler = FillerGenerator::new(
        resolver,
        template,
        timezone,
        FillerSettings {
            midnight_crossover_mode: MidnightCrossoverMode::Idle,
        },
    );
    programs.extend(filler.generate(
        &channel.tvg_id,
        &ctx,
        std::slice::from_ref(&span),
        std::slice::from_ref(&span),
        day_start,
        1,
    ));

    programs.sort_by_key(|program| program.start);
    programs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SyncStatus;
    use chrono::TimeZone;

    fn channel(start: DateTime<Utc>) -> ManagedChannel {
        ManagedChannel {
            id: 1,
            group_id: 1,
            event_id: "401".to_string(),
            provider: "espn".to_string(),
            tvg_id: "espn.401".to_string(),
            channel_name: "CHI @ DET".to_string(),
            logo_url: None,
            middleware_channel_id: None,
            exception_keyword: None,
            primary_stream_id: None,
            home_team: Some("Detroit Lions".to_string()),
            away_team: Some("Chicago Bears".to_string()),
            event_start: Some(start),
            event_name: Some("Chicago Bears at Detroit Lions".to_string()),
            league: Some("nfl".to_string()),
            sport: Some("football".to_string()),
            scheduled_delete_at: None,
            deleted_at: None,
            delete_reason: None,
            sync_status: SyncStatus::Synced,
            sync_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn event_channel_gets_gap_free_day_timeline() {
        let tz: Tz = "America/Detroit".parse().unwrap();
        let start = tz
            .with_ymd_and_hms(2025, 12, 7, 13, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        let resolver = TemplateResolver::standard();
        let template = Template::named("event");
        let programs = build_event_channel_timeline(
            &channel(start),
            &template,
            &resolver,
            tz,
            start - Duration::hours(3),
            3.5,
        );

        assert!(!programs.is_empty());
        for pair in programs.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert!(pair[0].start < pair[0].end);
        }
        let game = programs
            .iter()
            .find(|program| program.kind == ProgramKind::Game)
            .unwrap();
        assert_eq!(game.start, start);
        assert!(game.title.contains("Detroit Lions"));
    }

    #[test]
    fn channel_without_event_start_emits_nothing() {
        let mut without_start = channel(Utc::now());
        without_start.event_start = None;
        let resolver = TemplateResolver::standard();
        let programs = build_event_channel_timeline(
            &without_start,
            &Template::named("event"),
            &resolver,
            chrono_tz::UTC,
            Utc::now(),
            3.0,
        );
        assert!(programs.is_empty());
    }
}
