//! Date and time variables
//!
//! All formatting happens in the configured EPG timezone and honors the
//! 12/24-hour and show-timezone settings.

use crate::templates::registry::{Category, SuffixPolicy, VariableRegistry};

use super::event_of;

pub fn register(registry: &mut VariableRegistry) {
    registry.register("game_date", Category::Datetime, SuffixPolicy::All, |ctx, game| {
        event_of(game)
            .map(|event| {
                event
                    .start
                    .with_timezone(&ctx.timezone)
                    .format("%A, %B %-d, %Y")
                    .to_string()
            })
            .unwrap_or_default()
    });

    registry.register("game_date_short", Category::Datetime, SuffixPolicy::All, |ctx, game| {
        event_of(game)
            .map(|event| {
                event
                    .start
                    .with_timezone(&ctx.timezone)
                    .format("%b %-d")
                    .to_string()
            })
            .unwrap_or_default()
    });

    registry.register("game_time", Category::Datetime, SuffixPolicy::All, |ctx, game| {
        event_of(game)
            .map(|event| {
                let local = event.start.with_timezone(&ctx.timezone);
                let clock = if ctx.use_12_hour_clock {
                    local.format("%-I:%M %p").to_string()
                } else {
                    local.format("%H:%M").to_string()
                };
                if ctx.show_timezone {
                    format!("{clock} {}", local.format("%Z"))
                } else {
                    clock
                }
            })
            .unwrap_or_default()
    });

    registry.register("game_time_12h", Category::Datetime, SuffixPolicy::All, |ctx, game| {
        event_of(game)
            .map(|event| {
                event
                    .start
                    .with_timezone(&ctx.timezone)
                    .format("%-I:%M %p")
                    .to_string()
            })
            .unwrap_or_default()
    });

    registry.register("game_time_24h", Category::Datetime, SuffixPolicy::All, |ctx, game| {
        event_of(game)
            .map(|event| {
                event
                    .start
                    .with_timezone(&ctx.timezone)
                    .format("%H:%M")
                    .to_string()
            })
            .unwrap_or_default()
    });

    registry.register("game_day", Category::Datetime, SuffixPolicy::All, |ctx, game| {
        event_of(game)
            .map(|event| {
                event
                    .start
                    .with_timezone(&ctx.timezone)
                    .format("%A")
                    .to_string()
            })
            .unwrap_or_default()
    });

    registry.register("game_day_short", Category::Datetime, SuffixPolicy::All, |ctx, game| {
        event_of(game)
            .map(|event| {
                event
                    .start
                    .with_timezone(&ctx.timezone)
                    .format("%a")
                    .to_string()
            })
            .unwrap_or_default()
    });

    registry.register("hours_until", Category::Datetime, SuffixPolicy::All, |ctx, game| {
        event_of(game)
            .map(|event| (event.start - ctx.now).num_hours().max(0).to_string())
            .unwrap_or_default()
    });

    registry.register("minutes_until", Category::Datetime, SuffixPolicy::All, |ctx, game| {
        event_of(game)
            .map(|event| (event.start - ctx.now).num_minutes().max(0).to_string())
            .unwrap_or_default()
    });

    registry.register("days_until", Category::Datetime, SuffixPolicy::All, |ctx, game| {
        event_of(game)
            .map(|event| (event.start - ctx.now).num_days().max(0).to_string())
            .unwrap_or_default()
    });

    registry.register("time_until_text", Category::Datetime, SuffixPolicy::All, |ctx, game| {
        event_of(game)
            .map(|event| {
                let minutes = (event.start - ctx.now).num_minutes();
                let hours = minutes / 60;
                if hours > 0 {
                    format!("in {hours} hours")
                } else if minutes > 0 {
                    format!("in {minutes} minutes")
                } else {
                    "starting soon".to_string()
                }
            })
            .unwrap_or_default()
    });
}
