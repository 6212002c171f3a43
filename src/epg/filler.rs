//! Filler generation
//!
//! Partitions the time outside real games into pregame/postgame/idle
//! programs aligned to six-hour blocks (00:00, 06:00, 12:00, 18:00 local).
//! Filler programs run through the same template machinery as games, so a
//! pregame block can talk about the upcoming matchup and a postgame block
//! about the final score.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::config::MidnightCrossoverMode;
use crate::models::{EventState, FillerType, Program, ProgramKind, Template};
use crate::templates::TemplateResolver;

use super::context::{GameContext, TemplateContext};

/// A game with its computed on-air span and prebuilt context
#[derive(Debug, Clone)]
pub struct GameSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub context: GameContext,
}

/// How far ahead "no upcoming game" means offseason
const OFFSEASON_LOOKAHEAD_DAYS: i64 = 30;

#[derive(Debug, Clone)]
pub struct FillerSettings {
    pub midnight_crossover_mode: MidnightCrossoverMode,
}

pub struct FillerGenerator<'a> {
    resolver: &'a TemplateResolver,
    template: &'a Template,
    timezone: Tz,
    settings: FillerSettings,
}

impl<'a> FillerGenerator<'a> {
    pub fn new(
        resolver: &'a TemplateResolver,
        template: &'a Template,
        timezone: Tz,
        settings: FillerSettings,
    ) -> Self {
        Self {
            resolver,
            template,
            timezone,
            settings,
        }
    }

    /// Generate filler for the whole window
    ///
    /// `window_games` are the games inside the EPG window, sorted by start;
    /// `extended_games` cover +/-30 days and feed next/last-game context.
    pub fn generate(
        &self,
        tvg_id: &str,
        base_ctx: &TemplateContext,
        window_games: &[GameSpan],
        extended_games: &[GameSpan],
        epg_start: DateTime<Utc>,
        days_ahead: u32,
    ) -> Vec<Program> {
        let mut filler = Vec::new();

        let first_day_start = epg_start;
        let start_date = epg_start.with_timezone(&self.timezone).date_naive();
        let end_date = start_date + Duration::days(i64::from(days_ahead.max(1)) - 1);

        let mut current_date = start_date;
        while current_date <= end_date {
            let day_start = if current_date == start_date {
                first_day_start
            } else {
                self.local_midnight(current_date)
            };
            let day_end = self.local_midnight(current_date + Duration::days(1));

            let games_today: Vec<&GameSpan> = window_games
                .iter()
                .filter(|game| {
                    game.start.with_timezone(&self.timezone).date_naive() == current_date
                })
                .collect();

            // A game from yesterday may have crossed midnight into today
            let crossed_in = window_games
                .iter()
                .filter(|game| {
                    game.start.with_timezone(&self.timezone).date_naive() < current_date
                })
                .map(|game| game.end)
                .filter(|end| *end > day_start)
                .max();

            if games_today.is_empty() {
                if crossed_in.is_none() && self.template.idle_enabled {
                    filler.extend(self.idle_day(
                        tvg_id,
                        base_ctx,
                        extended_games,
                        day_start,
                        day_end,
                    ));
                }
                current_date += Duration::days(1);
                continue;
            }

            // Pregame: day start to first game, unless yesterday's game is
            // still running
            let first_game = games_today[0];
            if self.template.pregame_enabled
                && crossed_in.is_none()
                && day_start < first_game.start
            {
                filler.extend(self.filler_span(
                    tvg_id,
                    base_ctx,
                    FillerType::Pregame,
                    day_start,
                    first_game.start,
                    Some(first_game),
                    last_started_before(extended_games, first_game.start),
                ));
            }

            // Gaps between games on the same day end at a game start, so
            // they render as pregame for the later game
            for pair in games_today.windows(2) {
                let (earlier, later) = (pair[0], pair[1]);
                if earlier.end < later.start && self.template.pregame_enabled {
                    filler.extend(self.filler_span(
                        tvg_id,
                        base_ctx,
                        FillerType::Pregame,
                        earlier.end,
                        later.start,
                        Some(later),
                        Some(earlier),
                    ));
                }
            }

            // Postgame: last game end onward
            let last_game = games_today[games_today.len() - 1];
            if last_game.end >= day_end {
                // Crosses midnight; the next day decides what fills it
                let next_date = current_date + Duration::days(1);
                let next_day_games: Vec<&GameSpan> = window_games
                    .iter()
                    .filter(|game| {
                        game.start.with_timezone(&self.timezone).date_naive() == next_date
                    })
                    .collect();
                let next_day_end = self.local_midnight(next_date + Duration::days(1));

                if let Some(next_game) = next_day_games.first() {
                    if self.template.pregame_enabled && last_game.end < next_game.start {
                        filler.extend(self.filler_span(
                            tvg_id,
                            base_ctx,
                            FillerType::Pregame,
                            last_game.end,
                            next_game.start,
                            Some(next_game),
                            Some(last_game),
                        ));
                    }
                } else if next_date <= end_date {
                    let span_end = next_day_end.min(self.local_midnight(end_date + Duration::days(1)));
                    match self.settings.midnight_crossover_mode {
                        MidnightCrossoverMode::Postgame => {
                            if self.template.postgame_enabled && last_game.end < span_end {
                                filler.extend(self.filler_span(
                                    tvg_id,
                                    base_ctx,
                                    FillerType::Postgame,
                                    last_game.end,
                                    span_end,
                                    next_game_after(extended_games, last_game.start),
                                    Some(last_game),
                                ));
                            }
                        }
                        MidnightCrossoverMode::Idle => {
                            if self.template.idle_enabled && last_game.end < span_end {
                                filler.extend(self.filler_span(
                                    tvg_id,
                                    base_ctx,
                                    FillerType::Idle,
                                    last_game.end,
                                    span_end,
                                    next_game_after(extended_games, last_game.start),
                                    Some(last_game),
                                ));
                            }
                        }
                    }
                    // The crossed-into day is fully handled here
                    current_date += Duration::days(2);
                    continue;
                }
            } else if self.template.postgame_enabled && last_game.end < day_end {
                filler.extend(self.filler_span(
                    tvg_id,
                    base_ctx,
                    FillerType::Postgame,
                    last_game.end,
                    day_end,
                    next_game_after(extended_games, last_game.start),
                    Some(last_game),
                ));
            }

            current_date += Duration::days(1);
        }

        filler
    }

    /// Idle filler for a whole day, aligned to time blocks
    fn idle_day(
        &self,
        tvg_id: &str,
        base_ctx: &TemplateContext,
        extended_games: &[GameSpan],
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Vec<Program> {
        let next_game = next_game_after(extended_games, day_start);
        let last_game = last_started_before(extended_games, day_start);
        self.filler_span(
            tvg_id,
            base_ctx,
            FillerType::Idle,
            day_start,
            day_end,
            next_game,
            last_game,
        )
    }

    /// Emit time-block-aligned programs covering [start, end)
    fn filler_span(
        &self,
        tvg_id: &str,
        base_ctx: &TemplateContext,
        filler_type: FillerType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        next_game: Option<&GameSpan>,
        last_game: Option<&GameSpan>,
    ) -> Vec<Program> {
        let mut ctx = base_ctx.clone();
        // Pregame and postgame point their base variables at the upcoming
        // game; idle carries no current game
        ctx.game = match filler_type {
            FillerType::Idle => None,
            _ => next_game.map(|game| game.context.clone()),
        };
        ctx.next_game = next_game.map(|game| game.context.clone());
        ctx.last_game = last_game.map(|game| game.context.clone());

        let (title_template, subtitle_template, description_template, art_template) =
            self.select_templates(filler_type, next_game, last_game);

        let title = self.resolver.resolve(&title_template, &ctx);
        let subtitle = self.resolver.resolve(&subtitle_template, &ctx);
        let description = self.resolver.resolve(&description_template, &ctx);
        let art_url = art_template
            .map(|template| self.resolver.resolve(&template, &ctx))
            .filter(|resolved| !resolved.is_empty());

        let mut programs = Vec::new();
        let mut chunk_start = start;
        while chunk_start < end {
            let chunk_end = self.next_time_block(chunk_start).min(end);
            programs.push(Program {
                tvg_id: tvg_id.to_string(),
                start: chunk_start,
                end: chunk_end,
                title: title.clone(),
                subtitle: subtitle.clone(),
                description: description.clone(),
                art_url: art_url.clone(),
                categories: vec![base_ctx.team.sport.clone()],
                kind: ProgramKind::Filler(filler_type),
            });
            chunk_start = chunk_end;
        }
        programs
    }

    /// Pick templates per filler type, honoring the offseason and
    /// final/not-final conditional toggles
    fn select_templates(
        &self,
        filler_type: FillerType,
        next_game: Option<&GameSpan>,
        last_game: Option<&GameSpan>,
    ) -> (String, String, String, Option<String>) {
        let template = self.template;
        let last_is_final = last_game
            .and_then(|game| game.context.event.as_ref())
            .map(|event| event.status.state == EventState::Final || event.status.completed)
            .unwrap_or(false);

        match filler_type {
            FillerType::Pregame => (
                template.pregame_title.clone(),
                template.pregame_subtitle.clone(),
                template.pregame_description.clone(),
                template.pregame_art_url.clone(),
            ),
            FillerType::Postgame => {
                let description = if template.postgame_conditional_enabled {
                    if last_is_final {
                        template.postgame_description_final.clone()
                    } else {
                        template.postgame_description_not_final.clone()
                    }
                } else {
                    template.postgame_description.clone()
                };
                (
                    template.postgame_title.clone(),
                    template.postgame_subtitle.clone(),
                    description,
                    template.postgame_art_url.clone(),
                )
            }
            FillerType::Idle => {
                // Offseason tier: no upcoming game in the lookahead window
                let offseason = template.idle_offseason_enabled && next_game.is_none();
                let title = if offseason {
                    template.idle_title_offseason.clone()
                } else {
                    template.idle_title.clone()
                };
                let description = if offseason {
                    template.idle_description_offseason.clone()
                } else if template.idle_conditional_enabled {
                    if last_is_final {
                        template.idle_description_final.clone()
                    } else {
                        template.idle_description_not_final.clone()
                    }
                } else {
                    template.idle_description.clone()
                };
                (
                    title,
                    template.idle_subtitle.clone(),
                    description,
                    template.idle_art_url.clone(),
                )
            }
        }
    }

    fn local_midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        let naive = date.and_hms_opt(0, 0, 0).expect("midnight is valid");
        self.timezone
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
    }

    /// Next six-hour block boundary strictly after `from`, in local time
    fn next_time_block(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        let local = from.with_timezone(&self.timezone);
        for block_hour in [6u32, 12, 18] {
            if local.hour() < block_hour {
                let naive = local
                    .date_naive()
                    .and_hms_opt(block_hour, 0, 0)
                    .expect("block hour is valid");
                if let Some(boundary) = self.timezone.from_local_datetime(&naive).earliest() {
                    let boundary = boundary.with_timezone(&Utc);
                    if boundary > from {
                        return boundary;
                    }
                }
            }
        }
        self.local_midnight(local.date_naive() + Duration::days(1))
    }
}

/// Next game strictly after an instant, capped by the offseason lookahead
fn next_game_after<'a>(games: &'a [GameSpan], after: DateTime<Utc>) -> Option<&'a GameSpan> {
    games
        .iter()
        .filter(|game| game.start > after)
        .filter(|game| game.start <= after + Duration::days(OFFSEASON_LOOKAHEAD_DAYS))
        .min_by_key(|game| game.start)
}

/// Most recent game that has started, regardless of final status
fn last_started_before<'a>(games: &'a [GameSpan], before: DateTime<Utc>) -> Option<&'a GameSpan> {
    games
        .iter()
        .filter(|game| game.start <= before)
        .max_by_key(|game| game.start)
}
