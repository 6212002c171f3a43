//! Template variable categories
//!
//! Each module registers the variables of one category. The registry is
//! populated once at startup via [`register_all`].

pub mod broadcast;
pub mod conference;
pub mod datetime;
pub mod h2h;
pub mod identity;
pub mod odds;
pub mod outcome;
pub mod playoffs;
pub mod rankings;
pub mod records;
pub mod scores;
pub mod soccer;
pub mod standings;
pub mod statistics;
pub mod streaks;
pub mod venue;

use crate::epg::context::{GameContext, TemplateContext};
use crate::models::Event;

use super::registry::VariableRegistry;

pub fn register_all(registry: &mut VariableRegistry) {
    identity::register(registry);
    datetime::register(registry);
    venue::register(registry);
    broadcast::register(registry);
    scores::register(registry);
    outcome::register(registry);
    records::register(registry);
    rankings::register(registry);
    streaks::register(registry);
    statistics::register(registry);
    standings::register(registry);
    conference::register(registry);
    playoffs::register(registry);
    h2h::register(registry);
    odds::register(registry);
    soccer::register(registry);
}

/// Boolean rendering: "true" or empty (falsy), never the string "false"
pub(crate) fn bool_str(value: bool) -> String {
    if value {
        "true".to_string()
    } else {
        String::new()
    }
}

pub(crate) fn event_of<'a>(game: Option<&'a GameContext>) -> Option<&'a Event> {
    game.and_then(|g| g.event.as_ref())
}

/// The game context team-wide variables read when no current game exists
/// (idle filler): current, else last, else next
pub(crate) fn any_game<'a>(ctx: &'a TemplateContext) -> Option<&'a GameContext> {
    ctx.game
        .as_ref()
        .or(ctx.last_game.as_ref())
        .or(ctx.next_game.as_ref())
}

/// Our score and the opponent's, from the team's perspective
pub(crate) fn scores_for(ctx: &TemplateContext, game: Option<&GameContext>) -> Option<(u32, u32)> {
    let event = event_of(game)?;
    let ours = event.score_for(&ctx.team.team_id)?;
    let theirs = event
        .opponent_of(&ctx.team.team_id)
        .and_then(|opponent| event.score_for(&opponent.id))?;
    Some((ours, theirs))
}
