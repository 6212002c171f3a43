//! Venue variables

use crate::templates::registry::{Category, SuffixPolicy, VariableRegistry};

use super::event_of;

pub fn register(registry: &mut VariableRegistry) {
    registry.register("venue", Category::Venue, SuffixPolicy::All, |_, game| {
        event_of(game)
            .and_then(|event| event.venue.name.clone())
            .unwrap_or_default()
    });

    registry.register("venue_city", Category::Venue, SuffixPolicy::All, |_, game| {
        event_of(game)
            .and_then(|event| event.venue.city.clone())
            .unwrap_or_default()
    });

    registry.register("venue_state", Category::Venue, SuffixPolicy::All, |_, game| {
        event_of(game)
            .and_then(|event| event.venue.state.clone())
            .unwrap_or_default()
    });

    registry.register("venue_full", Category::Venue, SuffixPolicy::All, |_, game| {
        event_of(game)
            .and_then(|event| {
                let name = event.venue.name.clone()?;
                Some(match &event.venue.city {
                    Some(city) => format!("{name}, {city}"),
                    None => name,
                })
            })
            .unwrap_or_default()
    });
}
