//! Season-type variables

use crate::models::SeasonType;
use crate::templates::registry::{Category, SuffixPolicy, VariableRegistry};

use super::{bool_str, event_of};

pub fn register(registry: &mut VariableRegistry) {
    registry.register("is_playoff", Category::Playoffs, SuffixPolicy::All, |_, game| {
        bool_str(
            event_of(game)
                .map(|event| event.season_type == SeasonType::Postseason)
                .unwrap_or(false),
        )
    });

    registry.register("is_preseason", Category::Playoffs, SuffixPolicy::All, |_, game| {
        bool_str(
            event_of(game)
                .map(|event| event.season_type == SeasonType::Preseason)
                .unwrap_or(false),
        )
    });

    registry.register("season_type", Category::Playoffs, SuffixPolicy::All, |_, game| {
        event_of(game)
            .map(|event| {
                match event.season_type {
                    SeasonType::Preseason => "Preseason",
                    SeasonType::Regular => "Regular Season",
                    SeasonType::Postseason => "Postseason",
                }
                .to_string()
            })
            .unwrap_or_default()
    });
}
