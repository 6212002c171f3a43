//! Broadcast variables

use crate::templates::registry::{Category, SuffixPolicy, VariableRegistry};

use super::{bool_str, event_of};

const NATIONAL_NETWORKS: [&str; 12] = [
    "espn", "abc", "nbc", "cbs", "fox", "tnt", "tbs", "amazon", "prime video", "peacock",
    "nfl network", "apple tv",
];

pub fn register(registry: &mut VariableRegistry) {
    registry.register("broadcast", Category::Broadcast, SuffixPolicy::All, |_, game| {
        event_of(game)
            .and_then(|event| event.broadcasts.first().cloned())
            .unwrap_or_default()
    });

    registry.register("broadcasts", Category::Broadcast, SuffixPolicy::All, |_, game| {
        event_of(game)
            .map(|event| event.broadcasts.join(", "))
            .unwrap_or_default()
    });

    registry.register(
        "is_national_broadcast",
        Category::Broadcast,
        SuffixPolicy::All,
        |_, game| {
            bool_str(
                event_of(game)
                    .map(|event| {
                        event.broadcasts.iter().any(|broadcast| {
                            let lower = broadcast.to_lowercase();
                            NATIONAL_NETWORKS.iter().any(|network| lower.contains(network))
                        })
                    })
                    .unwrap_or(false),
            )
        },
    );
}
