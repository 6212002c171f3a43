//! Outcome variables
//!
//! Win/loss facts exist only after a final; these guard on completion even
//! under the `.last` suffix because the last game may be postponed or
//! still in progress.

use crate::templates::registry::{Category, SuffixPolicy, VariableRegistry};

use super::{bool_str, event_of, scores_for};

fn final_scores(
    ctx: &crate::epg::context::TemplateContext,
    game: Option<&crate::epg::context::GameContext>,
) -> Option<(u32, u32)> {
    let event = event_of(game)?;
    if !event.is_final() {
        return None;
    }
    scores_for(ctx, game)
}

pub fn register(registry: &mut VariableRegistry) {
    registry.register("game_result", Category::Outcome, SuffixPolicy::LastOnly, |ctx, game| {
        final_scores(ctx, game)
            .map(|(ours, theirs)| {
                if ours > theirs {
                    "Win"
                } else if ours < theirs {
                    "Loss"
                } else {
                    "Tie"
                }
                .to_string()
            })
            .unwrap_or_default()
    });

    registry.register("won", Category::Outcome, SuffixPolicy::LastOnly, |ctx, game| {
        bool_str(
            final_scores(ctx, game)
                .map(|(ours, theirs)| ours > theirs)
                .unwrap_or(false),
        )
    });

    registry.register("lost", Category::Outcome, SuffixPolicy::LastOnly, |ctx, game| {
        bool_str(
            final_scores(ctx, game)
                .map(|(ours, theirs)| ours < theirs)
                .unwrap_or(false),
        )
    });

    registry.register("final_score", Category::Outcome, SuffixPolicy::LastOnly, |ctx, game| {
        final_scores(ctx, game)
            .map(|(ours, theirs)| format!("{ours}-{theirs}"))
            .unwrap_or_default()
    });
}
