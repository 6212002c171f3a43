//! Variable registry
//!
//! A typed collection of template variables populated at startup from a
//! bounded set of categories. Each extractor is a pure function; dispatch
//! goes through the registry, never through strings at call sites.

use std::collections::HashMap;

use crate::epg::context::{GameContext, TemplateContext};

pub type Extractor = fn(&TemplateContext, Option<&GameContext>) -> String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Identity,
    Datetime,
    Venue,
    Broadcast,
    Scores,
    Outcome,
    Records,
    Rankings,
    Streaks,
    Statistics,
    Standings,
    Conference,
    Playoffs,
    HeadToHead,
    Odds,
    Soccer,
}

/// Which suffix forms a variable supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixPolicy {
    /// `{var}`, `{var.next}`, and `{var.last}`
    All,
    /// `{var}` only: identity and team-wide values
    BaseOnly,
    /// `{var.last}` only: scores and outcomes that exist after a final
    LastOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suffix {
    Base,
    Next,
    Last,
}

pub struct VariableDef {
    pub name: &'static str,
    pub category: Category,
    pub policy: SuffixPolicy,
    extract: Extractor,
}

#[derive(Default)]
pub struct VariableRegistry {
    variables: HashMap<&'static str, VariableDef>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full standard variable set
    pub fn standard() -> Self {
        let mut registry = Self::new();
        super::variables::register_all(&mut registry);
        registry
    }

    pub fn register(
        &mut self,
        name: &'static str,
        category: Category,
        policy: SuffixPolicy,
        extract: Extractor,
    ) {
        self.variables.insert(
            name,
            VariableDef {
                name,
                category,
                policy,
                extract,
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn names_in_category(&self, category: Category) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .variables
            .values()
            .filter(|def| def.category == category)
            .map(|def| def.name)
            .collect();
        names.sort();
        names
    }

    /// Resolve one variable reference
    ///
    /// Returns None for unknown names (reported upstream as a configuration
    /// error); out-of-policy suffixes resolve to the empty string.
    pub fn resolve(&self, name: &str, suffix: Suffix, ctx: &TemplateContext) -> Option<String> {
        let def = self.variables.get(name)?;

        let allowed = match (def.policy, suffix) {
            (SuffixPolicy::All, _) => true,
            (SuffixPolicy::BaseOnly, Suffix::Base) => true,
            (SuffixPolicy::LastOnly, Suffix::Last) => true,
            _ => false,
        };
        if !allowed {
            return Some(String::new());
        }

        let game_ctx = match suffix {
            Suffix::Base => ctx.game.as_ref(),
            Suffix::Next => ctx.next_game.as_ref(),
            Suffix::Last => ctx.last_game.as_ref(),
        };
        Some((def.extract)(ctx, game_ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_covers_every_category() {
        let registry = VariableRegistry::standard();
        for category in [
            Category::Identity,
            Category::Datetime,
            Category::Venue,
            Category::Broadcast,
            Category::Scores,
            Category::Outcome,
            Category::Records,
            Category::Rankings,
            Category::Streaks,
            Category::Statistics,
            Category::Standings,
            Category::Conference,
            Category::Playoffs,
            Category::HeadToHead,
            Category::Odds,
            Category::Soccer,
        ] {
            assert!(
                !registry.names_in_category(category).is_empty(),
                "no variables registered for {category:?}"
            );
        }
    }

    #[test]
    fn unknown_variable_resolves_to_none() {
        let registry = VariableRegistry::standard();
        let ctx = crate::epg::context::TemplateContext::new(
            Default::default(),
            chrono_tz::UTC,
            chrono::Utc::now(),
        );
        assert!(registry.resolve("definitely_not_a_var", Suffix::Base, &ctx).is_none());
    }
}
