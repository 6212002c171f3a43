//! Fuzzy team matching within a league
//!
//! Each team gets two search-name sets. Primary names are team-specific
//! (full name, nickname, short name, abbreviation, slug); secondary names
//! are location-only and rank lower because cities are shared ("LA" serves
//! both Lakers and Clippers). Candidates score by tier, longer match winning
//! within a tier, and a user alias table outranks everything.

use std::collections::HashMap;

use crate::models::{Team, TeamAlias, TeamLeagueRow};

use super::normalizer::fold_accents;

const US_STATES: [&str; 51] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY", "DC",
];

/// Normalize a name for index and query comparison
///
/// Lowercase, backtick to apostrophe, underscore to space, non-state
/// parentheticals removed, accents folded, punctuation collapsed, and
/// standalone numeric tokens dropped ("SV 07 Elversberg" == "SV Elversberg").
pub fn normalize_search_name(raw: &str) -> String {
    let mut text = raw.to_lowercase();
    text = text.replace('`', "'");
    text = text.replace('_', " ");
    text = fold_accents(&text);

    // Strip parentheticals unless they hold a US state abbreviation
    let mut output = String::with_capacity(text.len());
    let mut rest = text.as_str();
    while let Some(open) = rest.find('(') {
        output.push_str(&rest[..open]);
        match rest[open..].find(')') {
            Some(close_rel) => {
                let inner = rest[open + 1..open + close_rel].trim();
                if US_STATES.contains(&inner.to_uppercase().as_str()) {
                    output.push('(');
                    output.push_str(inner);
                    output.push(')');
                }
                rest = &rest[open + close_rel + 1..];
            }
            None => {
                rest = &rest[open + 1..];
            }
        }
    }
    output.push_str(rest);

    // Collapse punctuation except apostrophes and state parens
    let cleaned: String = output
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '\'' || c == '(' || c == ')' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    // Drop standalone numeric tokens and collapse whitespace
    cleaned
        .split_whitespace()
        .filter(|token| !token.chars().all(|c| c.is_ascii_digit()))
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Find `needle` as a whole word inside `haystack`; both pre-normalized
fn contains_word(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    let mut search_from = 0;
    while let Some(rel_pos) = haystack[search_from..].find(needle) {
        let pos = search_from + rel_pos;
        let before_ok = pos == 0
            || !haystack[..pos]
                .chars()
                .next_back()
                .map(char::is_alphanumeric)
                .unwrap_or(false);
        let end = pos + needle.len();
        let after_ok = end == haystack.len()
            || !haystack[end..]
                .chars()
                .next()
                .map(char::is_alphanumeric)
                .unwrap_or(false);
        if before_ok && after_ok {
            return Some(pos);
        }
        search_from = pos + 1;
    }
    None
}

struct IndexedTeam {
    team: Team,
    primary: Vec<String>,
    secondary: Vec<String>,
}

/// One match candidate with its quality
#[derive(Debug, Clone)]
pub struct TeamMatch {
    pub team: Team,
    /// 4 = exact, 3 = query-prefix-of-name, 2 = name-word-in-query,
    /// 1 = name-prefix-of-query, 0 = query-word-in-name (surfaced only so
    /// disambiguation can try e.g. Loyola Maryland for "Maryland")
    pub tier: u8,
    pub match_length: usize,
    pub primary: bool,
    pub via_alias: bool,
}

/// Search index over one league's team list
pub struct TeamIndex {
    pub league: String,
    teams: Vec<IndexedTeam>,
    aliases: HashMap<String, TeamAlias>,
}

impl TeamIndex {
    pub fn build(league: &str, teams: Vec<Team>, aliases: Vec<TeamAlias>) -> Self {
        let indexed = teams
            .into_iter()
            .map(|team| {
                let mut primary = Vec::new();
                let mut secondary = Vec::new();

                let mut push_unique = |set: &mut Vec<String>, name: String| {
                    if !name.is_empty() && !set.contains(&name) {
                        set.push(name);
                    }
                };

                let display = normalize_search_name(&team.name);
                push_unique(&mut primary, display.clone());
                if let Some(short) = &team.short_name {
                    push_unique(&mut primary, normalize_search_name(short));
                }
                if let Some(abbrev) = &team.abbreviation {
                    push_unique(&mut primary, abbrev.to_lowercase());
                }
                if let Some(slug) = &team.slug {
                    push_unique(&mut primary, normalize_search_name(&slug.replace('-', " ")));
                }
                // Nickname: trailing word of a multi-word display name
                let words: Vec<&str> = display.split(' ').collect();
                if words.len() >= 2 {
                    push_unique(&mut primary, words[words.len() - 1].to_string());
                }

                if let Some(location) = &team.location {
                    push_unique(&mut secondary, normalize_search_name(location));
                }
                // Everything but the nickname is a location-ish name
                if words.len() > 2 {
                    push_unique(
                        &mut secondary,
                        words[..words.len() - 1].join(" "),
                    );
                }
                // Location names must not shadow primary names
                secondary.retain(|name| !primary.contains(name));

                IndexedTeam {
                    team,
                    primary,
                    secondary,
                }
            })
            .collect();

        let aliases = aliases
            .into_iter()
            .map(|alias| (normalize_search_name(&alias.alias), alias))
            .collect();

        Self {
            league: league.to_string(),
            teams: indexed,
            aliases,
        }
    }

    pub fn from_cache_rows(league: &str, rows: Vec<TeamLeagueRow>, aliases: Vec<TeamAlias>) -> Self {
        let teams = rows
            .into_iter()
            .map(|row| Team {
                id: row.team_id,
                slug: Some(row.team_name.to_lowercase().replace(' ', "-")),
                name: row.team_name,
                abbreviation: row.team_abbrev,
                short_name: row.team_short_name,
                location: None,
                logo_url: None,
                color: None,
                rank: None,
            })
            .collect();
        Self::build(league, teams, aliases)
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    fn score(indexed: &IndexedTeam, query: &str) -> Option<(u8, usize, bool)> {
        let mut best: Option<(u8, usize, bool)> = None;

        let mut consider = |tier: u8, length: usize, primary: bool| {
            let better = match best {
                None => true,
                Some((b_tier, b_len, b_primary)) => {
                    (tier, primary, length) > (b_tier, b_primary, b_len)
                }
            };
            if better {
                best = Some((tier, length, primary));
            }
        };

        for name in &indexed.primary {
            if name.len() < 2 {
                continue;
            }
            if query == name {
                consider(4, name.len(), true);
            }
            if name.len() >= 3 || query.len() >= 3 {
                if name.starts_with(query) && query.len() >= 3 {
                    consider(3, query.len(), true);
                }
                if name.len() >= 3 && contains_word(query, name).is_some() {
                    consider(2, name.len(), true);
                }
                if name.len() >= 3 && query.starts_with(name.as_str()) {
                    consider(1, name.len(), true);
                }
                if query.len() >= 3 && contains_word(name, &query).is_some() {
                    consider(0, query.len(), true);
                }
            }
        }

        // Secondary names: exact and whole-word only, never prefix
        for name in &indexed.secondary {
            if name.len() < 3 {
                continue;
            }
            if query == name {
                consider(4, name.len(), false);
            }
            if contains_word(query, name).is_some() {
                consider(2, name.len(), false);
            }
            if query.len() >= 3 && contains_word(name, &query).is_some() {
                consider(0, query.len(), false);
            }
        }

        best
    }

    /// All candidate teams for a query, best first
    ///
    /// Ordering: alias, then tier descending, primary before secondary
    /// within a tier, longer match before shorter.
    pub fn all_matches(&self, raw_query: &str, limit: usize) -> Vec<TeamMatch> {
        let query = normalize_search_name(raw_query);
        if query.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<TeamMatch> = Vec::new();

        if let Some(alias) = self.aliases.get(&query) {
            let team = self
                .teams
                .iter()
                .find(|indexed| indexed.team.id == alias.team_id)
                .map(|indexed| indexed.team.clone())
                .unwrap_or_else(|| Team {
                    id: alias.team_id.clone(),
                    name: alias.team_name.clone(),
                    ..Default::default()
                });
            matches.push(TeamMatch {
                team,
                tier: 4,
                match_length: query.len(),
                primary: true,
                via_alias: true,
            });
        }

        for indexed in &self.teams {
            if matches
                .iter()
                .any(|existing| existing.team.id == indexed.team.id)
            {
                continue;
            }
            if let Some((tier, length, primary)) = Self::score(indexed, &query) {
                matches.push(TeamMatch {
                    team: indexed.team.clone(),
                    tier,
                    match_length: length,
                    primary,
                    via_alias: false,
                });
            }
        }

        matches.sort_by(|a, b| {
            (b.via_alias, b.tier, b.primary, b.match_length).cmp(&(
                a.via_alias,
                a.tier,
                a.primary,
                a.match_length,
            ))
        });
        matches.truncate(limit);
        matches
    }

    /// The single best match, if any
    pub fn best_match(&self, raw_query: &str) -> Option<TeamMatch> {
        self.all_matches(raw_query, 1).into_iter().next()
    }

    /// All teams appearing as whole words anywhere in the text, sorted by
    /// position. Feeds the "two teams anywhere" separator-less fallback.
    pub fn find_teams_in_text(&self, raw_text: &str) -> Vec<(Team, usize, usize)> {
        let text = normalize_search_name(raw_text);
        let mut found: Vec<(Team, usize, usize)> = Vec::new();

        for indexed in &self.teams {
            let names = indexed.primary.iter().chain(indexed.secondary.iter());
            for name in names {
                if name.len() < 3 {
                    continue;
                }
                if let Some(pos) = contains_word(&text, name) {
                    if !found.iter().any(|(team, _, _)| team.id == indexed.team.id) {
                        found.push((indexed.team.clone(), pos, name.len()));
                    }
                    break;
                }
            }
        }

        found.sort_by_key(|(_, pos, _)| *pos);
        found
    }

    /// Separator-less fallback: exactly two teams anywhere in the text,
    /// first by position = away, second = home
    pub fn two_teams_anywhere(&self, raw_text: &str) -> Option<(Team, Team)> {
        let mut found = self.find_teams_in_text(raw_text);
        if found.len() < 2 {
            return None;
        }
        if found.len() > 2 {
            // Keep the two longest matches ("NY Giants vs New England
            // Patriots" also hits "Giants" and "Patriots"), then restore
            // positional order
            found.sort_by(|a, b| b.2.cmp(&a.2));
            found.truncate(2);
            found.sort_by_key(|(_, pos, _)| *pos);
        }
        let home = found.pop()?.0;
        let away = found.pop()?.0;
        Some((away, home))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(id: &str, name: &str, abbrev: &str, location: &str) -> Team {
        Team {
            id: id.to_string(),
            name: name.to_string(),
            abbreviation: Some(abbrev.to_string()),
            short_name: None,
            slug: Some(name.to_lowercase().replace(' ', "-")),
            location: Some(location.to_string()),
            logo_url: None,
            color: None,
            rank: None,
        }
    }

    fn ncaa_index() -> TeamIndex {
        TeamIndex::build(
            "mens-college-basketball",
            vec![
                team("52", "Maryland Terrapins", "MD", "Maryland"),
                team("2379", "Maryland Eastern Shore Hawks", "UMES", "Maryland Eastern Shore"),
                team("2352", "Loyola Maryland Greyhounds", "L-MD", "Loyola Maryland"),
                team("264", "Washington Huskies", "WASH", "Washington"),
                team("265", "Washington State Cougars", "WSU", "Washington State"),
                team("349", "Army Black Knights", "ARMY", "Army"),
            ],
            Vec::new(),
        )
    }

    #[test]
    fn exact_name_beats_everything() {
        let index = ncaa_index();
        let best = index.best_match("Maryland Terrapins").unwrap();
        assert_eq!(best.team.id, "52");
        assert_eq!(best.tier, 4);
    }

    #[test]
    fn query_prefix_prefers_longer_specific_name() {
        // "washington state" is a prefix of "washington state cougars",
        // which must beat the word match on "washington"
        let index = ncaa_index();
        let best = index.best_match("washington state").unwrap();
        assert_eq!(best.team.id, "265");
    }

    #[test]
    fn ambiguous_location_yields_multiple_candidates() {
        let index = ncaa_index();
        let matches = index.all_matches("Maryland", 5);
        let ids: Vec<&str> = matches.iter().map(|m| m.team.id.as_str()).collect();
        assert!(ids.contains(&"52"));
        assert!(ids.contains(&"2379"));
        assert!(ids.contains(&"2352"));
        // The flagship program sorts first
        assert_eq!(matches[0].team.id, "52");
    }

    #[test]
    fn numeric_tokens_are_ignored() {
        let index = TeamIndex::build(
            "ger.2",
            vec![team("86", "SV 07 Elversberg", "ELV", "Elversberg")],
            Vec::new(),
        );
        let best = index.best_match("SV Elversberg").unwrap();
        assert_eq!(best.team.id, "86");
    }

    #[test]
    fn accents_fold_for_matching() {
        let index = TeamIndex::build(
            "esp.1",
            vec![team("1068", "Atlético Madrid", "ATM", "Madrid")],
            Vec::new(),
        );
        let best = index.best_match("Atletico Madrid").unwrap();
        assert_eq!(best.team.id, "1068");
    }

    #[test]
    fn alias_outranks_fuzzy_matching() {
        let index = TeamIndex::build(
            "eng.1",
            vec![
                team("367", "Tottenham Hotspur", "TOT", "Tottenham"),
                team("375", "San Antonio Spurs", "SA", "San Antonio"),
            ],
            vec![TeamAlias {
                alias: "Spurs".to_string(),
                league: "eng.1".to_string(),
                team_id: "367".to_string(),
                team_name: "Tottenham Hotspur".to_string(),
            }],
        );
        let best = index.best_match("Spurs").unwrap();
        assert_eq!(best.team.id, "367");
        assert!(best.via_alias);
    }

    #[test]
    fn state_paren_disambiguates_miami() {
        let index = TeamIndex::build(
            "mens-college-basketball",
            vec![
                team("193", "Miami (OH) RedHawks", "M-OH", "Miami (OH)"),
                team("2390", "Miami Hurricanes", "MIA", "Miami"),
            ],
            Vec::new(),
        );
        let best = index.best_match("Miami (OH)").unwrap();
        assert_eq!(best.team.id, "193");
    }

    #[test]
    fn two_teams_anywhere_orders_by_position() {
        let index = ncaa_index();
        let (away, home) = index
            .two_teams_anywhere("maryland eastern shore hawks army black knights")
            .unwrap();
        assert_eq!(away.id, "2379");
        assert_eq!(home.id, "349");
    }

    #[test]
    fn single_team_in_text_is_not_a_matchup() {
        let index = ncaa_index();
        assert!(index.two_teams_anywhere("army recruiting special").is_none());
    }

    #[test]
    fn matching_is_deterministic() {
        let index = ncaa_index();
        let first = index.all_matches("maryland", 5);
        for _ in 0..5 {
            let again = index.all_matches("maryland", 5);
            let ids_first: Vec<&str> = first.iter().map(|m| m.team.id.as_str()).collect();
            let ids_again: Vec<&str> = again.iter().map(|m| m.team.id.as_str()).collect();
            assert_eq!(ids_first, ids_again);
        }
    }

    #[test]
    fn normalize_strips_underscores_and_backticks() {
        assert_eq!(normalize_search_name("Gardner_Webb"), "gardner webb");
        assert_eq!(normalize_search_name("Hawai`i"), "hawai'i");
        assert_eq!(normalize_search_name("St. John's"), "st john's");
    }
}
