//! Pre-match stream filtering
//!
//! Positive detection: a stream must contain a game indicator (vs, at, @,
//! v, x) before it enters the matching pipeline, so match rates reflect
//! game streams and not placeholders. `@` only counts when it separates
//! teams, not when it introduces a date or time.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::Stream;

fn re_game_indicator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(vs\.?|at|v|x)\b").expect("static pattern compiles"))
}

// "@ Ravens" and "@ #4 Texas" are games; "@ Dec 05", "@ 2025-12-06" and
// "@ 12:00" are date/time markers
fn re_at_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?ix)@\s+
              (?: \#?\d+\s+ )?          # optional ranking marker
              ([A-Za-z]{2,})",
        )
        .expect("static pattern compiles")
    })
}

fn re_at_date_time() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)@\s+(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|jun(?:e)?|jul(?:y)?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\b|@\s+20\d{2}|@\s+\d{1,2}:\d{2}",
        )
        .expect("static pattern compiles")
    })
}

/// Whether a stream name contains a matchup indicator
pub fn has_game_indicator(stream_name: &str) -> bool {
    if re_game_indicator().is_match(stream_name) {
        return true;
    }

    // Every @ that leads a date/time is disqualified; any remaining @
    // followed by a team-looking token counts
    for m in re_at_separator().find_iter(stream_name) {
        if !re_at_date_time().is_match(m.as_str()) {
            return true;
        }
    }
    false
}

/// Result of the three-layer stream filter
#[derive(Debug, Default)]
pub struct FilterResult {
    pub game_streams: Vec<Stream>,
    pub filtered_streams: Vec<Stream>,
    pub filtered_no_indicator: usize,
    pub filtered_include_regex: usize,
    pub filtered_exclude_regex: usize,
}

/// Filter a stream pool down to plausible game streams
///
/// Layer order matters: the include regex whitelists first, the exclude
/// regex blacklists second, which allows "include Washington teams, but
/// exclude George Washington".
pub fn filter_game_streams(
    streams: Vec<Stream>,
    include_regex: Option<&Regex>,
    exclude_regex: Option<&Regex>,
) -> FilterResult {
    let mut result = FilterResult::default();

    for stream in streams {
        if !has_game_indicator(&stream.name) {
            result.filtered_no_indicator += 1;
            result.filtered_streams.push(stream);
            continue;
        }
        if let Some(include) = include_regex {
            if !include.is_match(&stream.name) {
                result.filtered_include_regex += 1;
                result.filtered_streams.push(stream);
                continue;
            }
        }
        if let Some(exclude) = exclude_regex {
            if exclude.is_match(&stream.name) {
                result.filtered_exclude_regex += 1;
                result.filtered_streams.push(stream);
                continue;
            }
        }
        result.game_streams.push(stream);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(id: i64, name: &str) -> Stream {
        Stream {
            id,
            name: name.to_string(),
            m3u_account: None,
        }
    }

    #[test]
    fn standard_indicators_detected() {
        assert!(has_game_indicator("NBA 01: Lakers vs Celtics"));
        assert!(has_game_indicator("Patriots at Bills"));
        assert!(has_game_indicator("Arsenal v Chelsea"));
        assert!(has_game_indicator("76ers x Wizards"));
        assert!(has_game_indicator("NFL 02: Chiefs @ Ravens"));
    }

    #[test]
    fn at_with_ranking_is_game() {
        assert!(has_game_indicator("Oklahoma @ 4 Texas T"));
        assert!(has_game_indicator("Auburn @ #8 Alabama"));
    }

    #[test]
    fn at_with_date_or_time_is_not_game() {
        assert!(!has_game_indicator("UFC 302 @ Dec 05 08:00 PM ET"));
        assert!(!has_game_indicator("ESPN+ 122 : Show Name @ December 05"));
        assert!(!has_game_indicator("Show @ 12:00"));
        assert!(!has_game_indicator("Card @ 2025-12-06"));
    }

    #[test]
    fn plain_channels_are_not_games() {
        assert!(!has_game_indicator("RedZone"));
        assert!(!has_game_indicator("NFL Network"));
        assert!(!has_game_indicator("NFL 03 - "));
    }

    #[test]
    fn include_runs_before_exclude() {
        let include = Regex::new("(?i)washington").unwrap();
        let exclude = Regex::new("(?i)george washington").unwrap();
        let result = filter_game_streams(
            vec![
                stream(1, "Washington State vs BYU"),
                stream(2, "George Washington vs Fordham"),
                stream(3, "Duke vs UNC"),
            ],
            Some(&include),
            Some(&exclude),
        );
        assert_eq!(result.game_streams.len(), 1);
        assert_eq!(result.game_streams[0].id, 1);
        assert_eq!(result.filtered_include_regex, 1);
        assert_eq!(result.filtered_exclude_regex, 1);
    }

    #[test]
    fn no_indicator_streams_are_counted() {
        let result = filter_game_streams(
            vec![stream(1, "NBA 01: Lakers vs Celtics"), stream(2, "RedZone")],
            None,
            None,
        );
        assert_eq!(result.game_streams.len(), 1);
        assert_eq!(result.filtered_no_indicator, 1);
    }
}
