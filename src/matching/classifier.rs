//! Stream classification
//!
//! Decides what a normalized stream is (team-vs-team, event-card,
//! placeholder) and splits out the raw team sides. The tricky part is `@`:
//! it separates teams in "Chiefs @ Ravens" but dates in "UFC 302 @ Dec 05",
//! so a separator is only accepted when its right side does not immediately
//! start with a month name, a 20xx year, or a time.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate, NaiveTime};
use regex::Regex;

use crate::errors::MatchError;
use crate::models::group::CustomRegexConfig;

use super::normalizer::{extract_date, extract_time, NormalizedStream, SEPARATORS};

macro_rules! classifier_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect("static pattern compiles"))
        }
    };
}

// Right sides that mark the separator as date/time punctuation, not a game
classifier_regex!(
    re_date_time_right,
    r"(?i)^(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|jun(?:e)?|jul(?:y)?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\b|^20\d{2}\b|^\d{1,2}:\d{2}"
);

/// Phrases whose presence marks a stream as a placeholder, never matchable
const PLACEHOLDER_PHRASES: [&str; 7] = [
    "no event",
    "off air",
    "tba",
    "to be announced",
    "coming soon",
    "no game",
    "stand by",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamCategory {
    /// Two teams facing each other
    TeamVsTeam,
    /// A multi-event card (UFC night, boxing card)
    EventCard,
    /// Channel slot with no content behind it
    Placeholder,
}

/// A classified stream with its extracted raw fields
#[derive(Debug, Clone)]
pub struct ClassifiedStream {
    pub category: StreamCategory,
    /// Left of the separator, by the "Away vs/at Home" convention
    pub away_raw: Option<String>,
    pub home_raw: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

/// Compiled, validated custom regex overrides
///
/// Each extractor can be enabled independently. Invalid user patterns are
/// returned as errors for reporting and the extractor is dropped.
#[derive(Default)]
pub struct CustomExtractors {
    teams: Option<Regex>,
    date: Option<Regex>,
    time: Option<Regex>,
}

impl CustomExtractors {
    pub fn compile(config: &CustomRegexConfig) -> (Self, Vec<MatchError>) {
        let mut extractors = Self::default();
        let mut errors = Vec::new();

        if config.teams_enabled {
            if let Some(pattern) = &config.teams_pattern {
                match Regex::new(pattern) {
                    Ok(re) => {
                        let names: Vec<&str> =
                            re.capture_names().flatten().collect();
                        if names.contains(&"team1") && names.contains(&"team2") {
                            extractors.teams = Some(re);
                        } else {
                            errors.push(MatchError::InvalidRegex {
                                field: "teams".to_string(),
                                message: "pattern must define named groups 'team1' and 'team2'"
                                    .to_string(),
                            });
                        }
                    }
                    Err(err) => errors.push(MatchError::InvalidRegex {
                        field: "teams".to_string(),
                        message: err.to_string(),
                    }),
                }
            }
        }

        if config.date_enabled {
            if let Some(pattern) = &config.date_pattern {
                match Regex::new(pattern) {
                    Ok(re) => extractors.date = Some(re),
                    Err(err) => errors.push(MatchError::InvalidRegex {
                        field: "date".to_string(),
                        message: err.to_string(),
                    }),
                }
            }
        }

        if config.time_enabled {
            if let Some(pattern) = &config.time_pattern {
                match Regex::new(pattern) {
                    Ok(re) => extractors.time = Some(re),
                    Err(err) => errors.push(MatchError::InvalidRegex {
                        field: "time".to_string(),
                        message: err.to_string(),
                    }),
                }
            }
        }

        (extractors, errors)
    }

    fn extract_teams(&self, raw: &str) -> Option<(String, String)> {
        let caps = self.teams.as_ref()?.captures(raw)?;
        let team1 = caps.name("team1")?.as_str().trim().to_string();
        let team2 = caps.name("team2")?.as_str().trim().to_string();
        if team1.is_empty() || team2.is_empty() {
            return None;
        }
        Some((team1, team2))
    }

    fn extract_date(&self, raw: &str, today: NaiveDate) -> Option<NaiveDate> {
        let caps = self.date.as_ref()?.captures(raw)?;

        // Separate day/month(/year) groups give explicit control over
        // DD/MM vs MM/DD interpretation
        if let (Some(day), Some(month)) = (caps.name("day"), caps.name("month")) {
            let day: u32 = day.as_str().parse().ok()?;
            let month = parse_month_group(month.as_str())?;
            let year = match caps.name("year") {
                Some(year) => {
                    let mut year: i32 = year.as_str().parse().ok()?;
                    if year < 100 {
                        year += 2000;
                    }
                    year
                }
                None => today.year(),
            };
            let date = NaiveDate::from_ymd_opt(year, month, day)?;
            // Without an explicit year, a date far in the past means next year
            if caps.name("year").is_none() && (today - date).num_days() > 180 {
                if let Some(next_year) = NaiveDate::from_ymd_opt(year + 1, month, day) {
                    return Some(next_year);
                }
            }
            return Some(date);
        }

        let text = caps
            .name("date")
            .map(|m| m.as_str())
            .or_else(|| caps.get(1).map(|m| m.as_str()))
            .unwrap_or(raw);
        extract_date(text, today)
    }

    fn extract_time(&self, raw: &str) -> Option<NaiveTime> {
        let caps = self.time.as_ref()?.captures(raw)?;
        let text = caps
            .name("time")
            .map(|m| m.as_str())
            .or_else(|| caps.get(1).map(|m| m.as_str()))
            .unwrap_or(raw);
        extract_time(text)
    }
}

fn parse_month_group(raw: &str) -> Option<u32> {
    if let Ok(month) = raw.parse::<u32>() {
        return (1..=12).contains(&month).then_some(month);
    }
    let lower = raw.trim().to_lowercase();
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    MONTHS
        .iter()
        .position(|prefix| lower.starts_with(prefix))
        .map(|idx| idx as u32 + 1)
}

/// Find the game separator in a normalized stream name
///
/// Separators are tried in list order (longest forms first). An occurrence
/// counts only when the left side is non-empty and the right side does not
/// start with a month, a 20xx year, or a time.
pub fn find_separator(text: &str) -> Option<(usize, usize)> {
    let lower = text.to_lowercase();
    for sep in SEPARATORS {
        let mut search_from = 0;
        while let Some(rel_pos) = lower[search_from..].find(sep) {
            let pos = search_from + rel_pos;
            if pos > 0 {
                let right = text[pos + sep.len()..].trim_start();
                if !re_date_time_right().is_match(right) {
                    return Some((pos, sep.len()));
                }
            }
            search_from = pos + sep.len();
        }
    }
    None
}

/// Whether the original stream name names a placeholder slot
pub fn is_placeholder(raw_name: &str) -> bool {
    let lower = raw_name.to_lowercase();
    PLACEHOLDER_PHRASES
        .iter()
        .any(|phrase| lower.contains(phrase))
}

/// The classifier, configured with the multi-event keywords of the
/// enabled single-event leagues
pub struct Classifier {
    event_card_keywords: Vec<String>,
    custom: CustomExtractors,
}

impl Classifier {
    pub fn new(event_card_keywords: Vec<String>) -> Self {
        Self {
            event_card_keywords,
            custom: CustomExtractors::default(),
        }
    }

    pub fn with_custom_extractors(mut self, custom: CustomExtractors) -> Self {
        self.custom = custom;
        self
    }

    /// Classify a stream and extract its raw fields
    pub fn classify(
        &self,
        raw_name: &str,
        normalized: &NormalizedStream,
        today: NaiveDate,
    ) -> ClassifiedStream {
        let date = self
            .custom
            .extract_date(raw_name, today)
            .or(normalized.date);
        let time = self.custom.extract_time(raw_name).or(normalized.time);

        if is_placeholder(raw_name) {
            return ClassifiedStream {
                category: StreamCategory::Placeholder,
                away_raw: None,
                home_raw: None,
                date,
                time,
            };
        }

        if let Some((team1, team2)) = self.custom.extract_teams(raw_name) {
            return ClassifiedStream {
                category: StreamCategory::TeamVsTeam,
                away_raw: Some(team1),
                home_raw: Some(team2),
                date,
                time,
            };
        }

        if let Some((pos, sep_len)) = find_separator(&normalized.canonical) {
            let away = normalized.canonical[..pos].trim().to_string();
            let home = normalized.canonical[pos + sep_len..].trim().to_string();
            return ClassifiedStream {
                category: StreamCategory::TeamVsTeam,
                away_raw: Some(away).filter(|s| !s.is_empty()),
                home_raw: Some(home).filter(|s| !s.is_empty()),
                date,
                time,
            };
        }

        let lower = normalized.canonical.to_lowercase();
        if self
            .event_card_keywords
            .iter()
            .any(|keyword| lower.contains(keyword.as_str()))
        {
            return ClassifiedStream {
                category: StreamCategory::EventCard,
                away_raw: None,
                home_raw: None,
                date,
                time,
            };
        }

        ClassifiedStream {
            category: StreamCategory::TeamVsTeam,
            away_raw: None,
            home_raw: None,
            date,
            time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::normalizer::Normalizer;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 1).unwrap()
    }

    fn classify(raw: &str) -> ClassifiedStream {
        let normalized = Normalizer::new(Vec::new()).normalize(raw, today());
        Classifier::new(vec!["ufc".to_string(), "fight night".to_string()])
            .classify(raw, &normalized, today())
    }

    #[test]
    fn vs_separator_splits_away_home() {
        let result = classify("NBA 01: Lakers vs Celtics");
        assert_eq!(result.category, StreamCategory::TeamVsTeam);
        assert_eq!(result.away_raw.as_deref(), Some("lakers"));
        assert_eq!(result.home_raw.as_deref(), Some("celtics"));
    }

    #[test]
    fn at_followed_by_team_is_separator() {
        let result = classify("NFL 02: Chiefs @ Ravens");
        assert_eq!(result.away_raw.as_deref(), Some("chiefs"));
        assert_eq!(result.home_raw.as_deref(), Some("ravens"));
    }

    #[test]
    fn at_followed_by_ranked_team_is_separator() {
        // "@ 4 Texas T": ranking marker then team, still a game
        let normalized = NormalizedStream {
            canonical: "oklahoma @ 4 texas t".to_string(),
            date: None,
            time: None,
        };
        let (pos, _) = find_separator(&normalized.canonical).unwrap();
        assert_eq!(&normalized.canonical[..pos], "oklahoma");
    }

    #[test]
    fn at_followed_by_month_is_not_separator() {
        assert!(find_separator("ufc 302 @ dec 05").is_none());
    }

    #[test]
    fn at_followed_by_year_is_not_separator() {
        assert!(find_separator("show name @ 2025-12-06").is_none());
    }

    #[test]
    fn at_followed_by_time_is_not_separator() {
        assert!(find_separator("show name @ 12:00").is_none());
    }

    #[test]
    fn ufc_card_without_separator_is_event_card() {
        let result = classify("UFC 302 @ Dec 05 08:00 PM ET");
        assert_eq!(result.category, StreamCategory::EventCard);
        assert_eq!(result.date, NaiveDate::from_ymd_opt(2025, 12, 5));
    }

    #[test]
    fn placeholder_phrases_win_over_everything() {
        for raw in ["NFL 03 - NO EVENT", "OFF AIR", "Game TBA vs TBA"] {
            let result = classify(raw);
            assert_eq!(result.category, StreamCategory::Placeholder, "for {raw}");
        }
    }

    #[test]
    fn custom_teams_regex_requires_named_groups() {
        let config = CustomRegexConfig {
            teams_pattern: Some(r"(\w+) plays (\w+)".to_string()),
            teams_enabled: true,
            ..Default::default()
        };
        let (extractors, errors) = CustomExtractors::compile(&config);
        assert_eq!(errors.len(), 1);
        assert!(extractors.teams.is_none());
    }

    #[test]
    fn custom_teams_regex_extracts_named_groups() {
        let config = CustomRegexConfig {
            teams_pattern: Some(r"(?P<team1>[\w ]+?) plays (?P<team2>[\w ]+)".to_string()),
            teams_enabled: true,
            ..Default::default()
        };
        let (extractors, errors) = CustomExtractors::compile(&config);
        assert!(errors.is_empty());
        let (team1, team2) = extractors.extract_teams("Lakers plays Celtics").unwrap();
        assert_eq!(team1, "Lakers");
        assert_eq!(team2, "Celtics");
    }

    #[test]
    fn custom_date_regex_with_split_groups() {
        let config = CustomRegexConfig {
            date_pattern: Some(r"(?P<day>\d{1,2})\.(?P<month>\d{1,2})\.(?P<year>\d{4})".to_string()),
            date_enabled: true,
            ..Default::default()
        };
        let (extractors, errors) = CustomExtractors::compile(&config);
        assert!(errors.is_empty());
        let date = extractors.extract_date("A vs B 24.12.2025", today()).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 12, 24).unwrap());
    }

    #[test]
    fn invalid_custom_regex_is_reported_and_ignored() {
        let config = CustomRegexConfig {
            date_pattern: Some("([unclosed".to_string()),
            date_enabled: true,
            ..Default::default()
        };
        let (extractors, errors) = CustomExtractors::compile(&config);
        assert_eq!(errors.len(), 1);
        assert!(extractors.date.is_none());
    }

    #[test]
    fn scenario_b_noisy_aleague_stream() {
        let result = classify("ESPN+ 25 : Perth Glory vs. Wellington Phoenix @ Dec 12 05:55 AM ET");
        assert_eq!(result.category, StreamCategory::TeamVsTeam);
        assert_eq!(result.away_raw.as_deref(), Some("perth glory"));
        assert_eq!(result.home_raw.as_deref(), Some("wellington phoenix"));
        assert_eq!(result.date, NaiveDate::from_ymd_opt(2025, 12, 12));
        assert_eq!(result.time, NaiveTime::from_hms_opt(5, 55, 0));
    }
}
