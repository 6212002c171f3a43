//! Stream name normalization
//!
//! Converts a raw stream name into a canonical lowercase token string with
//! the noise removed, plus any date and time extracted along the way. The
//! pipeline is mask-then-strip: times and dates are masked in place (not
//! deleted) first, so that metadata-colon detection can tell "NCAAB 01:"
//! from the colon inside "8:15pm" by position.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate, NaiveTime};
use regex::Regex;

use crate::models::ExceptionKeyword;

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect("static pattern compiles"))
        }
    };
}

/// UTF-8 bytes decoded as Latin-1 produce these sequences; the repair table
/// is fixed and one-way
const MOJIBAKE_TABLE: [(&str, &str); 14] = [
    ("Ã©", "é"),
    ("Ã¨", "è"),
    ("Ã±", "ñ"),
    ("Ã¼", "ü"),
    ("Ã¶", "ö"),
    ("Ã¤", "ä"),
    ("Ã³", "ó"),
    ("Ã¡", "á"),
    ("Ã­", "í"),
    ("Ãº", "ú"),
    ("Ã§", "ç"),
    ("Ã£", "ã"),
    ("Ãµ", "õ"),
    ("Ã", "Á"),
];

/// Spelling variants mapped one-way to the provider-canonical form. Never
/// applied in reverse.
const NAME_VARIANTS: [(&str, &str); 17] = [
    ("münchen", "munich"),
    ("munchen", "munich"),
    ("köln", "cologne"),
    ("koln", "cologne"),
    ("nuremberg", "nürnberg"),
    ("nurnberg", "nürnberg"),
    ("dusseldorf", "düsseldorf"),
    ("furth", "fürth"),
    ("monchengladbach", "mönchengladbach"),
    ("munster", "münster"),
    ("hertha bsc", "hertha berlin"),
    ("hamburger sv", "hamburg sv"),
    ("sv werder bremen", "werder bremen"),
    ("inter milan", "internazionale"),
    ("inter", "internazionale"),
    ("albany", "ualbany"),
    ("st leo", "saint leo"),
];

/// Accent fold table for matching; covers the characters European team
/// names actually use
const ACCENT_FOLDS: [(char, char); 28] = [
    ('á', 'a'),
    ('à', 'a'),
    ('â', 'a'),
    ('ä', 'a'),
    ('ã', 'a'),
    ('å', 'a'),
    ('ç', 'c'),
    ('é', 'e'),
    ('è', 'e'),
    ('ê', 'e'),
    ('ë', 'e'),
    ('í', 'i'),
    ('ì', 'i'),
    ('î', 'i'),
    ('ï', 'i'),
    ('ñ', 'n'),
    ('ó', 'o'),
    ('ò', 'o'),
    ('ô', 'o'),
    ('ö', 'o'),
    ('õ', 'o'),
    ('ø', 'o'),
    ('ú', 'u'),
    ('ù', 'u'),
    ('û', 'u'),
    ('ü', 'u'),
    ('ý', 'y'),
    ('ÿ', 'y'),
];

const US_STATES: [&str; 51] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY", "DC",
];

const MONTH_NAMES: [(&str, u32); 12] = [
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("may", 5),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
];

static_regex!(
    re_time_12h,
    r"(?i)(\d{1,2}):(\d{2})\s*(am|pm)(\s*(et|est|edt|pt|pst|pdt|ct|cst|cdt|mt|mst|mdt))?"
);
static_regex!(re_time_hour_only, r"(?i)\b(\d{1,2})(am|pm)\b");
static_regex!(re_time_24h, r"\b(\d{2}):(\d{2})(?:\s*(?i:[ap]m))?\b");
static_regex!(re_date_iso, r"(\d{4})-(\d{2})-(\d{2})");
static_regex!(re_date_us_full, r"(\d{1,2})/(\d{1,2})/(\d{2,4})");
static_regex!(re_date_us_short, r"(\d{1,2})/(\d{1,2})");
static_regex!(
    re_date_text_month,
    r"(?i)\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|jun(?:e)?|jul(?:y)?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\s+(\d{1,2})\b"
);
static_regex!(re_country_prefix, r"(?i)^\(\s*(uk|us|usa|ca|au)\s*\)\s*[|:]?\s*");
static_regex!(re_country_prefix_colon, r"(?i)^(uk|us|usa|ca|au)\s*[|:]\s*");
static_regex!(
    re_provider_parens,
    r"(?i)\([^)]*(?:sky|dazn|peacock|tsn|sportsnet|espn|fox|nbc|cbs|abc)[^)]*\)"
);
static_regex!(
    re_league_on_network,
    r"(?i)(nfl|nba|nhl|mlb|ncaa[mfwb]?|soccer|epl|mls)\s+on\s+\w+\s*:?\s*"
);
static_regex!(
    re_league_prefix,
    r"(?i)^(nfl|nba|nhl|mlb|ncaa[mfwb]?|mls|epl|premier\s*league|soccer|college)\s*(basketball|football|hockey)?\s*:?\s*"
);
static_regex!(re_game_pass, r"(?i)game\s*pass\s*\d*:?\s*");
static_regex!(
    re_tz_abbrev,
    r"(?i)\b(et|est|edt|pt|pst|pdt|ct|cst|cdt|mt|mst|mdt|gmt|utc)\b"
);
static_regex!(re_channel_pipe, r"\|\s*\d+\s*[-:]?\s*");
static_regex!(re_channel_lead, r"^\d+\s*[-:]?\s*");
static_regex!(re_ranking, r"#?\d+\s+([a-z])");
static_regex!(re_parens, r"\(([^)]*)\)");
static_regex!(re_specials, r"[|:#\[\]-]+");
static_regex!(re_trailing_at, r"\s*@\s*$");
static_regex!(re_whitespace, r"\s+");

/// Repair UTF-8-as-Latin-1 double encodings ("Ã©" -> "é")
pub fn fix_mojibake(text: &str) -> String {
    let mut result = text.to_string();
    for (wrong, right) in MOJIBAKE_TABLE {
        if result.contains(wrong) {
            result = result.replace(wrong, right);
        }
    }
    result
}

/// Fold accented characters to their base letter
pub fn fold_accents(text: &str) -> String {
    text.chars()
        .map(|c| {
            ACCENT_FOLDS
                .iter()
                .find(|(accented, _)| *accented == c)
                .map(|(_, base)| *base)
                .unwrap_or(c)
        })
        .collect()
}

/// A masked token with its byte span in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedToken {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

fn overlaps(found: &[MaskedToken], start: usize, end: usize) -> bool {
    found
        .iter()
        .any(|token| start < token.end && end > token.start)
}

fn mask_spans(text: &str, tokens: &[MaskedToken]) -> String {
    let mut bytes = text.as_bytes().to_vec();
    for token in tokens {
        for byte in bytes[token.start..token.end].iter_mut() {
            // All matched spans are ASCII, so byte masking is safe
            *byte = b'_';
        }
    }
    String::from_utf8(bytes).unwrap_or_else(|_| text.to_string())
}

/// Find and mask every time token, preserving positions
///
/// 12-hour times never use a leading zero on the hour; "01:12pm" is channel
/// metadata ("CB01:" + "12pm"), not a time, and is left for the hour-only
/// pattern to pick apart.
pub fn mask_times(text: &str) -> (String, Vec<MaskedToken>) {
    let mut found: Vec<MaskedToken> = Vec::new();

    for caps in re_time_12h().captures_iter(text) {
        let whole = caps.get(0).expect("group 0 always present");
        let hour_str = &caps[1];
        let hour: u32 = match hour_str.parse() {
            Ok(hour) => hour,
            Err(_) => continue,
        };
        if !(1..=12).contains(&hour) {
            continue;
        }
        if hour < 10 && hour_str.starts_with('0') {
            continue;
        }
        // Reject when the hour digits continue a longer number ("CB01:12pm")
        if text[..whole.start()]
            .chars()
            .next_back()
            .map(|c| c.is_ascii_digit())
            .unwrap_or(false)
        {
            continue;
        }
        found.push(MaskedToken {
            text: whole.as_str().to_string(),
            start: whole.start(),
            end: whole.end(),
        });
    }

    for caps in re_time_hour_only().captures_iter(text) {
        let whole = caps.get(0).expect("group 0 always present");
        if overlaps(&found, whole.start(), whole.end()) {
            continue;
        }
        let hour: u32 = match caps[1].parse() {
            Ok(hour) => hour,
            Err(_) => continue,
        };
        if (1..=12).contains(&hour) {
            found.push(MaskedToken {
                text: whole.as_str().to_string(),
                start: whole.start(),
                end: whole.end(),
            });
        }
    }

    for caps in re_time_24h().captures_iter(text) {
        let whole = caps.get(0).expect("group 0 always present");
        if overlaps(&found, whole.start(), whole.end()) {
            continue;
        }
        let (hour, minute): (u32, u32) = match (caps[1].parse(), caps[2].parse()) {
            (Ok(h), Ok(m)) => (h, m),
            _ => continue,
        };
        if hour < 24 && minute < 60 {
            found.push(MaskedToken {
                text: whole.as_str().to_string(),
                start: whole.start(),
                end: whole.end(),
            });
        }
    }

    found.sort_by_key(|token| token.start);
    (mask_spans(text, &found), found)
}

/// Find and mask every date token, preserving positions
pub fn mask_dates(text: &str) -> (String, Vec<MaskedToken>) {
    let mut found: Vec<MaskedToken> = Vec::new();

    for re in [re_date_iso(), re_date_us_full()] {
        for m in re.find_iter(text) {
            if !overlaps(&found, m.start(), m.end()) {
                found.push(MaskedToken {
                    text: m.as_str().to_string(),
                    start: m.start(),
                    end: m.end(),
                });
            }
        }
    }

    for m in re_date_us_short().find_iter(text) {
        // Skip when part of a full date already found
        if !overlaps(&found, m.start(), m.end()) {
            found.push(MaskedToken {
                text: m.as_str().to_string(),
                start: m.start(),
                end: m.end(),
            });
        }
    }

    for m in re_date_text_month().find_iter(text) {
        if !overlaps(&found, m.start(), m.end()) {
            found.push(MaskedToken {
                text: m.as_str().to_string(),
                start: m.start(),
                end: m.end(),
            });
        }
    }

    found.sort_by_key(|token| token.start);
    (mask_spans(text, &found), found)
}

fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    MONTH_NAMES
        .iter()
        .find(|(prefix, _)| lower.starts_with(prefix))
        .map(|(_, month)| *month)
}

/// Build a date, rolling into next year when the date is >6 months past
fn resolve_year(month: u32, day: u32, today: NaiveDate) -> Option<NaiveDate> {
    let date = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if (today - date).num_days() > 180 {
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)
    } else {
        Some(date)
    }
}

/// Extract the first date token from raw text
pub fn extract_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(caps) = re_date_iso().captures(text) {
        if let (Ok(year), Ok(month), Ok(day)) =
            (caps[1].parse(), caps[2].parse(), caps[3].parse())
        {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                return Some(date);
            }
        }
    }

    if let Some(caps) = re_date_us_full().captures(text) {
        if let (Ok(month), Ok(day), Ok(mut year)) =
            (caps[1].parse::<u32>(), caps[2].parse::<u32>(), caps[3].parse::<i32>())
        {
            if year < 100 {
                year += 2000;
            }
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                return Some(date);
            }
        }
    }

    if let Some(caps) = re_date_us_short().captures(text) {
        if let (Ok(month), Ok(day)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) {
            if let Some(date) = resolve_year(month, day, today) {
                return Some(date);
            }
        }
    }

    if let Some(caps) = re_date_text_month().captures(text) {
        if let (Some(month), Ok(day)) = (month_from_name(&caps[1]), caps[2].parse::<u32>()) {
            if let Some(date) = resolve_year(month, day, today) {
                return Some(date);
            }
        }
    }

    None
}

/// Extract the first time token from raw text
pub fn extract_time(text: &str) -> Option<NaiveTime> {
    let (_, tokens) = mask_times(text);
    for token in tokens {
        if let Some(caps) = re_time_12h().captures(&token.text) {
            let hour: u32 = caps[1].parse().ok()?;
            let minute: u32 = caps[2].parse().ok()?;
            let is_pm = caps[3].eq_ignore_ascii_case("pm");
            let hour = match (hour, is_pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            };
            return NaiveTime::from_hms_opt(hour, minute, 0);
        }
        if let Some(caps) = re_time_hour_only().captures(&token.text) {
            let hour: u32 = caps[1].parse().ok()?;
            let is_pm = caps[2].eq_ignore_ascii_case("pm");
            let hour = match (hour, is_pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            };
            return NaiveTime::from_hms_opt(hour, 0, 0);
        }
        if let Some(caps) = re_time_24h().captures(&token.text) {
            let hour: u32 = caps[1].parse().ok()?;
            let minute: u32 = caps[2].parse().ok()?;
            return NaiveTime::from_hms_opt(hour, minute, 0);
        }
    }
    None
}

/// Game separators, checked longest-first; position matters downstream
pub const SEPARATORS: [&str; 7] = [" vs. ", " vs ", " at ", " @ ", " v. ", " v ", " x "];

fn find_separator_position(text: &str) -> Option<usize> {
    let lower = text.to_lowercase();
    SEPARATORS
        .iter()
        .filter_map(|sep| lower.find(sep).filter(|pos| *pos > 0))
        .min()
}

/// Strip a metadata prefix ending at a colon before the game separator
///
/// Times are already masked in `masked`, so any colon left before the
/// separator belongs to metadata like "NCAAB 01:". The LAST such colon wins,
/// which handles nested prefixes ("Channel: Context: A @ B").
fn strip_metadata_colon(text: &str, masked: &str) -> String {
    let sep_pos = find_separator_position(text).unwrap_or(text.len());
    match masked[..sep_pos].rfind(':') {
        Some(colon_pos) if colon_pos > 0 => text[colon_pos + 1..].trim().to_string(),
        _ => text.to_string(),
    }
}

/// Remove parenthetical content except two-letter US state abbreviations,
/// which disambiguate teams like "Miami (OH)" from "Miami"
fn remove_non_state_parens(text: &str) -> String {
    re_parens()
        .replace_all(text, |caps: &regex::Captures| {
            let content = caps[1].trim().to_uppercase();
            if US_STATES.contains(&content.as_str()) {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

/// Lexical scrub: timezone tokens, channel numbers, ranking markers,
/// brackets, periods, and trailing separators go; lowercase with collapsed
/// whitespace comes out
pub fn scrub(text: &str) -> String {
    let mut text = text.to_lowercase();
    text = text.replace('`', "'");
    text = text.replace('_', " ");

    text = remove_non_state_parens(&text);
    text = re_league_prefix().replace(&text, "").into_owned();
    text = re_game_pass().replace_all(&text, "").into_owned();

    // Leftover date/time fragments that escaped masking
    let (masked, _) = mask_times(&text);
    text = masked.replace('_', " ");
    let (masked, _) = mask_dates(&text);
    text = masked.replace('_', " ");

    text = re_tz_abbrev().replace_all(&text, "").into_owned();
    text = re_channel_pipe().replace_all(&text, "").into_owned();
    text = re_channel_lead().replace(&text, "").into_owned();
    text = re_ranking().replace_all(&text, "$1").into_owned();
    text = re_specials().replace_all(&text, " ").into_owned();
    text = text.replace('.', "");
    text = re_trailing_at().replace(&text, "").into_owned();
    text = re_whitespace().replace_all(&text, " ").into_owned();

    text.trim().to_string()
}

/// Apply the one-way name variant table on word boundaries
pub fn apply_name_variants(text: &str) -> String {
    let mut result = text.to_string();
    for (variant, canonical) in NAME_VARIANTS {
        if !result.contains(variant) {
            continue;
        }
        let pattern = format!(r"\b{}\b", regex::escape(variant));
        if let Ok(re) = Regex::new(&pattern) {
            result = re.replace_all(&result, canonical).into_owned();
        }
    }
    result
}

/// A normalized stream: canonical token string plus extracted metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedStream {
    pub canonical: String,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

/// The normalizer, configured with the active exception keywords
pub struct Normalizer {
    exception_keywords: Vec<ExceptionKeyword>,
}

impl Normalizer {
    pub fn new(exception_keywords: Vec<ExceptionKeyword>) -> Self {
        Self { exception_keywords }
    }

    /// Run the full pipeline on a raw stream name
    pub fn normalize(&self, raw: &str, today: NaiveDate) -> NormalizedStream {
        // Date and time come from the raw name, before anything is removed
        let repaired = fix_mojibake(raw);
        let date = extract_date(&repaired, today);
        let time = extract_time(&repaired);

        let mut text = repaired;
        text = re_country_prefix().replace(&text, "").into_owned();
        text = re_country_prefix_colon().replace(&text, "").into_owned();
        text = re_provider_parens().replace_all(&text, "").into_owned();
        text = re_league_on_network().replace_all(&text, "").into_owned();

        let (masked_times, _) = mask_times(&text);
        let (masked, _) = mask_dates(&masked_times);
        text = strip_metadata_colon(&text, &masked);

        for keyword in &self.exception_keywords {
            for variant in &keyword.keywords {
                let lower = text.to_lowercase();
                // Byte offsets only transfer when lowercasing kept lengths
                if lower.len() != text.len() {
                    continue;
                }
                if let Some(pos) = lower.find(variant.as_str()) {
                    let end = pos + variant.len();
                    if text.is_char_boundary(pos) && text.is_char_boundary(end) {
                        text.replace_range(pos..end, "");
                    }
                }
            }
        }

        text = scrub(&text);
        text = apply_name_variants(&text);

        NormalizedStream {
            canonical: text,
            date,
            time,
        }
    }
}
