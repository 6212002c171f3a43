use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How streams matching an exception keyword are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordBehavior {
    /// Keep a distinct managed channel per keyword
    Separate,
    /// Attach keyword streams to the event's main channel, ordered
    Consolidate,
}

impl KeywordBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Separate => "separate",
            Self::Consolidate => "consolidate",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "separate" => Self::Separate,
            _ => Self::Consolidate,
        }
    }
}

/// User-configured keyword routing alternate broadcasts to their own channel
///
/// `keywords` holds ordered synonym variants; the first is canonical for
/// grouping. Matching is lowercase substring on the raw stream name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionKeyword {
    pub id: i64,
    pub keywords: Vec<String>,
    pub behavior: KeywordBehavior,
}

impl ExceptionKeyword {
    pub fn canonical(&self) -> Option<&str> {
        self.keywords.first().map(String::as_str)
    }

    /// First variant found as a lowercase substring of the stream name
    pub fn matches(&self, stream_name: &str) -> bool {
        let lower = stream_name.to_lowercase();
        self.keywords.iter().any(|keyword| lower.contains(keyword))
    }
}

/// Custom per-group regex overrides for team/date/time extraction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomRegexConfig {
    pub teams_pattern: Option<String>,
    pub teams_enabled: bool,
    pub date_pattern: Option<String>,
    pub date_enabled: bool,
    pub time_pattern: Option<String>,
    pub time_enabled: bool,
}

impl CustomRegexConfig {
    pub fn any_enabled(&self) -> bool {
        self.teams_enabled || self.date_enabled || self.time_enabled
    }
}

/// An event group: a pool of streams mapped onto per-event channels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventGroup {
    pub id: i64,
    pub name: String,
    /// Leagues whose events may produce channels
    pub include_leagues: Vec<String>,
    /// Superset of include leagues considered during matching
    pub candidate_leagues: Vec<String>,
    pub include_regex: Option<String>,
    pub exclude_regex: Option<String>,
    pub exception_keyword_ids: Vec<i64>,
    pub custom_regex: CustomRegexConfig,
    pub template_id: Option<uuid::Uuid>,
    /// Hours before event start to create channels (None = immediately)
    pub create_lead_hours: Option<i64>,
    /// Minutes of grace after event end before scheduled deletion
    pub delete_grace_minutes: Option<i64>,
    /// Monotonic counter; advancing it invalidates stream match cache rows
    pub generation: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventGroup {
    pub fn candidate_leagues(&self) -> &[String] {
        if self.candidate_leagues.is_empty() {
            &self.include_leagues
        } else {
            &self.candidate_leagues
        }
    }
}

/// A raw candidate stream from the downstream middleware
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stream {
    pub id: i64,
    pub name: String,
    pub m3u_account: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exception_keyword_matches_any_variant() {
        let keyword = ExceptionKeyword {
            id: 1,
            keywords: vec!["prime vision".to_string(), "primevision".to_string()],
            behavior: KeywordBehavior::Separate,
        };
        assert!(keyword.matches("NFL: Chiefs vs Raiders (Prime Vision)"));
        assert!(keyword.matches("NFL: Chiefs vs Raiders PRIMEVISION"));
        assert!(!keyword.matches("NFL: Chiefs vs Raiders"));
        assert_eq!(keyword.canonical(), Some("prime vision"));
    }

    #[test]
    fn candidate_leagues_fall_back_to_include() {
        let group = EventGroup {
            id: 1,
            name: "test".to_string(),
            include_leagues: vec!["nfl".to_string()],
            candidate_leagues: vec![],
            include_regex: None,
            exclude_regex: None,
            exception_keyword_ids: vec![],
            custom_regex: CustomRegexConfig::default(),
            template_id: None,
            create_lead_hours: None,
            delete_grace_minutes: None,
            generation: 0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(group.candidate_leagues(), ["nfl".to_string()]);
    }
}
