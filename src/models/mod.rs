use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod channel;
pub mod event;
pub mod group;
pub mod program;
pub mod stats;
pub mod template;

pub use channel::{ManagedChannel, ManagedChannelStream, SyncStatus};
pub use event::{Event, EventState, EventStatus, Odds, SeasonType, Team, TeamRecord, Venue};
pub use group::{EventGroup, ExceptionKeyword, KeywordBehavior, Stream};
pub use program::{FillerType, Program, ProgramKind};
pub use stats::TeamStats;
pub use template::{ConditionalDescription, Template};

/// Mapping from a canonical league code to a provider's identifiers
///
/// Some provider endpoints route by league id, others by league name, so
/// both are carried. `(league, provider)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueMapping {
    pub league: String,
    pub provider: String,
    pub provider_league_id: Option<String>,
    pub provider_league_name: Option<String>,
    pub sport: String,
    pub display_name: Option<String>,
    pub logo_url: Option<String>,
    pub enabled: bool,
    /// Stream keywords marking this as a single-event league ("one event
    /// per day"); empty for team-vs-team leagues
    #[serde(default)]
    pub single_event_keywords: Vec<String>,
}

/// A configured team channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamChannelConfig {
    pub id: Uuid,
    pub team_id: String,
    pub league: String,
    pub sport: String,
    pub team_name: String,
    pub team_abbrev: Option<String>,
    pub team_logo_url: Option<String>,
    /// Stable slug used as the channel's EPG key (tvg-id)
    pub channel_id: String,
    pub template_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cached stream-to-event match, keyed by fingerprint
///
/// Lets consecutive generations skip re-matching unchanged streams. Entries
/// die when the owning group's generation counter advances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamCacheEntry {
    pub fingerprint: String,
    pub group_id: i64,
    pub event_id: String,
    pub league: String,
    pub match_tier: String,
    pub generation: i64,
    pub last_seen: DateTime<Utc>,
}

/// One team cache row: normalized team name -> (league, team id, sport)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamLeagueRow {
    pub league: String,
    pub team_id: String,
    pub team_name: String,
    pub team_abbrev: Option<String>,
    pub team_short_name: Option<String>,
    pub sport: String,
}

/// User-defined team alias, consulted before fuzzy matching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamAlias {
    pub alias: String,
    pub league: String,
    pub team_id: String,
    pub team_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamChannelCreateRequest {
    pub team_id: String,
    pub league: String,
    pub sport: String,
    pub team_name: String,
    pub team_abbrev: Option<String>,
    pub team_logo_url: Option<String>,
    pub channel_id: String,
    pub template_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub channels_generated: usize,
    pub channels_failed: usize,
    pub per_channel_errors: Vec<ChannelError>,
    pub num_programs: usize,
    pub num_events: usize,
    pub num_pregame: usize,
    pub num_postgame: usize,
    pub num_idle: usize,
    pub api_calls: u64,
    pub generation_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelError {
    pub channel_id: String,
    pub message: String,
}
