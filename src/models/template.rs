use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Conditions a conditional description can be gated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    WinStreak,
    LossStreak,
    HomeWinStreak,
    HomeLossStreak,
    AwayWinStreak,
    AwayLossStreak,
    IsRanked,
    IsRankedOpponent,
    IsTopTenMatchup,
    IsHome,
    IsAway,
    IsPlayoff,
    IsPreseason,
    IsConferenceGame,
    IsRematch,
    IsNationalBroadcast,
    HasOdds,
    OpponentNameContains,
    Always,
}

/// One conditional description candidate
///
/// Lower priority wins; 100 is the conventional fallback. Ties at the same
/// priority are broken uniformly at random for variety.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionalDescription {
    pub condition: ConditionKind,
    #[serde(default)]
    pub condition_value: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: i32,
    pub template: String,
}

fn default_priority() -> i32 {
    50
}

/// A channel template: title/subtitle/description strings with {variable}
/// placeholders, plus the filler templates and their toggles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: Uuid,
    pub name: String,

    // Game program templates
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub art_url: Option<String>,
    #[serde(default)]
    pub conditional_descriptions: Vec<ConditionalDescription>,
    /// Game duration override in hours
    pub duration_hours: Option<f64>,

    // Pregame filler
    pub pregame_enabled: bool,
    pub pregame_title: String,
    pub pregame_subtitle: String,
    pub pregame_description: String,
    pub pregame_art_url: Option<String>,

    // Postgame filler
    pub postgame_enabled: bool,
    pub postgame_title: String,
    pub postgame_subtitle: String,
    pub postgame_description: String,
    pub postgame_art_url: Option<String>,
    /// Use final/not-final description variants for postgame filler
    pub postgame_conditional_enabled: bool,
    pub postgame_description_final: String,
    pub postgame_description_not_final: String,

    // Idle filler
    pub idle_enabled: bool,
    pub idle_title: String,
    pub idle_subtitle: String,
    pub idle_description: String,
    pub idle_art_url: Option<String>,
    /// Use final/not-final description variants for idle filler
    pub idle_conditional_enabled: bool,
    pub idle_description_final: String,
    pub idle_description_not_final: String,
    /// Offseason variants used when no game exists in a 30-day lookahead
    pub idle_offseason_enabled: bool,
    pub idle_title_offseason: String,
    pub idle_description_offseason: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    /// A minimal usable template with conventional defaults
    pub fn named(name: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            title: "{team_name} {sport}".to_string(),
            subtitle: "{matchup}".to_string(),
            description: "{away_team} at {home_team}".to_string(),
            art_url: None,
            conditional_descriptions: Vec::new(),
            duration_hours: None,
            pregame_enabled: true,
            pregame_title: "{team_name} Pregame".to_string(),
            pregame_subtitle: "Up next: {opponent.next}".to_string(),
            pregame_description: "Coverage ahead of {matchup.next}".to_string(),
            pregame_art_url: None,
            postgame_enabled: true,
            postgame_title: "{team_name} Postgame".to_string(),
            postgame_subtitle: String::new(),
            postgame_description: "Reaction to {matchup.last}".to_string(),
            postgame_art_url: None,
            postgame_conditional_enabled: false,
            postgame_description_final: "Final: {team_score.last}-{opponent_score.last} {game_result.last}".to_string(),
            postgame_description_not_final: "Full recap after the game concludes".to_string(),
            idle_enabled: true,
            idle_title: "{team_name} All Day".to_string(),
            idle_subtitle: String::new(),
            idle_description: "Next game: {game_date.next}".to_string(),
            idle_art_url: None,
            idle_conditional_enabled: false,
            idle_description_final: String::new(),
            idle_description_not_final: String::new(),
            idle_offseason_enabled: false,
            idle_title_offseason: "{team_name} Offseason".to_string(),
            idle_description_offseason: "See you next season".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}
