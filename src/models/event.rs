use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A team as reported by a provider, immutable within a fetch cycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Team {
    /// Provider-scoped team id
    pub id: String,
    /// Full display name, e.g. "Detroit Lions"
    pub name: String,
    pub abbreviation: Option<String>,
    pub short_name: Option<String>,
    pub slug: Option<String>,
    /// City/region portion, shared between co-located teams
    pub location: Option<String>,
    pub logo_url: Option<String>,
    pub color: Option<String>,
    /// Poll rank 1..=25; absent means unranked
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Venue {
    pub name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub indoor: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventState {
    Pre,
    InProgress,
    Final,
    Postponed,
    Cancelled,
}

impl Default for EventState {
    fn default() -> Self {
        Self::Pre
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventStatus {
    pub state: EventState,
    pub completed: bool,
    pub detail: Option<String>,
    pub period: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonType {
    Preseason,
    Regular,
    Postseason,
}

impl Default for SeasonType {
    fn default() -> Self {
        Self::Regular
    }
}

/// Betting odds, typically present only in same-day scoreboard data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Odds {
    pub provider: Option<String>,
    /// Spread detail string, e.g. "DET -3.5"
    pub spread: Option<String>,
    pub over_under: Option<f64>,
    pub home_moneyline: Option<i64>,
    pub away_moneyline: Option<i64>,
}

/// Win-loss record summary extracted from competitor data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamRecord {
    pub summary: String,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub win_percent: f64,
}

impl TeamRecord {
    /// Parse a "9-5" or "9-5-1" summary string
    pub fn from_summary(summary: &str) -> Self {
        let mut record = Self {
            summary: summary.to_string(),
            ..Default::default()
        };
        let parts: Vec<&str> = summary.split('-').collect();
        if parts.len() >= 2 {
            if let (Ok(wins), Ok(losses)) = (parts[0].trim().parse(), parts[1].trim().parse()) {
                record.wins = wins;
                record.losses = losses;
                if parts.len() >= 3 {
                    record.ties = parts[2].trim().parse().unwrap_or(0);
                }
                let played = record.wins + record.losses + record.ties;
                if played > 0 {
                    record.win_percent = f64::from(record.wins) / f64::from(played);
                }
            }
        }
        record
    }

    pub fn display(&self) -> String {
        if self.ties > 0 {
            format!("{}-{}-{}", self.wins, self.losses, self.ties)
        } else {
            format!("{}-{}", self.wins, self.losses)
        }
    }
}

/// A single sporting event in the provider-neutral model
///
/// Scores are absent iff the status state is `Pre`. The start time is
/// always UTC; rendering into the EPG timezone happens at the edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Provider-stable event id
    pub id: String,
    pub league: String,
    pub sport: String,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub start: DateTime<Utc>,
    pub home_team: Team,
    pub away_team: Team,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub home_record: Option<TeamRecord>,
    pub away_record: Option<TeamRecord>,
    pub venue: Venue,
    pub broadcasts: Vec<String>,
    pub season_type: SeasonType,
    pub status: EventStatus,
    pub odds: Option<Odds>,
    /// College-only flag, populated from scoreboard enrichment
    pub conference_competition: bool,
    /// League the event was discovered in, for soccer multi-league merges
    pub source_league: Option<String>,
    /// Stat leaders attached to the competition, when present
    pub leaders: Vec<LeaderCategory>,
}

impl Event {
    pub fn involves_team(&self, team_id: &str) -> bool {
        self.home_team.id == team_id || self.away_team.id == team_id
    }

    pub fn is_final(&self) -> bool {
        self.status.completed || self.status.state == EventState::Final
    }

    /// Score of the named team, if present
    pub fn score_for(&self, team_id: &str) -> Option<u32> {
        if self.home_team.id == team_id {
            self.home_score
        } else if self.away_team.id == team_id {
            self.away_score
        } else {
            None
        }
    }

    pub fn opponent_of(&self, team_id: &str) -> Option<&Team> {
        if self.home_team.id == team_id {
            Some(&self.away_team)
        } else if self.away_team.id == team_id {
            Some(&self.home_team)
        } else {
            None
        }
    }
}

/// A stat leader category ("passingYardsPerGame") with its leading player
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeaderCategory {
    pub name: String,
    pub team_id: String,
    pub player_name: String,
    pub display_value: String,
    /// True when the value is a season aggregate rather than a game line
    pub season_aggregate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conference {
    pub id: String,
    pub name: String,
    pub abbreviation: Option<String>,
    pub logo_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_parses_with_and_without_ties() {
        let record = TeamRecord::from_summary("9-5");
        assert_eq!((record.wins, record.losses, record.ties), (9, 5, 0));
        assert_eq!(record.display(), "9-5");

        let record = TeamRecord::from_summary("9-5-1");
        assert_eq!((record.wins, record.losses, record.ties), (9, 5, 1));
        assert_eq!(record.display(), "9-5-1");
        assert!((record.win_percent - 0.6).abs() < 1e-9);
    }

    #[test]
    fn record_tolerates_garbage_summary() {
        let record = TeamRecord::from_summary("n/a");
        assert_eq!(record.wins, 0);
        assert_eq!(record.summary, "n/a");
    }
}
