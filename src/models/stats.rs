use serde::{Deserialize, Serialize};

use super::event::TeamRecord;

/// Season statistics for a team, cached per (team, league) for six hours
///
/// Invariant: home wins plus away wins never exceed total wins; neutral-site
/// games account for the remainder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamStats {
    pub record: TeamRecord,
    /// Signed streak: positive = wins, negative = losses
    pub streak_count: i32,
    /// Points scored per game
    pub ppg: f64,
    /// Points allowed per game
    pub papg: f64,
    pub playoff_seed: Option<u32>,
    pub games_back: f64,
    pub home_record: String,
    pub away_record: String,
    pub division_record: String,
    /// Poll rank 1..=25; absent means unranked
    pub rank: Option<u32>,
    pub conference_name: String,
    pub conference_abbrev: String,
    pub division_name: String,
    /// Leagues this team belongs to, from the multi-league cache
    pub leagues: Vec<String>,
}

impl TeamStats {
    /// Streak rendered for display: "W3", "L2", or empty when no streak
    pub fn streak_display(&self) -> String {
        match self.streak_count {
            0 => String::new(),
            n if n > 0 => format!("W{n}"),
            n => format!("L{}", -n),
        }
    }

    pub fn is_ranked(&self) -> bool {
        matches!(self.rank, Some(rank) if rank <= 25)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streak_display_signs() {
        let mut stats = TeamStats {
            streak_count: 3,
            ..Default::default()
        };
        assert_eq!(stats.streak_display(), "W3");
        stats.streak_count = -2;
        assert_eq!(stats.streak_display(), "L2");
        stats.streak_count = 0;
        assert_eq!(stats.streak_display(), "");
    }

    #[test]
    fn unranked_team_is_not_ranked() {
        let stats = TeamStats::default();
        assert!(!stats.is_ranked());
        let stats = TeamStats {
            rank: Some(8),
            ..Default::default()
        };
        assert!(stats.is_ranked());
    }
}
