//! Stream-to-event matching
//!
//! Raw IPTV stream names arrive noisy: league prefixes, channel numbers,
//! timestamps, language tags, mojibake, ranking markers, inconsistent team
//! spellings. This module turns them into canonical `(event, league)` pairs
//! through a fixed pipeline: normalize, classify, resolve teams, then match
//! across candidate leagues with date/time disambiguation.

pub mod classifier;
pub mod keywords;
pub mod multi_tier;
pub mod normalizer;
pub mod stream_filter;
pub mod team_matcher;

use serde::{Deserialize, Serialize};

pub use classifier::{ClassifiedStream, Classifier, StreamCategory};
pub use multi_tier::{MatchMiss, MatchOutcome, MultiTierMatcher, StreamMatch};
pub use normalizer::{NormalizedStream, Normalizer};
pub use stream_filter::{filter_game_streams, has_game_indicator};
pub use team_matcher::{TeamIndex, TeamMatch};

/// The level at which a stream was matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchTier {
    /// Explicit league hint in the stream name
    Tier1,
    /// Sport hint, league found within that sport
    Tier2,
    /// Both teams resolved; date + time disambiguation
    Tier3a,
    /// Both teams resolved; time only, date assumed today
    Tier3b,
    /// Both teams resolved; closest game to now
    Tier3c,
    /// One team resolved; opponent found in its schedule by date/time
    Tier4a,
    /// One team resolved; opponent found, game closest to now
    Tier4b,
    /// Single-event league keyword (e.g. UFC card)
    SingleEvent,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tier1 => "1",
            Self::Tier2 => "2",
            Self::Tier3a => "3a",
            Self::Tier3b => "3b",
            Self::Tier3c => "3c",
            Self::Tier4a => "4a",
            Self::Tier4b => "4b",
            Self::SingleEvent => "single_event",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "1" => Some(Self::Tier1),
            "2" => Some(Self::Tier2),
            "3a" => Some(Self::Tier3a),
            "3b" => Some(Self::Tier3b),
            "3c" => Some(Self::Tier3c),
            "4a" => Some(Self::Tier4a),
            "4b" => Some(Self::Tier4b),
            "single_event" => Some(Self::SingleEvent),
            _ => None,
        }
    }
}

/// Stable fingerprint for the stream match cache: hash of the normalized
/// name plus the target date, so a rename or a new day re-matches
pub fn stream_fingerprint(normalized_name: &str, date: chrono::NaiveDate) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(normalized_name.as_bytes());
    hasher.update(date.format("%Y-%m-%d").to_string().as_bytes());
    hex::encode(hasher.finalize())
}
