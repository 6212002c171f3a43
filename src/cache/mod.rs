//! Process-wide caches
//!
//! Each cache is an owned type constructed at startup and passed by handle;
//! nothing here relies on global mutable state. No component ever holds more
//! than one cache lock at a time, and provider HTTP calls never happen under
//! a cache lock.

pub mod scoreboard;
pub mod stats;
pub mod team_league;

pub use scoreboard::ScoreboardCache;
pub use stats::StatsCache;
pub use team_league::{TeamLeagueCache, TeamLeagueSnapshot};
