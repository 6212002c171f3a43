use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillerType {
    Pregame,
    Postgame,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "filler_type")]
pub enum ProgramKind {
    Game,
    Filler(FillerType),
}

/// One emitted EPG program
///
/// Within a channel, programs are strictly ordered and gap-free across the
/// output window: every program's end equals the next program's start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub tvg_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub art_url: Option<String>,
    pub categories: Vec<String>,
    pub kind: ProgramKind,
}

impl Program {
    pub fn is_filler(&self) -> bool {
        matches!(self.kind, ProgramKind::Filler(_))
    }

    pub fn filler_type(&self) -> Option<FillerType> {
        match self.kind {
            ProgramKind::Filler(filler) => Some(filler),
            ProgramKind::Game => None,
        }
    }
}
