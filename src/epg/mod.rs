//! EPG generation
//!
//! The orchestrator runs a parallel per-team pipeline: fetch schedules,
//! enrich from scoreboards, build template contexts, resolve templates,
//! generate filler, and emit an ordered, gap-free program timeline.

pub mod context;
pub mod event_channels;
pub mod filler;
pub mod orchestrator;

pub use context::{ContextBuilder, GameContext, HeadToHead, PlayerLeaders, Streaks, TeamIdentity, TemplateContext};
pub use filler::{FillerGenerator, FillerSettings};
pub use orchestrator::{EpgOrchestrator, TeamChannel};
