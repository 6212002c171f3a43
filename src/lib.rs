//! teamguide - Sports-team EPG generation and event channel lifecycle management
//!
//! The library is organized around four subsystems:
//! - `providers`: rate-limited, cached HTTP clients for upstream sports data APIs
//! - `matching`: stream-name normalization, classification, and event matching
//! - `epg`: per-team EPG orchestration, template resolution, and filler generation
//! - `lifecycle`: managed event-channel creation, retirement, and reconciliation

pub mod cache;
pub mod config;
pub mod database;
pub mod epg;
pub mod errors;
pub mod lifecycle;
pub mod matching;
pub mod models;
pub mod providers;
pub mod templates;
pub mod utils;
pub mod web;
pub mod xmltv;

pub use errors::AppError;
