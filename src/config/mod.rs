use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub epg: EpgConfig,
    pub providers: ProvidersConfig,
    pub lifecycle: LifecycleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpgConfig {
    /// Forward window in days (1 = today only)
    pub days_ahead: u32,
    /// IANA timezone the guide is rendered in
    pub timezone: String,
    /// Default game duration in hours when no override applies
    pub default_game_duration_hours: f64,
    /// Per-sport duration overrides (sport code -> hours)
    pub sport_durations: std::collections::HashMap<String, f64>,
    /// Maximum concurrent per-team workers in a generation run
    pub max_workers: usize,
    /// Filler behavior when a game crosses midnight and the next day is empty
    pub midnight_crossover_mode: MidnightCrossoverMode,
    /// Cron expression for scheduled EPG regeneration
    pub refresh_cron: String,
    /// 12-hour clock in datetime template variables
    pub use_12_hour_clock: bool,
    /// Append timezone abbreviation to time variables
    pub show_timezone: bool,
    /// How many recent days of scoreboards to consult for final scores
    pub past_score_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MidnightCrossoverMode {
    Postgame,
    Idle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Per-call HTTP timeout in seconds
    pub request_timeout_secs: u64,
    /// Retry budget per call, linear backoff between attempts
    pub retry_count: u32,
    pub retry_delay_secs: u64,
    /// TheSportsDB requests per minute (free tier allows 30)
    pub tsdb_requests_per_minute: u32,
    /// Optional explicit TheSportsDB API key (falls back to TSDB_API_KEY env)
    pub tsdb_api_key: Option<String>,
    /// Team/league cache refresh interval in days
    pub team_cache_refresh_days: u32,
    /// Worker pool size for the team/league cache refresher
    pub team_cache_refresh_workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Base URL of the downstream IPTV middleware (None disables event
    /// channel management)
    pub middleware_url: Option<String>,
    /// Bearer token for the middleware API
    pub middleware_token: Option<String>,
    /// Minutes between background scheduler ticks
    pub interval_minutes: u64,
    /// Grace period after event end before channel deletion, in minutes
    pub delete_grace_minutes: i64,
    /// Hours before event start to create channels (None = immediately)
    pub create_lead_hours: Option<i64>,
    /// Days of managed-channel history to retain
    pub history_retention_days: u32,
    /// Run reconciliation automatically on scheduler ticks
    pub reconcile_on_tick: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://./teamguide.db".to_string(),
                max_connections: Some(10),
            },
            web: WebConfig {
                host: "0.0.0.0".to_string(),
                port: 8750,
                base_url: "http://localhost:8750".to_string(),
            },
            epg: EpgConfig {
                days_ahead: 3,
                timezone: "America/New_York".to_string(),
                default_game_duration_hours: 3.0,
                sport_durations: [
                    ("football".to_string(), 3.5),
                    ("basketball".to_string(), 2.5),
                    ("hockey".to_string(), 3.0),
                    ("baseball".to_string(), 3.5),
                    ("soccer".to_string(), 2.5),
                ]
                .into_iter()
                .collect(),
                max_workers: 100,
                midnight_crossover_mode: MidnightCrossoverMode::Idle,
                refresh_cron: "0 0 */4 * * *".to_string(),
                use_12_hour_clock: true,
                show_timezone: true,
                past_score_days: 3,
            },
            providers: ProvidersConfig {
                request_timeout_secs: 10,
                retry_count: 3,
                retry_delay_secs: 1,
                tsdb_requests_per_minute: 25,
                tsdb_api_key: None,
                team_cache_refresh_days: 7,
                team_cache_refresh_workers: 4,
            },
            lifecycle: LifecycleConfig {
                middleware_url: None,
                middleware_token: None,
                interval_minutes: 15,
                delete_grace_minutes: 60,
                create_lead_hours: None,
                history_retention_days: 90,
                reconcile_on_tick: true,
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(&config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(&config_file, contents)?;
            Ok(default_config)
        }
    }
}
