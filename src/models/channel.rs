use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Downstream sync state of a managed channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Synced,
    Drifted,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Drifted => "drifted",
            Self::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "synced" => Self::Synced,
            "drifted" => Self::Drifted,
            "error" => Self::Error,
            _ => Self::Pending,
        }
    }
}

/// A per-event virtual channel owned by an event group
///
/// At most one non-deleted ManagedChannel exists per (event id, group); the
/// tvg-id stays stable for the event's lifetime so middleware EPG matching
/// survives updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedChannel {
    pub id: i64,
    pub group_id: i64,
    pub event_id: String,
    pub provider: String,
    pub tvg_id: String,
    pub channel_name: String,
    pub logo_url: Option<String>,
    /// Channel id in the downstream middleware, once created there
    pub middleware_channel_id: Option<i64>,
    /// Exception keyword this channel was split out for, if any
    pub exception_keyword: Option<String>,
    /// Pinned primary stream, overriding lowest-id selection
    pub primary_stream_id: Option<i64>,

    // Event context carried for EPG emission and reconciliation
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub event_start: Option<DateTime<Utc>>,
    pub event_name: Option<String>,
    pub league: Option<String>,
    pub sport: Option<String>,

    // Lifecycle
    pub scheduled_delete_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub delete_reason: Option<String>,

    pub sync_status: SyncStatus,
    pub sync_message: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ManagedChannel {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_due_for_deletion(&self, now: DateTime<Utc>) -> bool {
        !self.is_deleted()
            && self
                .scheduled_delete_at
                .map(|at| at <= now)
                .unwrap_or(false)
    }
}

/// A stream attached to a managed channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedChannelStream {
    pub id: i64,
    pub managed_channel_id: i64,
    pub stream_id: i64,
    pub stream_name: String,
    pub m3u_account: Option<String>,
    pub priority: i64,
    pub exception_keyword: Option<String>,
    pub added_at: DateTime<Utc>,
    pub removed_at: Option<DateTime<Utc>>,
}
