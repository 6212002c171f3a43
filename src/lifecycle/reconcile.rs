//! Reconciliation between local managed channels and the middleware
//!
//! Three discrepancy classes: a local channel whose middleware counterpart
//! is gone (remote orphan), a middleware channel we created but no longer
//! track (local orphan), and metadata drift between the two. Scheduled runs
//! are detect-only; auto-fix is opt-in.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::RepositoryError;
use crate::models::SyncStatus;

use super::engine::ChannelStore;
use super::middleware::ChannelMiddleware;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub enum ReconciliationIssue {
    /// Local live channel with a middleware id nothing downstream knows
    RemoteOrphan {
        channel_id: i64,
        middleware_id: i64,
        name: String,
    },
    /// Local live channel never pushed downstream
    NeverSynced { channel_id: i64, name: String },
    /// Middleware channel carrying our tvg-id scheme but unknown locally
    LocalOrphan { middleware_id: i64, name: String },
    /// Name drifted between local record and middleware
    Drift {
        channel_id: i64,
        middleware_id: i64,
        local_name: String,
        remote_name: String,
    },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconciliationReport {
    pub checked: usize,
    pub issues: Vec<ReconciliationIssue>,
    pub fixed: usize,
    pub ran_at: Option<DateTime<Utc>>,
}

pub struct Reconciler {
    store: Arc<dyn ChannelStore>,
    middleware: Arc<dyn ChannelMiddleware>,
    /// tvg-id prefix identifying channels this instance owns
    tvg_prefix: String,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn ChannelStore>,
        middleware: Arc<dyn ChannelMiddleware>,
        tvg_prefix: String,
    ) -> Self {
        Self {
            store,
            middleware,
            tvg_prefix,
        }
    }

    /// Compare local records against the middleware listing
    ///
    /// With `auto_fix`: remote orphans are re-marked pending so the next
    /// group refresh recreates them, and local orphans are deleted
    /// downstream. Drift is corrected by pushing the local name.
    pub async fn reconcile(&self, auto_fix: bool) -> Result<ReconciliationReport, RepositoryError> {
        let mut report = ReconciliationReport {
            ran_at: Some(Utc::now()),
            ..Default::default()
        };

        let remote = match self.middleware.list_channels().await {
            Ok(channels) => channels,
            Err(err) => {
                warn!("Reconciliation skipped, middleware unreachable: {err}");
                return Ok(report);
            }
        };
        let local = self.store.list_live_channels(None).await?;
        report.checked = local.len();

        for channel in &local {
            match channel.middleware_channel_id {
                None => {
                    report.issues.push(ReconciliationIssue::NeverSynced {
                        channel_id: channel.id,
                        name: channel.channel_name.clone(),
                    });
                }
                Some(middleware_id) => {
                    match remote.iter().find(|remote| remote.id == middleware_id) {
                        None => {
                            report.issues.push(ReconciliationIssue::RemoteOrphan {
                                channel_id: channel.id,
                                middleware_id,
                                name: channel.channel_name.clone(),
                            });
                            if auto_fix {
                                // Clear the stale id; the next refresh
                                // recreates the channel downstream
                                self.store.set_middleware_id(channel.id, None).await?;
                                self.store
                                    .set_sync_status(
                                        channel.id,
                                        SyncStatus::Pending,
                                        Some("remote orphan".to_string()),
                                    )
                                    .await?;
                                report.fixed += 1;
                            } else {
                                self.store
                                    .set_sync_status(
                                        channel.id,
                                        SyncStatus::Drifted,
                                        Some("missing downstream".to_string()),
                                    )
                                    .await?;
                            }
                        }
                        Some(remote_channel) => {
                            if remote_channel.name != channel.channel_name {
                                report.issues.push(ReconciliationIssue::Drift {
                                    channel_id: channel.id,
                                    middleware_id,
                                    local_name: channel.channel_name.clone(),
                                    remote_name: remote_channel.name.clone(),
                                });
                                if auto_fix {
                                    let patch = super::middleware::ChannelPatch {
                                        name: Some(channel.channel_name.clone()),
                                        logo_url: None,
                                        stream_ids: None,
                                    };
                                    if self
                                        .middleware
                                        .update_channel(middleware_id, patch)
                                        .await
                                        .is_ok()
                                    {
                                        report.fixed += 1;
                                    }
                                } else {
                                    self.store
                                        .set_sync_status(
                                            channel.id,
                                            SyncStatus::Drifted,
                                            Some("name drift".to_string()),
                                        )
                                        .await?;
                                }
                            }
                        }
                    }
                }
            }
        }

        // Local orphans: downstream channels in our tvg-id namespace with no
        // live local record
        for remote_channel in &remote {
            let Some(tvg_id) = &remote_channel.tvg_id else {
                continue;
            };
            if !tvg_id.starts_with(&self.tvg_prefix) {
                continue;
            }
            let known = local
                .iter()
                .any(|channel| channel.middleware_channel_id == Some(remote_channel.id));
            if !known {
                report.issues.push(ReconciliationIssue::LocalOrphan {
                    middleware_id: remote_channel.id,
                    name: remote_channel.name.clone(),
                });
                if auto_fix {
                    if self
                        .middleware
                        .delete_channel(remote_channel.id)
                        .await
                        .is_ok()
                    {
                        report.fixed += 1;
                    }
                }
            }
        }

        if !report.issues.is_empty() {
            info!(
                "Reconciliation found {} issue(s), fixed {}",
                report.issues.len(),
                report.fixed
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::engine::memory_store::MemoryStore;
    use crate::lifecycle::engine::NewManagedChannel;
    use crate::lifecycle::middleware::mock::MockMiddleware;
    use crate::lifecycle::middleware::ChannelSpec;

    async fn local_channel(store: &MemoryStore, event_id: &str) -> i64 {
        store
            .insert_channel(NewManagedChannel {
                group_id: 1,
                event_id: event_id.to_string(),
                provider: "espn".to_string(),
                tvg_id: format!("espn.{event_id}"),
                channel_name: format!("Event {event_id}"),
                logo_url: None,
                exception_keyword: None,
                home_team: None,
                away_team: None,
                event_start: None,
                event_name: None,
                league: None,
                sport: None,
                scheduled_delete_at: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn detects_remote_orphan() {
        let store = Arc::new(MemoryStore::new());
        let middleware = Arc::new(MockMiddleware::new());
        let id = local_channel(&store, "401").await;
        // Local record points at a middleware channel that does not exist
        store.set_middleware_id(id, Some(99)).await.unwrap();

        let reconciler = Reconciler::new(store.clone(), middleware, "espn.".to_string());
        let report = reconciler.reconcile(false).await.unwrap();
        assert_eq!(report.issues.len(), 1);
        assert!(matches!(
            report.issues[0],
            ReconciliationIssue::RemoteOrphan { middleware_id: 99, .. }
        ));
        assert_eq!(report.fixed, 0);
    }

    #[tokio::test]
    async fn detects_local_orphan_and_fixes_it() {
        let store = Arc::new(MemoryStore::new());
        let middleware = Arc::new(MockMiddleware::new());
        // Downstream channel in our namespace, unknown locally
        middleware
            .create_channel(ChannelSpec {
                tvg_id: "espn.999".to_string(),
                name: "Stale Event".to_string(),
                logo_url: None,
                group_id: None,
                stream_ids: Vec::new(),
            })
            .await
            .unwrap();

        let reconciler = Reconciler::new(store, middleware.clone(), "espn.".to_string());
        let report = reconciler.reconcile(true).await.unwrap();
        assert_eq!(report.issues.len(), 1);
        assert!(matches!(
            report.issues[0],
            ReconciliationIssue::LocalOrphan { .. }
        ));
        assert_eq!(report.fixed, 1);
        assert!(middleware.channels.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn detects_name_drift() {
        let store = Arc::new(MemoryStore::new());
        let middleware = Arc::new(MockMiddleware::new());
        let id = local_channel(&store, "401").await;
        let downstream = middleware
            .create_channel(ChannelSpec {
                tvg_id: "espn.401".to_string(),
                name: "Old Name".to_string(),
                logo_url: None,
                group_id: None,
                stream_ids: Vec::new(),
            })
            .await
            .unwrap();
        store.set_middleware_id(id, Some(downstream.id)).await.unwrap();

        let reconciler = Reconciler::new(store, middleware.clone(), "espn.".to_string());
        let report = reconciler.reconcile(true).await.unwrap();
        assert_eq!(report.issues.len(), 1);
        assert!(matches!(report.issues[0], ReconciliationIssue::Drift { .. }));
        // Auto-fix pushed the local name downstream
        let channels = middleware.channels.lock().unwrap();
        assert_eq!(channels[&downstream.id].name, "Event 401");
    }

    #[tokio::test]
    async fn clean_state_reports_nothing() {
        let store = Arc::new(MemoryStore::new());
        let middleware = Arc::new(MockMiddleware::new());
        let id = local_channel(&store, "401").await;
        let downstream = middleware
            .create_channel(ChannelSpec {
                tvg_id: "espn.401".to_string(),
                name: "Event 401".to_string(),
                logo_url: None,
                group_id: None,
                stream_ids: Vec::new(),
            })
            .await
            .unwrap();
        store.set_middleware_id(id, Some(downstream.id)).await.unwrap();

        let reconciler = Reconciler::new(store, middleware, "espn.".to_string());
        let report = reconciler.reconcile(false).await.unwrap();
        assert!(report.issues.is_empty());
    }
}
