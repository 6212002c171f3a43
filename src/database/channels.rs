//! Managed channel repository
//!
//! Implements the lifecycle engine's `ChannelStore` over SQLite. Soft
//! deletes keep history; hard removal only happens through retention
//! pruning. Stream attachments are replaced wholesale per refresh, with
//! removal timestamps kept for history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

use crate::errors::RepositoryError;
use crate::lifecycle::engine::{ChannelStore, NewManagedChannel, StreamAttachment};
use crate::models::{ManagedChannel, ManagedChannelStream, StreamCacheEntry, SyncStatus};

#[derive(Clone)]
pub struct ChannelRepository {
    pool: Pool<Sqlite>,
}

impl ChannelRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn map_error(query: &str, err: sqlx::Error) -> RepositoryError {
        RepositoryError::query_failed(query, err.to_string())
    }

    fn row_to_channel(row: &sqlx::sqlite::SqliteRow) -> ManagedChannel {
        let sync_status: String = row.get("sync_status");
        ManagedChannel {
            id: row.get("id"),
            group_id: row.get("group_id"),
            event_id: row.get("event_id"),
            provider: row.get("provider"),
            tvg_id: row.get("tvg_id"),
            channel_name: row.get("channel_name"),
            logo_url: row.get("logo_url"),
            middleware_channel_id: row.get("middleware_channel_id"),
            exception_keyword: row.get("exception_keyword"),
            primary_stream_id: row.get("primary_stream_id"),
            home_team: row.get("home_team"),
            away_team: row.get("away_team"),
            event_start: row.get("event_start"),
            event_name: row.get("event_name"),
            league: row.get("league"),
            sport: row.get("sport"),
            scheduled_delete_at: row.get("scheduled_delete_at"),
            deleted_at: row.get("deleted_at"),
            delete_reason: row.get("delete_reason"),
            sync_status: SyncStatus::parse(&sync_status),
            sync_message: row.get("sync_message"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    async fn record_history(
        &self,
        channel_id: i64,
        action: &str,
        detail: Option<&str>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO managed_channel_history (managed_channel_id, action, detail, recorded_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(channel_id)
        .bind(action)
        .bind(detail)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| Self::map_error("insert history", err))?;
        Ok(())
    }

    pub async fn streams_for(
        &self,
        channel_id: i64,
    ) -> Result<Vec<ManagedChannelStream>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM managed_channel_streams
             WHERE managed_channel_id = ? AND removed_at IS NULL
             ORDER BY priority",
        )
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| Self::map_error("select streams", err))?;

        Ok(rows
            .iter()
            .map(|row| ManagedChannelStream {
                id: row.get("id"),
                managed_channel_id: row.get("managed_channel_id"),
                stream_id: row.get("stream_id"),
                stream_name: row.get("stream_name"),
                m3u_account: row.get("m3u_account"),
                priority: row.get("priority"),
                exception_keyword: row.get("exception_keyword"),
                added_at: row.get("added_at"),
                removed_at: row.get("removed_at"),
            })
            .collect())
    }
}

#[async_trait]
impl ChannelStore for ChannelRepository {
    async fn find_channel(
        &self,
        group_id: i64,
        event_id: &str,
        keyword: Option<&str>,
    ) -> Result<Option<ManagedChannel>, RepositoryError> {
        let row = sqlx::query(
            "SELECT * FROM managed_channels
             WHERE group_id = ? AND event_id = ?
               AND COALESCE(exception_keyword, '') = COALESCE(?, '')
             ORDER BY deleted_at IS NOT NULL, id DESC
             LIMIT 1",
        )
        .bind(group_id)
        .bind(event_id)
        .bind(keyword)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| Self::map_error("select managed_channels", err))?;
        Ok(row.as_ref().map(Self::row_to_channel))
    }

    async fn insert_channel(
        &self,
        new: NewManagedChannel,
    ) -> Result<ManagedChannel, RepositoryError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO managed_channels
                (group_id, event_id, provider, tvg_id, channel_name, logo_url,
                 exception_keyword, home_team, away_team, event_start, event_name,
                 league, sport, scheduled_delete_at, sync_status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?)
            "#,
        )
        .bind(new.group_id)
        .bind(&new.event_id)
        .bind(&new.provider)
        .bind(&new.tvg_id)
        .bind(&new.channel_name)
        .bind(&new.logo_url)
        .bind(&new.exception_keyword)
        .bind(&new.home_team)
        .bind(&new.away_team)
        .bind(new.event_start)
        .bind(&new.event_name)
        .bind(&new.league)
        .bind(&new.sport)
        .bind(new.scheduled_delete_at)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|err| Self::map_error("insert managed_channels", err))?;

        let id = result.last_insert_rowid();
        self.record_history(id, "created", None).await?;

        let row = sqlx::query("SELECT * FROM managed_channels WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| Self::map_error("select managed_channels", err))?;
        Ok(Self::row_to_channel(&row))
    }

    async fn set_middleware_id(
        &self,
        channel_id: i64,
        middleware_id: Option<i64>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE managed_channels SET middleware_channel_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(middleware_id)
        .bind(Utc::now())
        .bind(channel_id)
        .execute(&self.pool)
        .await
        .map_err(|err| Self::map_error("update managed_channels", err))?;
        Ok(())
    }

    async fn set_sync_status(
        &self,
        channel_id: i64,
        status: SyncStatus,
        message: Option<String>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE managed_channels SET sync_status = ?, sync_message = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(message)
        .bind(Utc::now())
        .bind(channel_id)
        .execute(&self.pool)
        .await
        .map_err(|err| Self::map_error("update managed_channels", err))?;
        Ok(())
    }

    async fn set_scheduled_delete(
        &self,
        channel_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE managed_channels SET scheduled_delete_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(at)
        .bind(Utc::now())
        .bind(channel_id)
        .execute(&self.pool)
        .await
        .map_err(|err| Self::map_error("update managed_channels", err))?;
        Ok(())
    }

    async fn reactivate_channel(&self, channel_id: i64) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE managed_channels
             SET deleted_at = NULL, delete_reason = NULL, sync_status = 'pending', updated_at = ?
             WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(channel_id)
        .execute(&self.pool)
        .await
        .map_err(|err| Self::map_error("update managed_channels", err))?;
        self.record_history(channel_id, "reactivated", None).await
    }

    async fn mark_deleted(
        &self,
        channel_id: i64,
        reason: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE managed_channels
             SET deleted_at = ?, delete_reason = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(reason)
        .bind(Utc::now())
        .bind(channel_id)
        .execute(&self.pool)
        .await
        .map_err(|err| Self::map_error("update managed_channels", err))?;
        self.record_history(channel_id, "deleted", Some(reason)).await
    }

    async fn replace_streams(
        &self,
        channel_id: i64,
        streams: Vec<StreamAttachment>,
    ) -> Result<(), RepositoryError> {
        let now = Utc::now();
        sqlx::query(
            "UPDATE managed_channel_streams SET removed_at = ?
             WHERE managed_channel_id = ? AND removed_at IS NULL",
        )
        .bind(now)
        .bind(channel_id)
        .execute(&self.pool)
        .await
        .map_err(|err| Self::map_error("update streams", err))?;

        for attachment in streams {
            sqlx::query(
                "INSERT INTO managed_channel_streams
                    (managed_channel_id, stream_id, stream_name, m3u_account,
                     priority, exception_keyword, added_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(channel_id)
            .bind(attachment.stream_id)
            .bind(&attachment.stream_name)
            .bind(&attachment.m3u_account)
            .bind(attachment.priority)
            .bind(&attachment.exception_keyword)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|err| Self::map_error("insert streams", err))?;
        }
        Ok(())
    }

    async fn list_live_channels(
        &self,
        group_id: Option<i64>,
    ) -> Result<Vec<ManagedChannel>, RepositoryError> {
        let rows = match group_id {
            Some(group_id) => {
                sqlx::query(
                    "SELECT * FROM managed_channels
                     WHERE deleted_at IS NULL AND group_id = ? ORDER BY id",
                )
                .bind(group_id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT * FROM managed_channels WHERE deleted_at IS NULL ORDER BY id",
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|err| Self::map_error("select managed_channels", err))?;
        Ok(rows.iter().map(Self::row_to_channel).collect())
    }

    async fn list_due_for_deletion(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ManagedChannel>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM managed_channels
             WHERE deleted_at IS NULL AND scheduled_delete_at IS NOT NULL
               AND scheduled_delete_at <= ?
             ORDER BY scheduled_delete_at",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| Self::map_error("select managed_channels", err))?;
        Ok(rows.iter().map(Self::row_to_channel).collect())
    }

    async fn prune_history(&self, older_than: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let history = sqlx::query("DELETE FROM managed_channel_history WHERE recorded_at < ?")
            .bind(older_than)
            .execute(&self.pool)
            .await
            .map_err(|err| Self::map_error("delete history", err))?;

        // Soft-deleted channels past retention go away for good
        let channels = sqlx::query(
            "DELETE FROM managed_channels WHERE deleted_at IS NOT NULL AND deleted_at < ?",
        )
        .bind(older_than)
        .execute(&self.pool)
        .await
        .map_err(|err| Self::map_error("delete managed_channels", err))?;

        Ok(history.rows_affected() + channels.rows_affected())
    }

    async fn get_cached_match(
        &self,
        fingerprint: &str,
    ) -> Result<Option<StreamCacheEntry>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM stream_match_cache WHERE fingerprint = ?")
            .bind(fingerprint)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| Self::map_error("select stream_match_cache", err))?;

        Ok(row.map(|row| StreamCacheEntry {
            fingerprint: row.get("fingerprint"),
            group_id: row.get("group_id"),
            event_id: row.get("event_id"),
            league: row.get("league"),
            match_tier: row.get("match_tier"),
            generation: row.get("generation"),
            last_seen: row.get("last_seen"),
        }))
    }

    async fn put_cached_match(&self, entry: StreamCacheEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO stream_match_cache
                (fingerprint, group_id, event_id, league, match_tier, generation, last_seen)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (fingerprint) DO UPDATE SET
                group_id = excluded.group_id,
                event_id = excluded.event_id,
                league = excluded.league,
                match_tier = excluded.match_tier,
                generation = excluded.generation,
                last_seen = excluded.last_seen",
        )
        .bind(&entry.fingerprint)
        .bind(entry.group_id)
        .bind(&entry.event_id)
        .bind(&entry.league)
        .bind(&entry.match_tier)
        .bind(entry.generation)
        .bind(entry.last_seen)
        .execute(&self.pool)
        .await
        .map_err(|err| Self::map_error("upsert stream_match_cache", err))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    async fn repo() -> ChannelRepository {
        let db = Database::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        ChannelRepository::new(db.pool().clone())
    }

    fn new_channel(event_id: &str) -> NewManagedChannel {
        NewManagedChannel {
            group_id: 1,
            event_id: event_id.to_string(),
            provider: "espn".to_string(),
            tvg_id: format!("espn.{event_id}"),
            channel_name: format!("Event {event_id}"),
            logo_url: None,
            exception_keyword: None,
            home_team: Some("Detroit Lions".to_string()),
            away_team: Some("Chicago Bears".to_string()),
            event_start: Some(Utc::now()),
            event_name: None,
            league: Some("nfl".to_string()),
            sport: Some("football".to_string()),
            scheduled_delete_at: None,
        }
    }

    #[tokio::test]
    async fn insert_find_delete_round_trip() {
        let repo = repo().await;
        let created = repo.insert_channel(new_channel("401")).await.unwrap();
        assert_eq!(created.sync_status, SyncStatus::Pending);

        let found = repo.find_channel(1, "401", None).await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(repo.find_channel(2, "401", None).await.unwrap().is_none());

        repo.mark_deleted(created.id, "event over").await.unwrap();
        let deleted = repo.find_channel(1, "401", None).await.unwrap().unwrap();
        assert!(deleted.is_deleted());
        assert_eq!(deleted.delete_reason.as_deref(), Some("event over"));
        assert!(repo.list_live_channels(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn due_for_deletion_respects_schedule() {
        let repo = repo().await;
        let channel = repo.insert_channel(new_channel("401")).await.unwrap();
        let now = Utc::now();

        repo.set_scheduled_delete(channel.id, now - chrono::Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(repo.list_due_for_deletion(now).await.unwrap().len(), 1);

        repo.set_scheduled_delete(channel.id, now + chrono::Duration::minutes(5))
            .await
            .unwrap();
        assert!(repo.list_due_for_deletion(now).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replace_streams_keeps_removed_history() {
        let repo = repo().await;
        let channel = repo.insert_channel(new_channel("401")).await.unwrap();

        repo.replace_streams(
            channel.id,
            vec![StreamAttachment {
                stream_id: 11,
                stream_name: "feed one".to_string(),
                m3u_account: None,
                priority: 0,
                exception_keyword: None,
            }],
        )
        .await
        .unwrap();

        repo.replace_streams(
            channel.id,
            vec![StreamAttachment {
                stream_id: 12,
                stream_name: "feed two".to_string(),
                m3u_account: None,
                priority: 0,
                exception_keyword: None,
            }],
        )
        .await
        .unwrap();

        let active = repo.streams_for(channel.id).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].stream_id, 12);
    }

    #[tokio::test]
    async fn stream_match_cache_round_trips() {
        let repo = repo().await;
        let entry = StreamCacheEntry {
            fingerprint: "abc".to_string(),
            group_id: 1,
            event_id: "401".to_string(),
            league: "nfl".to_string(),
            match_tier: "3c".to_string(),
            generation: 2,
            last_seen: Utc::now(),
        };
        repo.put_cached_match(entry.clone()).await.unwrap();
        let cached = repo.get_cached_match("abc").await.unwrap().unwrap();
        assert_eq!(cached.event_id, "401");
        assert_eq!(cached.generation, 2);
        assert!(repo.get_cached_match("missing").await.unwrap().is_none());
    }
}
