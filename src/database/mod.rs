//! Database connection and embedded migrations
//!
//! SQLite through sqlx. The schema ships embedded and is applied at startup;
//! applied migrations are recorded in `_migrations` with a content checksum
//! so a changed schema file fails loudly instead of silently diverging.

use anyhow::Result;
use sqlx::{migrate::MigrateDatabase, Pool, Row, Sqlite, SqlitePool};
use tracing::info;

use crate::config::DatabaseConfig;

pub mod channels;
pub mod groups;
pub mod leagues;
pub mod settings;
pub mod teams;
pub mod templates;

pub use channels::ChannelRepository;
pub use groups::GroupRepository;
pub use leagues::LeagueRepository;
pub use settings::SettingsRepository;
pub use teams::TeamRepository;
pub use templates::TemplateRepository;

const SCHEMA: &str = include_str!("schema.sql");
const SCHEMA_VERSION: i64 = 1;

#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        if !Sqlite::database_exists(&config.url).await? {
            Sqlite::create_database(&config.url).await?;
        }

        let pool = SqlitePool::connect(&config.url).await?;
        Ok(Self { pool })
    }

    /// In-memory database for tests
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePool::connect("sqlite::memory:").await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                checksum TEXT NOT NULL,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        let checksum = Self::checksum(SCHEMA);
        let existing = sqlx::query("SELECT checksum FROM _migrations WHERE version = ?")
            .bind(SCHEMA_VERSION)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = existing {
            let applied: String = row.get("checksum");
            if applied != checksum {
                anyhow::bail!(
                    "embedded schema changed after being applied; write a new migration"
                );
            }
            return Ok(());
        }

        for statement in SCHEMA.split(';') {
            let statement = statement.trim();
            if statement.is_empty() || statement.starts_with("--") && !statement.contains('\n') {
                continue;
            }
            sqlx::query(statement).execute(&self.pool).await?;
        }

        sqlx::query("INSERT INTO _migrations (version, checksum) VALUES (?, ?)")
            .bind(SCHEMA_VERSION)
            .bind(&checksum)
            .execute(&self.pool)
            .await?;
        info!("Applied embedded schema migration v{SCHEMA_VERSION}");
        Ok(())
    }

    fn checksum(content: &str) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_backed_database_is_created_and_migrated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("teamguide-test.db");
        let config = crate::config::DatabaseConfig {
            url: format!("sqlite://{}", path.display()),
            max_connections: Some(5),
        };
        let db = Database::new(&config).await.unwrap();
        db.migrate().await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        db.migrate().await.unwrap();

        let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM _migrations")
            .fetch_one(db.pool())
            .await
            .unwrap()
            .get("n");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn live_channel_uniqueness_is_enforced() {
        let db = Database::in_memory().await.unwrap();
        db.migrate().await.unwrap();

        let insert = |keyword: Option<&str>| {
            let pool = db.pool().clone();
            let keyword = keyword.map(String::from);
            async move {
                sqlx::query(
                    r#"
                    INSERT INTO managed_channels
                        (group_id, event_id, provider, tvg_id, channel_name,
                         exception_keyword, sync_status, created_at, updated_at)
                    VALUES (1, '401', 'espn', 'espn.401', 'test', ?, 'pending',
                            CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
                    "#,
                )
                .bind(keyword)
                .execute(&pool)
                .await
            }
        };

        insert(None).await.unwrap();
        // Second live channel for the same (group, event, keyword) must fail
        assert!(insert(None).await.is_err());
        // A keyword channel for the same event is a different key
        insert(Some("prime vision")).await.unwrap();
    }
}
