//! Key/value settings repository

use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};

use crate::errors::RepositoryError;

#[derive(Clone)]
pub struct SettingsRepository {
    pool: Pool<Sqlite>,
}

impl SettingsRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                RepositoryError::query_failed("select settings", err.to_string())
            })?;
        Ok(row.map(|row| row.get("value")))
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| RepositoryError::query_failed("upsert settings", err.to_string()))?;
        Ok(())
    }

    pub async fn get_or(&self, key: &str, default: &str) -> Result<String, RepositoryError> {
        Ok(self.get(key).await?.unwrap_or_else(|| default.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    #[tokio::test]
    async fn set_get_round_trip() {
        let db = Database::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let repo = SettingsRepository::new(db.pool().clone());

        assert!(repo.get("tz").await.unwrap().is_none());
        repo.set("tz", "America/Detroit").await.unwrap();
        assert_eq!(repo.get("tz").await.unwrap().unwrap(), "America/Detroit");
        repo.set("tz", "UTC").await.unwrap();
        assert_eq!(repo.get_or("tz", "x").await.unwrap(), "UTC");
        assert_eq!(repo.get_or("missing", "fallback").await.unwrap(), "fallback");
    }
}
