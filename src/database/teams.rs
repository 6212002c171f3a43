//! Team channel repository

use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

use crate::errors::RepositoryError;
use crate::models::{TeamChannelConfig, TeamChannelCreateRequest};

#[derive(Clone)]
pub struct TeamRepository {
    pool: Pool<Sqlite>,
}

impl TeamRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn map_error(query: &str, err: sqlx::Error) -> RepositoryError {
        RepositoryError::query_failed(query, err.to_string())
    }

    fn row_to_config(row: &sqlx::sqlite::SqliteRow) -> TeamChannelConfig {
        let id: String = row.get("id");
        let template_id: Option<String> = row.get("template_id");
        TeamChannelConfig {
            id: Uuid::parse_str(&id).unwrap_or_default(),
            team_id: row.get("team_id"),
            league: row.get("league"),
            sport: row.get("sport"),
            team_name: row.get("team_name"),
            team_abbrev: row.get("team_abbrev"),
            team_logo_url: row.get("team_logo_url"),
            channel_id: row.get("channel_id"),
            template_id: template_id.and_then(|raw| Uuid::parse_str(&raw).ok()),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    pub async fn list_active(&self) -> Result<Vec<TeamChannelConfig>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM teams WHERE is_active = 1 ORDER BY team_name")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| Self::map_error("select teams", err))?;
        Ok(rows.iter().map(Self::row_to_config).collect())
    }

    pub async fn list_all(&self) -> Result<Vec<TeamChannelConfig>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM teams ORDER BY team_name")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| Self::map_error("select teams", err))?;
        Ok(rows.iter().map(Self::row_to_config).collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<TeamChannelConfig>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM teams WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| Self::map_error("select teams", err))?;
        Ok(row.as_ref().map(Self::row_to_config))
    }

    pub async fn create(
        &self,
        request: TeamChannelCreateRequest,
    ) -> Result<TeamChannelConfig, RepositoryError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO teams
                (id, team_id, league, sport, team_name, team_abbrev, team_logo_url,
                 channel_id, template_id, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&request.team_id)
        .bind(request.league.to_lowercase())
        .bind(request.sport.to_lowercase())
        .bind(&request.team_name)
        .bind(&request.team_abbrev)
        .bind(&request.team_logo_url)
        .bind(&request.channel_id)
        .bind(request.template_id.map(|id| id.to_string()))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|err| Self::map_error("insert teams", err))?;

        self.get(id).await?.ok_or_else(|| {
            RepositoryError::record_not_found("teams", "id", id.to_string())
        })
    }

    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE teams SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(Utc::now())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|err| Self::map_error("update teams", err))?;
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM teams WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|err| Self::map_error("delete teams", err))?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    #[tokio::test]
    async fn create_and_list_round_trip() {
        let db = Database::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let repo = TeamRepository::new(db.pool().clone());

        let created = repo
            .create(TeamChannelCreateRequest {
                team_id: "8".to_string(),
                league: "NFL".to_string(),
                sport: "Football".to_string(),
                team_name: "Detroit Lions".to_string(),
                team_abbrev: Some("DET".to_string()),
                team_logo_url: None,
                channel_id: "detroit-lions".to_string(),
                template_id: None,
            })
            .await
            .unwrap();

        assert_eq!(created.league, "nfl");
        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 1);

        repo.set_active(created.id, false).await.unwrap();
        assert!(repo.list_active().await.unwrap().is_empty());
        assert_eq!(repo.list_all().await.unwrap().len(), 1);

        assert!(repo.delete(created.id).await.unwrap());
        assert!(repo.list_all().await.unwrap().is_empty());
    }
}
