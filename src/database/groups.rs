//! Event group and exception keyword repository

use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};

use crate::errors::RepositoryError;
use crate::matching::keywords::parse_keywords_string;
use crate::models::group::CustomRegexConfig;
use crate::models::{EventGroup, ExceptionKeyword, KeywordBehavior};

#[derive(Clone)]
pub struct GroupRepository {
    pool: Pool<Sqlite>,
}

impl GroupRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn map_error(query: &str, err: sqlx::Error) -> RepositoryError {
        RepositoryError::query_failed(query, err.to_string())
    }

    fn row_to_group(row: &sqlx::sqlite::SqliteRow) -> Result<EventGroup, RepositoryError> {
        let include_leagues: String = row.get("include_leagues");
        let candidate_leagues: String = row.get("candidate_leagues");
        let keyword_ids: String = row.get("exception_keyword_ids");
        let custom_regex: String = row.get("custom_regex");
        let template_id: Option<String> = row.get("template_id");

        Ok(EventGroup {
            id: row.get("id"),
            name: row.get("name"),
            include_leagues: serde_json::from_str(&include_leagues)?,
            candidate_leagues: serde_json::from_str(&candidate_leagues)?,
            include_regex: row.get("include_regex"),
            exclude_regex: row.get("exclude_regex"),
            exception_keyword_ids: serde_json::from_str(&keyword_ids)?,
            custom_regex: serde_json::from_str::<CustomRegexConfig>(&custom_regex)
                .unwrap_or_default(),
            template_id: template_id.and_then(|raw| uuid::Uuid::parse_str(&raw).ok()),
            create_lead_hours: row.get("create_lead_hours"),
            delete_grace_minutes: row.get("delete_grace_minutes"),
            generation: row.get("generation"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    pub async fn list_active(&self) -> Result<Vec<EventGroup>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM event_groups WHERE is_active = 1 ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| Self::map_error("select event_groups", err))?;
        rows.iter().map(Self::row_to_group).collect()
    }

    pub async fn get(&self, id: i64) -> Result<Option<EventGroup>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM event_groups WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| Self::map_error("select event_groups", err))?;
        row.as_ref().map(Self::row_to_group).transpose()
    }

    pub async fn create(&self, group: &EventGroup) -> Result<EventGroup, RepositoryError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO event_groups
                (name, include_leagues, candidate_leagues, include_regex, exclude_regex,
                 exception_keyword_ids, custom_regex, template_id, create_lead_hours,
                 delete_grace_minutes, generation, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
            "#,
        )
        .bind(&group.name)
        .bind(serde_json::to_string(&group.include_leagues)?)
        .bind(serde_json::to_string(&group.candidate_leagues)?)
        .bind(&group.include_regex)
        .bind(&group.exclude_regex)
        .bind(serde_json::to_string(&group.exception_keyword_ids)?)
        .bind(serde_json::to_string(&group.custom_regex)?)
        .bind(group.template_id.map(|id| id.to_string()))
        .bind(group.create_lead_hours)
        .bind(group.delete_grace_minutes)
        .bind(group.is_active)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|err| Self::map_error("insert event_groups", err))?;

        self.get(result.last_insert_rowid()).await?.ok_or_else(|| {
            RepositoryError::record_not_found("event_groups", "id", result.last_insert_rowid().to_string())
        })
    }

    /// Advance the generation counter, invalidating cached stream matches
    pub async fn bump_generation(&self, id: i64) -> Result<i64, RepositoryError> {
        sqlx::query(
            "UPDATE event_groups SET generation = generation + 1, updated_at = ? WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|err| Self::map_error("update event_groups", err))?;

        let row = sqlx::query("SELECT generation FROM event_groups WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| Self::map_error("select event_groups", err))?;
        Ok(row.get("generation"))
    }

    pub async fn list_exception_keywords(
        &self,
        ids: &[i64],
    ) -> Result<Vec<ExceptionKeyword>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM exception_keywords ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| Self::map_error("select exception_keywords", err))?;

        Ok(rows
            .iter()
            .map(|row| {
                let keywords: String = row.get("keywords");
                let behavior: String = row.get("behavior");
                ExceptionKeyword {
                    id: row.get("id"),
                    keywords: parse_keywords_string(&keywords),
                    behavior: KeywordBehavior::parse(&behavior),
                }
            })
            .filter(|keyword| ids.is_empty() || ids.contains(&keyword.id))
            .collect())
    }

    pub async fn create_exception_keyword(
        &self,
        keywords: &str,
        behavior: KeywordBehavior,
    ) -> Result<i64, RepositoryError> {
        let result = sqlx::query("INSERT INTO exception_keywords (keywords, behavior) VALUES (?, ?)")
            .bind(keywords)
            .bind(behavior.as_str())
            .execute(&self.pool)
            .await
            .map_err(|err| Self::map_error("insert exception_keywords", err))?;
        Ok(result.last_insert_rowid())
    }
}
