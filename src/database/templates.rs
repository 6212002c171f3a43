//! Template repository
//!
//! Templates are stored whole as a JSON body column; the schema only cares
//! about identity and naming, the template shape lives in the model.

use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

use crate::errors::RepositoryError;
use crate::models::Template;

#[derive(Clone)]
pub struct TemplateRepository {
    pool: Pool<Sqlite>,
}

impl TemplateRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn map_error(query: &str, err: sqlx::Error) -> RepositoryError {
        RepositoryError::query_failed(query, err.to_string())
    }

    pub async fn list(&self) -> Result<Vec<Template>, RepositoryError> {
        let rows = sqlx::query("SELECT body FROM templates ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| Self::map_error("select templates", err))?;

        let mut templates = Vec::new();
        for row in rows {
            let body: String = row.get("body");
            templates.push(serde_json::from_str(&body)?);
        }
        Ok(templates)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Template>, RepositoryError> {
        let row = sqlx::query("SELECT body FROM templates WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| Self::map_error("select templates", err))?;
        match row {
            Some(row) => {
                let body: String = row.get("body");
                Ok(Some(serde_json::from_str(&body)?))
            }
            None => Ok(None),
        }
    }

    pub async fn upsert(&self, template: &Template) -> Result<(), RepositoryError> {
        let body = serde_json::to_string(template)?;
        sqlx::query(
            "INSERT INTO templates (id, name, body, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET
                name = excluded.name, body = excluded.body, updated_at = excluded.updated_at",
        )
        .bind(template.id.to_string())
        .bind(&template.name)
        .bind(body)
        .bind(template.created_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| Self::map_error("upsert templates", err))?;
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM templates WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|err| Self::map_error("delete templates", err))?;
        Ok(result.rows_affected() > 0)
    }

    /// The template a channel uses: its configured one, else a default
    pub async fn for_channel(&self, template_id: Option<Uuid>) -> Result<Template, RepositoryError> {
        if let Some(id) = template_id {
            if let Some(template) = self.get(id).await? {
                return Ok(template);
            }
        }
        Ok(Template::named("default"))
    }
}
