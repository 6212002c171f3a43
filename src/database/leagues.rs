//! League mappings, team/league cache rows, aliases, soccer memberships

use sqlx::{Pool, Row, Sqlite};

use crate::errors::RepositoryError;
use crate::models::{LeagueMapping, TeamAlias, TeamLeagueRow};

#[derive(Clone)]
pub struct LeagueRepository {
    pool: Pool<Sqlite>,
}

impl LeagueRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn map_error(query: &str, err: sqlx::Error) -> RepositoryError {
        RepositoryError::query_failed(query, err.to_string())
    }

    pub async fn list_mappings(&self) -> Result<Vec<LeagueMapping>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM league_provider_mappings ORDER BY league, provider")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| Self::map_error("select league_provider_mappings", err))?;

        Ok(rows
            .iter()
            .map(|row| {
                let keywords: String = row.get("single_event_keywords");
                LeagueMapping {
                    league: row.get("league"),
                    provider: row.get("provider"),
                    provider_league_id: row.get("provider_league_id"),
                    provider_league_name: row.get("provider_league_name"),
                    sport: row.get("sport"),
                    display_name: row.get("display_name"),
                    logo_url: row.get("logo_url"),
                    enabled: row.get("enabled"),
                    single_event_keywords: serde_json::from_str(&keywords).unwrap_or_default(),
                }
            })
            .collect())
    }

    pub async fn upsert_mapping(&self, mapping: &LeagueMapping) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO league_provider_mappings
                (league, provider, provider_league_id, provider_league_name,
                 sport, display_name, logo_url, enabled, single_event_keywords)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (league, provider) DO UPDATE SET
                provider_league_id = excluded.provider_league_id,
                provider_league_name = excluded.provider_league_name,
                sport = excluded.sport,
                display_name = excluded.display_name,
                logo_url = excluded.logo_url,
                enabled = excluded.enabled,
                single_event_keywords = excluded.single_event_keywords
            "#,
        )
        .bind(mapping.league.to_lowercase())
        .bind(&mapping.provider)
        .bind(&mapping.provider_league_id)
        .bind(&mapping.provider_league_name)
        .bind(&mapping.sport)
        .bind(&mapping.display_name)
        .bind(&mapping.logo_url)
        .bind(mapping.enabled)
        .bind(serde_json::to_string(&mapping.single_event_keywords)?)
        .execute(&self.pool)
        .await
        .map_err(|err| Self::map_error("upsert league_provider_mappings", err))?;
        Ok(())
    }

    /// Replace the whole team/league cache table with a fresh refresh
    pub async fn replace_team_cache(
        &self,
        rows: &[TeamLeagueRow],
    ) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| Self::map_error("begin", err))?;

        sqlx::query("DELETE FROM team_league_cache")
            .execute(&mut *tx)
            .await
            .map_err(|err| Self::map_error("delete team_league_cache", err))?;

        for row in rows {
            sqlx::query(
                "INSERT OR REPLACE INTO team_league_cache
                    (league, team_id, team_name, team_abbrev, team_short_name, sport)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&row.league)
            .bind(&row.team_id)
            .bind(&row.team_name)
            .bind(&row.team_abbrev)
            .bind(&row.team_short_name)
            .bind(&row.sport)
            .execute(&mut *tx)
            .await
            .map_err(|err| Self::map_error("insert team_league_cache", err))?;
        }

        tx.commit()
            .await
            .map_err(|err| Self::map_error("commit", err))?;
        Ok(())
    }

    pub async fn load_team_cache(&self) -> Result<Vec<TeamLeagueRow>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM team_league_cache")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| Self::map_error("select team_league_cache", err))?;
        Ok(rows
            .iter()
            .map(|row| TeamLeagueRow {
                league: row.get("league"),
                team_id: row.get("team_id"),
                team_name: row.get("team_name"),
                team_abbrev: row.get("team_abbrev"),
                team_short_name: row.get("team_short_name"),
                sport: row.get("sport"),
            })
            .collect())
    }

    pub async fn load_soccer_memberships(&self) -> Result<Vec<(String, String)>, RepositoryError> {
        let rows = sqlx::query("SELECT team_id, league FROM soccer_team_leagues")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| Self::map_error("select soccer_team_leagues", err))?;
        Ok(rows
            .iter()
            .map(|row| (row.get("team_id"), row.get("league")))
            .collect())
    }

    pub async fn add_soccer_membership(
        &self,
        team_id: &str,
        league: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query("INSERT OR IGNORE INTO soccer_team_leagues (team_id, league) VALUES (?, ?)")
            .bind(team_id)
            .bind(league.to_lowercase())
            .execute(&self.pool)
            .await
            .map_err(|err| Self::map_error("insert soccer_team_leagues", err))?;
        Ok(())
    }

    pub async fn list_aliases(&self) -> Result<Vec<TeamAlias>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM team_aliases")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| Self::map_error("select team_aliases", err))?;
        Ok(rows
            .iter()
            .map(|row| TeamAlias {
                alias: row.get("alias"),
                league: row.get("league"),
                team_id: row.get("team_id"),
                team_name: row.get("team_name"),
            })
            .collect())
    }

    pub async fn upsert_alias(&self, alias: &TeamAlias) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO team_aliases (alias, league, team_id, team_name) VALUES (?, ?, ?, ?)
             ON CONFLICT (alias, league) DO UPDATE SET
                team_id = excluded.team_id, team_name = excluded.team_name",
        )
        .bind(alias.alias.to_lowercase())
        .bind(alias.league.to_lowercase())
        .bind(&alias.team_id)
        .bind(&alias.team_name)
        .execute(&self.pool)
        .await
        .map_err(|err| Self::map_error("upsert team_aliases", err))?;
        Ok(())
    }
}

/// Built-in league mappings seeded on first run
pub fn default_mappings() -> Vec<LeagueMapping> {
    let espn = |league: &str, id: &str, sport: &str, name: &str| LeagueMapping {
        league: league.to_string(),
        provider: "espn".to_string(),
        provider_league_id: Some(id.to_string()),
        provider_league_name: Some(name.to_string()),
        sport: sport.to_string(),
        display_name: Some(name.to_string()),
        logo_url: None,
        enabled: true,
        single_event_keywords: Vec::new(),
    };
    vec![
        espn("nfl", "nfl", "football", "NFL"),
        espn("nba", "nba", "basketball", "NBA"),
        espn("wnba", "wnba", "basketball", "WNBA"),
        espn("nhl", "nhl", "hockey", "NHL"),
        espn("mlb", "mlb", "baseball", "MLB"),
        espn("college-football", "college-football", "football", "NCAA Football"),
        espn(
            "mens-college-basketball",
            "mens-college-basketball",
            "basketball",
            "NCAA Men's Basketball",
        ),
        espn(
            "womens-college-basketball",
            "womens-college-basketball",
            "basketball",
            "NCAA Women's Basketball",
        ),
        espn("usa.1", "usa.1", "soccer", "MLS"),
        espn("eng.1", "eng.1", "soccer", "English Premier League"),
        espn("esp.1", "esp.1", "soccer", "Spanish LaLiga"),
        espn("ger.1", "ger.1", "soccer", "German Bundesliga"),
        espn("ita.1", "ita.1", "soccer", "Italian Serie A"),
        espn("fra.1", "fra.1", "soccer", "French Ligue 1"),
        espn("aus.1", "aus.1", "soccer", "Australian A-League Men"),
        espn("uefa.champions", "uefa.champions", "soccer", "UEFA Champions League"),
        LeagueMapping {
            single_event_keywords: vec!["ufc".to_string(), "fight night".to_string()],
            ..espn("ufc", "ufc", "mma", "UFC")
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    #[tokio::test]
    async fn mapping_upsert_is_unique_per_league_provider() {
        let db = Database::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let repo = LeagueRepository::new(db.pool().clone());

        for mapping in default_mappings() {
            repo.upsert_mapping(&mapping).await.unwrap();
        }
        let first = repo.list_mappings().await.unwrap().len();

        // Upserting again must not duplicate
        for mapping in default_mappings() {
            repo.upsert_mapping(&mapping).await.unwrap();
        }
        assert_eq!(repo.list_mappings().await.unwrap().len(), first);
    }

    #[tokio::test]
    async fn single_event_keywords_round_trip() {
        let db = Database::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let repo = LeagueRepository::new(db.pool().clone());

        for mapping in default_mappings() {
            repo.upsert_mapping(&mapping).await.unwrap();
        }
        let mappings = repo.list_mappings().await.unwrap();
        let ufc = mappings
            .iter()
            .find(|mapping| mapping.league == "ufc")
            .unwrap();
        assert_eq!(
            ufc.single_event_keywords,
            vec!["ufc".to_string(), "fight night".to_string()]
        );
        let nfl = mappings
            .iter()
            .find(|mapping| mapping.league == "nfl")
            .unwrap();
        assert!(nfl.single_event_keywords.is_empty());
    }

    #[tokio::test]
    async fn team_cache_replace_is_wholesale() {
        let db = Database::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let repo = LeagueRepository::new(db.pool().clone());

        let row = |id: &str, name: &str| TeamLeagueRow {
            league: "nfl".to_string(),
            team_id: id.to_string(),
            team_name: name.to_string(),
            team_abbrev: None,
            team_short_name: None,
            sport: "football".to_string(),
        };

        repo.replace_team_cache(&[row("8", "Detroit Lions"), row("3", "Chicago Bears")])
            .await
            .unwrap();
        assert_eq!(repo.load_team_cache().await.unwrap().len(), 2);

        repo.replace_team_cache(&[row("8", "Detroit Lions")]).await.unwrap();
        assert_eq!(repo.load_team_cache().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn soccer_memberships_and_aliases() {
        let db = Database::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let repo = LeagueRepository::new(db.pool().clone());

        repo.add_soccer_membership("86", "esp.1").await.unwrap();
        repo.add_soccer_membership("86", "uefa.champions").await.unwrap();
        repo.add_soccer_membership("86", "esp.1").await.unwrap();
        assert_eq!(repo.load_soccer_memberships().await.unwrap().len(), 2);

        repo.upsert_alias(&TeamAlias {
            alias: "Spurs".to_string(),
            league: "eng.1".to_string(),
            team_id: "367".to_string(),
            team_name: "Tottenham Hotspur".to_string(),
        })
        .await
        .unwrap();
        let aliases = repo.list_aliases().await.unwrap();
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases[0].alias, "spurs");
    }
}
