// Repository pattern - isolates all preference-document side effects
use async_trait::async_trait;
use rusqlite::params;
use std::sync::Arc;

use crate::db::models::UserPreference;
use crate::db::RepositoryError;
use crate::state::DbPool;

/// All persistence operations on the per-user preference document.
#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    /// Load one user's preference document.
    async fn load(&self, user_id: &str) -> Result<Option<UserPreference>, RepositoryError>;

    /// Save a preference document (idempotent upsert).
    async fn save(&self, prefs: &UserPreference) -> Result<(), RepositoryError>;

    /// All preference documents with at least one notify-by-email saved
    /// search. Rows whose JSON does not parse are skipped, not fatal.
    async fn find_notify_enabled(&self) -> Result<Vec<UserPreference>, RepositoryError>;
}

/// SQLite implementation storing the whole document as one JSON column.
pub struct SqlitePreferenceRepository {
    pool: DbPool,
}

impl SqlitePreferenceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreferenceRepository for SqlitePreferenceRepository {
    async fn load(&self, user_id: &str) -> Result<Option<UserPreference>, RepositoryError> {
        let conn = self.pool.get()?;

        let result: Result<String, rusqlite::Error> = conn.query_row(
            "SELECT preference_json FROM user_preferences WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        );

        match result {
            Ok(json) => {
                let prefs: UserPreference = serde_json::from_str(&json)?;
                Ok(Some(prefs))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, prefs: &UserPreference) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;

        let preference_json = serde_json::to_string(prefs)?;

        conn.execute(
            "INSERT INTO user_preferences (user_id, preference_json, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(user_id) DO UPDATE SET
               preference_json = excluded.preference_json,
               updated_at = excluded.updated_at",
            params![prefs.user_id, preference_json],
        )?;

        Ok(())
    }

    async fn find_notify_enabled(&self) -> Result<Vec<UserPreference>, RepositoryError> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare("SELECT user_id, preference_json FROM user_preferences")?;
        let rows: Vec<(String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut results = Vec::new();
        for (user_id, json) in rows {
            // A malformed document must not abort the batch
            let prefs: UserPreference = match serde_json::from_str(&json) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!("Skipping malformed preference document for {}: {}", user_id, e);
                    continue;
                }
            };
            if prefs.notify_enabled_searches().next().is_some() {
                results.push(prefs);
            }
        }

        Ok(results)
    }
}

/// Type alias for Arc-wrapped repository (for handlers and services)
pub type DynPreferenceRepository = Arc<dyn PreferenceRepository>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::models::SavedSearch;
    use tempfile::TempDir;

    fn create_test_repo() -> (SqlitePreferenceRepository, DbPool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let pool = db::create_pool(&db_path).unwrap();
        db::run_migrations(&pool).unwrap();

        (SqlitePreferenceRepository::new(pool.clone()), pool, temp_dir)
    }

    fn seed_user(pool: &DbPool, id: &str) {
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO users (id, name, email) VALUES (?1, ?1, ?1 || '@example.com')",
            params![id],
        )
        .unwrap();
    }

    fn notify_search(location: &str) -> SavedSearch {
        SavedSearch {
            location: location.to_string(),
            property_type: "all".to_string(),
            status: "all".to_string(),
            min_price: None,
            max_price: None,
            min_bedrooms: None,
            notify_by_email: true,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn save_and_load_round_trips() {
        let (repo, pool, _tmp) = create_test_repo();
        seed_user(&pool, "u1");

        let mut prefs = UserPreference::new("u1");
        prefs.add_saved_search(notify_search("Mumbai")).unwrap();
        repo.save(&prefs).await.unwrap();

        let loaded = repo.load("u1").await.unwrap().unwrap();
        assert_eq!(loaded.saved_searches.len(), 1);
        assert_eq!(loaded.saved_searches[0].location, "Mumbai");
    }

    #[tokio::test]
    async fn load_missing_user_is_none() {
        let (repo, _pool, _tmp) = create_test_repo();
        assert!(repo.load("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_is_an_upsert() {
        let (repo, pool, _tmp) = create_test_repo();
        seed_user(&pool, "u1");

        let mut prefs = UserPreference::new("u1");
        repo.save(&prefs).await.unwrap();

        prefs.push_notification("hello".into(), "t1".into());
        repo.save(&prefs).await.unwrap();

        let loaded = repo.load("u1").await.unwrap().unwrap();
        assert_eq!(loaded.notifications.len(), 1);

        let conn = pool.get().unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM user_preferences", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn find_notify_enabled_filters_and_skips_malformed() {
        let (repo, pool, _tmp) = create_test_repo();
        seed_user(&pool, "subscribed");
        seed_user(&pool, "quiet");
        seed_user(&pool, "broken");

        let mut subscribed = UserPreference::new("subscribed");
        subscribed.add_saved_search(notify_search("Pune")).unwrap();
        repo.save(&subscribed).await.unwrap();

        let mut quiet = UserPreference::new("quiet");
        let mut s = notify_search("Pune");
        s.notify_by_email = false;
        quiet.add_saved_search(s).unwrap();
        repo.save(&quiet).await.unwrap();

        // Write garbage directly for the third user
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO user_preferences (user_id, preference_json) VALUES ('broken', 'not json')",
            [],
        )
        .unwrap();
        drop(conn);

        let found = repo.find_notify_enabled().await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].user_id, "subscribed");
    }
}
