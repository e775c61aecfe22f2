//! SQLite key-value backend.
//!
//! One table, `kv(key, value)`, created on connect. Good for:
//! - The CLI, where the session must survive between invocations
//! - Tests that want real SQL round-trips (`in_memory`)

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::debug;

use crate::error::{Result, SessionError};
use crate::kernel::BaseKeyValueStore;

pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    /// Connect to the database at `database_url`, creating the file if needed.
    ///
    /// # Example URLs
    /// - `sqlite://storefront-session.db?mode=rwc` - file-based
    /// - `sqlite::memory:` - ephemeral
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(SessionError::persistence)?
            .create_if_missing(true);

        // An in-memory database exists per connection, so keep a single one
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(SessionError::persistence)?;

        let store = Self { pool };
        store.run_migrations().await?;
        debug!(database_url, "Session database ready");
        Ok(store)
    }

    pub async fn in_memory() -> Result<Self> {
        Self::new("sqlite::memory:").await
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(SessionError::persistence)?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl BaseKeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT value FROM kv WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(SessionError::persistence)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(SessionError::persistence)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(SessionError::persistence)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_and_delete() {
        let store = SqliteKeyValueStore::in_memory().await.unwrap();

        assert_eq!(store.get("authToken").await.unwrap(), None);
        store.set("authToken", "first").await.unwrap();
        store.set("authToken", "second").await.unwrap();
        assert_eq!(
            store.get("authToken").await.unwrap().as_deref(),
            Some("second")
        );

        store.remove("authToken").await.unwrap();
        store.remove("authToken").await.unwrap();
        assert_eq!(store.get("authToken").await.unwrap(), None);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let store = SqliteKeyValueStore::in_memory().await.unwrap();
        store.set("user", "{}").await.unwrap();
        store.set("userData", "{\"a\":1}").await.unwrap();
        store.remove("user").await.unwrap();

        assert_eq!(store.get("user").await.unwrap(), None);
        assert_eq!(
            store.get("userData").await.unwrap().as_deref(),
            Some("{\"a\":1}")
        );
    }
}
