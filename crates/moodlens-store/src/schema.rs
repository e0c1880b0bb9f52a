//! Schema provisioning.

use crate::users::User;
use crate::{Store, StoreError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT NOT NULL UNIQUE,
    email       TEXT NOT NULL UNIQUE,
    avatar_url  TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS analysis_results (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id            INTEGER NOT NULL REFERENCES users(id),
    dominant_emotion   TEXT NOT NULL,
    confidence         REAL NOT NULL,
    full_results_json  TEXT NOT NULL,
    timestamp          TEXT NOT NULL,
    image_thumbnail    TEXT
);

CREATE INDEX IF NOT EXISTS idx_analysis_results_user_ts
    ON analysis_results (user_id, timestamp DESC);
";

impl Store {
    /// Create tables if absent and seed the default user. Idempotent; run
    /// once at startup before serving requests.
    pub async fn provision(&self, default_username: &str) -> Result<User, StoreError> {
        self.conn
            .call(|c| {
                c.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;
        tracing::info!("database schema ready");

        let user = self.get_or_create_user(default_username).await?;
        tracing::info!(id = user.id, username = %user.username, "default user ready");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_provision_is_idempotent() {
        let store = Store::open_in_memory().await.unwrap();
        let first = store.provision("demo").await.unwrap();
        let second = store.provision("demo").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.username, "demo");
        assert_eq!(first.email, "demo@example.com");
    }

    #[tokio::test]
    async fn test_provision_enforces_foreign_keys() {
        let store = Store::open_in_memory().await.unwrap();
        store.provision("demo").await.unwrap();
        let result = store
            .conn
            .call(|c| {
                c.execute(
                    "INSERT INTO analysis_results
                        (user_id, dominant_emotion, confidence, full_results_json, timestamp)
                     VALUES (4242, 'Happy', 90.0, '{}', '2024-01-01T00:00:00.000000Z')",
                    [],
                )?;
                Ok(())
            })
            .await;
        assert!(result.is_err());
    }
}
