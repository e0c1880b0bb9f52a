//! User records.

use crate::{format_timestamp, parse_timestamp, Store, StoreError};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

/// A dashboard identity. Users are created on demand and never deleted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Raw column values; timestamps are parsed outside the connection thread.
struct UserRow {
    id: i64,
    username: String,
    email: String,
    avatar_url: Option<String>,
    created_at: String,
}

impl UserRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            avatar_url: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn into_user(self) -> Result<User, StoreError> {
        let created_at = parse_timestamp(self.id, &self.created_at)?;
        Ok(User {
            id: self.id,
            username: self.username,
            email: self.email,
            avatar_url: self.avatar_url,
            created_at,
        })
    }
}

const SELECT_USER: &str = "SELECT id, username, email, avatar_url, created_at FROM users";

impl Store {
    pub async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        let row = self
            .conn
            .call(move |c| {
                let row = c
                    .query_row(
                        &format!("{SELECT_USER} WHERE id = ?1"),
                        params![id],
                        UserRow::from_row,
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;
        row.map(UserRow::into_user).transpose()
    }

    pub async fn find_user_by_name(&self, username: &str) -> Result<Option<User>, StoreError> {
        let username = username.to_string();
        let row = self
            .conn
            .call(move |c| {
                let row = c
                    .query_row(
                        &format!("{SELECT_USER} WHERE username = ?1"),
                        params![username],
                        UserRow::from_row,
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;
        row.map(UserRow::into_user).transpose()
    }

    /// Look up a user by name, creating it (email `<name>@example.com`,
    /// default avatar) if absent.
    pub async fn get_or_create_user(&self, username: &str) -> Result<User, StoreError> {
        let username = username.to_string();
        let email = format!("{username}@example.com");
        let avatar_url = self.default_avatar_url.clone();
        let now = format_timestamp(Utc::now());

        let (row, created) = self
            .conn
            .call(move |c| {
                let created = c.execute(
                    "INSERT OR IGNORE INTO users (username, email, avatar_url, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![username, email, avatar_url, now],
                )? > 0;
                let row = c.query_row(
                    &format!("{SELECT_USER} WHERE username = ?1"),
                    params![username],
                    UserRow::from_row,
                )?;
                Ok((row, created))
            })
            .await?;

        let user = row.into_user()?;
        if created {
            tracing::info!(id = user.id, username = %user.username, "user created");
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use crate::Store;

    #[tokio::test]
    async fn test_get_or_create_user() {
        let store = Store::open_in_memory().await.unwrap();
        store.provision("demo").await.unwrap();

        let alice = store.get_or_create_user("alice").await.unwrap();
        assert_eq!(alice.username, "alice");
        assert_eq!(alice.email, "alice@example.com");
        assert_eq!(alice.avatar_url.as_deref(), Some(crate::DEFAULT_AVATAR_URL));

        let again = store.get_or_create_user("alice").await.unwrap();
        assert_eq!(alice, again);
    }

    #[tokio::test]
    async fn test_find_user() {
        let store = Store::open_in_memory().await.unwrap();
        let demo = store.provision("demo").await.unwrap();

        assert_eq!(store.find_user(demo.id).await.unwrap(), Some(demo.clone()));
        assert_eq!(store.find_user_by_name("demo").await.unwrap(), Some(demo));
        assert_eq!(store.find_user(9999).await.unwrap(), None);
        assert_eq!(store.find_user_by_name("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_custom_default_avatar() {
        let store = Store::open_in_memory()
            .await
            .unwrap()
            .with_default_avatar("/static/me.png");
        let user = store.provision("demo").await.unwrap();
        assert_eq!(user.avatar_url.as_deref(), Some("/static/me.png"));
    }
}
