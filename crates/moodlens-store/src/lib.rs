//! moodlens-store — SQLite persistence for users and emotion analysis results.
//!
//! All access goes through a single `tokio-rusqlite` connection thread, so
//! each call is one serialized unit of work against the database.

use chrono::{DateTime, SecondsFormat, Utc};
use std::path::Path;
use thiserror::Error;
use tokio_rusqlite::Connection;

pub mod results;
pub mod schema;
pub mod time_ago;
pub mod users;

pub use results::AnalysisRecord;
pub use time_ago::time_ago;
pub use users::User;

/// Avatar assigned to new users when none is configured.
pub const DEFAULT_AVATAR_URL: &str = "https://www.gravatar.com/avatar/?d=identicon&s=128";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] tokio_rusqlite::Error),
    #[error("unknown user id: {0}")]
    UnknownUser(i64),
    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: i64, reason: String },
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle to the MoodLens database. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    conn: Connection,
    default_avatar_url: String,
}

impl Store {
    /// Open (or create) the database file at `path`.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).await?;
        tracing::info!(path = %path.display(), "opened database");
        Self::from_connection(conn).await
    }

    /// Open a private in-memory database.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().await?;
        Self::from_connection(conn).await
    }

    async fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.call(|c| {
            c.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        })
        .await?;

        Ok(Self {
            conn,
            default_avatar_url: DEFAULT_AVATAR_URL.to_string(),
        })
    }

    /// Avatar URL given to users created through this handle.
    pub fn with_default_avatar(mut self, url: impl Into<String>) -> Self {
        self.default_avatar_url = url.into();
        self
    }
}

/// Fixed-width RFC 3339 (microseconds, `Z`) so text order matches time order.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(id: i64, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            id,
            reason: format!("bad timestamp {raw:?}: {e}"),
        })
}
