//! Placeholder identity: sessions resolve to users without any credential check.
//!
//! Everything identity-related goes through [`IdentityResolver`] so a real
//! authentication backend can replace [`DemoIdentity`] without touching the
//! prediction pipeline.

use async_trait::async_trait;
use moodlens_store::{Store, StoreError, User};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("identity lookup failed: {0}")]
    Store(#[from] StoreError),
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve the user bound to a session. `None` (or a stale id) yields
    /// the default identity, which the caller should then bind.
    async fn resolve(&self, bound_user_id: Option<i64>) -> Result<User, IdentityError>;

    /// Find or create the named user. A missing or blank name means the
    /// default identity.
    async fn login(&self, username: Option<&str>) -> Result<User, IdentityError>;
}

/// Auto-provisions a well-known default user; any username logs in.
pub struct DemoIdentity {
    store: Store,
    default_username: String,
}

impl DemoIdentity {
    pub fn new(store: Store, default_username: impl Into<String>) -> Self {
        Self {
            store,
            default_username: default_username.into(),
        }
    }
}

#[async_trait]
impl IdentityResolver for DemoIdentity {
    async fn resolve(&self, bound_user_id: Option<i64>) -> Result<User, IdentityError> {
        if let Some(id) = bound_user_id {
            if let Some(user) = self.store.find_user(id).await? {
                return Ok(user);
            }
            tracing::warn!(user_id = id, "session bound to unknown user; using default identity");
        }
        Ok(self.store.get_or_create_user(&self.default_username).await?)
    }

    async fn login(&self, username: Option<&str>) -> Result<User, IdentityError> {
        let username = username
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.default_username);
        let user = self.store.get_or_create_user(username).await?;
        tracing::info!(user_id = user.id, username = %user.username, "login");
        Ok(user)
    }
}
