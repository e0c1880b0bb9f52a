//! HTTP API handlers for moodlensd

pub mod auth;
pub mod error;
pub mod health;
pub mod history;
pub mod predict;
pub mod ui;
pub mod user;

pub use auth::auth;
pub use error::ApiError;
pub use health::health_routes;
pub use history::get_history;
pub use predict::predict;
pub use ui::{serve_app_js, serve_index};
pub use user::get_user;

use axum_extra::extract::cookie::SignedCookieJar;
use moodlens_store::User;

use crate::identity::IdentityError;
use crate::{session, AppState};

/// Resolve the session's user, binding the session if it pointed nowhere.
pub(crate) async fn current_user(
    state: &AppState,
    jar: SignedCookieJar,
) -> Result<(User, SignedCookieJar), IdentityError> {
    let bound = session::bound_user_id(&jar);
    let user = state.identity.resolve(bound).await?;
    let jar = if bound == Some(user.id) {
        jar
    } else {
        session::bind(jar, user.id)
    };
    Ok((user, jar))
}

/// Round to two decimal places for display.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
