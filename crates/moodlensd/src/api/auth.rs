//! POST /api/auth: placeholder login/logout.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use axum_extra::extract::cookie::SignedCookieJar;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::ApiError;
use crate::{session, AppState};

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    pub action: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
}

/// POST /api/auth
///
/// `{"action":"login","username":..}` binds the session to that user,
/// creating it if needed. `{"action":"logout"}` clears the binding.
pub async fn auth(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    body: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<(SignedCookieJar, Json<Value>), ApiError> {
    let Ok(Json(request)) = body else {
        return Err(ApiError::UnknownAction);
    };

    match request.action.as_deref() {
        Some("login") => {
            let user = state.identity.login(request.username.as_deref()).await?;
            let jar = session::bind(jar, user.id);
            let summary = UserSummary {
                id: user.id,
                username: user.username,
                avatar_url: user.avatar_url,
            };
            Ok((
                jar,
                Json(json!({
                    "status": "success",
                    "message": "Logged in successfully",
                    "user": summary,
                })),
            ))
        }
        Some("logout") => Ok((
            session::unbind(jar),
            Json(json!({
                "status": "success",
                "message": "Logged out successfully",
            })),
        )),
        _ => Err(ApiError::UnknownAction),
    }
}
