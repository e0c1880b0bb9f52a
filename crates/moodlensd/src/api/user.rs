//! GET /api/user

use axum::extract::State;
use axum::Json;
use axum_extra::extract::cookie::SignedCookieJar;
use serde_json::{json, Value};

use super::{current_user, ApiError};
use crate::AppState;

pub async fn get_user(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<(SignedCookieJar, Json<Value>), ApiError> {
    let (user, jar) = current_user(&state, jar).await?;
    Ok((
        jar,
        Json(json!({
            "status": "success",
            "user": {
                "id": user.id,
                "username": user.username,
                "email": user.email,
                "avatar_url": user.avatar_url,
            },
        })),
    ))
}
