//! Dashboard page and its script

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::cookie::SignedCookieJar;
use moodlens_store::DEFAULT_AVATAR_URL;

use super::{current_user, ApiError};
use crate::AppState;

const INDEX_HTML: &str = include_str!("../../ui/index.html");
const APP_JS: &str = include_str!("../../ui/app.js");

/// GET /
///
/// Dashboard for the session's user.
pub async fn serve_index(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<(SignedCookieJar, Html<String>), ApiError> {
    let (user, jar) = current_user(&state, jar).await?;
    let avatar = user.avatar_url.as_deref().unwrap_or(DEFAULT_AVATAR_URL);
    Ok((jar, Html(render_index(&user.username, avatar))))
}

/// GET /static/app.js
pub async fn serve_app_js() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/javascript")],
        APP_JS,
    )
        .into_response()
}

fn render_index(username: &str, avatar_url: &str) -> String {
    INDEX_HTML
        .replace("{{username}}", &escape_html(username))
        .replace("{{avatar_url}}", &escape_html(avatar_url))
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
