//! Signed-cookie sessions. The cookie carries only the bound user id.

use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use sha2::{Digest, Sha512};

pub const SESSION_COOKIE: &str = "moodlens_session";

/// Derive the cookie signing key from a secret, or generate a random one.
///
/// A generated key invalidates every session when the process restarts.
pub fn session_key(secret: Option<&str>) -> Key {
    match secret {
        Some(secret) => Key::from(Sha512::digest(secret.as_bytes()).as_slice()),
        None => {
            tracing::warn!("MOODLENS_SECRET_KEY not set; sessions will not survive a restart");
            Key::generate()
        }
    }
}

/// User id bound to this session, if the cookie is present and its signature verifies.
pub fn bound_user_id(jar: &SignedCookieJar) -> Option<i64> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| cookie.value().parse().ok())
}

pub fn bind(jar: SignedCookieJar, user_id: i64) -> SignedCookieJar {
    jar.add(
        Cookie::build((SESSION_COOKIE, user_id.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    )
}

pub fn unbind(jar: SignedCookieJar) -> SignedCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
