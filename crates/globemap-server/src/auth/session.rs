use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::auth::csrf::{generate_csrf_token, CSRF_COOKIE};
use crate::auth::token::{TokenService, SESSION_TTL_DAYS};
use crate::error::AppResult;

pub const AUTH_COOKIE: &str = "auth_token";

fn build_cookie(name: &'static str, value: String, http_only: bool, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .max_age(time::Duration::days(SESSION_TTL_DAYS))
        .http_only(http_only)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

pub fn build_session_cookie(token: String, secure: bool) -> Cookie<'static> {
    build_cookie(AUTH_COOKIE, token, true, secure)
}

/// Readable by page scripts so they can echo it in `X-CSRF-Token`.
pub fn build_csrf_cookie(token: String, secure: bool) -> Cookie<'static> {
    build_cookie(CSRF_COOKIE, token, false, secure)
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name)
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}

/// Issue a session token and a fresh CSRF token, setting both cookies.
/// Returns the updated jar and the CSRF token for the response body.
pub fn start_session(
    jar: CookieJar,
    tokens: &TokenService,
    user_id: i64,
    email: &str,
    secure: bool,
) -> AppResult<(CookieJar, String)> {
    let session_token = tokens.issue(user_id, email)?;
    let csrf_token = generate_csrf_token();

    let jar = jar
        .add(build_session_cookie(session_token, secure))
        .add(build_csrf_cookie(csrf_token.clone(), secure));

    Ok((jar, csrf_token))
}

pub fn end_session(jar: CookieJar) -> CookieJar {
    jar.add(removal_cookie(AUTH_COOKIE))
        .add(removal_cookie(CSRF_COOKIE))
}
