use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::auth::csrf::{verify_csrf, CSRF_COOKIE, CSRF_HEADER};
use crate::auth::session::AUTH_COOKIE;
use crate::error::{AppError, AppResult};
use crate::models::AuthUser;
use crate::routes::AppState;

/// Session token from the httpOnly cookie, falling back to a legacy
/// `Authorization: Bearer` header.
fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(AUTH_COOKIE) {
        return Some(cookie.value().to_string());
    }
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

pub fn authenticate(state: &AppState, jar: &CookieJar, headers: &HeaderMap) -> AppResult<AuthUser> {
    let token = session_token(jar, headers).ok_or_else(AppError::unauthorized)?;
    state.tokens.verify(&token)
}

pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&state, &jar, request.headers())?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Attach the caller's identity when a valid session is present, but let
/// anonymous requests through.
pub async fn optional_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Ok(user) = authenticate(&state, &jar, request.headers()) {
        request.extensions_mut().insert(user);
    }
    next.run(request).await
}

pub async fn require_csrf(jar: CookieJar, request: Request, next: Next) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok());
    let cookie = jar.get(CSRF_COOKIE).map(|c| c.value());

    if let Err(e) = verify_csrf(cookie, header) {
        tracing::warn!("CSRF check failed for {} {}: {e}", request.method(), request.uri().path());
        return Err(e);
    }

    Ok(next.run(request).await)
}
