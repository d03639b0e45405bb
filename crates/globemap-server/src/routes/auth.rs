use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::csrf::generate_csrf_token;
use crate::auth::password;
use crate::auth::session::{build_csrf_cookie, end_session, start_session};
use crate::db::{users, StoreError};
use crate::error::{AppError, AppResult};
use crate::extract::JsonBody;
use crate::models::{AuthUser, UserPublic};
use crate::routes::AppState;

pub const MIN_PASSWORD_LEN: usize = 6;
const MAX_EMAIL_LEN: usize = 254;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: UserPublic,
    pub csrf_token: String,
}

pub(crate) fn normalize_email(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_lowercase();
    let valid = email.len() <= MAX_EMAIL_LEN
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    Ok(email)
}

pub(crate) fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// bcrypt is CPU bound; keep it off the async workers.
pub(crate) async fn hash_off_thread(password: String, cost: u32) -> AppResult<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {e}")))?
}

async fn verify_off_thread(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || password::verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Verification task failed: {e}")))?
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(body): JsonBody<Credentials>,
) -> AppResult<impl IntoResponse> {
    let email = normalize_email(&body.email)?;
    validate_password(&body.password)?;

    let password_hash = hash_off_thread(body.password, state.config.bcrypt_cost).await?;

    let user = {
        let conn = state.db.get()?;
        users::create_user(&conn, &email, &password_hash)?
    };

    let (jar, csrf_token) = start_session(
        jar,
        &state.tokens,
        user.id,
        &user.email,
        state.config.secure_cookies,
    )?;
    tracing::info!(user_id = user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            message: "Registration successful",
            user: user.into(),
            csrf_token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(body): JsonBody<Credentials>,
) -> AppResult<impl IntoResponse> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let email = body.email.trim().to_lowercase();
    let user = {
        let conn = state.db.get()?;
        users::find_by_email(&conn, &email)?
    }
    .ok_or_else(invalid)?;

    if !verify_off_thread(body.password, user.password_hash.clone()).await? {
        tracing::info!(user_id = user.id, "Rejected login with wrong password");
        return Err(invalid());
    }

    let (jar, csrf_token) = start_session(
        jar,
        &state.tokens,
        user.id,
        &user.email,
        state.config.secure_cookies,
    )?;
    tracing::info!(user_id = user.id, "User logged in");

    Ok((
        jar,
        Json(AuthResponse {
            message: "Login successful",
            user: user.into(),
            csrf_token,
        }),
    ))
}

pub async fn logout(Extension(user): Extension<AuthUser>, jar: CookieJar) -> impl IntoResponse {
    tracing::info!(user_id = user.user_id, "User logged out");
    (end_session(jar), Json(json!({ "message": "Logged out successfully" })))
}

/// Reissue the session for another full lifetime. The account must still
/// exist; a token for a deleted user cannot be extended.
pub async fn refresh(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    jar: CookieJar,
) -> AppResult<impl IntoResponse> {
    let user = {
        let conn = state.db.get()?;
        users::get_user(&conn, auth.user_id)
    }
    .map_err(|e| match e {
        StoreError::NotFound(_) => AppError::unauthorized(),
        other => other.into(),
    })?;

    let (jar, csrf_token) = start_session(
        jar,
        &state.tokens,
        user.id,
        &user.email,
        state.config.secure_cookies,
    )?;

    Ok((
        jar,
        Json(json!({
            "message": "Token refreshed",
            "csrf_token": csrf_token,
        })),
    ))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<UserPublic>> {
    let conn = state.db.get()?;
    let user = users::get_user(&conn, auth.user_id)?;
    Ok(Json(user.into()))
}

pub async fn csrf_token(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    jar: CookieJar,
) -> impl IntoResponse {
    let token = generate_csrf_token();
    let jar = jar.add(build_csrf_cookie(token.clone(), state.config.secure_cookies));
    (jar, Json(json!({ "csrf_token": token })))
}
