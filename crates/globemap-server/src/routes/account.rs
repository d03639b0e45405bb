use axum::{extract::State, response::IntoResponse, Extension, Json};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::json;

use crate::auth::session::{end_session, start_session};
use crate::db::{donations, users};
use crate::error::AppResult;
use crate::extract::JsonBody;
use crate::models::{AuthUser, DonationHistoryItem, DonationSummary, UserPublic};
use crate::routes::auth::{hash_off_thread, normalize_email, validate_password};
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct ChangeEmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub password: String,
}

pub async fn donations(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<DonationHistoryItem>>> {
    let conn = state.db.get()?;
    Ok(Json(donations::user_donations(&conn, user.user_id)?))
}

pub async fn donation_summary(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<DonationSummary>> {
    let conn = state.db.get()?;
    Ok(Json(donations::donation_summary(&conn, user.user_id)?))
}

/// The session token carries the email, so a change reissues both cookies.
pub async fn change_email(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    jar: CookieJar,
    JsonBody(body): JsonBody<ChangeEmailRequest>,
) -> AppResult<impl IntoResponse> {
    let email = normalize_email(&body.email)?;

    let user = {
        let conn = state.db.get()?;
        users::update_email(&conn, auth.user_id, &email)?;
        users::get_user(&conn, auth.user_id)?
    };

    let (jar, csrf_token) = start_session(
        jar,
        &state.tokens,
        user.id,
        &user.email,
        state.config.secure_cookies,
    )?;
    tracing::info!(user_id = user.id, "Email updated");

    Ok((
        jar,
        Json(json!({
            "message": "Email updated successfully",
            "user": UserPublic::from(user),
            "csrf_token": csrf_token,
        })),
    ))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(body): JsonBody<ChangePasswordRequest>,
) -> AppResult<impl IntoResponse> {
    validate_password(&body.password)?;

    let password_hash = hash_off_thread(body.password, state.config.bcrypt_cost).await?;

    let conn = state.db.get()?;
    users::update_password(&conn, auth.user_id, &password_hash)?;
    tracing::info!(user_id = auth.user_id, "Password updated");

    Ok(Json(json!({ "message": "Password updated successfully" })))
}

pub async fn delete_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    jar: CookieJar,
) -> AppResult<impl IntoResponse> {
    {
        let mut conn = state.db.get()?;
        users::delete_user(&mut conn, auth.user_id)?;
    }
    tracing::info!(user_id = auth.user_id, "Account deleted");

    Ok((
        end_session(jar),
        Json(json!({ "message": "Account deleted successfully" })),
    ))
}
