use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::AuthUser;

pub const SESSION_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub exp: i64,
}

/// Signs and checks HS256 session tokens. Tokens are never stored; they
/// stop working when they expire or when the secret changes.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn issue(&self, user_id: i64, email: &str) -> AppResult<String> {
        self.issue_with_ttl(user_id, email, Duration::days(SESSION_TTL_DAYS))
    }

    pub fn issue_with_ttl(&self, user_id: i64, email: &str, ttl: Duration) -> AppResult<String> {
        let claims = Claims {
            user_id,
            email: email.to_string(),
            exp: (Utc::now() + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Token signing failed: {e}")))
    }

    pub fn verify(&self, token: &str) -> AppResult<AuthUser> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!("Rejected session token: {e}");
            AppError::Unauthorized("Could not validate credentials".to_string())
        })?;

        Ok(AuthUser {
            user_id: data.claims.user_id,
            email: data.claims.email,
        })
    }
}
