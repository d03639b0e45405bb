use crate::error::{AppError, AppResult};

/// bcrypt only looks at the first 72 bytes of its input.
pub const MAX_PASSWORD_BYTES: usize = 72;

fn truncated(password: &str) -> &[u8] {
    let bytes = password.as_bytes();
    &bytes[..bytes.len().min(MAX_PASSWORD_BYTES)]
}

pub fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    bcrypt::hash(truncated(password), cost)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    bcrypt::verify(truncated(password), hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {e}")))
}
