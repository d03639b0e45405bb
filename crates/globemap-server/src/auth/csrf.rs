//! Double-submit cookie CSRF protection.
//!
//! The token lives in a JS-readable `csrf_token` cookie and must be echoed in
//! the `X-CSRF-Token` header on state-changing requests. A cross-site page can
//! neither read nor set the cookie, so it cannot produce a matching header.
//! The token is not bound to the session token: anyone able to write cookies
//! for this origin (e.g. a compromised sibling subdomain) can forge a pair.

use rand::RngCore;

use crate::error::{AppError, AppResult};

pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

const CSRF_TOKEN_BYTES: usize = 32;

/// 32 bytes from the OS RNG, hex encoded.
pub fn generate_csrf_token() -> String {
    let mut bytes = [0u8; CSRF_TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Compare without short-circuiting on the first differing byte.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

pub fn verify_csrf(cookie: Option<&str>, header: Option<&str>) -> AppResult<()> {
    let header = header
        .filter(|h| !h.is_empty())
        .ok_or_else(|| AppError::Forbidden("CSRF token missing from header".to_string()))?;
    let cookie = cookie
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Forbidden("CSRF token missing from cookie".to_string()))?;

    if !constant_time_eq(header.as_bytes(), cookie.as_bytes()) {
        return Err(AppError::Forbidden("Invalid CSRF token".to_string()));
    }
    Ok(())
}
