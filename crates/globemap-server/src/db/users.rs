use rusqlite::{Connection, OptionalExtension};

use super::{is_unique_violation, now_timestamp, StoreError, StoreResult};
use crate::models::User;

const USER_COLS: &str = "id, email, password_hash, created_at";
const DUPLICATE_EMAIL: &str = "Email already registered";

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub fn create_user(conn: &Connection, email: &str, password_hash: &str) -> StoreResult<User> {
    let created_at = now_timestamp();
    conn.execute(
        "INSERT INTO users (email, password_hash, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![email, password_hash, created_at],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            StoreError::Duplicate(DUPLICATE_EMAIL)
        } else {
            StoreError::Database(e)
        }
    })?;

    Ok(User {
        id: conn.last_insert_rowid(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        created_at,
    })
}

pub fn find_by_email(conn: &Connection, email: &str) -> StoreResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLS} FROM users WHERE email = ?1"),
            rusqlite::params![email],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

pub fn get_user(conn: &Connection, id: i64) -> StoreResult<User> {
    conn.query_row(
        &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
        rusqlite::params![id],
        row_to_user,
    )
    .optional()?
    .ok_or(StoreError::NotFound("User"))
}

pub fn update_email(conn: &Connection, id: i64, email: &str) -> StoreResult<()> {
    let affected = conn
        .execute(
            "UPDATE users SET email = ?1 WHERE id = ?2",
            rusqlite::params![email, id],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(DUPLICATE_EMAIL)
            } else {
                StoreError::Database(e)
            }
        })?;

    if affected == 0 {
        return Err(StoreError::NotFound("User"));
    }
    Ok(())
}

pub fn update_password(conn: &Connection, id: i64, password_hash: &str) -> StoreResult<()> {
    let affected = conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE id = ?2",
        rusqlite::params![password_hash, id],
    )?;

    if affected == 0 {
        return Err(StoreError::NotFound("User"));
    }
    Ok(())
}

/// Remove a user. Their donations stay on record with the owner cleared.
pub fn delete_user(conn: &mut Connection, id: i64) -> StoreResult<()> {
    let tx = conn.transaction()?;

    tx.execute(
        "UPDATE donations SET user_id = NULL WHERE user_id = ?1",
        rusqlite::params![id],
    )?;
    let affected = tx.execute("DELETE FROM users WHERE id = ?1", rusqlite::params![id])?;

    if affected == 0 {
        // Dropping the transaction rolls back the donation update.
        return Err(StoreError::NotFound("User"));
    }

    tx.commit()?;
    Ok(())
}
