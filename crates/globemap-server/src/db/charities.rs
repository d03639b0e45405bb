use rusqlite::Connection;

use super::StoreResult;
use crate::models::Charity;

fn row_to_charity(row: &rusqlite::Row) -> rusqlite::Result<Charity> {
    Ok(Charity {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        donation_url: row.get(3)?,
        crisis_id: row.get(4)?,
    })
}

/// Charities in alphabetical order, optionally limited to one crisis.
pub fn list_charities(conn: &Connection, crisis_id: Option<i64>) -> StoreResult<Vec<Charity>> {
    let charities: Result<Vec<_>, _> = match crisis_id {
        Some(crisis_id) => {
            let mut stmt = conn.prepare(
                "SELECT id, name, description, donation_url, crisis_id FROM charities WHERE crisis_id = ?1 ORDER BY name",
            )?;
            let rows = stmt.query_map(rusqlite::params![crisis_id], row_to_charity)?;
            rows.collect()
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT id, name, description, donation_url, crisis_id FROM charities ORDER BY name",
            )?;
            let rows = stmt.query_map([], row_to_charity)?;
            rows.collect()
        }
    };
    Ok(charities?)
}
