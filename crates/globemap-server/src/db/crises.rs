use rusqlite::{Connection, OptionalExtension};

use super::{StoreError, StoreResult};
use crate::models::{Category, Crisis, Severity};

const CRISIS_COLS: &str = "id, title, category, country, latitude, longitude, severity, summary, description, start_date, is_active";

/// Most severe first, then most recent.
const CRISIS_ORDER: &str = "CASE severity WHEN 'Critical' THEN 1 WHEN 'High' THEN 2 WHEN 'Medium' THEN 3 ELSE 4 END, start_date DESC";

#[derive(Debug, Default, Clone)]
pub struct CrisisFilter {
    pub text: Option<String>,
    pub category: Option<Category>,
    pub severity: Option<Severity>,
}

fn row_to_crisis(row: &rusqlite::Row) -> rusqlite::Result<Crisis> {
    Ok(Crisis {
        id: row.get(0)?,
        title: row.get(1)?,
        category: row.get(2)?,
        country: row.get(3)?,
        latitude: row.get(4)?,
        longitude: row.get(5)?,
        severity: row.get(6)?,
        summary: row.get(7)?,
        description: row.get(8)?,
        start_date: row.get(9)?,
        is_active: row.get(10)?,
    })
}

/// Escape LIKE metacharacters so user text only ever matches literally.
fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

pub fn search_crises(conn: &Connection, filter: &CrisisFilter) -> StoreResult<Vec<Crisis>> {
    let mut where_clause = "WHERE is_active = 1".to_string();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(text) = filter.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        params.push(Box::new(like_pattern(text)));
        let idx = params.len();
        where_clause.push_str(&format!(
            " AND (title LIKE ?{idx} ESCAPE '\\' OR summary LIKE ?{idx} ESCAPE '\\' OR description LIKE ?{idx} ESCAPE '\\' OR country LIKE ?{idx} ESCAPE '\\')"
        ));
    }
    if let Some(category) = filter.category {
        params.push(Box::new(category));
        where_clause.push_str(&format!(" AND category = ?{}", params.len()));
    }
    if let Some(severity) = filter.severity {
        params.push(Box::new(severity));
        where_clause.push_str(&format!(" AND severity = ?{}", params.len()));
    }

    let sql = format!("SELECT {CRISIS_COLS} FROM crises {where_clause} ORDER BY {CRISIS_ORDER}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
        row_to_crisis,
    )?;
    let crises: Result<Vec<_>, _> = rows.collect();
    Ok(crises?)
}

pub fn get_crisis(conn: &Connection, id: i64) -> StoreResult<Crisis> {
    conn.query_row(
        &format!("SELECT {CRISIS_COLS} FROM crises WHERE id = ?1"),
        rusqlite::params![id],
        row_to_crisis,
    )
    .optional()?
    .ok_or(StoreError::NotFound("Crisis"))
}
