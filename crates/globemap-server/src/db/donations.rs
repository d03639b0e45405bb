use rusqlite::Connection;

use super::{now_timestamp, StoreResult};
use crate::models::{Donation, DonationHistoryItem, DonationSummary};

pub const STATUS_SUCCEEDED: &str = "succeeded";

const DONATION_COLS: &str = "id, crisis_id, charity_id, user_id, amount, currency, stripe_payment_intent_id, status, created_at";

#[derive(Debug, Clone)]
pub struct NewDonation {
    pub crisis_id: i64,
    pub charity_id: Option<i64>,
    pub user_id: Option<i64>,
    pub amount: i64,
    pub currency: String,
    pub stripe_payment_intent_id: String,
    pub status: String,
}

#[derive(Debug)]
pub struct RecordedDonation {
    pub donation: Donation,
    /// False when the payment intent had already been recorded.
    pub created: bool,
}

fn row_to_donation(row: &rusqlite::Row) -> rusqlite::Result<Donation> {
    Ok(Donation {
        id: row.get(0)?,
        crisis_id: row.get(1)?,
        charity_id: row.get(2)?,
        user_id: row.get(3)?,
        amount: row.get(4)?,
        currency: row.get(5)?,
        stripe_payment_intent_id: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Insert a donation for a payment intent. Redelivery of the same intent is
/// a no-op that returns the row stored the first time. References to users
/// or charities that no longer exist are stored as NULL.
pub fn record_donation(conn: &mut Connection, new: &NewDonation) -> StoreResult<RecordedDonation> {
    let tx = conn.transaction()?;

    let inserted = tx.execute(
        "INSERT INTO donations (crisis_id, charity_id, user_id, amount, currency, stripe_payment_intent_id, status, created_at)
         VALUES (?1, (SELECT id FROM charities WHERE id = ?2), (SELECT id FROM users WHERE id = ?3), ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT (stripe_payment_intent_id) DO NOTHING",
        rusqlite::params![
            new.crisis_id,
            new.charity_id,
            new.user_id,
            new.amount,
            new.currency,
            new.stripe_payment_intent_id,
            new.status,
            now_timestamp(),
        ],
    )?;

    let donation = tx.query_row(
        &format!("SELECT {DONATION_COLS} FROM donations WHERE stripe_payment_intent_id = ?1"),
        rusqlite::params![new.stripe_payment_intent_id],
        row_to_donation,
    )?;

    tx.commit()?;

    Ok(RecordedDonation {
        donation,
        created: inserted > 0,
    })
}

pub fn user_donations(conn: &Connection, user_id: i64) -> StoreResult<Vec<DonationHistoryItem>> {
    let mut stmt = conn.prepare(
        "SELECT d.id, d.amount, d.currency, d.created_at, c.title, c.country, ch.name
         FROM donations d
         JOIN crises c ON d.crisis_id = c.id
         LEFT JOIN charities ch ON d.charity_id = ch.id
         WHERE d.user_id = ?1 AND d.status = ?2
         ORDER BY d.created_at DESC, d.id DESC",
    )?;
    let rows = stmt.query_map(rusqlite::params![user_id, STATUS_SUCCEEDED], |row| {
        Ok(DonationHistoryItem {
            id: row.get(0)?,
            amount: row.get(1)?,
            currency: row.get(2)?,
            created_at: row.get(3)?,
            crisis_title: row.get(4)?,
            crisis_country: row.get(5)?,
            charity_name: row.get(6)?,
        })
    })?;
    let items: Result<Vec<_>, _> = rows.collect();
    Ok(items?)
}

pub fn donation_summary(conn: &Connection, user_id: i64) -> StoreResult<DonationSummary> {
    let summary = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0),
                UPPER(COALESCE(MAX(currency), 'USD')),
                COUNT(DISTINCT crisis_id),
                COUNT(DISTINCT charity_id)
         FROM donations
         WHERE user_id = ?1 AND status = ?2",
        rusqlite::params![user_id, STATUS_SUCCEEDED],
        |row| {
            Ok(DonationSummary {
                total_amount: row.get(0)?,
                currency: row.get(1)?,
                crisis_count: row.get(2)?,
                charity_count: row.get(3)?,
            })
        },
    )?;
    Ok(summary)
}
