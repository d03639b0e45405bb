use rusqlite::Connection;

const SCHEMA: &str = include_str!("schema.sql");

pub fn run(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)?;

    // Databases created before the idempotency guard lack the unique index
    // on payment intents; CREATE UNIQUE INDEX IF NOT EXISTS covers both.
    conn.execute_batch(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_donations_payment_intent
            ON donations (stripe_payment_intent_id);",
    )?;

    Ok(())
}
