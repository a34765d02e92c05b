//! Database schema for the record store

/// SQL schema for the record store
///
/// One row per notice, keyed by notice number. Field columns carry the
/// `NoticeField` names.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS notices (
    notice_number TEXT PRIMARY KEY,
    notice_name TEXT,
    organization TEXT,
    announcement_date TEXT,
    deadline_date TEXT,
    opening_date TEXT,
    bid_date TEXT,
    budget_amount TEXT,
    estimated_price TEXT,
    base_price TEXT,
    bid_method TEXT,
    selection_method TEXT,
    classification TEXT,
    document_number TEXT,
    opening_location TEXT,
    contact_person TEXT,
    contact_department TEXT,
    contact_phone TEXT,
    contact_email TEXT,
    notes TEXT,
    fingerprint TEXT NOT NULL,
    source_page INTEGER NOT NULL,
    collected_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notices_announcement ON notices(announcement_date);
CREATE INDEX IF NOT EXISTS idx_notices_fingerprint ON notices(fingerprint);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
