//! Record persistence sink
//!
//! Records are upserted into SQLite as they are collected, so a crash never
//! loses a record that was already merged. The JSON and CSV exports are
//! regenerated from the database at the end of a run.

use crate::record::{FieldSet, NoticeField, Record};
use crate::storage::atomic::write_atomic;
use crate::storage::schema::initialize_schema;
use crate::storage::{StorageError, StorageResult};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const JSON_EXPORT: &str = "notices.json";
pub const CSV_EXPORT: &str = "notices.csv";

const META_COLUMNS: [&str; 3] = ["fingerprint", "source_page", "collected_at"];

/// Where collected records go
pub trait RecordSink {
    /// Persists one record, replacing any earlier version with the same notice number
    fn append(&mut self, record: &Record) -> StorageResult<()>;

    /// Writes every stored record as a JSON array; returns the file written
    fn flush_to_json(&mut self) -> StorageResult<PathBuf>;

    /// Writes every stored record as CSV; returns the file written
    fn flush_to_csv(&mut self) -> StorageResult<PathBuf>;

    /// Number of stored records
    fn count(&self) -> StorageResult<usize>;
}

/// SQLite-backed sink
pub struct SqliteSink {
    conn: Connection,
    export_dir: PathBuf,
}

impl SqliteSink {
    /// Opens or creates the record database at `db_path`
    pub fn open(db_path: &Path, export_dir: impl Into<PathBuf>) -> StorageResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            export_dir: export_dir.into(),
        })
    }

    /// Creates an in-memory database (for dry runs and tests)
    pub fn open_in_memory(export_dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            export_dir: export_dir.into(),
        })
    }

    fn columns() -> Vec<&'static str> {
        NoticeField::all()
            .iter()
            .map(|field| field.as_str())
            .chain(META_COLUMNS)
            .collect()
    }

    fn upsert_sql() -> String {
        let columns = Self::columns();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        // Existing values survive when a later version lacks them
        let updates: Vec<String> = columns[1..]
            .iter()
            .map(|c| format!("{c} = COALESCE(excluded.{c}, notices.{c})"))
            .collect();

        format!(
            "INSERT INTO notices ({}) VALUES ({}) ON CONFLICT(notice_number) DO UPDATE SET {}",
            columns.join(", "),
            placeholders.join(", "),
            updates.join(", ")
        )
    }

    /// All stored records, newest announcement first
    pub fn records(&self) -> StorageResult<Vec<Record>> {
        let sql = format!(
            "SELECT {} FROM notices ORDER BY announcement_date DESC, notice_number DESC",
            Self::columns().join(", ")
        );
        let fields = NoticeField::all();
        let field_count = fields.len();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            let mut values = Vec::with_capacity(field_count);
            for i in 0..field_count {
                values.push(row.get::<_, Option<String>>(i)?);
            }
            let source_page: i64 = row.get(field_count + 1)?;
            let collected_at: String = row.get(field_count + 2)?;
            Ok((values, source_page, collected_at))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (values, source_page, collected_at) = row?;
            let set: FieldSet = fields
                .iter()
                .zip(values)
                .filter_map(|(field, value)| value.map(|v| (*field, v)))
                .collect();
            let collected_at = DateTime::parse_from_rfc3339(&collected_at)
                .map_err(|e| StorageError::Serialization(format!("collected_at: {}", e)))?
                .with_timezone(&Utc);
            let page = u32::try_from(source_page).unwrap_or_default();

            if let Some(record) = Record::with_timestamp(set, page, collected_at) {
                records.push(record);
            }
        }
        Ok(records)
    }
}

impl RecordSink for SqliteSink {
    fn append(&mut self, record: &Record) -> StorageResult<()> {
        let mut values: Vec<Value> = NoticeField::all()
            .into_iter()
            .map(|field| match record.get(field) {
                Some(v) => Value::Text(v.to_string()),
                None => Value::Null,
            })
            .collect();
        values.push(Value::Text(record.fingerprint().as_str().to_string()));
        values.push(Value::Integer(i64::from(record.source_page)));
        values.push(Value::Text(record.collected_at.to_rfc3339()));

        self.conn
            .execute(&Self::upsert_sql(), params_from_iter(values.iter()))?;
        debug!(notice = record.notice_number(), "Record stored");
        Ok(())
    }

    fn flush_to_json(&mut self) -> StorageResult<PathBuf> {
        let records = self.records()?;
        let path = self.export_dir.join(JSON_EXPORT);
        let json = serde_json::to_vec_pretty(&records)?;
        write_atomic(&path, &json)?;
        info!(path = %path.display(), records = records.len(), "JSON export written");
        Ok(path)
    }

    fn flush_to_csv(&mut self) -> StorageResult<PathBuf> {
        let records = self.records()?;
        let path = self.export_dir.join(CSV_EXPORT);

        let header: Vec<String> = NoticeField::all()
            .iter()
            .map(|f| f.as_str().to_string())
            .chain(["source_page".to_string(), "collected_at".to_string()])
            .collect();

        // BOM so spreadsheet tools pick UTF-8 for the Korean text
        let mut out = String::from("\u{feff}");
        push_row(&mut out, &header);
        for record in &records {
            let row: Vec<String> = NoticeField::all()
                .into_iter()
                .map(|field| record.get(field).unwrap_or_default().to_string())
                .chain([
                    record.source_page.to_string(),
                    record.collected_at.to_rfc3339(),
                ])
                .collect();
            push_row(&mut out, &row);
        }

        write_atomic(&path, out.as_bytes())?;
        info!(path = %path.display(), records = records.len(), "CSV export written");
        Ok(path)
    }

    fn count(&self) -> StorageResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notices", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Appends one CSV row with RFC 4180 quoting
fn push_row(out: &mut String, row: &[String]) {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if needs_quotes(cell) {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push_str("\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn record(number: &str, name: &str, posted: &str) -> Record {
        let fields: FieldSet = [
            (NoticeField::NoticeNumber, number.to_string()),
            (NoticeField::NoticeName, name.to_string()),
            (NoticeField::AnnouncementDate, posted.to_string()),
        ]
        .into_iter()
        .collect();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        Record::with_timestamp(fields, 1, at).unwrap()
    }

    #[test]
    fn test_append_is_upsert() {
        let dir = TempDir::new().unwrap();
        let mut sink = SqliteSink::open_in_memory(dir.path()).unwrap();

        sink.append(&record("A-1", "Road Repair", "2024/05/01")).unwrap();
        sink.append(&record("A-1", "Road Repair (amended)", "2024/05/02")).unwrap();
        sink.append(&record("A-2", "Bridge Paint", "2024/05/01")).unwrap();

        assert_eq!(sink.count().unwrap(), 2);
        let stored = sink.records().unwrap();
        let amended = stored.iter().find(|r| r.notice_number() == "A-1").unwrap();
        assert_eq!(amended.notice_name(), Some("Road Repair (amended)"));
    }

    #[test]
    fn test_upsert_keeps_fields_missing_from_later_version() {
        let dir = TempDir::new().unwrap();
        let mut sink = SqliteSink::open_in_memory(dir.path()).unwrap();

        let mut full = FieldSet::new();
        full.insert(NoticeField::NoticeNumber, "A-1");
        full.insert(NoticeField::ContactEmail, "bid@example.go.kr");
        sink.append(&Record::from_fields(full, 1).unwrap()).unwrap();
        sink.append(&record("A-1", "Road Repair", "2024/05/01")).unwrap();

        let stored = sink.records().unwrap();
        assert_eq!(stored[0].get(NoticeField::ContactEmail), Some("bid@example.go.kr"));
        assert_eq!(stored[0].notice_name(), Some("Road Repair"));
    }

    #[test]
    fn test_records_sorted_newest_first() {
        let dir = TempDir::new().unwrap();
        let mut sink = SqliteSink::open_in_memory(dir.path()).unwrap();
        sink.append(&record("A-1", "one", "2024/05/01")).unwrap();
        sink.append(&record("A-3", "three", "2024/05/03")).unwrap();
        sink.append(&record("A-2", "two", "2024/05/03")).unwrap();

        let numbers: Vec<String> = sink
            .records()
            .unwrap()
            .iter()
            .map(|r| r.notice_number().to_string())
            .collect();
        assert_eq!(numbers, vec!["A-3", "A-2", "A-1"]);
    }

    #[test]
    fn test_json_export() {
        let dir = TempDir::new().unwrap();
        let mut sink = SqliteSink::open_in_memory(dir.path()).unwrap();
        sink.append(&record("A-1", "Road Repair", "2024/05/01")).unwrap();

        let path = sink.flush_to_json().unwrap();
        assert_eq!(path, dir.path().join(JSON_EXPORT));

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value[0]["notice_number"], "A-1");
        assert_eq!(value[0]["notice_name"], "Road Repair");
    }

    #[test]
    fn test_csv_export_quotes_fields() {
        let dir = TempDir::new().unwrap();
        let mut sink = SqliteSink::open_in_memory(dir.path()).unwrap();
        sink.append(&record("A-1", "Roads, \"phase 2\"", "2024/05/01"))
            .unwrap();

        let path = sink.flush_to_csv().unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let content = content.trim_start_matches('\u{feff}');
        let mut lines = content.lines();

        assert!(lines.next().unwrap().starts_with("notice_number,notice_name,organization"));
        assert!(lines
            .next()
            .unwrap()
            .starts_with("A-1,\"Roads, \"\"phase 2\"\"\",,2024/05/01"));
    }

    #[test]
    fn test_open_on_disk_persists() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("data/notices.db");
        {
            let mut sink = SqliteSink::open(&db, dir.path()).unwrap();
            sink.append(&record("A-1", "Road Repair", "2024/05/01")).unwrap();
        }
        let sink = SqliteSink::open(&db, dir.path()).unwrap();
        assert_eq!(sink.count().unwrap(), 1);
    }
}
