//! Diagnostic report over the backing store
//!
//! The version and count probes are load-bearing: any failure aborts the
//! report. Sample probes degrade to an empty list on their own.

use rusqlite::Connection;
use serde::Serialize;

use super::materialize::{rows_to_records, Record};
use crate::storage::DIALECT;
use crate::{Error, Result};

const SAMPLE_SIZE: i64 = 3;

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub ok: bool,
    pub dialect: &'static str,
    pub version: String,
    pub coordinates_count: i64,
    pub metadata_count: i64,
    pub annotations_terms_count: i64,
    pub coordinates_sample: Vec<Record>,
    pub metadata_sample: Vec<Record>,
    pub annotations_terms_sample: Vec<Record>,
}

/// Body returned when a load-bearing probe fails
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticFailure {
    pub ok: bool,
    pub dialect: &'static str,
    pub error: String,
}

impl DiagnosticFailure {
    pub fn new(error: &Error) -> Self {
        Self {
            ok: false,
            dialect: DIALECT,
            error: error.to_string(),
        }
    }
}

/// Run every probe on one connection
pub fn run_probes(conn: &Connection) -> Result<DiagnosticReport> {
    let version: String = conn.query_row("SELECT sqlite_version()", [], |row| row.get(0))?;

    let coordinates_count = count(conn, "coordinates")?;
    let metadata_count = count(conn, "metadata")?;
    let annotations_terms_count = count(conn, "annotations_terms")?;

    Ok(DiagnosticReport {
        ok: true,
        dialect: DIALECT,
        version,
        coordinates_count,
        metadata_count,
        annotations_terms_count,
        coordinates_sample: sample(
            conn,
            "coordinates",
            "SELECT study_id, x, y, z FROM coordinates LIMIT ?1",
        ),
        metadata_sample: sample(conn, "metadata", "SELECT * FROM metadata LIMIT ?1"),
        annotations_terms_sample: sample(
            conn,
            "annotations_terms",
            "SELECT study_id, contrast_id, term, weight FROM annotations_terms LIMIT ?1",
        ),
    })
}

fn count(conn: &Connection, table: &str) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}

fn sample(conn: &Connection, table: &str, sql: &str) -> Vec<Record> {
    let rows = conn
        .prepare(sql)
        .map_err(Error::from)
        .and_then(|mut stmt| rows_to_records(&mut stmt, [SAMPLE_SIZE]));

    match rows {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!("Sample probe for {} failed: {}", table, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::{insert_coordinate, insert_study, insert_term, memory_connection};

    #[test]
    fn test_full_report() {
        let conn = memory_connection();
        for id in 1..=4 {
            insert_study(&conn, id, "Study");
            insert_term(&conn, id, "pain");
            insert_coordinate(&conn, id, 1.0, 2.0, 3.0);
        }
        insert_term(&conn, 1, "fear");

        let report = run_probes(&conn).unwrap();
        assert!(report.ok);
        assert_eq!(report.dialect, "sqlite");
        assert!(!report.version.is_empty());
        assert_eq!(report.metadata_count, 4);
        assert_eq!(report.annotations_terms_count, 5);
        assert_eq!(report.coordinates_count, 4);
        assert_eq!(report.coordinates_sample.len(), 3);
        assert_eq!(report.metadata_sample.len(), 3);
        assert_eq!(report.annotations_terms_sample.len(), 3);
        assert!(report.annotations_terms_sample[0].contains_key("contrast_id"));
    }

    #[test]
    fn test_sample_failure_degrades() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE metadata (study_id INTEGER);
             CREATE TABLE coordinates (study_id INTEGER, x REAL, y REAL, z REAL);
             CREATE TABLE annotations_terms (study_id INTEGER, term TEXT);
             INSERT INTO annotations_terms VALUES (1, 'pain');",
        )
        .unwrap();

        let report = run_probes(&conn).unwrap();
        assert!(report.ok);
        assert_eq!(report.annotations_terms_count, 1);
        assert!(report.annotations_terms_sample.is_empty());
    }

    #[test]
    fn test_count_failure_aborts() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE metadata (study_id INTEGER);").unwrap();

        let err = run_probes(&conn).unwrap_err();
        let failure = serde_json::to_value(DiagnosticFailure::new(&err)).unwrap();
        assert_eq!(failure["ok"], false);
        assert_eq!(failure["dialect"], "sqlite");
        assert!(failure["error"].as_str().unwrap().contains("coordinates"));
    }
}
