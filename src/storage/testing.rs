//! Fixtures shared by unit tests

use std::path::Path;

use rusqlite::{params, Connection};

use super::schema;

/// In-memory database with the schema and the `rarray` module loaded
pub(crate) fn memory_connection() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    rusqlite::vtab::array::load_module(&conn).unwrap();
    schema::initialize(&conn).unwrap();
    conn
}

/// Create `ns.db` with the schema under `dir` and return its connection string
pub(crate) fn file_database(dir: &Path) -> String {
    let path = dir.join("ns.db");
    let conn = Connection::open(&path).unwrap();
    schema::initialize(&conn).unwrap();
    format!("sqlite://{}", path.display())
}

pub(crate) fn insert_study(conn: &Connection, study_id: i64, title: &str) {
    conn.execute(
        "INSERT INTO metadata (study_id, title, authors, journal, year)
         VALUES (?1, ?2, 'Doe J', 'NeuroImage', 2010)",
        params![study_id, title],
    )
    .unwrap();
}

pub(crate) fn insert_term(conn: &Connection, study_id: i64, term: &str) {
    conn.execute(
        "INSERT INTO annotations_terms (study_id, contrast_id, term, weight)
         VALUES (?1, NULL, ?2, 0.5)",
        params![study_id, term],
    )
    .unwrap();
}

pub(crate) fn insert_coordinate(conn: &Connection, study_id: i64, x: f64, y: f64, z: f64) {
    conn.execute(
        "INSERT INTO coordinates (study_id, x, y, z) VALUES (?1, ?2, ?3, ?4)",
        params![study_id, x, y, z],
    )
    .unwrap();
}
