//! Database schema definitions
//!
//! The relations are owned by the ingestion pipeline; these statements exist
//! so a development database can be created with `neurodiss init-schema`.

use rusqlite::Connection;

/// SQL to create the study metadata table
pub const CREATE_METADATA_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS metadata (
    study_id INTEGER PRIMARY KEY,
    title TEXT,
    authors TEXT,
    journal TEXT,
    year INTEGER
)
"#;

/// SQL to create the term annotations table
pub const CREATE_ANNOTATIONS_TERMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS annotations_terms (
    study_id INTEGER NOT NULL,
    contrast_id TEXT,
    term TEXT NOT NULL,
    weight REAL
)
"#;

/// SQL to create the coordinates table
pub const CREATE_COORDINATES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS coordinates (
    study_id INTEGER NOT NULL,
    x REAL NOT NULL,
    y REAL NOT NULL,
    z REAL NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_terms_term ON annotations_terms(term)",
    "CREATE INDEX IF NOT EXISTS idx_terms_study ON annotations_terms(study_id)",
    "CREATE INDEX IF NOT EXISTS idx_coordinates_xyz ON coordinates(x, y, z)",
    "CREATE INDEX IF NOT EXISTS idx_coordinates_study ON coordinates(study_id)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_METADATA_TABLE,
        CREATE_ANNOTATIONS_TERMS_TABLE,
        CREATE_COORDINATES_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}

/// Create any missing relations and indexes
pub fn initialize(conn: &Connection) -> rusqlite::Result<()> {
    for stmt in all_schema_statements() {
        conn.execute(stmt, [])?;
    }
    Ok(())
}
