//! Result materialization: study identifiers to metadata records

use std::rc::Rc;

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, Params, Statement};
use serde_json::{Map, Number, Value};

use crate::Result;

/// A metadata row, keyed by column name. The column set is whatever the
/// store exposes.
pub type Record = Map<String, Value>;

const METADATA_BY_IDS: &str =
    "SELECT * FROM metadata WHERE study_id IN rarray(?1) ORDER BY study_id";

/// Fetch metadata for `study_ids` in one batched lookup.
///
/// An empty input returns immediately without touching the store.
pub fn materialize(conn: &Connection, study_ids: &[i64]) -> Result<Vec<Record>> {
    if study_ids.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Rc<Vec<SqlValue>> = Rc::new(study_ids.iter().copied().map(SqlValue::from).collect());
    let mut stmt = conn.prepare_cached(METADATA_BY_IDS)?;
    let records = rows_to_records(&mut stmt, [ids])?;
    tracing::debug!("Materialized {} of {} studies", records.len(), study_ids.len());
    Ok(records)
}

/// Run a statement and convert every row to a [`Record`]
pub fn rows_to_records<P: Params>(stmt: &mut Statement<'_>, params: P) -> Result<Vec<Record>> {
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query(params)?;

    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Record::new();
        for (i, name) in columns.iter().enumerate() {
            record.insert(name.clone(), to_json(row.get_ref(i)?));
        }
        records.push(record);
    }
    Ok(records)
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => {
            Value::String(bytes.iter().map(|b| format!("{:02x}", b)).collect())
        }
    }
}
