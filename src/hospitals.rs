use std::collections::HashMap;

use duckdb::{OptionalExt, Row, params_from_iter};
use serde::Serialize;

use crate::store::ReferenceStore;

/// A hospital registry row with its 340B participation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HospitalRecord {
    pub unique_id: String,
    pub name: Option<String>,
    pub state: Option<String>,
    pub beds: Option<i64>,
    pub lat: Option<f64>,
    pub long: Option<f64>,
    pub hospital_url: Option<String>,
    pub retrieved: Option<String>,
    pub is_340b: bool,
    pub program_type_long: Option<String>,
}

const HOSPITAL_SELECT: &str = r#"
    SELECT
      unique_id,
      name,
      state,
      beds,
      lat,
      "long",
      hospital_url,
      CAST(retrieved AS VARCHAR) AS retrieved,
      is_340b,
      program_type_long
    FROM hospitals
"#;

pub fn hospital_detail(
    store: &ReferenceStore,
    unique_id: &str,
) -> duckdb::Result<Option<HospitalRecord>> {
    let sql = format!("{HOSPITAL_SELECT} WHERE unique_id = ? LIMIT 1");
    let mut stmt = store.conn().prepare(&sql)?;
    stmt.query_row([unique_id], hospital_record).optional()
}

/// Hospitals keyed by unique id; ids absent from the registry are simply
/// missing from the map.
pub fn hospitals_by_id(
    store: &ReferenceStore,
    ids: &[&str],
) -> duckdb::Result<HashMap<String, HospitalRecord>> {
    let mut out = HashMap::with_capacity(ids.len());
    if ids.is_empty() {
        return Ok(out);
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("{HOSPITAL_SELECT} WHERE unique_id IN ({placeholders})");
    let mut stmt = store.conn().prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(ids.iter()), hospital_record)?;
    for r in rows {
        let h = r?;
        out.insert(h.unique_id.clone(), h);
    }
    Ok(out)
}

fn hospital_record(row: &Row<'_>) -> duckdb::Result<HospitalRecord> {
    Ok(HospitalRecord {
        unique_id: row.get(0)?,
        name: row.get(1)?,
        state: row.get(2)?,
        beds: row.get(3)?,
        lat: row.get(4)?,
        long: row.get(5)?,
        hospital_url: row.get(6)?,
        retrieved: row.get(7)?,
        is_340b: row.get(8)?,
        program_type_long: row.get(9)?,
    })
}
