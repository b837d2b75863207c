use duckdb::Connection;

use crate::error::LookupError;
use crate::store::ReferenceStore;

/// How a selection string identifies the drug or procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// The selection is an HCPCS description.
    Hcpcs,
    /// The selection is a product name covering one or more NDCs.
    Ndc,
}

impl SelectionMode {
    /// Only the literal strings `"hcpcs"` and `"ndc"` are recognized.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hcpcs" => Some(Self::Hcpcs),
            "ndc" => Some(Self::Ndc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hcpcs => "hcpcs",
            Self::Ndc => "ndc",
        }
    }
}

pub fn list_hcpcs_descriptions(store: &ReferenceStore) -> duckdb::Result<Vec<String>> {
    query_string_list(
        store.conn(),
        "SELECT DISTINCT hcpcs_desc FROM hcpcs_desc WHERE hcpcs_desc IS NOT NULL ORDER BY hcpcs_desc ASC",
    )
}

pub fn list_product_names(store: &ReferenceStore) -> duckdb::Result<Vec<String>> {
    query_string_list(
        store.conn(),
        "SELECT DISTINCT product FROM ndc_names WHERE product IS NOT NULL ORDER BY product ASC",
    )
}

/// Options for the selection control in the given mode.
pub fn list_options(store: &ReferenceStore, mode: SelectionMode) -> duckdb::Result<Vec<String>> {
    match mode {
        SelectionMode::Hcpcs => list_hcpcs_descriptions(store),
        SelectionMode::Ndc => list_product_names(store),
    }
}

/// Exact-match lookup of the single code behind an HCPCS description.
pub fn resolve_hcpcs_code(store: &ReferenceStore, description: &str) -> Result<String, LookupError> {
    let mut stmt = store
        .conn()
        .prepare("SELECT DISTINCT hcpcs FROM hcpcs_desc WHERE hcpcs_desc = ? AND hcpcs IS NOT NULL")?;
    let rows = stmt.query_map([description], |row| row.get::<usize, String>(0))?;
    let mut codes = Vec::new();
    for r in rows {
        codes.push(r?);
    }

    match codes.len() {
        0 => Err(LookupError::NotFound {
            description: description.to_string(),
        }),
        1 => Ok(codes.remove(0)),
        count => Err(LookupError::Ambiguous {
            description: description.to_string(),
            count,
        }),
    }
}

/// All NDCs filed under a product name. An unknown product yields an empty list.
pub fn resolve_ndc_codes(store: &ReferenceStore, product: &str) -> Result<Vec<String>, LookupError> {
    let mut stmt = store
        .conn()
        .prepare("SELECT ndc FROM ndc_names WHERE product = ? AND ndc IS NOT NULL")?;
    let rows = stmt.query_map([product], |row| row.get::<usize, String>(0))?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

fn query_string_list(db: &Connection, sql: &str) -> duckdb::Result<Vec<String>> {
    let mut stmt = db.prepare(sql)?;
    let mut out = Vec::new();
    let rows = stmt.query_map([], |row| row.get::<usize, String>(0))?;
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
