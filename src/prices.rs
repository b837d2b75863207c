use serde::Serialize;

use crate::error::SummaryError;
use crate::lookup::SelectionMode;
use crate::store::{ReferenceStore, relation_columns};

pub const NO_PRICING_MESSAGE: &str = "No pricing information available.";

/// Columns that identify a group rather than carry a price.
const EXCLUDED_PRICE_COLUMNS: &[&str] = &["hcpcs_desc", "asp", "hcpcs", "product"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSummaryRow {
    pub desc: Option<String>,
    pub price_type: String,
    pub amount: f64,
    /// `amount` formatted for display, e.g. `$30.5`.
    pub display_amount: String,
}

impl PriceSummaryRow {
    fn new(desc: Option<String>, price_type: impl Into<String>, amount: f64) -> Self {
        Self {
            desc,
            price_type: price_type.into(),
            amount,
            display_amount: format_dollars(amount),
        }
    }
}

// Whole amounts keep one decimal place: `$1000.0`, `$2.5`, `$55.55`.
fn format_dollars(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("${amount:.1}")
    } else {
        format!("${amount}")
    }
}

/// Summary result. `NoPricing` is the placeholder the client renders instead
/// of an empty table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PriceSummary {
    Available { rows: Vec<PriceSummaryRow> },
    NoPricing { message: &'static str },
}

impl PriceSummary {
    pub fn no_pricing() -> Self {
        Self::NoPricing {
            message: NO_PRICING_MESSAGE,
        }
    }

    fn from_rows(rows: Vec<PriceSummaryRow>) -> Self {
        if rows.is_empty() {
            Self::no_pricing()
        } else {
            Self::Available { rows }
        }
    }

    pub fn rows(&self) -> &[PriceSummaryRow] {
        match self {
            Self::Available { rows } => rows,
            Self::NoPricing { .. } => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }
}

/// Summarize reference prices for `value`.
///
/// `"ndc"` filters the `product` column and `"hcpcs"` the `hcpcs` column; any
/// other mode is an error (unlike `filter_payments`, which returns no rows).
/// In `"ndc"` mode callers pass the product display name, not resolved NDCs.
pub fn summarize_prices(
    store: &ReferenceStore,
    mode: &str,
    value: &str,
) -> Result<PriceSummary, SummaryError> {
    let filter_column = match SelectionMode::parse(mode) {
        Some(SelectionMode::Ndc) => "product",
        Some(SelectionMode::Hcpcs) => "hcpcs",
        None => {
            return Err(SummaryError::UnrecognizedMode {
                mode: mode.to_string(),
            });
        }
    };
    if value.trim().is_empty() {
        return Ok(PriceSummary::no_pricing());
    }

    let numeric = numeric_price_columns(store)?;
    let has_asp = numeric.iter().any(|c| c == "asp");
    let price_columns: Vec<&str> = numeric
        .iter()
        .map(String::as_str)
        .filter(|c| !EXCLUDED_PRICE_COLUMNS.contains(c))
        .collect();

    let mut select = vec![
        "CAST(product AS VARCHAR) AS product".to_string(),
        "hcpcs_desc".to_string(),
    ];
    select.push(if has_asp {
        "ROUND(AVG(CAST(asp AS DOUBLE)), 2) AS asp".to_string()
    } else {
        "CAST(NULL AS DOUBLE) AS asp".to_string()
    });
    for col in &price_columns {
        let ident = quote_ident(col);
        select.push(format!("ROUND(AVG(CAST({ident} AS DOUBLE)), 2) AS {ident}"));
    }

    let sql = format!(
        r#"
        WITH filtered AS (
          SELECT
            *,
            CAST(hcpcs AS VARCHAR) || ' - ' || CAST(asp_desc AS VARCHAR)
              || ' (' || CAST(asp_dosage AS VARCHAR) || ')' AS hcpcs_desc
          FROM prices
          WHERE CAST({filter_column} AS VARCHAR) = ?
        )
        SELECT {select}
        FROM filtered
        GROUP BY product, hcpcs_desc, hcpcs
        ORDER BY product ASC NULLS LAST, hcpcs_desc ASC NULLS LAST
        "#,
        select = select.join(", ")
    );
    tracing::debug!(
        "summarize prices: filter={} price_columns={}",
        filter_column,
        price_columns.len()
    );

    let mut stmt = store.conn().prepare(&sql)?;
    let rows = stmt.query_map([value], |row| {
        let mut amounts = Vec::with_capacity(price_columns.len());
        for i in 0..price_columns.len() {
            amounts.push(row.get::<usize, Option<f64>>(3 + i)?);
        }
        Ok(GroupedPrices {
            product: row.get(0)?,
            hcpcs_desc: row.get(1)?,
            asp: row.get(2)?,
            amounts,
        })
    })?;
    let mut groups = Vec::new();
    for r in rows {
        groups.push(r?);
    }

    Ok(PriceSummary::from_rows(reshape(&groups, &price_columns)))
}

struct GroupedPrices {
    product: Option<String>,
    hcpcs_desc: Option<String>,
    asp: Option<f64>,
    amounts: Vec<Option<f64>>,
}

fn reshape(groups: &[GroupedPrices], price_columns: &[&str]) -> Vec<PriceSummaryRow> {
    let mut out: Vec<PriceSummaryRow> = Vec::new();

    for g in groups {
        let Some(asp) = g.asp else {
            continue;
        };
        let row = PriceSummaryRow::new(g.hcpcs_desc.clone(), "asp", asp);
        if !out.contains(&row) {
            out.push(row);
        }
    }

    for (i, col) in price_columns.iter().enumerate() {
        for g in groups {
            if let Some(amount) = g.amounts[i] {
                out.push(PriceSummaryRow::new(g.product.clone(), *col, amount));
            }
        }
    }
    out
}

fn numeric_price_columns(store: &ReferenceStore) -> duckdb::Result<Vec<String>> {
    Ok(relation_columns(store.conn(), "prices")?
        .into_iter()
        .filter(|(_, ty)| is_numeric_type(ty))
        .map(|(name, _)| name)
        .collect())
}

fn is_numeric_type(ty: &str) -> bool {
    let ty = ty.to_ascii_uppercase();
    const NUMERIC: &[&str] = &[
        "TINYINT", "SMALLINT", "INTEGER", "BIGINT", "HUGEINT", "UTINYINT", "USMALLINT",
        "UINTEGER", "UBIGINT", "UHUGEINT", "FLOAT", "DOUBLE", "DECIMAL", "REAL",
    ];
    NUMERIC.iter().any(|n| ty == *n || ty.starts_with(&format!("{n}(")))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
