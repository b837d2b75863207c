use duckdb::{Row, params_from_iter};
use serde::Serialize;

use crate::error::FilterError;
use crate::lookup::{SelectionMode, resolve_hcpcs_code, resolve_ndc_codes};
use crate::store::ReferenceStore;

/// One payment line item joined to its hospital. This is the grid row handed
/// to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridRow {
    pub hospital_unique_id: String,
    pub ndc: Option<String>,
    pub hcpcs: Option<String>,
    pub description: Option<String>,
    pub setting: Option<String>,
    pub drug_unit_of_measurement: f64,
    pub drug_type_of_measurement: Option<String>,
    pub payer_name: Option<String>,
    pub plan_name: Option<String>,
    pub mapped_plan_name: Option<String>,
    pub mapped_lob_name: Option<String>,
    pub standard_charge_gross: Option<f64>,
    pub standard_charge_discounted_cash: Option<f64>,
    pub standard_charge_negotiated_dollar: Option<f64>,
    pub standard_charge_negotiated_percentage: Option<f64>,
    pub standard_charge_methodology: Option<String>,
    pub calculated_negotiated_dollars: Option<bool>,
    pub retrieved: Option<String>,
    pub name: Option<String>,
    pub state: Option<String>,
    pub beds: Option<i64>,
    pub is_340b: bool,
    pub lat: Option<f64>,
    pub long: Option<f64>,
    pub hospital_retrieved: Option<String>,
}

const GRID_SELECT: &str = r#"
    SELECT
      p.hospital_unique_id,
      p.ndc,
      p.hcpcs,
      p.description,
      p.setting,
      p.drug_unit_of_measurement,
      p.drug_type_of_measurement,
      p.payer_name,
      p.plan_name,
      p.mapped_plan_name,
      p.mapped_lob_name,
      p.standard_charge_gross,
      p.standard_charge_discounted_cash,
      p.standard_charge_negotiated_dollar,
      p.standard_charge_negotiated_percentage,
      p.standard_charge_methodology,
      p.calculated_negotiated_dollars,
      CAST(p.retrieved AS VARCHAR) AS retrieved,
      h.name,
      h.state,
      h.beds,
      h.is_340b,
      h.lat,
      h."long",
      CAST(h.retrieved AS VARCHAR) AS hospital_retrieved
    FROM payment_info p
    JOIN hospitals h ON p.hospital_unique_id = h.unique_id
"#;

/// Payment rows for a selection, joined to hospital attributes.
///
/// An empty selection or an unrecognized mode yields no rows. Payment rows
/// whose hospital is not in the registry are dropped by the inner join.
pub fn filter_payments(
    store: &ReferenceStore,
    mode: &str,
    selection: &str,
) -> Result<Vec<GridRow>, FilterError> {
    if selection.trim().is_empty() {
        return Ok(Vec::new());
    }
    let Some(mode) = SelectionMode::parse(mode) else {
        tracing::debug!("unrecognized filter mode '{}'; returning no rows", mode);
        return Ok(Vec::new());
    };

    let codes = match mode {
        SelectionMode::Hcpcs => vec![resolve_hcpcs_code(store, selection)?],
        SelectionMode::Ndc => resolve_ndc_codes(store, selection)?,
    };
    if codes.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; codes.len()].join(", ");
    let sql = format!(
        "{GRID_SELECT} WHERE p.{} IN ({placeholders})",
        mode.as_str()
    );
    tracing::debug!(
        "filter payments: mode={} codes={}",
        mode.as_str(),
        codes.len()
    );

    let mut stmt = store.conn().prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(codes.iter()), grid_row)?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

fn grid_row(row: &Row<'_>) -> duckdb::Result<GridRow> {
    Ok(GridRow {
        hospital_unique_id: row.get(0)?,
        ndc: row.get(1)?,
        hcpcs: row.get(2)?,
        description: row.get(3)?,
        setting: row.get(4)?,
        drug_unit_of_measurement: row.get(5)?,
        drug_type_of_measurement: row.get(6)?,
        payer_name: row.get(7)?,
        plan_name: row.get(8)?,
        mapped_plan_name: row.get(9)?,
        mapped_lob_name: row.get(10)?,
        standard_charge_gross: row.get(11)?,
        standard_charge_discounted_cash: row.get(12)?,
        standard_charge_negotiated_dollar: row.get(13)?,
        standard_charge_negotiated_percentage: row.get(14)?,
        standard_charge_methodology: row.get(15)?,
        calculated_negotiated_dollars: row.get(16)?,
        retrieved: row.get(17)?,
        name: row.get(18)?,
        state: row.get(19)?,
        beds: row.get(20)?,
        is_340b: row.get(21)?,
        lat: row.get(22)?,
        long: row.get(23)?,
        hospital_retrieved: row.get(24)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use crate::test_support::{LISPRO_DESC, fixture_store};

    fn descriptions(rows: &[GridRow]) -> Vec<String> {
        let mut out: Vec<String> = rows
            .iter()
            .filter_map(|r| r.description.clone())
            .collect();
        out.sort();
        out
    }

    #[test]
    fn hcpcs_filter_returns_only_resolved_code() {
        let store = fixture_store();
        let code = resolve_hcpcs_code(&store, LISPRO_DESC).unwrap();
        let rows = filter_payments(&store, "hcpcs", LISPRO_DESC).unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.hcpcs.as_deref() == Some(code.as_str())));
    }

    #[test]
    fn join_misses_are_dropped_not_null_filled() {
        let store = fixture_store();
        let rows = filter_payments(&store, "hcpcs", LISPRO_DESC).unwrap();
        assert!(rows.iter().all(|r| r.name.is_some()));
        assert!(rows.iter().all(|r| r.hospital_unique_id != "H9"));
        assert!(!descriptions(&rows).contains(&"orphan row".to_string()));
    }

    #[test]
    fn ndc_filter_covers_every_code_of_the_product() {
        let store = fixture_store();
        let rows = filter_payments(&store, "ndc", "HUMALOG").unwrap();
        assert_eq!(
            descriptions(&rows),
            vec![
                "lispro no price",
                "lispro null unit",
                "lispro vial",
                "lispro zero unit"
            ]
        );
    }

    #[test]
    fn hospital_attributes_are_joined() {
        let store = fixture_store();
        let rows = filter_payments(&store, "ndc", "HUMALOG").unwrap();
        let vial = rows
            .iter()
            .find(|r| r.description.as_deref() == Some("lispro vial"))
            .unwrap();
        assert_eq!(vial.name.as_deref(), Some("County Medical Center"));
        assert_eq!(vial.state.as_deref(), Some("TX"));
        assert_eq!(vial.beds, Some(120));
        assert!(vial.is_340b);
        assert_eq!(vial.lat, Some(29.76));
        assert_eq!(vial.long, Some(-95.36));
        assert_eq!(vial.retrieved.as_deref(), Some("2024-06-15"));
        assert_eq!(vial.hospital_retrieved.as_deref(), Some("2024-06-15"));
        assert_eq!(vial.drug_unit_of_measurement, 10.0);
    }

    #[test]
    fn normalized_units_flow_through() {
        let store = fixture_store();
        let rows = filter_payments(&store, "hcpcs", LISPRO_DESC).unwrap();
        assert!(rows.iter().all(|r| r.drug_unit_of_measurement != 0.0));
    }

    #[test]
    fn unknown_product_yields_no_rows() {
        let store = fixture_store();
        assert!(filter_payments(&store, "ndc", "NOT A DRUG").unwrap().is_empty());
    }

    #[test]
    fn product_without_payments_yields_no_rows() {
        let store = fixture_store();
        assert!(filter_payments(&store, "ndc", "KEYTRUDA").unwrap().is_empty());
    }

    #[test]
    fn unrecognized_mode_yields_no_rows() {
        let store = fixture_store();
        assert!(filter_payments(&store, "rxnorm", "HUMALOG").unwrap().is_empty());
    }

    #[test]
    fn empty_selection_yields_no_rows() {
        let store = fixture_store();
        assert!(filter_payments(&store, "hcpcs", "").unwrap().is_empty());
        assert!(filter_payments(&store, "ndc", "   ").unwrap().is_empty());
    }

    #[test]
    fn unknown_description_surfaces_lookup_error() {
        let store = fixture_store();
        let err = filter_payments(&store, "hcpcs", "NO SUCH DESCRIPTION").unwrap_err();
        assert!(matches!(
            err,
            FilterError::Lookup(LookupError::NotFound { .. })
        ));
    }
}
