use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::VizError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Float,
    Integer,
    Boolean,
}

impl FieldType {
    fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Float => "float",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SchemaField {
    pub column: &'static str,
    pub dtype: FieldType,
    /// Aggregation cannot run without this column.
    pub required: bool,
    pub desc: &'static str,
}

const fn field(
    column: &'static str,
    dtype: FieldType,
    required: bool,
    desc: &'static str,
) -> SchemaField {
    SchemaField {
        column,
        dtype,
        required,
        desc,
    }
}

pub const VISIBLE_ROW_SCHEMA: &[SchemaField] = &[
    field(
        "description",
        FieldType::String,
        false,
        "Item description as published by the hospital",
    ),
    field(
        "ndc",
        FieldType::String,
        false,
        "National Drug Code of the billed product",
    ),
    field(
        "hcpcs",
        FieldType::String,
        false,
        "HCPCS code of the billed item",
    ),
    field(
        "setting",
        FieldType::String,
        false,
        "Care setting (inpatient, outpatient or both)",
    ),
    field(
        "drug_unit_of_measurement",
        FieldType::Float,
        true,
        "Quantity of drug the charge covers (1 when not reported)",
    ),
    field(
        "drug_type_of_measurement",
        FieldType::String,
        true,
        "Unit the drug quantity is expressed in (ML, UN, MG, ...)",
    ),
    field(
        "payer_name",
        FieldType::String,
        false,
        "Insurer the rate was negotiated with",
    ),
    field(
        "plan_name",
        FieldType::String,
        false,
        "Plan name as published by the hospital",
    ),
    field(
        "standard_charge_gross",
        FieldType::Float,
        false,
        "Gross charge before any discount",
    ),
    field(
        "standard_charge_discounted_cash",
        FieldType::Float,
        false,
        "Discounted cash price",
    ),
    field(
        "standard_charge_negotiated_dollar",
        FieldType::Float,
        true,
        "Negotiated rate in dollars",
    ),
    field(
        "standard_charge_methodology",
        FieldType::String,
        false,
        "How the negotiated rate is determined",
    ),
    field(
        "standard_charge_negotiated_percentage",
        FieldType::Float,
        false,
        "Negotiated rate as a percentage of charges",
    ),
    field(
        "calculated_negotiated_dollars",
        FieldType::Boolean,
        false,
        "Whether the dollar rate was derived from a percentage",
    ),
    field(
        "hospital_unique_id",
        FieldType::String,
        true,
        "Hospital identifier",
    ),
    field(
        "mapped_plan_name",
        FieldType::String,
        false,
        "Plan name normalized across hospitals",
    ),
    field(
        "mapped_lob_name",
        FieldType::String,
        false,
        "Line of business (Commercial, Medicare, ...)",
    ),
    field(
        "name",
        FieldType::String,
        true,
        "Hospital name",
    ),
    field(
        "state",
        FieldType::String,
        false,
        "Hospital state",
    ),
    field(
        "beds",
        FieldType::Integer,
        false,
        "Number of staffed beds",
    ),
    field(
        "lat",
        FieldType::Float,
        false,
        "Hospital latitude",
    ),
    field(
        "long",
        FieldType::Float,
        false,
        "Hospital longitude",
    ),
];

/// A visible grid row after the schema check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibleRow {
    pub description: Option<String>,
    pub ndc: Option<String>,
    pub hcpcs: Option<String>,
    pub setting: Option<String>,
    pub drug_unit_of_measurement: Option<f64>,
    pub drug_type_of_measurement: Option<String>,
    pub payer_name: Option<String>,
    pub plan_name: Option<String>,
    pub standard_charge_gross: Option<f64>,
    pub standard_charge_discounted_cash: Option<f64>,
    pub standard_charge_negotiated_dollar: Option<f64>,
    pub standard_charge_methodology: Option<String>,
    pub standard_charge_negotiated_percentage: Option<f64>,
    pub calculated_negotiated_dollars: Option<bool>,
    pub hospital_unique_id: Option<String>,
    pub mapped_plan_name: Option<String>,
    pub mapped_lob_name: Option<String>,
    pub name: Option<String>,
    pub state: Option<String>,
    pub beds: Option<i64>,
    pub lat: Option<f64>,
    pub long: Option<f64>,
}

enum Cell {
    Null,
    Str(String),
    Float(f64),
    Int(i64),
    Bool(bool),
}

impl Cell {
    fn into_string(self) -> Option<String> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    fn into_f64(self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(f),
            _ => None,
        }
    }

    fn into_i64(self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(i),
            _ => None,
        }
    }

    fn into_bool(self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }
}

/// Check client rows against `VISIBLE_ROW_SCHEMA`. `null` becomes `None` and
/// unknown keys are ignored; any other mismatch rejects the whole batch.
pub fn parse_visible_rows(rows: &[Value]) -> Result<Vec<VisibleRow>, VizError> {
    rows.iter()
        .enumerate()
        .map(|(i, v)| parse_visible_row(i, v))
        .collect()
}

fn parse_visible_row(index: usize, value: &Value) -> Result<VisibleRow, VizError> {
    let Some(obj) = value.as_object() else {
        return Err(VizError::NotAnObject { row: index });
    };

    let mut row = VisibleRow::default();
    for f in VISIBLE_ROW_SCHEMA {
        let cell = read_cell(index, obj, f)?;
        match f.column {
            "description" => row.description = cell.into_string(),
            "ndc" => row.ndc = cell.into_string(),
            "hcpcs" => row.hcpcs = cell.into_string(),
            "setting" => row.setting = cell.into_string(),
            "drug_unit_of_measurement" => row.drug_unit_of_measurement = cell.into_f64(),
            "drug_type_of_measurement" => row.drug_type_of_measurement = cell.into_string(),
            "payer_name" => row.payer_name = cell.into_string(),
            "plan_name" => row.plan_name = cell.into_string(),
            "standard_charge_gross" => row.standard_charge_gross = cell.into_f64(),
            "standard_charge_discounted_cash" => {
                row.standard_charge_discounted_cash = cell.into_f64()
            }
            "standard_charge_negotiated_dollar" => {
                row.standard_charge_negotiated_dollar = cell.into_f64()
            }
            "standard_charge_methodology" => row.standard_charge_methodology = cell.into_string(),
            "standard_charge_negotiated_percentage" => {
                row.standard_charge_negotiated_percentage = cell.into_f64()
            }
            "calculated_negotiated_dollars" => row.calculated_negotiated_dollars = cell.into_bool(),
            "hospital_unique_id" => row.hospital_unique_id = cell.into_string(),
            "mapped_plan_name" => row.mapped_plan_name = cell.into_string(),
            "mapped_lob_name" => row.mapped_lob_name = cell.into_string(),
            "name" => row.name = cell.into_string(),
            "state" => row.state = cell.into_string(),
            "beds" => row.beds = cell.into_i64(),
            "lat" => row.lat = cell.into_f64(),
            "long" => row.long = cell.into_f64(),
            _ => {}
        }
    }
    Ok(row)
}

fn read_cell(index: usize, obj: &Map<String, Value>, f: &SchemaField) -> Result<Cell, VizError> {
    let value = match obj.get(f.column) {
        Some(v) => v,
        None if f.required => {
            return Err(VizError::MissingColumn {
                row: index,
                column: f.column,
            });
        }
        None => return Ok(Cell::Null),
    };
    if value.is_null() {
        return Ok(Cell::Null);
    }

    let cell = match (f.dtype, value) {
        (FieldType::String, Value::String(s)) => Some(Cell::Str(s.clone())),
        (FieldType::String, Value::Number(n)) => Some(Cell::Str(n.to_string())),
        (FieldType::Float, Value::Number(n)) => n.as_f64().map(Cell::Float),
        (FieldType::Float, Value::String(s)) => s.trim().parse::<f64>().ok().map(Cell::Float),
        (FieldType::Integer, Value::Number(n)) => as_integral(n.as_f64()).map(Cell::Int),
        (FieldType::Integer, Value::String(s)) => {
            as_integral(s.trim().parse::<f64>().ok()).map(Cell::Int)
        }
        (FieldType::Boolean, Value::Bool(b)) => Some(Cell::Bool(*b)),
        _ => None,
    };

    cell.ok_or_else(|| VizError::InvalidValue {
        row: index,
        column: f.column,
        expected: f.dtype.name(),
        found: value.to_string(),
    })
}

fn as_integral(v: Option<f64>) -> Option<i64> {
    v.filter(|f| f.is_finite() && f.fract() == 0.0)
        .map(|f| f as i64)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn full_row() -> Value {
        json!({
            "description": "lispro vial",
            "ndc": "00002-7510-17",
            "hcpcs": "J1817",
            "setting": "inpatient",
            "drug_unit_of_measurement": 10,
            "drug_type_of_measurement": "UN",
            "payer_name": "Aetna",
            "plan_name": "Medicare Advantage",
            "standard_charge_gross": 900.0,
            "standard_charge_discounted_cash": 600.0,
            "standard_charge_negotiated_dollar": 300.0,
            "standard_charge_methodology": "case rate",
            "standard_charge_negotiated_percentage": null,
            "calculated_negotiated_dollars": false,
            "hospital_unique_id": "H2",
            "mapped_plan_name": "MA",
            "mapped_lob_name": "Medicare",
            "name": "County Medical Center",
            "state": "TX",
            "beds": 120,
            "lat": 29.76,
            "long": -95.36,
            "is_340b": true
        })
    }

    #[test]
    fn parses_a_grid_row() {
        let rows = parse_visible_rows(&[full_row()]).unwrap();
        let r = &rows[0];
        assert_eq!(r.hospital_unique_id.as_deref(), Some("H2"));
        assert_eq!(r.drug_unit_of_measurement, Some(10.0));
        assert_eq!(r.standard_charge_negotiated_percentage, None);
        assert_eq!(r.calculated_negotiated_dollars, Some(false));
        assert_eq!(r.beds, Some(120));
        assert_eq!(r.long, Some(-95.36));
    }

    #[test]
    fn coerces_numeric_strings_and_numeric_codes() {
        let mut v = full_row();
        v["standard_charge_negotiated_dollar"] = json!("300.5");
        v["ndc"] = json!(2751017);
        v["beds"] = json!(120.0);
        let r = &parse_visible_rows(&[v]).unwrap()[0];
        assert_eq!(r.standard_charge_negotiated_dollar, Some(300.5));
        assert_eq!(r.ndc.as_deref(), Some("2751017"));
        assert_eq!(r.beds, Some(120));
    }

    #[test]
    fn optional_columns_may_be_absent() {
        let mut v = full_row();
        v.as_object_mut().unwrap().remove("payer_name");
        v.as_object_mut().unwrap().remove("lat");
        let r = &parse_visible_rows(&[v]).unwrap()[0];
        assert_eq!(r.payer_name, None);
        assert_eq!(r.lat, None);
    }

    #[test]
    fn renamed_required_column_rejects_batch() {
        let mut v = full_row();
        let obj = v.as_object_mut().unwrap();
        let price = obj.remove("standard_charge_negotiated_dollar").unwrap();
        obj.insert("negotiated".to_string(), price);
        let err = parse_visible_rows(&[full_row(), v]).unwrap_err();
        assert!(matches!(
            err,
            VizError::MissingColumn {
                row: 1,
                column: "standard_charge_negotiated_dollar"
            }
        ));
    }

    #[test]
    fn non_numeric_price_rejects_batch() {
        let mut v = full_row();
        v["standard_charge_negotiated_dollar"] = json!("call for price");
        let err = parse_visible_rows(&[v]).unwrap_err();
        assert!(matches!(err, VizError::InvalidValue { expected: "float", .. }));
    }

    #[test]
    fn fractional_beds_rejects_batch() {
        let mut v = full_row();
        v["beds"] = json!(12.5);
        assert!(parse_visible_rows(&[v]).is_err());
    }

    #[test]
    fn non_object_row_rejects_batch() {
        let err = parse_visible_rows(&[json!([1, 2, 3])]).unwrap_err();
        assert!(matches!(err, VizError::NotAnObject { row: 0 }));
    }
}
