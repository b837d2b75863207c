use std::path::Path;

use anyhow::{Context, anyhow};
use duckdb::Connection;
use serde::Serialize;

use crate::storage::{SourceFiles, StoragePaths};

/// Blanket non-chemo drug code; never offered or resolvable.
pub const EXCLUDED_HCPCS_CODE: &str = "J8499";

/// Textual timestamp format of the `retrieved` columns, e.g.
/// `2024-05-01T12:30:00.000Z`.
const RETRIEVED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.%gZ";

const PAYMENT_COLUMNS: &[&str] = &[
    "hospital_unique_id",
    "ndc",
    "hcpcs",
    "description",
    "setting",
    "drug_unit_of_measurement",
    "drug_type_of_measurement",
    "payer_name",
    "plan_name",
    "mapped_plan_name",
    "mapped_lob_name",
    "standard_charge_gross",
    "standard_charge_discounted_cash",
    "standard_charge_negotiated_dollar",
    "standard_charge_negotiated_percentage",
    "standard_charge_methodology",
    "calculated_negotiated_dollars",
    "retrieved",
];
const NDC_COLUMNS: &[&str] = &["product", "ndc"];
const HCPCS_COLUMNS: &[&str] = &["hcpcs", "hcpcs_desc"];
const HOSPITAL_COLUMNS: &[&str] = &[
    "unique_id",
    "name",
    "state",
    "beds",
    "lat",
    "long",
    "hospital_url",
    "retrieved",
];
const HOSPITAL_340B_COLUMNS: &[&str] = &["unique_id", "program_type_long"];
pub(crate) const PRICE_KEY_COLUMNS: &[&str] = &["product", "hcpcs", "asp_desc", "asp_dosage"];

/// Row counts captured once the datasets are loaded.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatasetCounts {
    pub payments: u64,
    pub ndc_names: u64,
    pub hcpcs_descriptions: u64,
    pub hospitals: u64,
    pub hospitals_340b: u64,
    pub prices: u64,
}

/// Read-only handle over the reference datasets, built once per process.
pub struct ReferenceStore {
    conn: Connection,
    counts: DatasetCounts,
}

impl ReferenceStore {
    /// Open every parquet file under the data directory. Any failure here is
    /// fatal: the backend cannot serve a single request without the datasets.
    pub fn open(paths: &StoragePaths) -> anyhow::Result<Self> {
        let sources = paths.source_files();
        let missing = sources.missing();
        if !missing.is_empty() {
            return Err(anyhow!(
                "missing datasets under {}: {}",
                paths.data_dir.display(),
                missing
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }

        let mut conn = Connection::open_in_memory().context("open in-memory duckdb")?;
        create_or_replace_raw_views(&mut conn, &sources).context("create parquet views")?;
        Self::from_raw(conn)
    }

    /// Build the store over a connection that already has the `*_raw`
    /// relations (parquet views or plain tables).
    pub fn from_raw(conn: Connection) -> anyhow::Result<Self> {
        validate_raw_columns(&conn)?;
        install_derived_views(&conn).context("install derived views")?;
        let counts = count_rows(&conn).context("count dataset rows")?;
        tracing::info!(
            "Datasets loaded: payments={} ndc_names={} hcpcs_descriptions={} hospitals={} hospitals_340b={} prices={}",
            counts.payments,
            counts.ndc_names,
            counts.hcpcs_descriptions,
            counts.hospitals,
            counts.hospitals_340b,
            counts.prices
        );
        Ok(Self { conn, counts })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn counts(&self) -> &DatasetCounts {
        &self.counts
    }
}

/// `(column_name, column_type)` pairs of a view or table.
pub(crate) fn relation_columns(
    conn: &Connection,
    relation: &str,
) -> duckdb::Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(&format!("DESCRIBE {relation}"))?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<usize, String>(0)?, row.get::<usize, String>(1)?))
    })?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

fn create_or_replace_raw_views(conn: &mut Connection, sources: &SourceFiles) -> anyhow::Result<()> {
    for (view, path) in sources.views() {
        let path = sql_quote_path(path);
        conn.execute(
            &format!("CREATE OR REPLACE VIEW {view} AS SELECT * FROM read_parquet('{path}')"),
            [],
        )
        .with_context(|| format!("create view {view} over {path}"))?;
    }
    Ok(())
}

fn validate_raw_columns(conn: &Connection) -> anyhow::Result<()> {
    let required: [(&str, &[&str]); 6] = [
        ("payment_raw", PAYMENT_COLUMNS),
        ("ndc_names_raw", NDC_COLUMNS),
        ("hcpcs_desc_raw", HCPCS_COLUMNS),
        ("hospital_raw", HOSPITAL_COLUMNS),
        ("hospital340b_raw", HOSPITAL_340B_COLUMNS),
        ("prices_raw", PRICE_KEY_COLUMNS),
    ];
    for (relation, columns) in required {
        let present = relation_columns(conn, relation)
            .with_context(|| format!("describe {relation}"))?;
        let missing: Vec<&str> = columns
            .iter()
            .copied()
            .filter(|c| !present.iter().any(|(name, _)| name == c))
            .collect();
        if !missing.is_empty() {
            return Err(anyhow!(
                "{relation} is missing required columns: {}",
                missing.join(", ")
            ));
        }
    }
    Ok(())
}

fn retrieved_date_sql(column: &str) -> String {
    format!(
        "CAST(COALESCE(TRY_STRPTIME(CAST({column} AS VARCHAR), '{RETRIEVED_FORMAT}'), TRY_CAST({column} AS TIMESTAMP)) AS DATE)"
    )
}

fn install_derived_views(conn: &Connection) -> duckdb::Result<()> {
    let payment_retrieved = retrieved_date_sql("retrieved");
    conn.execute(
        &format!(
            r#"
            CREATE OR REPLACE VIEW payment_info AS
            SELECT
              CAST(hospital_unique_id AS VARCHAR) AS hospital_unique_id,
              CAST(ndc AS VARCHAR) AS ndc,
              CAST(hcpcs AS VARCHAR) AS hcpcs,
              CAST(description AS VARCHAR) AS description,
              CAST(setting AS VARCHAR) AS setting,
              COALESCE(NULLIF(TRY_CAST(drug_unit_of_measurement AS DOUBLE), 0), CAST(1.0 AS DOUBLE))
                AS drug_unit_of_measurement,
              CAST(drug_type_of_measurement AS VARCHAR) AS drug_type_of_measurement,
              CAST(payer_name AS VARCHAR) AS payer_name,
              CAST(plan_name AS VARCHAR) AS plan_name,
              CAST(mapped_plan_name AS VARCHAR) AS mapped_plan_name,
              CAST(mapped_lob_name AS VARCHAR) AS mapped_lob_name,
              TRY_CAST(standard_charge_gross AS DOUBLE) AS standard_charge_gross,
              TRY_CAST(standard_charge_discounted_cash AS DOUBLE) AS standard_charge_discounted_cash,
              TRY_CAST(standard_charge_negotiated_dollar AS DOUBLE) AS standard_charge_negotiated_dollar,
              TRY_CAST(standard_charge_negotiated_percentage AS DOUBLE) AS standard_charge_negotiated_percentage,
              CAST(standard_charge_methodology AS VARCHAR) AS standard_charge_methodology,
              TRY_CAST(calculated_negotiated_dollars AS BOOLEAN) AS calculated_negotiated_dollars,
              {payment_retrieved} AS retrieved
            FROM payment_raw
            "#
        ),
        [],
    )?;

    conn.execute(
        r#"
        CREATE OR REPLACE VIEW ndc_names AS
        SELECT CAST(product AS VARCHAR) AS product, CAST(ndc AS VARCHAR) AS ndc
        FROM ndc_names_raw
        "#,
        [],
    )?;

    conn.execute(
        &format!(
            r#"
            CREATE OR REPLACE VIEW hcpcs_desc AS
            SELECT CAST(hcpcs AS VARCHAR) AS hcpcs, CAST(hcpcs_desc AS VARCHAR) AS hcpcs_desc
            FROM hcpcs_desc_raw
            WHERE CAST(hcpcs AS VARCHAR) <> '{EXCLUDED_HCPCS_CODE}'
            "#
        ),
        [],
    )?;

    let hospital_retrieved = retrieved_date_sql("h.retrieved");
    conn.execute(
        &format!(
            r#"
            CREATE OR REPLACE VIEW hospitals AS
            SELECT
              CAST(h.unique_id AS VARCHAR) AS unique_id,
              CAST(h.name AS VARCHAR) AS name,
              CAST(h.state AS VARCHAR) AS state,
              TRY_CAST(h.beds AS BIGINT) AS beds,
              TRY_CAST(h.lat AS DOUBLE) AS lat,
              TRY_CAST(h."long" AS DOUBLE) AS "long",
              CAST(h.hospital_url AS VARCHAR) AS hospital_url,
              {hospital_retrieved} AS retrieved,
              b.program_type_long,
              b.unique_id IS NOT NULL AS is_340b
            FROM hospital_raw h
            LEFT JOIN (
              SELECT
                CAST(unique_id AS VARCHAR) AS unique_id,
                ANY_VALUE(CAST(program_type_long AS VARCHAR)) AS program_type_long
              FROM hospital340b_raw
              GROUP BY 1
            ) b ON CAST(h.unique_id AS VARCHAR) = b.unique_id
            "#
        ),
        [],
    )?;

    conn.execute("CREATE OR REPLACE VIEW prices AS SELECT * FROM prices_raw", [])?;
    Ok(())
}

fn count_rows(conn: &Connection) -> duckdb::Result<DatasetCounts> {
    Ok(DatasetCounts {
        payments: one_u64(conn, "SELECT COUNT(*) FROM payment_info")?,
        ndc_names: one_u64(conn, "SELECT COUNT(*) FROM ndc_names")?,
        hcpcs_descriptions: one_u64(conn, "SELECT COUNT(*) FROM hcpcs_desc")?,
        hospitals: one_u64(conn, "SELECT COUNT(*) FROM hospitals")?,
        hospitals_340b: one_u64(conn, "SELECT COUNT(*) FROM hospitals WHERE is_340b")?,
        prices: one_u64(conn, "SELECT COUNT(*) FROM prices")?,
    })
}

fn one_u64(conn: &Connection, sql: &str) -> duckdb::Result<u64> {
    let mut stmt = conn.prepare(sql)?;
    let v: i64 = stmt.query_row([], |row| row.get(0))?;
    Ok(v.max(0) as u64)
}

fn sql_quote_path(path: &Path) -> String {
    path.display().to_string().replace('\'', "''")
}
