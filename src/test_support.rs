use duckdb::Connection;

use crate::store::ReferenceStore;

pub const LISPRO_DESC: &str = "J1817 - INSULIN LISPRO (100 UNITS)";

pub fn create_raw_tables(conn: &Connection) {
    conn.execute_batch(
        r#"
        CREATE TABLE payment_raw (
          hospital_unique_id VARCHAR,
          ndc VARCHAR,
          hcpcs VARCHAR,
          description VARCHAR,
          setting VARCHAR,
          drug_unit_of_measurement DOUBLE,
          drug_type_of_measurement VARCHAR,
          payer_name VARCHAR,
          plan_name VARCHAR,
          mapped_plan_name VARCHAR,
          mapped_lob_name VARCHAR,
          standard_charge_gross DOUBLE,
          standard_charge_discounted_cash DOUBLE,
          standard_charge_negotiated_dollar DOUBLE,
          standard_charge_negotiated_percentage DOUBLE,
          standard_charge_methodology VARCHAR,
          calculated_negotiated_dollars BOOLEAN,
          retrieved VARCHAR
        );
        INSERT INTO payment_raw VALUES
          ('H1', '00002-7510-01', 'J1817', 'lispro zero unit', 'outpatient', 0, 'ML', 'Aetna', 'Open Access PPO', 'PPO', 'Commercial', 400, 250, 100, NULL, 'fee schedule', false, '2024-05-01T12:30:00.000Z'),
          ('H1', '00002-7510-01', 'J1817', 'lispro null unit', 'outpatient', NULL, 'ML', 'Cigna', 'HMO Gold', 'HMO', 'Commercial', 400, 250, 200, NULL, 'fee schedule', true, '2024-05-01T12:30:00.000Z'),
          ('H2', '00002-7510-17', 'J1817', 'lispro vial', 'inpatient', 10, 'UN', 'Aetna', 'Medicare Advantage', 'MA', 'Medicare', 900, 600, 300, NULL, 'case rate', false, '2024-06-15T08:00:00.000Z'),
          ('H9', '00002-7510-01', 'J1817', 'orphan row', 'outpatient', 1, 'ML', 'Aetna', 'PPO', 'PPO', 'Commercial', 10, 10, 999, NULL, 'fee schedule', false, NULL),
          ('H3', '50242-0060-01', 'J9035', 'bevacizumab', 'outpatient', 4, 'MG', 'United', 'Choice Plus', 'PPO', 'Commercial', 5000, 3000, 500, 65.0, 'percent of total billed charges', true, '2024-07-01T00:00:00.000Z'),
          ('H2', NULL, 'J8499', 'oral non chemo', 'outpatient', 1, 'EA', 'Aetna', 'PPO', 'PPO', 'Commercial', 80, 60, 50, NULL, 'fee schedule', false, NULL),
          ('H3', '00002-7510-17', 'J1817', 'lispro no price', 'outpatient', 10, 'UN', 'United', 'Choice Plus', 'PPO', 'Commercial', 900, NULL, NULL, 40.0, 'percent of total billed charges', false, NULL);

        CREATE TABLE ndc_names_raw (product VARCHAR, ndc VARCHAR);
        INSERT INTO ndc_names_raw VALUES
          ('HUMALOG', '00002-7510-01'),
          ('HUMALOG', '00002-7510-17'),
          ('AVASTIN', '50242-0060-01'),
          ('KEYTRUDA', '00006-3026-02');

        CREATE TABLE hcpcs_desc_raw (hcpcs VARCHAR, hcpcs_desc VARCHAR);
        INSERT INTO hcpcs_desc_raw VALUES
          ('J1817', 'J1817 - INSULIN LISPRO (100 UNITS)'),
          ('J9035', 'J9035 - BEVACIZUMAB (10 MG)'),
          ('J8499', 'J8499 - ORAL PRESCRIP DRUG NON CHEMO'),
          ('J9271', 'J9271 - PEMBROLIZUMAB (1 MG)'),
          ('J7701', 'DUPLICATED DESCRIPTION'),
          ('J7702', 'DUPLICATED DESCRIPTION');

        CREATE TABLE hospital_raw (
          unique_id VARCHAR,
          name VARCHAR,
          state VARCHAR,
          beds INTEGER,
          lat VARCHAR,
          "long" VARCHAR,
          hospital_url VARCHAR,
          retrieved VARCHAR
        );
        INSERT INTO hospital_raw VALUES
          ('H1', 'General Hospital', 'CA', 300, '34.05', '-118.24', 'https://general.example.org', '2024-05-01T12:30:00.000Z'),
          ('H2', 'County Medical Center', 'TX', 120, '29.76', '-95.36', 'https://county.example.org', '2024-06-15T08:00:00.000Z'),
          ('H3', 'Lakeside Clinic', 'NY', 80, '40.71', '-74.00', NULL, '2024-07-01');

        CREATE TABLE hospital340b_raw (unique_id VARCHAR, program_type_long VARCHAR);
        INSERT INTO hospital340b_raw VALUES
          ('H2', 'Disproportionate Share Hospital');

        CREATE TABLE prices_raw (
          product VARCHAR,
          hcpcs VARCHAR,
          asp_desc VARCHAR,
          asp_dosage VARCHAR,
          asp DOUBLE,
          wac DOUBLE,
          nadac DOUBLE
        );
        INSERT INTO prices_raw VALUES
          ('HUMALOG', 'J1817', 'INSULIN LISPRO', '100 UNITS', 2.5, 30.004, NULL),
          ('HUMALOG', 'J1817', 'INSULIN LISPRO', '100 UNITS', 2.5, 31.0, 12.0),
          ('AVASTIN', 'J9035', 'BEVACIZUMAB', '10 MG', 70.1, NULL, NULL),
          ('ZEPBOUND', 'J3490', 'UNCLASSIFIED DRUGS', '1 EA', NULL, 1000.0, NULL),
          ('KEYTRUDA', 'J9271', 'PEMBROLIZUMAB', '1 MG', 55.55, 60.0, NULL);
        "#,
    )
    .expect("create fixture tables");
}

pub fn fixture_store() -> ReferenceStore {
    fixture_store_with("")
}

/// The fixture store after running `extra_sql` against the raw tables.
pub fn fixture_store_with(extra_sql: &str) -> ReferenceStore {
    let conn = Connection::open_in_memory().expect("open in-memory duckdb");
    create_raw_tables(&conn);
    conn.execute_batch(extra_sql).expect("apply fixture changes");
    ReferenceStore::from_raw(conn).expect("build fixture store")
}
