use thiserror::Error;

/// Errors from resolving a selection string to codes.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("no HCPCS code matches description '{description}'")]
    NotFound { description: String },

    /// Several distinct codes share one description; a data-quality problem.
    #[error("HCPCS description '{description}' maps to {count} codes")]
    Ambiguous { description: String, count: usize },

    #[error(transparent)]
    Query(#[from] duckdb::Error),
}

/// Errors from filtering payment rows.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Query(#[from] duckdb::Error),
}

/// Errors from summarizing reference prices.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("invalid filter type '{mode}'; use 'ndc' or 'hcpcs'")]
    UnrecognizedMode { mode: String },

    #[error(transparent)]
    Query(#[from] duckdb::Error),
}

/// Errors from parsing or aggregating the visible grid rows.
#[derive(Debug, Error)]
pub enum VizError {
    #[error("visible row {row} is not an object")]
    NotAnObject { row: usize },

    #[error("visible row {row} is missing column '{column}'")]
    MissingColumn { row: usize, column: &'static str },

    #[error("visible row {row} column '{column}': expected {expected}, got {found}")]
    InvalidValue {
        row: usize,
        column: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error(transparent)]
    Query(#[from] duckdb::Error),
}
