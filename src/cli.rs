use clap::{Parser, Subcommand, ValueEnum};

use crate::lookup::SelectionMode;

const DEFAULT_DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data");

#[derive(Parser, Debug)]
#[command(name = "hospital-prices")]
#[command(about = "Hospital price transparency backend (DuckDB over parquet)", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the HTTP API.
    Serve(ServeArgs),
    /// Print the selectable options for a mode, one per line.
    Options(OptionsArgs),
    /// Run one selection through the pipeline and print the result as JSON.
    Query(QueryArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Hcpcs,
    Ndc,
}

impl From<ModeArg> for SelectionMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Hcpcs => SelectionMode::Hcpcs,
            ModeArg::Ndc => SelectionMode::Ndc,
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Directory holding the parquet datasets.
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,

    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, default_value_t = 8787)]
    pub port: u16,
}

#[derive(clap::Args, Debug, Clone)]
pub struct OptionsArgs {
    /// Directory holding the parquet datasets.
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,

    #[arg(long, value_enum)]
    pub mode: ModeArg,
}

#[derive(clap::Args, Debug, Clone)]
pub struct QueryArgs {
    /// Directory holding the parquet datasets.
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,

    #[arg(long, value_enum)]
    pub mode: ModeArg,

    /// HCPCS description (hcpcs mode) or product name (ndc mode).
    #[arg(long)]
    pub selection: String,

    /// Maximum number of grid rows to print.
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}
