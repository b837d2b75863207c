use anyhow::Context;
use serde::Serialize;

use crate::cli::{OptionsArgs, QueryArgs};
use crate::dashboard::{refresh_selection, selection_options};
use crate::lookup::SelectionMode;
use crate::payments::GridRow;
use crate::prices::PriceSummary;
use crate::storage::StoragePaths;
use crate::store::ReferenceStore;

#[derive(Debug, Serialize)]
struct QueryOutput<'a> {
    mode: &'static str,
    selection: &'a str,
    row_count: usize,
    rows: &'a [GridRow],
    prices: &'a PriceSummary,
}

pub fn run(opts: QueryArgs) -> anyhow::Result<()> {
    let store = open_store(&opts.data_dir)?;
    let mode = SelectionMode::from(opts.mode);

    let t0 = std::time::Instant::now();
    let view = refresh_selection(&store, mode.as_str(), Some(&opts.selection));
    tracing::info!(
        "Query finished in {:.1}s: rows={}",
        t0.elapsed().as_secs_f64(),
        view.rows.len()
    );

    let shown = view.rows.len().min(opts.limit);
    let out = QueryOutput {
        mode: mode.as_str(),
        selection: &opts.selection,
        row_count: view.rows.len(),
        rows: &view.rows[..shown],
        prices: &view.prices,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&out).context("serialize query output")?
    );
    Ok(())
}

pub fn run_options(opts: OptionsArgs) -> anyhow::Result<()> {
    let store = open_store(&opts.data_dir)?;
    for option in selection_options(&store, opts.mode.into()).options {
        println!("{option}");
    }
    Ok(())
}

fn open_store(data_dir: &str) -> anyhow::Result<ReferenceStore> {
    let paths = StoragePaths::new(data_dir);
    ReferenceStore::open(&paths).with_context(|| format!("load datasets from {data_dir}"))
}
