use serde::Serialize;
use serde_json::Value;

use crate::distribution::{DistributionPoint, distribution_aggregate};
use crate::geo::{MapAggregate, map_aggregate};
use crate::lookup::{SelectionMode, list_options, resolve_hcpcs_code};
use crate::payments::{GridRow, filter_payments};
use crate::prices::{PriceSummary, summarize_prices};
use crate::store::ReferenceStore;
use crate::visible::parse_visible_rows;

#[derive(Debug, Clone, Serialize)]
pub struct SelectionOptions {
    pub options: Vec<String>,
    /// First option, preselected by the selection control.
    pub default: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectionView {
    pub rows: Vec<GridRow>,
    pub prices: PriceSummary,
}

impl SelectionView {
    fn empty() -> Self {
        Self {
            rows: Vec::new(),
            prices: PriceSummary::no_pricing(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Visualizations {
    pub map: MapAggregate,
    pub distribution: Vec<DistributionPoint>,
}

pub fn selection_options(store: &ReferenceStore, mode: SelectionMode) -> SelectionOptions {
    let options = list_options(store, mode).unwrap_or_else(|e| {
        tracing::warn!("listing {} options failed: {}", mode.as_str(), e);
        Vec::new()
    });
    SelectionOptions {
        default: options.first().cloned(),
        options,
    }
}

/// Grid rows and price summary for one selection.
///
/// The two halves are computed independently; a failure in one does not
/// empty the other. In `"hcpcs"` mode the description is resolved to its code
/// before summarizing; in `"ndc"` mode the product name is summarized as-is.
pub fn refresh_selection(store: &ReferenceStore, mode: &str, selection: Option<&str>) -> SelectionView {
    let Some(selection) = selection.filter(|s| !s.trim().is_empty()) else {
        return SelectionView::empty();
    };

    let rows = filter_payments(store, mode, selection).unwrap_or_else(|e| {
        tracing::warn!("filter payments ({mode}, {selection:?}) failed: {e}");
        Vec::new()
    });

    let lookup_value = if SelectionMode::parse(mode) == Some(SelectionMode::Hcpcs) {
        match resolve_hcpcs_code(store, selection) {
            Ok(code) => Some(code),
            Err(e) => {
                tracing::warn!("price lookup for {selection:?} failed: {e}");
                None
            }
        }
    } else {
        Some(selection.to_string())
    };

    let prices = match lookup_value {
        Some(value) => summarize_prices(store, mode, &value).unwrap_or_else(|e| {
            tracing::warn!("summarize prices ({mode}, {value:?}) failed: {e}");
            PriceSummary::no_pricing()
        }),
        None => PriceSummary::no_pricing(),
    };

    tracing::info!(
        "selection mode={} rows={} price_rows={}",
        mode,
        rows.len(),
        prices.rows().len()
    );
    SelectionView { rows, prices }
}

/// Map and distribution inputs for the currently visible grid rows, or
/// `None` when there is nothing (valid) to aggregate.
pub fn visualize(store: &ReferenceStore, rows: &[Value]) -> Option<Visualizations> {
    if rows.is_empty() {
        return None;
    }
    let visible = match parse_visible_rows(rows) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("skipping visualization update: {e}");
            return None;
        }
    };
    let map = match map_aggregate(store, &visible) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!("skipping visualization update: {e}");
            return None;
        }
    };
    Some(Visualizations {
        map,
        distribution: distribution_aggregate(&visible),
    })
}
