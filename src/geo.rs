use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::VizError;
use crate::hospitals::hospitals_by_id;
use crate::store::ReferenceStore;
use crate::visible::VisibleRow;

const MIN_MARKER_SIZE: f64 = 4.0;
const MARKER_SIZE_SPAN: f64 = 26.0;
const COLOR_LOWER_QUANTILE: f64 = 0.05;
const COLOR_UPPER_QUANTILE: f64 = 0.95;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub hospital_unique_id: String,
    pub name: Option<String>,
    pub state: Option<String>,
    pub lat: Option<f64>,
    pub long: Option<f64>,
    /// Mean negotiated dollar amount across the hospital's visible rows.
    pub standard_charge_negotiated_dollar: f64,
    pub marker_size: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorRange {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapAggregate {
    pub points: Vec<MapPoint>,
    /// 5th..95th percentile of the point prices; `None` without points.
    pub color_range: Option<ColorRange>,
}

/// Per-hospital mean negotiated price, joined back to hospital coordinates.
pub fn map_aggregate(store: &ReferenceStore, rows: &[VisibleRow]) -> Result<MapAggregate, VizError> {
    let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for r in rows {
        let Some(id) = r.hospital_unique_id.as_deref() else {
            continue;
        };
        let entry = sums.entry(id).or_insert((0.0, 0));
        if let Some(price) = r.standard_charge_negotiated_dollar {
            entry.0 += price;
            entry.1 += 1;
        }
    }

    let ids: Vec<&str> = sums.keys().copied().collect();
    let hospitals = hospitals_by_id(store, &ids)?;

    let mut points = Vec::new();
    for (id, (sum, count)) in sums {
        if count == 0 {
            continue;
        }
        let Some(h) = hospitals.get(id) else {
            continue;
        };
        points.push(MapPoint {
            hospital_unique_id: id.to_string(),
            name: h.name.clone(),
            state: h.state.clone(),
            lat: h.lat,
            long: h.long,
            standard_charge_negotiated_dollar: sum / count as f64,
            marker_size: MIN_MARKER_SIZE,
        });
    }

    let prices: Vec<f64> = points
        .iter()
        .map(|p| p.standard_charge_negotiated_dollar)
        .collect();
    for (p, size) in points.iter_mut().zip(marker_sizes(&prices)) {
        p.marker_size = size;
    }

    let color_range = match (
        quantile_nearest(&prices, COLOR_LOWER_QUANTILE),
        quantile_nearest(&prices, COLOR_UPPER_QUANTILE),
    ) {
        (Some(lower), Some(upper)) => Some(ColorRange { lower, upper }),
        _ => None,
    };

    Ok(MapAggregate {
        points,
        color_range,
    })
}

/// Linear scale of each value onto `[4, 30]`. A single distinct value
/// divides zero by zero; that NaN becomes the minimum size.
pub fn marker_sizes(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    values
        .iter()
        .map(|v| {
            let size = (v - min) / (max - min) * MARKER_SIZE_SPAN + MIN_MARKER_SIZE;
            if size.is_nan() { MIN_MARKER_SIZE } else { size }
        })
        .collect()
}

/// Quantile picking the nearest observed value.
pub fn quantile_nearest(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let idx = ((sorted.len() - 1) as f64 * q).round() as usize;
    sorted.get(idx.min(sorted.len() - 1)).copied()
}
