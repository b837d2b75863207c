use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::visible::VisibleRow;

/// Price per unit for one hospital in one unit of measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionPoint {
    pub name: Option<String>,
    pub drug_type_of_measurement: Option<String>,
    /// `"{unit}\n({hospital_count})"`; `None` when the unit is unknown.
    pub category: Option<String>,
    pub hospital_count: usize,
    pub price_per_unit: Option<f64>,
}

#[derive(Default)]
struct Acc {
    price_sum: f64,
    price_n: usize,
    unit_sum: f64,
    unit_n: usize,
}

/// Group visible rows by (hospital name, unit type) and compute
/// `round(mean(negotiated) / mean(unit), 2)`. A missing unit counts as 1.0.
pub fn distribution_aggregate(rows: &[VisibleRow]) -> Vec<DistributionPoint> {
    let mut groups: BTreeMap<(Option<&str>, Option<&str>), Acc> = BTreeMap::new();
    for r in rows {
        let key = (
            r.drug_type_of_measurement.as_deref(),
            r.name.as_deref(),
        );
        let acc = groups.entry(key).or_default();
        if let Some(price) = r.standard_charge_negotiated_dollar {
            acc.price_sum += price;
            acc.price_n += 1;
        }
        acc.unit_sum += r.drug_unit_of_measurement.unwrap_or(1.0);
        acc.unit_n += 1;
    }

    let mut hospitals_per_unit: HashMap<Option<&str>, HashSet<Option<&str>>> = HashMap::new();
    for (unit, name) in groups.keys() {
        hospitals_per_unit.entry(*unit).or_default().insert(*name);
    }

    groups
        .into_iter()
        .map(|((unit, name), acc)| {
            let hospital_count = hospitals_per_unit.get(&unit).map_or(0, HashSet::len);
            let price_per_unit = (acc.price_n > 0).then(|| {
                let mean_price = acc.price_sum / acc.price_n as f64;
                let mean_unit = acc.unit_sum / acc.unit_n as f64;
                round2(mean_price / mean_unit)
            });
            DistributionPoint {
                name: name.map(str::to_string),
                drug_type_of_measurement: unit.map(str::to_string),
                category: unit.map(|u| format!("{u}\n({hospital_count})")),
                hospital_count,
                price_per_unit,
            }
        })
        .collect()
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
