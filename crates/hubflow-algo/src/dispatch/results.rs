//! Post-solve extraction of per-step flows and aggregate totals.

use std::collections::BTreeMap;

use hubflow_core::{DispatchError, HubflowResult, Link};
use serde::Serialize;

use super::constraints::DispatchModel;
use super::lexicographic::{ObjectiveValue, PhaseReport, SolveReport, SolveStatus};

/// Solved flow of one link over the horizon
#[derive(Debug, Clone, Serialize)]
pub struct LinkSeries {
    pub link: Link,
    pub key: &'static str,
    pub values: Vec<f64>,
}

impl LinkSeries {
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

/// Read-only dispatch plan
#[derive(Debug, Clone, Serialize)]
pub struct DispatchResult {
    pub horizon: usize,
    pub status: SolveStatus,
    /// One entry per link, in link-table order
    #[serde(skip)]
    pub flows: Vec<LinkSeries>,
    /// Running sum of the storage link flow
    #[serde(skip)]
    pub storage_cumulative: Vec<f64>,
    pub totals: BTreeMap<String, f64>,
    pub objectives: Vec<ObjectiveValue>,
    pub phases: Vec<PhaseReport>,
}

impl DispatchResult {
    pub fn series(&self, link: Link) -> &[f64] {
        &self.flows[link.index()].values
    }

    pub fn total(&self, key: &str) -> Option<f64> {
        self.totals.get(key).copied()
    }
}

fn running_sum(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(0.0, |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// Read the solved model into a [`DispatchResult`].
pub fn extract(model: &DispatchModel, report: &SolveReport) -> HubflowResult<DispatchResult> {
    if !report.status.is_success() {
        return Err(DispatchError::ResultUnavailable(report.status.to_string()));
    }
    if report.values.len() != model.spec().num_variables() {
        return Err(DispatchError::ResultUnavailable(format!(
            "{} (solution holds {} values for {} variables)",
            report.status,
            report.values.len(),
            model.spec().num_variables()
        )));
    }

    let flows: Vec<LinkSeries> = Link::all()
        .map(|link| LinkSeries {
            link,
            key: link.key(),
            values: model
                .link_series(link)
                .iter()
                .map(|var| report.values[var.index()])
                .collect(),
        })
        .collect();
    let storage_cumulative = running_sum(&flows[Link::STORAGE.index()].values);

    let mut totals: BTreeMap<String, f64> = flows
        .iter()
        .map(|series| (series.key.to_string(), series.total()))
        .collect();
    let total = |link: Link| flows[link.index()].total();

    let pv = total(Link::PvToLv);
    let mv = total(Link::MvToLv);
    let lake = total(Link::LakeToHpLake);
    let mp = total(Link::MpToGas);
    let prices = model.prices();
    let emissions = model.conversion().emissions();
    let (storage_min, storage_max) = min_max(&storage_cumulative);
    let (backfeed_min, backfeed_max) = min_max(&flows[Link::LvToMv.index()].values);

    let derived = [
        ("total_sources", pv + mv + lake + mp),
        ("renewable", lake + pv),
        ("imported_electricity", mv),
        ("imported_gas", mp),
        ("import_cost", prices.electricity * mv + prices.gas * mp),
        (
            "storage_cumulative_final",
            storage_cumulative.last().copied().unwrap_or(0.0),
        ),
        ("storage_cumulative_min", storage_min),
        ("storage_cumulative_max", storage_max),
        ("lv_mv_min", backfeed_min),
        ("lv_mv_max", backfeed_max),
        ("co2_emissions", emissions.gas * mp + emissions.electricity * mv),
    ];
    totals.extend(derived.iter().map(|(k, v)| (k.to_string(), *v)));

    Ok(DispatchResult {
        horizon: model.horizon(),
        status: report.status.clone(),
        flows,
        storage_cumulative,
        totals,
        objectives: report.objective_values.clone(),
        phases: report.phases.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::constraints::DispatchModelBuilder;
    use hubflow_core::{ConversionModel, DispatchParams, TimeSeriesInputs, Topology};

    fn model(horizon: usize) -> DispatchModel {
        let inputs = TimeSeriesInputs::constant(horizon, 10.0)
            .window(horizon)
            .unwrap();
        DispatchModelBuilder::new(
            Topology::district(),
            ConversionModel::default(),
            inputs,
            &DispatchParams::default(),
        )
        .build()
    }

    #[test]
    fn failed_status_is_unavailable() {
        let m = model(2);
        let err = extract(&m, &SolveReport::not_solved()).unwrap_err();
        assert!(matches!(err, DispatchError::ResultUnavailable(_)));
    }

    #[test]
    fn totals_from_synthetic_solution() {
        let m = model(3);
        let mut values = vec![0.0; m.spec().num_variables()];
        for (t, v) in [2.0, -1.0, -1.0].iter().enumerate() {
            values[m.flow(Link::StorageToGas, t).index()] = *v;
        }
        for t in 0..3 {
            values[m.flow(Link::MvToLv, t).index()] = 1.0;
            values[m.flow(Link::MpToGas, t).index()] = 2.0;
            values[m.flow(Link::PvToLv, t).index()] = 0.5;
            values[m.flow(Link::LvToMv, t).index()] = t as f64;
        }
        let report = SolveReport {
            status: SolveStatus::Optimal,
            values,
            phases: Vec::new(),
            objective_values: Vec::new(),
        };
        let result = extract(&m, &report).unwrap();

        assert_eq!(result.storage_cumulative, vec![2.0, 1.0, 0.0]);
        assert_eq!(result.total("storage_cumulative_max"), Some(2.0));
        assert_eq!(result.total("storage_cumulative_final"), Some(0.0));
        assert_eq!(result.total("mv"), Some(3.0));
        assert_eq!(result.total("total_sources"), Some(3.0 + 6.0 + 1.5));
        assert_eq!(result.total("renewable"), Some(1.5));
        assert_eq!(result.total("lv_mv_max"), Some(2.0));
        assert_eq!(result.total("lv_mv_min"), Some(0.0));
        let cost = result.total("import_cost").unwrap();
        assert!((cost - (17.68 * 3.0 + 9.5 * 6.0)).abs() < 1e-9);
        let co2 = result.total("co2_emissions").unwrap();
        assert!((co2 - (0.184 * 6.0 + 0.0236 * 3.0)).abs() < 1e-12);
        assert_eq!(result.series(Link::MpToGas), &[2.0, 2.0, 2.0]);
        assert_eq!(result.flows.len(), Link::COUNT);
    }
}
