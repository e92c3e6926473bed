//! Normalized time-series inputs.
//!
//! The core never reads files. It receives six already-scaled series (kW) and
//! consumes the first `H` samples of each through [`TimeSeriesInputs::window`],
//! which is also where the input contract is enforced.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, HubflowResult};

/// The six input series consumed per time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    CoolingDemand,
    GasHeatingDemand,
    NetworkHeatingDemand,
    SubstationHeatingDemand,
    PvProduction,
    ElectricityDemand,
}

impl SeriesKind {
    pub const ALL: [SeriesKind; 6] = [
        SeriesKind::CoolingDemand,
        SeriesKind::GasHeatingDemand,
        SeriesKind::NetworkHeatingDemand,
        SeriesKind::SubstationHeatingDemand,
        SeriesKind::PvProduction,
        SeriesKind::ElectricityDemand,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SeriesKind::CoolingDemand => "cooling_demand",
            SeriesKind::GasHeatingDemand => "gas_heating_demand",
            SeriesKind::NetworkHeatingDemand => "network_heating_demand",
            SeriesKind::SubstationHeatingDemand => "substation_heating_demand",
            SeriesKind::PvProduction => "pv_production",
            SeriesKind::ElectricityDemand => "electricity_demand",
        }
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SeriesKind {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SeriesKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| DispatchError::Parse(format!("unknown series '{s}'")))
    }
}

/// One named series, as handed over by ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSeries {
    pub kind: SeriesKind,
    pub values: Vec<f64>,
}

impl InputSeries {
    pub fn new(kind: SeriesKind, values: Vec<f64>) -> Self {
        Self { kind, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Raw series of arbitrary length, before the horizon is applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeriesInputs {
    series: BTreeMap<SeriesKind, Vec<f64>>,
}

impl TimeSeriesInputs {
    pub fn builder() -> TimeSeriesInputsBuilder {
        TimeSeriesInputsBuilder::default()
    }

    /// Every series set to `value` for `len` steps.
    pub fn constant(len: usize, value: f64) -> Self {
        let series = SeriesKind::ALL
            .into_iter()
            .map(|kind| (kind, vec![value; len]))
            .collect();
        Self { series }
    }

    pub fn insert(&mut self, series: InputSeries) {
        self.series.insert(series.kind, series.values);
    }

    pub fn get(&self, kind: SeriesKind) -> Option<&[f64]> {
        self.series.get(&kind).map(Vec::as_slice)
    }

    /// Longest horizon all six series can support.
    pub fn max_horizon(&self) -> usize {
        SeriesKind::ALL
            .iter()
            .map(|kind| self.get(*kind).map_or(0, <[f64]>::len))
            .min()
            .unwrap_or(0)
    }

    /// Validate and truncate every series to the first `horizon` samples.
    pub fn window(&self, horizon: usize) -> HubflowResult<HorizonInputs> {
        if horizon == 0 {
            return Err(DispatchError::Configuration(
                "horizon must be at least one step".into(),
            ));
        }
        let mut series = BTreeMap::new();
        for kind in SeriesKind::ALL {
            let values = self
                .get(kind)
                .ok_or_else(|| DispatchError::data(kind.name(), "series is missing"))?;
            if values.len() < horizon {
                return Err(DispatchError::data(
                    kind.name(),
                    format!(
                        "has {} samples, horizon requires {}",
                        values.len(),
                        horizon
                    ),
                ));
            }
            let window = &values[..horizon];
            if let Some((idx, bad)) = window
                .iter()
                .enumerate()
                .find(|(_, v)| !v.is_finite() || **v < 0.0)
            {
                return Err(DispatchError::data(
                    kind.name(),
                    format!("sample {idx} is {bad}, expected a finite non-negative value"),
                ));
            }
            if values.len() > horizon {
                tracing::debug!(
                    series = kind.name(),
                    ignored = values.len() - horizon,
                    "trailing samples beyond horizon ignored"
                );
            }
            series.insert(kind, window.to_vec());
        }
        Ok(HorizonInputs { horizon, series })
    }
}

#[derive(Debug, Default)]
pub struct TimeSeriesInputsBuilder {
    inputs: TimeSeriesInputs,
}

impl TimeSeriesInputsBuilder {
    pub fn series(mut self, kind: SeriesKind, values: impl Into<Vec<f64>>) -> Self {
        self.inputs.insert(InputSeries::new(kind, values.into()));
        self
    }

    pub fn build(self) -> TimeSeriesInputs {
        self.inputs
    }
}

/// Validated inputs holding exactly `horizon` samples per series.
#[derive(Debug, Clone, PartialEq)]
pub struct HorizonInputs {
    horizon: usize,
    series: BTreeMap<SeriesKind, Vec<f64>>,
}

impl HorizonInputs {
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Sample of `kind` at step `t`. Panics if `t >= horizon`.
    pub fn sample(&self, kind: SeriesKind, t: usize) -> f64 {
        self.series(kind)[t]
    }

    pub fn series(&self, kind: SeriesKind) -> &[f64] {
        // window() guarantees all six kinds are present
        self.series.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total(&self, kind: SeriesKind) -> f64 {
        self.series(kind).iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_window_has_exact_length() {
        let inputs = TimeSeriesInputs::constant(10, 1.5);
        let window = inputs.window(4).unwrap();
        assert_eq!(window.horizon(), 4);
        for kind in SeriesKind::ALL {
            assert_eq!(window.series(kind), &[1.5; 4]);
        }
        assert_eq!(window.sample(SeriesKind::PvProduction, 3), 1.5);
    }

    #[test]
    fn missing_series_is_data_error() {
        let inputs = TimeSeriesInputs::builder()
            .series(SeriesKind::CoolingDemand, vec![1.0, 2.0])
            .build();
        let err = inputs.window(2).unwrap_err();
        match err {
            DispatchError::Data { series, detail } => {
                assert_eq!(series, "gas_heating_demand");
                assert!(detail.contains("missing"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn short_series_names_lengths() {
        let mut inputs = TimeSeriesInputs::constant(5, 1.0);
        inputs.insert(InputSeries::new(SeriesKind::PvProduction, vec![0.0; 3]));
        let err = inputs.window(5).unwrap_err().to_string();
        assert!(err.contains("pv_production"));
        assert!(err.contains("has 3 samples, horizon requires 5"));
        assert_eq!(inputs.max_horizon(), 3);
    }

    #[test]
    fn negative_sample_names_index() {
        let mut inputs = TimeSeriesInputs::constant(4, 1.0);
        inputs.insert(InputSeries::new(
            SeriesKind::ElectricityDemand,
            vec![1.0, 1.0, -0.5, 1.0],
        ));
        let err = inputs.window(4).unwrap_err().to_string();
        assert!(err.contains("electricity_demand"));
        assert!(err.contains("sample 2"));
    }

    #[test]
    fn invalid_samples_beyond_horizon_are_ignored() {
        let mut inputs = TimeSeriesInputs::constant(4, 1.0);
        inputs.insert(InputSeries::new(
            SeriesKind::CoolingDemand,
            vec![1.0, 1.0, f64::NAN, 1.0],
        ));
        assert!(inputs.window(2).is_ok());
        assert!(inputs.window(3).is_err());
    }

    #[test]
    fn zero_horizon_rejected() {
        let inputs = TimeSeriesInputs::constant(4, 1.0);
        assert!(matches!(
            inputs.window(0),
            Err(DispatchError::Configuration(_))
        ));
    }

    #[test]
    fn series_kind_parses_names() {
        for kind in SeriesKind::ALL {
            assert_eq!(kind.name().parse::<SeriesKind>().unwrap(), kind);
        }
        assert!("solar".parse::<SeriesKind>().is_err());
    }
}
