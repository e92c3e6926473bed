//! Run configuration loaded from TOML.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) describes the historical district run:
//!
//! ```toml
//! [run]
//! horizon = 10752
//! secondary = "rejection"
//!
//! [prices]
//! electricity = 17.68
//! gas = 9.5
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::conversion::{ConversionModel, ConversionRatios, DesignTemperatures, EmissionFactors};
use crate::error::{DispatchError, HubflowResult};
use crate::inputs::SeriesKind;

/// Top-level configuration of one dispatch run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub run: DispatchParams,
    #[serde(default)]
    pub temperatures: DesignTemperatures,
    #[serde(default)]
    pub ratios: ConversionRatios,
    #[serde(default)]
    pub emissions: EmissionFactors,
    #[serde(default)]
    pub prices: ImportPrices,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub inputs: InputsConfig,
}

impl DispatchConfig {
    pub fn from_toml_str(contents: &str) -> HubflowResult<Self> {
        let config: DispatchConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file. Relative input paths are resolved against the
    /// file's directory.
    pub fn load(path: &Path) -> HubflowResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&contents)?;
        if let Some(base) = path.parent() {
            config.inputs.resolve_relative_to(base);
        }
        Ok(config)
    }

    pub fn to_toml_string(&self) -> HubflowResult<String> {
        toml::to_string_pretty(self).map_err(|err| DispatchError::Parse(err.to_string()))
    }

    /// Evaluate the conversion coefficients of this configuration.
    pub fn conversion_model(&self) -> HubflowResult<ConversionModel> {
        ConversionModel::from_config(self.temperatures, self.ratios, self.emissions)
    }

    pub fn validate(&self) -> HubflowResult<()> {
        fn check(ok: bool, message: impl FnOnce() -> String) -> HubflowResult<()> {
            if ok {
                Ok(())
            } else {
                Err(DispatchError::Configuration(message()))
            }
        }

        let run = &self.run;
        check(run.horizon > 0, || "run.horizon must be at least 1".into())?;
        check(run.pv_scale.is_finite() && run.pv_scale >= 0.0, || {
            format!("run.pv_scale must be finite and non-negative, got {}", run.pv_scale)
        })?;
        check(
            run.primary_rel_tol.is_finite() && run.primary_rel_tol >= 0.0,
            || {
                format!(
                    "run.primary_rel_tol must be finite and non-negative, got {}",
                    run.primary_rel_tol
                )
            },
        )?;
        for (name, price) in [
            ("electricity", self.prices.electricity),
            ("gas", self.prices.gas),
        ] {
            check(price.is_finite(), || {
                format!("prices.{name} must be finite, got {price}")
            })?;
        }
        if let Some(gap) = self.solver.mip_gap {
            check((0.0..1.0).contains(&gap), || {
                format!("solver.mip_gap must lie in [0, 1), got {gap}")
            })?;
        }
        check(
            self.solver.abs_tolerance.is_finite() && self.solver.abs_tolerance >= 0.0,
            || "solver.abs_tolerance must be finite and non-negative".into(),
        )?;
        for (name, scale) in [
            ("unit_scale", self.inputs.unit_scale),
            ("pv_unit_scale", self.inputs.pv_unit_scale),
        ] {
            check(scale.is_finite() && scale > 0.0, || {
                format!("inputs.{name} must be positive, got {scale}")
            })?;
        }
        if let Some(n) = self.inputs.spread {
            check(n >= 1, || "inputs.spread must be at least 1".into())?;
        }
        Ok(())
    }
}

/// Secondary objective resolved after import cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecondaryObjective {
    /// Minimize heat rejected from the low-temperature network
    #[default]
    Rejection,
    /// Minimize the spread of the cumulative storage curve
    StorageSwing,
    /// Minimize the spread of low-voltage backfeed into the feeder
    BackfeedSwing,
}

impl SecondaryObjective {
    pub fn as_str(self) -> &'static str {
        match self {
            SecondaryObjective::Rejection => "rejection",
            SecondaryObjective::StorageSwing => "storage-swing",
            SecondaryObjective::BackfeedSwing => "backfeed-swing",
        }
    }
}

impl fmt::Display for SecondaryObjective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecondaryObjective {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rejection" | "reject" => Ok(SecondaryObjective::Rejection),
            "storage-swing" | "storage" => Ok(SecondaryObjective::StorageSwing),
            "backfeed-swing" | "backfeed" => Ok(SecondaryObjective::BackfeedSwing),
            other => Err(DispatchError::Configuration(format!(
                "unknown secondary objective '{other}' (expected rejection, storage-swing or backfeed-swing)"
            ))),
        }
    }
}

fn default_horizon() -> usize {
    96 * 7 * 4 * 4
}

fn default_pv_scale() -> f64 {
    0.1
}

fn default_primary_rel_tol() -> f64 {
    0.1
}

/// Run parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchParams {
    /// Number of time steps H
    #[serde(default = "default_horizon")]
    pub horizon: usize,
    #[serde(default)]
    pub secondary: SecondaryObjective,
    /// Multiplier applied to the PV input series
    #[serde(default = "default_pv_scale")]
    pub pv_scale: f64,
    /// Relative degradation allowed on import cost while optimizing the secondary objective
    #[serde(default = "default_primary_rel_tol")]
    pub primary_rel_tol: f64,
}

impl Default for DispatchParams {
    fn default() -> Self {
        Self {
            horizon: default_horizon(),
            secondary: SecondaryObjective::default(),
            pv_scale: default_pv_scale(),
            primary_rel_tol: default_primary_rel_tol(),
        }
    }
}

fn default_electricity_price() -> f64 {
    17.68
}

fn default_gas_price() -> f64 {
    9.5
}

/// Weights of the two external supplies in the import cost
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImportPrices {
    /// Weight of mv→lv
    #[serde(default = "default_electricity_price")]
    pub electricity: f64,
    /// Weight of mp→gas
    #[serde(default = "default_gas_price")]
    pub gas: f64,
}

impl Default for ImportPrices {
    fn default() -> Self {
        Self {
            electricity: default_electricity_price(),
            gas: default_gas_price(),
        }
    }
}

fn default_lp_solver() -> String {
    "clarabel".to_string()
}

fn default_abs_tolerance() -> f64 {
    1e-6
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// LP backend: clarabel or highs
    #[serde(default = "default_lp_solver")]
    pub lp_solver: String,
    /// Relative optimality gap, forwarded to backends that support it
    #[serde(default)]
    pub mip_gap: Option<f64>,
    /// Absolute slack added to each lexicographic bound
    #[serde(default = "default_abs_tolerance")]
    pub abs_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            lp_solver: default_lp_solver(),
            mip_gap: None,
            abs_tolerance: default_abs_tolerance(),
        }
    }
}

fn default_unit_scale() -> f64 {
    1.0 / 1000.0
}

fn default_pv_unit_scale() -> f64 {
    1.0
}

/// Where and how time series are ingested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputsConfig {
    /// Directory holding one JSON array per series
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Single CSV file with one column per series (takes precedence over `dir`)
    #[serde(default)]
    pub csv: Option<PathBuf>,
    /// Multiplier applied to every raw demand sample (W to kW by default)
    #[serde(default = "default_unit_scale")]
    pub unit_scale: f64,
    /// Multiplier applied to raw PV samples, which already arrive normalized
    #[serde(default = "default_pv_unit_scale")]
    pub pv_unit_scale: f64,
    /// Interpolate each interval into this many sub-steps
    #[serde(default)]
    pub spread: Option<usize>,
    #[serde(default)]
    pub files: SeriesFiles,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            csv: None,
            unit_scale: default_unit_scale(),
            pv_unit_scale: default_pv_unit_scale(),
            spread: None,
            files: SeriesFiles::default(),
        }
    }
}

impl InputsConfig {
    fn resolve_relative_to(&mut self, base: &Path) {
        for path in [&mut self.dir, &mut self.csv].into_iter().flatten() {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// File name of each series inside the input directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesFiles {
    #[serde(default = "default_cooling_file")]
    pub cooling_demand: String,
    #[serde(default = "default_gas_heating_file")]
    pub gas_heating_demand: String,
    #[serde(default = "default_network_heating_file")]
    pub network_heating_demand: String,
    #[serde(default = "default_substation_heating_file")]
    pub substation_heating_demand: String,
    #[serde(default = "default_pv_file")]
    pub pv_production: String,
    #[serde(default = "default_electricity_file")]
    pub electricity_demand: String,
}

fn default_cooling_file() -> String {
    "aggregated_cooling_needs.json".to_string()
}

fn default_gas_heating_file() -> String {
    "aggregated_heating_needs_gas.json".to_string()
}

fn default_network_heating_file() -> String {
    "aggregated_heating_needs_net.json".to_string()
}

fn default_substation_heating_file() -> String {
    "aggregated_heating_needs_sub.json".to_string()
}

fn default_pv_file() -> String {
    "aggregated_pv_prod.json".to_string()
}

fn default_electricity_file() -> String {
    "aggregated_elec_services.json".to_string()
}

impl Default for SeriesFiles {
    fn default() -> Self {
        Self {
            cooling_demand: default_cooling_file(),
            gas_heating_demand: default_gas_heating_file(),
            network_heating_demand: default_network_heating_file(),
            substation_heating_demand: default_substation_heating_file(),
            pv_production: default_pv_file(),
            electricity_demand: default_electricity_file(),
        }
    }
}

impl SeriesFiles {
    pub fn file_for(&self, kind: SeriesKind) -> &str {
        match kind {
            SeriesKind::CoolingDemand => &self.cooling_demand,
            SeriesKind::GasHeatingDemand => &self.gas_heating_demand,
            SeriesKind::NetworkHeatingDemand => &self.network_heating_demand,
            SeriesKind::SubstationHeatingDemand => &self.substation_heating_demand,
            SeriesKind::PvProduction => &self.pv_production,
            SeriesKind::ElectricityDemand => &self.electricity_demand,
        }
    }
}
