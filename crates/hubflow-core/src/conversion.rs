//! Technology conversion coefficients.
//!
//! Heat pump coefficients of performance follow a Carnot-style estimate at 40%
//! of the ideal value. All coefficients are evaluated once at build time; the
//! resulting [`ConversionModel`] is immutable and shared by every time step.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, HubflowResult};
use crate::units::Celsius;

/// Fraction of the Carnot COP reached by real machines
pub const CARNOT_EFFICIENCY: f64 = 0.4;

/// Heating COP for a heat pump lifting from `t_evap` to `t_cond`.
pub fn cop_heat(t_cond: Celsius, t_evap: Celsius) -> f64 {
    CARNOT_EFFICIENCY * t_cond.to_kelvin().value() / (t_cond - t_evap).value()
}

/// Cooling COP for a heat pump lifting from `t_evap` to `t_cond`.
pub fn cop_cool(t_cond: Celsius, t_evap: Celsius) -> f64 {
    CARNOT_EFFICIENCY * t_evap.to_kelvin().value() / (t_cond - t_evap).value()
}

fn default_heating() -> Celsius {
    Celsius(60.0)
}

fn default_cooling() -> Celsius {
    Celsius(2.0)
}

fn default_lake() -> Celsius {
    Celsius(8.0)
}

fn default_reference() -> Celsius {
    Celsius(25.0)
}

fn default_heating_secondary() -> Celsius {
    Celsius(80.0)
}

/// Design temperatures of the four heat pumps, in °C.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DesignTemperatures {
    /// LT heating supply
    #[serde(default = "default_heating")]
    pub heating: Celsius,
    /// LT cooling supply
    #[serde(default = "default_cooling")]
    pub cooling: Celsius,
    #[serde(default = "default_lake")]
    pub lake: Celsius,
    /// Low-temperature network reference
    #[serde(default = "default_reference")]
    pub reference: Celsius,
    /// HT network supply
    #[serde(default = "default_heating_secondary")]
    pub heating_secondary: Celsius,
}

impl Default for DesignTemperatures {
    fn default() -> Self {
        Self {
            heating: default_heating(),
            cooling: default_cooling(),
            lake: default_lake(),
            reference: default_reference(),
            heating_secondary: default_heating_secondary(),
        }
    }
}

fn default_p2g() -> f64 {
    0.55
}

fn default_gas_boiler() -> f64 {
    0.9
}

fn default_chp_lv() -> f64 {
    0.3
}

fn default_chp_ht() -> f64 {
    0.6
}

/// Fixed conversion ratios of the non heat pump technologies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionRatios {
    #[serde(default = "default_p2g")]
    pub power_to_gas: f64,
    #[serde(default = "default_gas_boiler")]
    pub gas_boiler: f64,
    /// Electrical output per unit of gas input
    #[serde(default = "default_chp_lv")]
    pub chp_lv: f64,
    /// Heat output per unit of gas input
    #[serde(default = "default_chp_ht")]
    pub chp_ht: f64,
}

impl Default for ConversionRatios {
    fn default() -> Self {
        Self {
            power_to_gas: default_p2g(),
            gas_boiler: default_gas_boiler(),
            chp_lv: default_chp_lv(),
            chp_ht: default_chp_ht(),
        }
    }
}

fn default_gas_co2() -> f64 {
    0.184
}

fn default_electricity_co2() -> f64 {
    0.0236
}

/// CO₂ intensity of imported energy, kg per kWh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmissionFactors {
    #[serde(default = "default_gas_co2")]
    pub gas: f64,
    #[serde(default = "default_electricity_co2")]
    pub electricity: f64,
}

impl Default for EmissionFactors {
    fn default() -> Self {
        Self {
            gas: default_gas_co2(),
            electricity: default_electricity_co2(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatPump {
    Lake,
    HeatingLt,
    CoolingLt,
    HeatingHt,
}

impl HeatPump {
    pub const ALL: [HeatPump; 4] = [
        HeatPump::Lake,
        HeatPump::HeatingLt,
        HeatPump::CoolingLt,
        HeatPump::HeatingHt,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HeatPump::Lake => "hp_lake",
            HeatPump::HeatingLt => "hp_heat_lt",
            HeatPump::CoolingLt => "hp_cool_lt",
            HeatPump::HeatingHt => "hp_heat_ht",
        }
    }

    /// (condenser, evaporator) pair for this heat pump
    pub fn temperatures(self, temps: &DesignTemperatures) -> (Celsius, Celsius) {
        match self {
            HeatPump::Lake => (temps.reference, temps.lake),
            HeatPump::HeatingLt => (temps.heating, temps.reference),
            HeatPump::CoolingLt => (temps.reference, temps.cooling),
            HeatPump::HeatingHt => (temps.heating_secondary, temps.reference),
        }
    }

    pub fn is_cooling(self) -> bool {
        matches!(self, HeatPump::CoolingLt)
    }
}

impl fmt::Display for HeatPump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One evaluated coefficient, for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionRule {
    pub technology: String,
    pub reference: Option<Celsius>,
    pub coefficient: f64,
}

/// Evaluated coefficients for every technology.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionModel {
    temperatures: DesignTemperatures,
    ratios: ConversionRatios,
    emissions: EmissionFactors,
    cop_lake: f64,
    cop_heat_lt: f64,
    cop_cool_lt: f64,
    cop_heat_ht: f64,
}

impl ConversionModel {
    pub fn from_config(
        temperatures: DesignTemperatures,
        ratios: ConversionRatios,
        emissions: EmissionFactors,
    ) -> HubflowResult<Self> {
        let mut cops = [0.0; 4];
        for (slot, hp) in cops.iter_mut().zip(HeatPump::ALL) {
            let (t_cond, t_evap) = hp.temperatures(&temperatures);
            if t_cond == t_evap {
                return Err(DispatchError::Configuration(format!(
                    "{hp}: condenser and evaporator temperatures are both {t_cond}"
                )));
            }
            let cop = if hp.is_cooling() {
                cop_cool(t_cond, t_evap)
            } else {
                cop_heat(t_cond, t_evap)
            };
            if !cop.is_finite() || cop == 0.0 {
                return Err(DispatchError::Configuration(format!(
                    "{hp}: coefficient of performance evaluates to {cop}"
                )));
            }
            if cop < 0.0 {
                tracing::warn!(
                    technology = hp.name(),
                    cop,
                    "negative coefficient of performance; the model will be infeasible"
                );
            }
            *slot = cop;
        }

        for (name, value) in [
            ("power_to_gas", ratios.power_to_gas),
            ("gas_boiler", ratios.gas_boiler),
            ("chp_lv", ratios.chp_lv),
            ("chp_ht", ratios.chp_ht),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DispatchError::Configuration(format!(
                    "conversion ratio {name} must be finite and non-negative, got {value}"
                )));
            }
        }

        Ok(Self {
            temperatures,
            ratios,
            emissions,
            cop_lake: cops[0],
            cop_heat_lt: cops[1],
            cop_cool_lt: cops[2],
            cop_heat_ht: cops[3],
        })
    }

    pub fn cop(&self, hp: HeatPump) -> f64 {
        match hp {
            HeatPump::Lake => self.cop_lake,
            HeatPump::HeatingLt => self.cop_heat_lt,
            HeatPump::CoolingLt => self.cop_cool_lt,
            HeatPump::HeatingHt => self.cop_heat_ht,
        }
    }

    pub fn ratios(&self) -> &ConversionRatios {
        &self.ratios
    }

    pub fn emissions(&self) -> &EmissionFactors {
        &self.emissions
    }

    pub fn temperatures(&self) -> &DesignTemperatures {
        &self.temperatures
    }

    /// Flat listing of every coefficient.
    pub fn rules(&self) -> Vec<ConversionRule> {
        let mut rules: Vec<ConversionRule> = HeatPump::ALL
            .iter()
            .map(|&hp| ConversionRule {
                technology: hp.name().to_string(),
                reference: Some(hp.temperatures(&self.temperatures).0),
                coefficient: self.cop(hp),
            })
            .collect();
        for (technology, coefficient) in [
            ("p2g", self.ratios.power_to_gas),
            ("gas_b", self.ratios.gas_boiler),
            ("chp_lv", self.ratios.chp_lv),
            ("chp_ht", self.ratios.chp_ht),
        ] {
            rules.push(ConversionRule {
                technology: technology.to_string(),
                reference: None,
                coefficient,
            });
        }
        rules
    }
}

impl Default for ConversionModel {
    fn default() -> Self {
        let temperatures = DesignTemperatures::default();
        let cop_of = |hp: HeatPump| {
            let (t_cond, t_evap) = hp.temperatures(&temperatures);
            if hp.is_cooling() {
                cop_cool(t_cond, t_evap)
            } else {
                cop_heat(t_cond, t_evap)
            }
        };
        Self {
            temperatures,
            ratios: ConversionRatios::default(),
            emissions: EmissionFactors::default(),
            cop_lake: cop_of(HeatPump::Lake),
            cop_heat_lt: cop_of(HeatPump::HeatingLt),
            cop_cool_lt: cop_of(HeatPump::CoolingLt),
            cop_heat_ht: cop_of(HeatPump::HeatingHt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn cop_heat_reference_values() {
        assert!(close(cop_heat(Celsius(80.0), Celsius(25.0)), 2.5684, 1e-3));
        assert!(close(cop_heat(Celsius(60.0), Celsius(25.0)), 3.8074, 1e-3));
        assert!(close(cop_heat(Celsius(25.0), Celsius(8.0)), 7.0153, 1e-3));
    }

    #[test]
    fn cop_cool_reference_value() {
        assert!(close(cop_cool(Celsius(25.0), Celsius(2.0)), 4.7852, 1e-3));
    }

    #[test]
    fn default_model_is_positive_and_finite() {
        let model = ConversionModel::from_config(
            DesignTemperatures::default(),
            ConversionRatios::default(),
            EmissionFactors::default(),
        )
        .unwrap();
        for hp in HeatPump::ALL {
            let cop = model.cop(hp);
            assert!(cop.is_finite() && cop > 0.0, "{hp}: {cop}");
        }
        assert_eq!(model, ConversionModel::default());
    }

    #[test]
    fn equal_temperatures_rejected() {
        let temps = DesignTemperatures {
            lake: Celsius(25.0),
            ..DesignTemperatures::default()
        };
        let err = ConversionModel::from_config(
            temps,
            ConversionRatios::default(),
            EmissionFactors::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DispatchError::Configuration(_)));
        assert!(err.to_string().contains("hp_lake"));
    }

    #[test]
    fn negative_cop_is_accepted() {
        let temps = DesignTemperatures {
            cooling: Celsius(40.0),
            ..DesignTemperatures::default()
        };
        let model = ConversionModel::from_config(
            temps,
            ConversionRatios::default(),
            EmissionFactors::default(),
        )
        .unwrap();
        assert!(model.cop(HeatPump::CoolingLt) < 0.0);
    }

    #[test]
    fn negative_ratio_rejected() {
        let ratios = ConversionRatios {
            gas_boiler: -0.9,
            ..ConversionRatios::default()
        };
        assert!(ConversionModel::from_config(
            DesignTemperatures::default(),
            ratios,
            EmissionFactors::default()
        )
        .is_err());
    }

    #[test]
    fn rules_list_every_technology() {
        let rules = ConversionModel::default().rules();
        assert_eq!(rules.len(), 8);
        assert!(rules
            .iter()
            .any(|r| r.technology == "gas_b" && close(r.coefficient, 0.9, 1e-12)));
    }
}
