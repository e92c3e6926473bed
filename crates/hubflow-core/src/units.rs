//! Temperature units for the heat pump conversion model.
//!
//! Design temperatures are configured in degrees Celsius while the Carnot-style
//! COP formulas need absolute temperatures. Keeping the two as distinct types
//! makes it impossible to feed a Celsius value where Kelvin is expected.
//!
//! # Usage
//!
//! ```
//! use hubflow_core::units::{Celsius, Kelvin};
//!
//! let supply = Celsius(60.0);
//! let absolute: Kelvin = supply.to_kelvin();
//! assert!((absolute.value() - 333.15).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// Offset between the Celsius and Kelvin scales
pub const CELSIUS_TO_KELVIN: f64 = 273.15;

macro_rules! impl_unit_ops {
    ($type:ty, $unit_name:literal) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.2} {}", self.0, $unit_name)
            }
        }

        impl $type {
            /// Create a new value
            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            /// Get the raw numeric value
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            /// Check if value is finite
            #[inline]
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }
    };
}

/// Temperature in degrees Celsius
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Celsius(pub f64);

impl_unit_ops!(Celsius, "°C");

/// Absolute temperature in Kelvin
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Kelvin(pub f64);

impl_unit_ops!(Kelvin, "K");

impl Celsius {
    /// Convert to absolute temperature
    #[inline]
    pub fn to_kelvin(self) -> Kelvin {
        Kelvin(self.0 + CELSIUS_TO_KELVIN)
    }
}

impl Kelvin {
    /// Convert back to degrees Celsius
    #[inline]
    pub fn to_celsius(self) -> Celsius {
        Celsius(self.0 - CELSIUS_TO_KELVIN)
    }
}
