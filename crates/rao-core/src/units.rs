//! Unit safety for monitored physical quantities.
//!
//! Monitored elements carry thresholds in megawatts (flow), amperes (current)
//! or kilovolts (bus voltage). Using raw `f64` values throughout makes it easy
//! to compare a current threshold against a power flow; these newtype wrappers
//! catch such mistakes at compile time, and conversion is explicit.
//!
//! All wrappers use `#[repr(transparent)]`, so they have the same layout as
//! `f64` and the compiler optimizes the wrapper away.
//!
//! # Usage
//!
//! ```
//! use rao_core::units::{Amperes, Kilovolts, Megawatts};
//!
//! let flow = Megawatts(120.0) - Megawatts(20.0);
//! assert_eq!(flow.value(), 100.0);
//!
//! // Converting a current threshold to MW needs the nominal voltage.
//! let limit = Amperes(418.4).to_megawatts(Kilovolts(400.0));
//! assert!((limit.value() - 289.9).abs() < 0.1);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Macro to implement common arithmetic operations for unit types
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

        impl Neg for $type {
            type Output = Self;
            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Mul<$type> for f64 {
            type Output = $type;
            fn mul(self, rhs: $type) -> Self::Output {
                <$type>::new(self * rhs.0)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl Div<$type> for $type {
            type Output = f64;
            fn div(self, rhs: $type) -> Self::Output {
                self.0 / rhs.0
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.4} {}", self.0, $unit_name)
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

            /// Absolute value
            #[inline]
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }

            /// Check if value is finite
            #[inline]
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }

            /// Minimum of two values
            #[inline]
            pub fn min(self, other: Self) -> Self {
                Self(self.0.min(other.0))
            }

            /// Maximum of two values
            #[inline]
            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }
        }

        impl std::iter::Sum for $type {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }
    };
}

/// Active power flow in megawatts (MW). The internal working unit of the
/// linear sub-solver: every threshold is converted to MW (or left in kV for
/// voltage elements) before constraints are built.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Megawatts(pub f64);

impl_unit_ops!(Megawatts, "MW");

/// Branch current in amperes (A).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Amperes(pub f64);

impl_unit_ops!(Amperes, "A");

/// Voltage in kilovolts (kV), line-to-line.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Kilovolts(pub f64);

impl_unit_ops!(Kilovolts, "kV");

const SQRT_3: f64 = 1.732_050_807_568_877_2;

impl Amperes {
    /// Convert a three-phase current to active power at the given nominal
    /// voltage, assuming unity power factor: `P = √3 · V · I`.
    pub fn to_megawatts(self, nominal_voltage: Kilovolts) -> Megawatts {
        Megawatts(SQRT_3 * nominal_voltage.0 * self.0 / 1000.0)
    }
}

impl Megawatts {
    /// Convert an active power flow to the equivalent three-phase current at
    /// the given nominal voltage.
    pub fn to_amperes(self, nominal_voltage: Kilovolts) -> Amperes {
        Amperes(1000.0 * self.0 / (SQRT_3 * nominal_voltage.0))
    }
}

/// Unit tag carried by thresholds and objective configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Unit {
    /// Megawatts (active power flow)
    #[default]
    Megawatt,
    /// Amperes (branch current)
    Ampere,
    /// Kilovolts (bus voltage)
    Kilovolt,
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unit::Megawatt => write!(f, "MW"),
            Unit::Ampere => write!(f, "A"),
            Unit::Kilovolt => write!(f, "kV"),
        }
    }
}

impl std::str::FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MW" | "MEGAWATT" => Ok(Unit::Megawatt),
            "A" | "AMPERE" => Ok(Unit::Ampere),
            "KV" | "KILOVOLT" => Ok(Unit::Kilovolt),
            _ => Err(format!("Unknown unit: {}", s)),
        }
    }
}
