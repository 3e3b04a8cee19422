//! Physical units and the conversion table between them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by unit parsing and conversion.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    #[error("Conversion from {from} to {to} is not supported")]
    UnsupportedConversion { from: Unit, to: Unit },

    #[error("Unknown unit: {0}")]
    UnknownUnit(String),
}

/// Result type for unit operations.
pub type Result<T> = std::result::Result<T, UnitError>;

/// Closed set of units a sensor series can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "mm")]
    Millimeter,
    #[serde(rename = "cm")]
    Centimeter,
    #[serde(rename = "m")]
    Meter,
    #[serde(rename = "m/s")]
    MeterPerSecond,
    #[serde(rename = "cm/s")]
    CentimeterPerSecond,
    #[serde(rename = "mm/s")]
    MillimeterPerSecond,
}

/// Quantity family a unit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityFamily {
    Length,
    Velocity,
}

impl Unit {
    pub const ALL: [Unit; 6] = [
        Unit::Millimeter,
        Unit::Centimeter,
        Unit::Meter,
        Unit::MeterPerSecond,
        Unit::CentimeterPerSecond,
        Unit::MillimeterPerSecond,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Millimeter => "mm",
            Unit::Centimeter => "cm",
            Unit::Meter => "m",
            Unit::MeterPerSecond => "m/s",
            Unit::CentimeterPerSecond => "cm/s",
            Unit::MillimeterPerSecond => "mm/s",
        }
    }

    pub fn family(self) -> QuantityFamily {
        match self {
            Unit::Millimeter | Unit::Centimeter | Unit::Meter => QuantityFamily::Length,
            _ => QuantityFamily::Velocity,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        Unit::ALL
            .iter()
            .copied()
            .find(|u| u.symbol().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnitError::UnknownUnit(trimmed.to_string()))
    }
}

/// Immutable table of multiplicative factors `from -> to`.
///
/// Pairs missing from the table are unsupported; converting a unit to itself
/// is always the identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversionTable {
    factors: BTreeMap<Unit, BTreeMap<Unit, f64>>,
}

impl Default for ConversionTable {
    fn default() -> Self {
        use Unit::*;
        let entries: [(Unit, &[(Unit, f64)]); 6] = [
            (Millimeter, &[(Centimeter, 0.1), (Meter, 0.001)]),
            (Centimeter, &[(Millimeter, 10.0), (Meter, 0.01)]),
            (Meter, &[(Millimeter, 1000.0), (Centimeter, 100.0)]),
            (MeterPerSecond, &[(CentimeterPerSecond, 100.0), (MillimeterPerSecond, 1000.0)]),
            (CentimeterPerSecond, &[(MeterPerSecond, 0.01), (MillimeterPerSecond, 10.0)]),
            (MillimeterPerSecond, &[(MeterPerSecond, 0.001), (CentimeterPerSecond, 0.1)]),
        ];

        let factors = entries
            .iter()
            .map(|(from, targets)| (*from, targets.iter().copied().collect()))
            .collect();
        Self { factors }
    }
}

impl ConversionTable {
    /// Factor that converts a value in `from` into `to`.
    pub fn factor(&self, from: Unit, to: Unit) -> Result<f64> {
        if from == to {
            return Ok(1.0);
        }
        self.factors
            .get(&from)
            .and_then(|targets| targets.get(&to))
            .copied()
            .ok_or(UnitError::UnsupportedConversion { from, to })
    }

    /// Scale every value in place. Nothing is touched if the pair is unsupported.
    pub fn convert_in_place(&self, values: &mut [f64], from: Unit, to: Unit) -> Result<()> {
        let factor = self.factor(from, to)?;
        if factor != 1.0 {
            values.iter_mut().for_each(|v| *v *= factor);
        }
        Ok(())
    }
}
