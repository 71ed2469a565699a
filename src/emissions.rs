//! Location-specific marginal health damage costs of pollutant emissions.
//!
//! Costs come from an EASIUR-style dataset: a cost per tonne for each cell of the regional grid
//! (see [`crate::projection`]), for each pollutant and release height.
use crate::error::EmissionsError;
use indexmap::IndexMap;
use ndarray::Array2;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::fmt;
use std::str::FromStr;

pub mod grid;
pub mod resolver;
pub mod store;
pub mod tables;

/// A grid of values for each pollutant, indexed by zero-based `(x, y)` cell
pub type PollutantGrids = IndexMap<Pollutant, Array2<f64>>;

/// A pollutant with a health damage cost
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::EnumIter,
    DeserializeLabeledStringEnum,
)]
pub enum Pollutant {
    /// Nitrogen oxides
    #[string = "NOx"]
    NOx,
    /// Sulphur dioxide
    #[string = "SO2"]
    SO2,
    /// Fine particulate matter
    #[string = "PM25"]
    PM25,
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pollutant::NOx => write!(f, "NOx"),
            Pollutant::SO2 => write!(f, "SO2"),
            Pollutant::PM25 => write!(f, "PM2.5"),
        }
    }
}

/// The height at which emissions are released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseClass {
    /// Ground-level release
    Area,
    /// Elevated release at 150 m
    P150,
    /// Elevated release at 300 m
    P300,
}

impl ReleaseClass {
    /// The label used for this release class in dataset keys
    pub fn label(self) -> &'static str {
        match self {
            ReleaseClass::Area => "area",
            ReleaseClass::P150 => "p150",
            ReleaseClass::P300 => "p300",
        }
    }
}

impl FromStr for ReleaseClass {
    type Err = EmissionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "area" => Ok(ReleaseClass::Area),
            "p150" => Ok(ReleaseClass::P150),
            "p300" => Ok(ReleaseClass::P300),
            _ => Err(EmissionsError::InvalidReleaseClass(s.to_string())),
        }
    }
}

impl fmt::Display for ReleaseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
