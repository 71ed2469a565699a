#![allow(missing_docs)]

//! Typed errors for the lookup and time-series layers.
//!
//! Configuration-level code wraps these in [`anyhow::Error`] with context.
use thiserror::Error;

/// A failure of the coordinate transform
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("Latitude {0} is outside the range [-90, 90]")]
    InvalidLatitude(f64),
    #[error("Longitude {0} is outside the range [-180, 180]")]
    InvalidLongitude(f64),
    #[error("Unknown datum: {0}")]
    UnknownDatum(String),
    #[error("Point ({lon}, {lat}) cannot be represented in the projection")]
    Unrepresentable { lon: f64, lat: f64 },
}

/// A failure while loading or adjusting an emissions cost grid
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EmissionsError {
    #[error("Invalid release class '{0}': must be one of area, p150 or p300")]
    InvalidReleaseClass(String),
    #[error("Income year {0} is not supported: must be between 1990 and 2024")]
    UnsupportedIncomeYear(i32),
    #[error("Dollar year {0} is not supported: must be between 1980 and 2010")]
    UnsupportedDollarYear(i32),
    #[error("Could not load emissions dataset '{key}': {message}")]
    Dataset { key: String, message: String },
}

/// A failure while building a time series
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimeSeriesError {
    #[error("Time series has {len} entries: expected 12 or {expected}")]
    InvalidSeriesLength { len: usize, expected: usize },
    #[error("Time steps per hour must be at least 1")]
    InvalidStepsPerHour,
    #[error("Invalid calendar period: {0}")]
    InvalidPeriod(String),
    #[error(
        "Week {week} of month {month} in {year} has no day {day_of_week} (it falls in another month)"
    )]
    PeriodStartsInOtherMonth {
        year: i32,
        month: u32,
        week: u32,
        day_of_week: u32,
    },
    #[error("Period ending at hour {end} runs past the end of the year")]
    PeriodCrossesYearEnd { end: usize },
}

/// A failure while completing the financial configuration
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FinancialError {
    #[error(
        "Health costs were requested in the objective but could not be resolved for: {}",
        .0.join(", ")
    )]
    MissingHealthCostInputs(Vec<String>),
}
