//! Site-specific pollutant costs and cost escalation rates.
use super::grid::{EmissionsCostGrid, EmissionsGridCache, GridKey};
use super::store::EmissionsDataStore;
use super::tables::BASE_DOLLAR_YEAR;
use super::{Pollutant, ReleaseClass};
use crate::projection::{Datum, grid_cell};
use crate::units::{Dimensionless, MoneyPerTonne};
use indexmap::IndexMap;
use log::{debug, warn};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use strum::IntoEnumIterator;

/// Cost per tonne for each pollutant
pub type PollutantCosts = IndexMap<Pollutant, MoneyPerTonne>;

/// Annual cost escalation rate for each pollutant
pub type PollutantRates = IndexMap<Pollutant, Dimensionless>;

/// Population and income year of the costs returned by [`EmissionsCostResolver::resolve_costs`]
const COST_YEAR: i32 = 2020;

/// Final year of the period over which escalation rates are calculated
const ESCALATION_END_YEAR: i32 = 2024;

/// Converts 2010 dollars to 2020 dollars
const USD_2010_TO_2020: f64 = 1.246;

/// The outcome of a lookup for a particular site
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// The site is covered by the dataset
    Found(T),
    /// No value is available, with the reason why
    NotAvailable(String),
}

impl<T> Lookup<T> {
    /// Convert into an [`Option`], discarding the reason for a missing value
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotAvailable(_) => None,
        }
    }

    /// Whether a value was found
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

/// The kind of emissions for which costs are requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteKind {
    /// Emissions associated with electricity bought from the grid
    Grid,
    /// Emissions from fuel burned on site
    Onsite,
}

impl SiteKind {
    /// The release height of emissions of this kind
    pub fn release_class(self) -> ReleaseClass {
        match self {
            SiteKind::Grid => ReleaseClass::P150,
            SiteKind::Onsite => ReleaseClass::Area,
        }
    }
}

impl FromStr for SiteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grid" => Ok(SiteKind::Grid),
            "onsite" => Ok(SiteKind::Onsite),
            _ => Err(format!("Unknown site kind '{s}': must be grid or onsite")),
        }
    }
}

impl fmt::Display for SiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteKind::Grid => write!(f, "grid"),
            SiteKind::Onsite => write!(f, "onsite"),
        }
    }
}

/// Looks up pollutant costs for sites, caching the grids it loads
pub struct EmissionsCostResolver<S> {
    store: S,
    cache: EmissionsGridCache,
    datum: Datum,
}

impl<S: EmissionsDataStore> EmissionsCostResolver<S> {
    /// Create a resolver reading from `store`, with coordinates in the default datum
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: EmissionsGridCache::default(),
            datum: Datum::default(),
        }
    }

    /// Interpret coordinates in the given datum
    pub fn with_datum(mut self, datum: Datum) -> Self {
        self.datum = datum;
        self
    }

    /// The grids loaded so far
    pub fn cache(&self) -> &EmissionsGridCache {
        &self.cache
    }

    /// Load the grid for a release class with the given population and income year
    fn grid(&mut self, release: ReleaseClass, year: i32) -> Lookup<Rc<EmissionsCostGrid>> {
        let key = GridKey {
            release,
            pop_year: year,
            income_year: year,
            dollar_year: BASE_DOLLAR_YEAR,
        };

        match self.cache.get_or_load(&self.store, key) {
            Ok(grid) => Lookup::Found(grid),
            Err(err) => {
                warn!("Emissions cost data unavailable: {err}");
                Lookup::NotAvailable(err.to_string())
            }
        }
    }

    /// The one-based grid cell containing the site
    fn cell(&self, lat: f64, lon: f64) -> Lookup<(i64, i64)> {
        match grid_cell(lon, lat, self.datum) {
            Ok(cell) => Lookup::Found(cell),
            Err(err) => Lookup::NotAvailable(err.to_string()),
        }
    }

    /// Cost per tonne of each pollutant at the site, in 2020 dollars.
    ///
    /// Costs use 2020 population and income. Sites outside the dataset's coverage give
    /// [`Lookup::NotAvailable`].
    pub fn resolve_costs(&mut self, lat: f64, lon: f64, kind: SiteKind) -> Lookup<PollutantCosts> {
        let (x, y) = match self.cell(lat, lon) {
            Lookup::Found(cell) => cell,
            Lookup::NotAvailable(reason) => return Lookup::NotAvailable(reason),
        };
        let grid = match self.grid(kind.release_class(), COST_YEAR) {
            Lookup::Found(grid) => grid,
            Lookup::NotAvailable(reason) => return Lookup::NotAvailable(reason),
        };

        let mut costs = PollutantCosts::new();
        for pollutant in Pollutant::iter() {
            let Some(cost) = grid.cost(pollutant, x, y) else {
                return not_covered(lat, lon, x, y);
            };
            costs.insert(pollutant, cost * Dimensionless(USD_2010_TO_2020));
        }

        debug!("Resolved {kind} emissions costs at ({lat}, {lon}): {costs:?}");
        Lookup::Found(costs)
    }

    /// As [`Self::resolve_costs`], but with the kind of site given by name ("grid" or "onsite")
    pub fn resolve_costs_by_name(
        &mut self,
        lat: f64,
        lon: f64,
        kind: &str,
    ) -> Lookup<PollutantCosts> {
        match kind.parse() {
            Ok(kind) => self.resolve_costs(lat, lon, kind),
            Err(reason) => {
                warn!("{reason}");
                Lookup::NotAvailable(reason)
            }
        }
    }

    /// Nominal annual escalation rate of each pollutant's cost at the site.
    ///
    /// This is the compound annual growth rate of the 150 m release cost between 2020 and 2024,
    /// plus `baseline_inflation`.
    pub fn resolve_escalation(
        &mut self,
        lat: f64,
        lon: f64,
        baseline_inflation: Dimensionless,
    ) -> Lookup<PollutantRates> {
        let (x, y) = match self.cell(lat, lon) {
            Lookup::Found(cell) => cell,
            Lookup::NotAvailable(reason) => return Lookup::NotAvailable(reason),
        };
        let (start, end) = match (
            self.grid(ReleaseClass::P150, COST_YEAR),
            self.grid(ReleaseClass::P150, ESCALATION_END_YEAR),
        ) {
            (Lookup::Found(start), Lookup::Found(end)) => (start, end),
            (Lookup::NotAvailable(reason), _) | (_, Lookup::NotAvailable(reason)) => {
                return Lookup::NotAvailable(reason);
            }
        };

        let years = f64::from(ESCALATION_END_YEAR - COST_YEAR);
        let mut rates = PollutantRates::new();
        for pollutant in Pollutant::iter() {
            let (Some(cost_start), Some(cost_end)) =
                (start.cost(pollutant, x, y), end.cost(pollutant, x, y))
            else {
                return not_covered(lat, lon, x, y);
            };

            let growth = (cost_end / cost_start).powf(1.0 / years);
            if !growth.is_finite() {
                return Lookup::NotAvailable(format!(
                    "Cannot calculate escalation of {pollutant} cost from {cost_start} to {cost_end}"
                ));
            }

            rates.insert(pollutant, growth - Dimensionless(1.0) + baseline_inflation);
        }

        debug!("Resolved emissions cost escalation at ({lat}, {lon}): {rates:?}");
        Lookup::Found(rates)
    }
}

fn not_covered<T>(lat: f64, lon: f64, x: i64, y: i64) -> Lookup<T> {
    Lookup::NotAvailable(format!(
        "Site ({lat}, {lon}) in cell ({x}, {y}) is not covered by the emissions dataset"
    ))
}
