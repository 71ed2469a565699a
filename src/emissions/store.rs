//! Sources of the baseline emissions cost dataset.
use super::{Pollutant, PollutantGrids, ReleaseClass};
use crate::error::EmissionsError;
use crate::input::read_csv;
use crate::projection::{GRID_COLUMNS, GRID_ROWS};
use ndarray::Array2;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use strum::IntoEnumIterator;

/// A store of baseline emissions cost grids, keyed by release class.
///
/// Grids are indexed by zero-based `(x, y)` cell and have shape
/// `(GRID_COLUMNS, GRID_ROWS)`.
pub trait EmissionsDataStore {
    /// Cost per tonne for each pollutant with 2005 population and income, in 2010 dollars
    fn base_grids(&self, release: ReleaseClass) -> Result<PollutantGrids, EmissionsError>;

    /// Annual population growth factor for each pollutant's cost in each cell
    fn growth_factors(&self, release: ReleaseClass) -> Result<PollutantGrids, EmissionsError>;
}

impl<T: EmissionsDataStore + ?Sized> EmissionsDataStore for Box<T> {
    fn base_grids(&self, release: ReleaseClass) -> Result<PollutantGrids, EmissionsError> {
        (**self).base_grids(release)
    }

    fn growth_factors(&self, release: ReleaseClass) -> Result<PollutantGrids, EmissionsError> {
        (**self).growth_factors(release)
    }
}

/// A single cell value as stored in a CSV file
#[derive(Debug, Deserialize)]
struct GridCellRaw {
    /// One-based x coordinate
    x: usize,
    /// One-based y coordinate
    y: usize,
    pollutant: Pollutant,
    value: f64,
}

/// Reads grids from a directory of CSV files.
///
/// For each release class the directory contains `easiur_<class>_pop2005.csv` (baseline costs)
/// and `easiur_<class>_growth.csv` (population growth factors). Both have the columns
/// `x,y,pollutant,value` with one-based cell coordinates. Cells which are absent are `NaN`.
#[derive(Debug, Clone)]
pub struct CsvEmissionsStore {
    dir: PathBuf,
}

impl CsvEmissionsStore {
    /// Create a store reading from the given directory
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    fn read_grids(&self, file_name: &str) -> Result<PollutantGrids, EmissionsError> {
        let dataset_err = |message: String| EmissionsError::Dataset {
            key: file_name.to_string(),
            message,
        };

        let cells: Vec<GridCellRaw> =
            read_csv(&self.dir.join(file_name)).map_err(|err| dataset_err(format!("{err:#}")))?;

        let mut grids: PollutantGrids = Pollutant::iter()
            .map(|pollutant| (pollutant, empty_grid()))
            .collect();
        for cell in cells {
            if !(1..=GRID_COLUMNS).contains(&cell.x) || !(1..=GRID_ROWS).contains(&cell.y) {
                return Err(dataset_err(format!(
                    "Cell ({}, {}) is outside the {GRID_COLUMNS}x{GRID_ROWS} grid",
                    cell.x, cell.y
                )));
            }

            grids[&cell.pollutant][[cell.x - 1, cell.y - 1]] = cell.value;
        }

        Ok(grids)
    }
}

impl EmissionsDataStore for CsvEmissionsStore {
    fn base_grids(&self, release: ReleaseClass) -> Result<PollutantGrids, EmissionsError> {
        self.read_grids(&format!("easiur_{release}_pop2005.csv"))
    }

    fn growth_factors(&self, release: ReleaseClass) -> Result<PollutantGrids, EmissionsError> {
        self.read_grids(&format!("easiur_{release}_growth.csv"))
    }
}

/// A grid with every cell missing
fn empty_grid() -> Array2<f64> {
    Array2::from_elem((GRID_COLUMNS, GRID_ROWS), f64::NAN)
}

/// Holds grids supplied by the caller
#[derive(Debug, Clone, Default)]
pub struct InMemoryEmissionsStore {
    base: HashMap<ReleaseClass, PollutantGrids>,
    growth: HashMap<ReleaseClass, PollutantGrids>,
}

impl InMemoryEmissionsStore {
    /// Add the baseline costs and growth factors for a release class
    pub fn insert(&mut self, release: ReleaseClass, base: PollutantGrids, growth: PollutantGrids) {
        self.base.insert(release, base);
        self.growth.insert(release, growth);
    }

    /// Add grids for a release class in which every cell has the same values.
    ///
    /// `values` holds the baseline cost and growth factor of each pollutant.
    pub fn insert_uniform(&mut self, release: ReleaseClass, values: &[(Pollutant, f64, f64)]) {
        let shape = (GRID_COLUMNS, GRID_ROWS);
        let base = values
            .iter()
            .map(|(pollutant, cost, _)| (*pollutant, Array2::from_elem(shape, *cost)))
            .collect();
        let growth = values
            .iter()
            .map(|(pollutant, _, growth)| (*pollutant, Array2::from_elem(shape, *growth)))
            .collect();
        self.insert(release, base, growth);
    }

    fn get(
        map: &HashMap<ReleaseClass, PollutantGrids>,
        release: ReleaseClass,
        key: &str,
    ) -> Result<PollutantGrids, EmissionsError> {
        map.get(&release)
            .cloned()
            .ok_or_else(|| EmissionsError::Dataset {
                key: format!("{key}_{release}"),
                message: "No data for release class".into(),
            })
    }
}

impl EmissionsDataStore for InMemoryEmissionsStore {
    fn base_grids(&self, release: ReleaseClass) -> Result<PollutantGrids, EmissionsError> {
        Self::get(&self.base, release, "base")
    }

    fn growth_factors(&self, release: ReleaseClass) -> Result<PollutantGrids, EmissionsError> {
        Self::get(&self.growth, release, "growth")
    }
}
