//! Loading of adjusted emissions cost grids, with a cache of the results.
use super::store::EmissionsDataStore;
use super::tables::{BASE_DOLLAR_YEAR, BASE_YEAR, dollar_adjustment, income_adjustment};
use super::{Pollutant, PollutantGrids, ReleaseClass};
use crate::error::EmissionsError;
use crate::units::MoneyPerTonne;
use log::debug;
use std::collections::HashMap;
use std::rc::Rc;

/// Identifies a set of adjusted cost grids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridKey {
    /// Release height
    pub release: ReleaseClass,
    /// Year of population to which costs are scaled
    pub pop_year: i32,
    /// Year of income to which costs are scaled
    pub income_year: i32,
    /// Year of the dollars in which costs are expressed
    pub dollar_year: i32,
}

/// Cost per tonne of each pollutant for each grid cell
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionsCostGrid {
    costs: PollutantGrids,
}

impl EmissionsCostGrid {
    /// The cost of a pollutant in the cell with one-based coordinates `(x, y)`.
    ///
    /// Returns `None` if the cell is outside the grid or has no data.
    pub fn cost(&self, pollutant: Pollutant, x: i64, y: i64) -> Option<MoneyPerTonne> {
        let grid = self.costs.get(&pollutant)?;
        let x = usize::try_from(x.checked_sub(1)?).ok()?;
        let y = usize::try_from(y.checked_sub(1)?).ok()?;
        let value = *grid.get([x, y])?;

        value.is_finite().then_some(MoneyPerTonne(value))
    }
}

/// Load the cost grids for `key`, applying population, income and dollar-year adjustments to the
/// baseline dataset.
///
/// Each adjustment is skipped when the requested year matches the baseline.
pub fn load_grid<S: EmissionsDataStore + ?Sized>(
    store: &S,
    key: GridKey,
) -> Result<EmissionsCostGrid, EmissionsError> {
    // Check the years before touching the dataset
    let income_adj = (key.income_year != BASE_YEAR)
        .then(|| income_adjustment(key.income_year))
        .transpose()?;
    let dollar_adj = (key.dollar_year != BASE_DOLLAR_YEAR)
        .then(|| dollar_adjustment(key.dollar_year))
        .transpose()?;

    let mut costs = store.base_grids(key.release)?;

    if key.pop_year != BASE_YEAR {
        let growth = store.growth_factors(key.release)?;
        let exponent = key.pop_year - BASE_YEAR;
        for (pollutant, grid) in &mut costs {
            let rates = growth.get(pollutant).ok_or_else(|| EmissionsError::Dataset {
                key: format!("growth_{}", key.release),
                message: format!("No growth factors for {pollutant}"),
            })?;
            if rates.dim() != grid.dim() {
                return Err(EmissionsError::Dataset {
                    key: format!("growth_{}", key.release),
                    message: format!("Growth factors for {pollutant} do not match the cost grid"),
                });
            }

            grid.zip_mut_with(rates, |cost, rate| *cost *= rate.powi(exponent));
        }
    }

    if let Some(adj) = income_adj {
        for grid in costs.values_mut() {
            grid.mapv_inplace(|cost| cost * adj.value());
        }
    }

    if let Some(adj) = dollar_adj {
        for grid in costs.values_mut() {
            grid.mapv_inplace(|cost| cost * adj.value());
        }
    }

    Ok(EmissionsCostGrid { costs })
}

/// Adjusted grids which have already been loaded, keyed by [`GridKey`].
///
/// Grids are immutable once loaded, so they are shared via [`Rc`].
#[derive(Debug, Default)]
pub struct EmissionsGridCache {
    grids: HashMap<GridKey, Rc<EmissionsCostGrid>>,
}

impl EmissionsGridCache {
    /// Get the grids for `key`, loading them from `store` if they are not cached
    pub fn get_or_load<S: EmissionsDataStore + ?Sized>(
        &mut self,
        store: &S,
        key: GridKey,
    ) -> Result<Rc<EmissionsCostGrid>, EmissionsError> {
        if let Some(grid) = self.grids.get(&key) {
            return Ok(Rc::clone(grid));
        }

        debug!("Loading emissions cost grid for {key:?}");
        let grid = Rc::new(load_grid(store, key)?);
        self.grids.insert(key, Rc::clone(&grid));

        Ok(grid)
    }

    /// Number of cached grids
    pub fn len(&self) -> usize {
        self.grids.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    /// Remove all cached grids
    pub fn clear(&mut self) {
        self.grids.clear();
    }
}
