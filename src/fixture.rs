//! Fixtures for tests

use crate::emissions::Pollutant;
use crate::emissions::ReleaseClass;
use crate::emissions::resolver::EmissionsCostResolver;
use crate::emissions::store::InMemoryEmissionsStore;
use crate::financial::Site;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Latitude and longitude of Denver, Colorado, which lies in grid cell (58, 58)
pub const DENVER: (f64, f64) = (39.74, -104.99);

/// Growth factors of the 150 m release grids in [`emissions_store`]
pub const P150_GROWTH: [(Pollutant, f64); 3] = [
    (Pollutant::NOx, 1.01),
    (Pollutant::SO2, 1.015),
    (Pollutant::PM25, 1.02),
];

/// A store with the same costs in every cell of the grid. Each pollutant grows at its own rate.
#[fixture]
pub fn emissions_store() -> InMemoryEmissionsStore {
    let mut store = InMemoryEmissionsStore::default();
    store.insert_uniform(
        ReleaseClass::P150,
        &[
            (Pollutant::NOx, 1000.0, 1.01),
            (Pollutant::SO2, 2000.0, 1.015),
            (Pollutant::PM25, 3000.0, 1.02),
        ],
    );
    store.insert_uniform(
        ReleaseClass::Area,
        &[
            (Pollutant::NOx, 500.0, 1.02),
            (Pollutant::SO2, 600.0, 1.025),
            (Pollutant::PM25, 700.0, 1.03),
        ],
    );

    store
}

#[fixture]
pub fn resolver(
    emissions_store: InMemoryEmissionsStore,
) -> EmissionsCostResolver<InMemoryEmissionsStore> {
    EmissionsCostResolver::new(emissions_store)
}

#[fixture]
pub fn site() -> Site {
    let (latitude, longitude) = DENVER;
    Site {
        latitude,
        longitude,
    }
}
