//! Common code for integration tests.
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Grid cell containing Denver, Colorado
#[allow(dead_code)]
pub const DENVER_CELL: (usize, usize) = (58, 58);

/// Latitude and longitude of Denver, Colorado
#[allow(dead_code)]
pub const DENVER: (f64, f64) = (39.74, -104.99);

/// Latitude and longitude of Los Angeles, California, which has no data in the test dataset
#[allow(dead_code)]
pub const LOS_ANGELES: (f64, f64) = (34.05, -118.24);

fn write_grid_file(path: &Path, values: &[(&str, f64)]) {
    let (x, y) = DENVER_CELL;
    let mut file = File::create(path).unwrap();
    writeln!(file, "x,y,pollutant,value").unwrap();
    for (pollutant, value) in values {
        writeln!(file, "{x},{y},{pollutant},{value}").unwrap();
    }
}

/// Write an emissions dataset with data only for the cell containing Denver.
///
/// Elevated release costs grow by 1% to 2% a year, depending on the pollutant. Ground-level costs
/// grow by 2% a year.
pub fn write_emissions_dataset(dir: &Path) {
    write_grid_file(
        &dir.join("easiur_p150_pop2005.csv"),
        &[("NOx", 1000.0), ("SO2", 2000.0), ("PM25", 3000.0)],
    );
    write_grid_file(
        &dir.join("easiur_p150_growth.csv"),
        &[("NOx", 1.01), ("SO2", 1.015), ("PM25", 1.02)],
    );
    write_grid_file(
        &dir.join("easiur_area_pop2005.csv"),
        &[("NOx", 500.0), ("SO2", 600.0), ("PM25", 700.0)],
    );
    write_grid_file(
        &dir.join("easiur_area_growth.csv"),
        &[("NOx", 1.02), ("SO2", 1.02), ("PM25", 1.02)],
    );
}
