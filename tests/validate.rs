//! Integration tests for the `validate` command.
use enfin::cli::{SiteOpts, handle_validate_command};
use enfin::emissions::Pollutant;
use enfin::projection::Datum;
use enfin::settings::Settings;
use enfin::units::{Dimensionless, MoneyPerTonne};
use std::fs;
use tempfile::tempdir;

mod common;
use common::{DENVER, write_emissions_dataset};

/// An integration test for the `validate` command
#[test]
fn test_handle_validate_command() {
    let data_dir = tempdir().unwrap();
    write_emissions_dataset(data_dir.path());

    let input_dir = tempdir().unwrap();
    fs::write(
        input_dir.path().join("financial.toml"),
        "third_party_ownership = true
owner_discount_rate = 0.1
include_health_in_objective = true

[so2]
grid_cost_per_tonne = 12345.0
",
    )
    .unwrap();

    let (lat, lon) = DENVER;
    let opts = SiteOpts {
        lat,
        lon,
        datum: Datum::Nad83,
        emissions_dir: None,
    };
    let settings = Settings {
        log_level: "off".to_string(),
        emissions_data_dir: data_dir.path().to_path_buf(),
    };

    let financial = handle_validate_command(input_dir.path(), &opts, Some(settings)).unwrap();
    assert!(financial.health_costs_resolved);
    assert_eq!(financial.owner_discount_rate, Dimensionless(0.1));
    assert_eq!(
        financial.health_costs[&Pollutant::SO2].grid_cost_per_tonne,
        MoneyPerTonne(12345.0)
    );
    assert!(financial.health_costs[&Pollutant::NOx].grid_cost_per_tonne > MoneyPerTonne(0.0));
}
