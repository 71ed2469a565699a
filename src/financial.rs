//! The financial configuration of a scenario.
//!
//! Inputs are read into a [`FinancialInputs`], in which pollutant costs are optional, and then
//! completed and validated into a [`Financial`], which is read-only for the rest of a run.
use crate::emissions::Pollutant;
use crate::emissions::resolver::{EmissionsCostResolver, Lookup, SiteKind};
use crate::emissions::store::EmissionsDataStore;
use crate::error::FinancialError;
use crate::input::{input_err_msg, read_toml};
use crate::units::{Dimensionless, Money, MoneyPerEnergy, MoneyPerTonne};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use log::{info, warn};
use serde::Deserialize;
use std::path::Path;
use strum::IntoEnumIterator;

const FINANCIAL_FILE_NAME: &str = "financial.toml";

/// Tolerance used when checking that a MACRS schedule sums to no more than one
const MACRS_SUM_TOLERANCE: f64 = 1e-6;

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::from($value)
        }
    };
}

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_unit_param_default!(default_om_cost_escalation_rate, Dimensionless, 0.025);
define_unit_param_default!(default_elec_cost_escalation_rate, Dimensionless, 0.017);
define_unit_param_default!(default_fuel_cost_escalation_rate, Dimensionless, 0.015);
define_unit_param_default!(default_generator_fuel_cost_escalation_rate, Dimensionless, 0.012);
define_unit_param_default!(default_tax_rate, Dimensionless, 0.26);
define_unit_param_default!(default_discount_rate, Dimensionless, 0.0638);
define_unit_param_default!(default_co2_cost_escalation_rate, Dimensionless, 0.042_173);
define_param_default!(default_analysis_years, u32, 25);
define_param_default!(default_co2_cost_per_tonne, MoneyPerTonne, MoneyPerTonne(51.0));
define_param_default!(
    default_macrs_five_year,
    Vec<Dimensionless>,
    to_rates(&[0.2, 0.32, 0.192, 0.1152, 0.1152, 0.0576])
);
define_param_default!(
    default_macrs_seven_year,
    Vec<Dimensionless>,
    to_rates(&[0.1429, 0.2449, 0.1749, 0.1249, 0.0893, 0.0892, 0.0893, 0.0446])
);

fn to_rates(values: &[f64]) -> Vec<Dimensionless> {
    values.iter().copied().map(Dimensionless).collect()
}

/// The cost of unserved load, either for the whole year or for each time step
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ValueOfLostLoad {
    /// The same value for every time step
    Scalar(MoneyPerEnergy),
    /// A value for each time step
    Series(Vec<MoneyPerEnergy>),
}

impl Default for ValueOfLostLoad {
    fn default() -> Self {
        ValueOfLostLoad::Scalar(MoneyPerEnergy(1.0))
    }
}

/// User-supplied health costs for a pollutant. Unset values are looked up for the site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PollutantCostInputs {
    /// Cost of emissions associated with grid electricity
    pub grid_cost_per_tonne: Option<MoneyPerTonne>,
    /// Cost of emissions from fuel burned on site
    pub onsite_cost_per_tonne: Option<MoneyPerTonne>,
    /// Annual escalation rate of the costs
    pub escalation_rate: Option<Dimensionless>,
}

/// The location of the site being modelled
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Site {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

impl Site {
    fn validate(&self) -> Result<()> {
        ensure!(
            (-90.0..=90.0).contains(&self.latitude),
            "latitude must be between -90 and 90"
        );
        ensure!(
            (-180.0..=180.0).contains(&self.longitude),
            "longitude must be between -180 and 180"
        );

        Ok(())
    }
}

/// Financial inputs as supplied by the user, i.e. the contents of `financial.toml`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FinancialInputs {
    /// Annual escalation rate of operation and maintenance costs.
    ///
    /// Also used as the baseline inflation rate for pollutant cost escalation.
    #[serde(default = "default_om_cost_escalation_rate")]
    pub om_cost_escalation_rate: Dimensionless,
    /// Annual escalation rate of electricity costs
    #[serde(default = "default_elec_cost_escalation_rate")]
    pub elec_cost_escalation_rate: Dimensionless,
    /// Annual escalation rate of fuel costs for an existing boiler
    #[serde(default = "default_fuel_cost_escalation_rate")]
    pub existing_boiler_fuel_cost_escalation_rate: Dimensionless,
    /// Annual escalation rate of boiler fuel costs
    #[serde(default = "default_fuel_cost_escalation_rate")]
    pub boiler_fuel_cost_escalation_rate: Dimensionless,
    /// Annual escalation rate of CHP fuel costs
    #[serde(default = "default_fuel_cost_escalation_rate")]
    pub chp_fuel_cost_escalation_rate: Dimensionless,
    /// Annual escalation rate of generator fuel costs
    #[serde(default = "default_generator_fuel_cost_escalation_rate")]
    pub generator_fuel_cost_escalation_rate: Dimensionless,
    /// Tax rate of the offtaker (site host)
    #[serde(default = "default_tax_rate")]
    pub offtaker_tax_rate: Dimensionless,
    /// Discount rate of the offtaker (site host)
    #[serde(default = "default_discount_rate")]
    pub offtaker_discount_rate: Dimensionless,
    /// Whether the system is owned by a third party
    #[serde(default)]
    pub third_party_ownership: bool,
    /// Tax rate of the owner. Ignored unless `third_party_ownership` is set.
    #[serde(default = "default_tax_rate")]
    pub owner_tax_rate: Dimensionless,
    /// Discount rate of the owner. Ignored unless `third_party_ownership` is set.
    #[serde(default = "default_discount_rate")]
    pub owner_discount_rate: Dimensionless,
    /// Length of the analysis period in years
    #[serde(default = "default_analysis_years")]
    pub analysis_years: u32,
    /// Cost of unserved load
    #[serde(default)]
    pub value_of_lost_load: ValueOfLostLoad,
    /// Cost of upgrading to a microgrid as a fraction of capital costs
    #[serde(default)]
    pub microgrid_upgrade_cost_fraction: Dimensionless,
    /// Five-year MACRS depreciation schedule
    #[serde(default = "default_macrs_five_year")]
    pub macrs_five_year: Vec<Dimensionless>,
    /// Seven-year MACRS depreciation schedule
    #[serde(default = "default_macrs_seven_year")]
    pub macrs_seven_year: Vec<Dimensionless>,
    /// Whether the site is off grid
    #[serde(default)]
    pub off_grid: bool,
    /// Other capital costs which only apply to off-grid sites
    #[serde(default)]
    pub offgrid_other_capital_costs: Money,
    /// Other annual costs which only apply to off-grid sites
    #[serde(default)]
    pub offgrid_other_annual_costs: Money,
    /// Cost of CO2 emissions
    #[serde(default = "default_co2_cost_per_tonne")]
    pub co2_cost_per_tonne: MoneyPerTonne,
    /// Annual escalation rate of the cost of CO2 emissions
    #[serde(default = "default_co2_cost_escalation_rate")]
    pub co2_cost_escalation_rate: Dimensionless,
    /// Health costs of NOx emissions
    #[serde(default)]
    pub nox: PollutantCostInputs,
    /// Health costs of SO2 emissions
    #[serde(default)]
    pub so2: PollutantCostInputs,
    /// Health costs of PM2.5 emissions
    #[serde(default)]
    pub pm25: PollutantCostInputs,
    /// Whether health costs are included in the optimisation objective.
    ///
    /// If set, every pollutant cost must be available.
    #[serde(default)]
    pub include_health_in_objective: bool,
}

impl Default for FinancialInputs {
    fn default() -> Self {
        Self {
            om_cost_escalation_rate: default_om_cost_escalation_rate(),
            elec_cost_escalation_rate: default_elec_cost_escalation_rate(),
            existing_boiler_fuel_cost_escalation_rate: default_fuel_cost_escalation_rate(),
            boiler_fuel_cost_escalation_rate: default_fuel_cost_escalation_rate(),
            chp_fuel_cost_escalation_rate: default_fuel_cost_escalation_rate(),
            generator_fuel_cost_escalation_rate: default_generator_fuel_cost_escalation_rate(),
            offtaker_tax_rate: default_tax_rate(),
            offtaker_discount_rate: default_discount_rate(),
            third_party_ownership: false,
            owner_tax_rate: default_tax_rate(),
            owner_discount_rate: default_discount_rate(),
            analysis_years: default_analysis_years(),
            value_of_lost_load: ValueOfLostLoad::default(),
            microgrid_upgrade_cost_fraction: Dimensionless(0.0),
            macrs_five_year: default_macrs_five_year(),
            macrs_seven_year: default_macrs_seven_year(),
            off_grid: false,
            offgrid_other_capital_costs: Money(0.0),
            offgrid_other_annual_costs: Money(0.0),
            co2_cost_per_tonne: default_co2_cost_per_tonne(),
            co2_cost_escalation_rate: default_co2_cost_escalation_rate(),
            nox: PollutantCostInputs::default(),
            so2: PollutantCostInputs::default(),
            pm25: PollutantCostInputs::default(),
            include_health_in_objective: false,
        }
    }
}

/// Check that a rate is finite and greater than -100%
fn check_rate(name: &str, value: Dimensionless) -> Result<()> {
    ensure!(
        value.is_finite() && value > Dimensionless(-1.0),
        "{name} must be a finite number greater than -1"
    );

    Ok(())
}

/// Check that a value is between 0 and 1
fn check_proportion(name: &str, value: Dimensionless) -> Result<()> {
    ensure!(
        (0.0..=1.0).contains(&value.value()),
        "{name} must be between 0 and 1"
    );

    Ok(())
}

/// Check that a cost is finite and not negative
fn check_cost(name: &str, value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "{name} must be a finite number which is not negative"
    );

    Ok(())
}

/// Check that a MACRS schedule is made up of fractions which sum to no more than one
fn check_macrs_schedule(name: &str, schedule: &[Dimensionless]) -> Result<()> {
    for fraction in schedule {
        check_proportion(name, *fraction)?;
    }

    let total: f64 = schedule.iter().map(|fraction| fraction.value()).sum();
    ensure!(
        total <= 1.0 + MACRS_SUM_TOLERANCE,
        "{name} must sum to no more than 1 (sum is {total})"
    );

    Ok(())
}

fn check_value_of_lost_load(value: &ValueOfLostLoad) -> Result<()> {
    match value {
        ValueOfLostLoad::Scalar(value) => check_cost("value_of_lost_load", value.value()),
        ValueOfLostLoad::Series(values) => {
            ensure!(!values.is_empty(), "value_of_lost_load cannot be empty");
            for value in values {
                check_cost("value_of_lost_load", value.value())?;
            }
            Ok(())
        }
    }
}

impl FinancialInputs {
    /// Read the financial inputs from `financial.toml` in the specified directory
    pub fn from_path<P: AsRef<Path>>(dir: P) -> Result<FinancialInputs> {
        let file_path = dir.as_ref().join(FINANCIAL_FILE_NAME);
        let inputs: FinancialInputs = read_toml(&file_path)?;

        inputs
            .validate()
            .with_context(|| input_err_msg(&file_path))?;

        Ok(inputs)
    }

    /// The health cost inputs for a pollutant
    pub fn pollutant(&self, pollutant: Pollutant) -> &PollutantCostInputs {
        match pollutant {
            Pollutant::NOx => &self.nox,
            Pollutant::SO2 => &self.so2,
            Pollutant::PM25 => &self.pm25,
        }
    }

    /// Check that the inputs are valid
    fn validate(&self) -> Result<()> {
        ensure!(self.analysis_years > 0, "analysis_years cannot be zero");

        for (name, rate) in [
            ("om_cost_escalation_rate", self.om_cost_escalation_rate),
            ("elec_cost_escalation_rate", self.elec_cost_escalation_rate),
            (
                "existing_boiler_fuel_cost_escalation_rate",
                self.existing_boiler_fuel_cost_escalation_rate,
            ),
            (
                "boiler_fuel_cost_escalation_rate",
                self.boiler_fuel_cost_escalation_rate,
            ),
            (
                "chp_fuel_cost_escalation_rate",
                self.chp_fuel_cost_escalation_rate,
            ),
            (
                "generator_fuel_cost_escalation_rate",
                self.generator_fuel_cost_escalation_rate,
            ),
            ("offtaker_discount_rate", self.offtaker_discount_rate),
            ("owner_discount_rate", self.owner_discount_rate),
            ("co2_cost_escalation_rate", self.co2_cost_escalation_rate),
        ] {
            check_rate(name, rate)?;
        }

        check_proportion("offtaker_tax_rate", self.offtaker_tax_rate)?;
        check_proportion("owner_tax_rate", self.owner_tax_rate)?;
        check_proportion(
            "microgrid_upgrade_cost_fraction",
            self.microgrid_upgrade_cost_fraction,
        )?;
        check_macrs_schedule("macrs_five_year", &self.macrs_five_year)?;
        check_macrs_schedule("macrs_seven_year", &self.macrs_seven_year)?;
        check_value_of_lost_load(&self.value_of_lost_load)?;
        check_cost(
            "offgrid_other_capital_costs",
            self.offgrid_other_capital_costs.value(),
        )?;
        check_cost(
            "offgrid_other_annual_costs",
            self.offgrid_other_annual_costs.value(),
        )?;
        check_cost("co2_cost_per_tonne", self.co2_cost_per_tonne.value())?;

        for pollutant in Pollutant::iter() {
            let inputs = self.pollutant(pollutant);
            if let Some(cost) = inputs.grid_cost_per_tonne {
                check_cost(&format!("{pollutant} grid_cost_per_tonne"), cost.value())?;
            }
            if let Some(cost) = inputs.onsite_cost_per_tonne {
                check_cost(&format!("{pollutant} onsite_cost_per_tonne"), cost.value())?;
            }
            if let Some(rate) = inputs.escalation_rate {
                check_rate(&format!("{pollutant} escalation_rate"), rate)?;
            }
        }

        Ok(())
    }
}

/// Health costs of a pollutant after lookup. Costs which could not be resolved are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HealthCosts {
    /// Cost of emissions associated with grid electricity
    pub grid_cost_per_tonne: MoneyPerTonne,
    /// Cost of emissions from fuel burned on site
    pub onsite_cost_per_tonne: MoneyPerTonne,
    /// Annual escalation rate of the costs
    pub escalation_rate: Dimensionless,
}

/// A complete and validated financial configuration
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Financial {
    /// Annual escalation rate of operation and maintenance costs
    pub om_cost_escalation_rate: Dimensionless,
    /// Annual escalation rate of electricity costs
    pub elec_cost_escalation_rate: Dimensionless,
    /// Annual escalation rate of fuel costs for an existing boiler
    pub existing_boiler_fuel_cost_escalation_rate: Dimensionless,
    /// Annual escalation rate of boiler fuel costs
    pub boiler_fuel_cost_escalation_rate: Dimensionless,
    /// Annual escalation rate of CHP fuel costs
    pub chp_fuel_cost_escalation_rate: Dimensionless,
    /// Annual escalation rate of generator fuel costs
    pub generator_fuel_cost_escalation_rate: Dimensionless,
    /// Tax rate of the offtaker
    pub offtaker_tax_rate: Dimensionless,
    /// Discount rate of the offtaker
    pub offtaker_discount_rate: Dimensionless,
    /// Whether the system is owned by a third party
    pub third_party_ownership: bool,
    /// Tax rate of the owner
    pub owner_tax_rate: Dimensionless,
    /// Discount rate of the owner
    pub owner_discount_rate: Dimensionless,
    /// Length of the analysis period in years
    pub analysis_years: u32,
    /// Cost of unserved load
    pub value_of_lost_load: ValueOfLostLoad,
    /// Cost of upgrading to a microgrid as a fraction of capital costs
    pub microgrid_upgrade_cost_fraction: Dimensionless,
    /// Five-year MACRS depreciation schedule
    pub macrs_five_year: Vec<Dimensionless>,
    /// Seven-year MACRS depreciation schedule
    pub macrs_seven_year: Vec<Dimensionless>,
    /// Whether the site is off grid
    pub off_grid: bool,
    /// Other capital costs of an off-grid site
    pub offgrid_other_capital_costs: Money,
    /// Other annual costs of an off-grid site
    pub offgrid_other_annual_costs: Money,
    /// Cost of CO2 emissions
    pub co2_cost_per_tonne: MoneyPerTonne,
    /// Annual escalation rate of the cost of CO2 emissions
    pub co2_cost_escalation_rate: Dimensionless,
    /// Health costs for each pollutant
    pub health_costs: IndexMap<Pollutant, HealthCosts>,
    /// Whether every health cost was resolved. If not, health costs are omitted from the model.
    pub health_costs_resolved: bool,
    /// Whether health costs are included in the optimisation objective
    pub include_health_in_objective: bool,
}

/// Convert a lookup into an [`Option`], logging why a value is unavailable
fn found_or_log<T>(lookup: Lookup<T>, description: &str) -> Option<T> {
    match lookup {
        Lookup::Found(value) => Some(value),
        Lookup::NotAvailable(reason) => {
            info!("Could not look up {description}: {reason}");
            None
        }
    }
}

/// Fill in unset health costs for the site.
///
/// Returns the costs and a description of each one which could not be resolved.
fn resolve_health_costs<S: EmissionsDataStore>(
    inputs: &FinancialInputs,
    site: &Site,
    resolver: &mut EmissionsCostResolver<S>,
) -> (IndexMap<Pollutant, HealthCosts>, Vec<String>) {
    let (lat, lon) = (site.latitude, site.longitude);
    let any_unset = |is_unset: fn(&PollutantCostInputs) -> bool| {
        Pollutant::iter().any(|pollutant| is_unset(inputs.pollutant(pollutant)))
    };

    // Only look up what is needed
    let grid_costs = if any_unset(|p| p.grid_cost_per_tonne.is_none()) {
        found_or_log(
            resolver.resolve_costs(lat, lon, SiteKind::Grid),
            "grid emissions costs",
        )
    } else {
        None
    };
    let onsite_costs = if any_unset(|p| p.onsite_cost_per_tonne.is_none()) {
        found_or_log(
            resolver.resolve_costs(lat, lon, SiteKind::Onsite),
            "onsite emissions costs",
        )
    } else {
        None
    };
    let escalation_rates = if any_unset(|p| p.escalation_rate.is_none()) {
        found_or_log(
            resolver.resolve_escalation(lat, lon, inputs.om_cost_escalation_rate),
            "emissions cost escalation rates",
        )
    } else {
        None
    };

    let mut missing = Vec::new();
    let mut health_costs = IndexMap::new();
    for pollutant in Pollutant::iter() {
        let pollutant_inputs = inputs.pollutant(pollutant);
        if pollutant_inputs.escalation_rate == Some(Dimensionless(0.0)) {
            warn!(
                "The escalation rate for {pollutant} costs is zero. This is used as given; \
                leave it unset to look up a location-specific rate."
            );
        }

        let costs = HealthCosts {
            grid_cost_per_tonne: resolve_value(
                pollutant_inputs.grid_cost_per_tonne,
                grid_costs.as_ref(),
                pollutant,
                "grid cost per tonne",
                &mut missing,
            ),
            onsite_cost_per_tonne: resolve_value(
                pollutant_inputs.onsite_cost_per_tonne,
                onsite_costs.as_ref(),
                pollutant,
                "onsite cost per tonne",
                &mut missing,
            ),
            escalation_rate: resolve_value(
                pollutant_inputs.escalation_rate,
                escalation_rates.as_ref(),
                pollutant,
                "escalation rate",
                &mut missing,
            ),
        };
        health_costs.insert(pollutant, costs);
    }

    (health_costs, missing)
}

/// Take a user-supplied value if there is one, otherwise the looked-up value.
///
/// If neither is available, the value is recorded in `missing` and zero is returned.
fn resolve_value<T: Copy + Default>(
    value: Option<T>,
    lookup: Option<&IndexMap<Pollutant, T>>,
    pollutant: Pollutant,
    description: &str,
    missing: &mut Vec<String>,
) -> T {
    value
        .or_else(|| lookup.and_then(|values| values.get(&pollutant).copied()))
        .unwrap_or_else(|| {
            missing.push(format!("{pollutant} {description}"));
            T::default()
        })
}

impl Financial {
    /// Complete and validate financial inputs for a site.
    ///
    /// Unset pollutant costs are looked up with `resolver`. If a cost cannot be resolved it is
    /// left as zero, unless health costs are to be included in the objective, in which case an
    /// error is returned.
    pub fn from_inputs<S: EmissionsDataStore>(
        mut inputs: FinancialInputs,
        site: &Site,
        resolver: &mut EmissionsCostResolver<S>,
    ) -> Result<Financial> {
        inputs.validate().context("Invalid financial inputs")?;
        site.validate().context("Invalid site")?;

        if inputs.off_grid && inputs.microgrid_upgrade_cost_fraction != Dimensionless(0.0) {
            warn!(
                "microgrid_upgrade_cost_fraction is not applied to off-grid sites; \
                setting it to zero"
            );
            inputs.microgrid_upgrade_cost_fraction = Dimensionless(0.0);
        }

        if !inputs.off_grid
            && (inputs.offgrid_other_capital_costs != Money(0.0)
                || inputs.offgrid_other_annual_costs != Money(0.0))
        {
            warn!(
                "offgrid_other_capital_costs and offgrid_other_annual_costs only apply to \
                off-grid sites; setting them to zero"
            );
            inputs.offgrid_other_capital_costs = Money(0.0);
            inputs.offgrid_other_annual_costs = Money(0.0);
        }

        if !inputs.third_party_ownership {
            inputs.owner_tax_rate = inputs.offtaker_tax_rate;
            inputs.owner_discount_rate = inputs.offtaker_discount_rate;
        }

        let (health_costs, missing) = resolve_health_costs(&inputs, site, resolver);
        if !missing.is_empty() {
            if inputs.include_health_in_objective {
                return Err(FinancialError::MissingHealthCostInputs(missing).into());
            }

            info!(
                "Health costs are unavailable for this site and will be omitted: {}",
                missing.join(", ")
            );
        }

        Ok(Financial {
            om_cost_escalation_rate: inputs.om_cost_escalation_rate,
            elec_cost_escalation_rate: inputs.elec_cost_escalation_rate,
            existing_boiler_fuel_cost_escalation_rate: inputs
                .existing_boiler_fuel_cost_escalation_rate,
            boiler_fuel_cost_escalation_rate: inputs.boiler_fuel_cost_escalation_rate,
            chp_fuel_cost_escalation_rate: inputs.chp_fuel_cost_escalation_rate,
            generator_fuel_cost_escalation_rate: inputs.generator_fuel_cost_escalation_rate,
            offtaker_tax_rate: inputs.offtaker_tax_rate,
            offtaker_discount_rate: inputs.offtaker_discount_rate,
            third_party_ownership: inputs.third_party_ownership,
            owner_tax_rate: inputs.owner_tax_rate,
            owner_discount_rate: inputs.owner_discount_rate,
            analysis_years: inputs.analysis_years,
            value_of_lost_load: inputs.value_of_lost_load,
            microgrid_upgrade_cost_fraction: inputs.microgrid_upgrade_cost_fraction,
            macrs_five_year: inputs.macrs_five_year,
            macrs_seven_year: inputs.macrs_seven_year,
            off_grid: inputs.off_grid,
            offgrid_other_capital_costs: inputs.offgrid_other_capital_costs,
            offgrid_other_annual_costs: inputs.offgrid_other_annual_costs,
            co2_cost_per_tonne: inputs.co2_cost_per_tonne,
            co2_cost_escalation_rate: inputs.co2_cost_escalation_rate,
            health_costs,
            health_costs_resolved: missing.is_empty(),
            include_health_in_objective: inputs.include_health_in_objective,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emissions::store::InMemoryEmissionsStore;
    use crate::fixture::{assert_error, resolver, site};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    type Resolver = EmissionsCostResolver<InMemoryEmissionsStore>;

    fn all_costs_given() -> PollutantCostInputs {
        PollutantCostInputs {
            grid_cost_per_tonne: Some(MoneyPerTonne(10.0)),
            onsite_cost_per_tonne: Some(MoneyPerTonne(20.0)),
            escalation_rate: Some(Dimensionless(0.03)),
        }
    }

    #[test]
    fn test_from_path_defaults() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join(FINANCIAL_FILE_NAME)).unwrap();

        let inputs = FinancialInputs::from_path(dir.path()).unwrap();
        assert_eq!(inputs, FinancialInputs::default());
        assert_eq!(inputs.analysis_years, 25);
        assert_eq!(inputs.co2_cost_per_tonne, MoneyPerTonne(51.0));
        assert_eq!(inputs.macrs_seven_year.len(), 8);
    }

    #[test]
    fn test_from_path() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(FINANCIAL_FILE_NAME)).unwrap();
            writeln!(
                file,
                "analysis_years = 20
offtaker_discount_rate = 0.08
value_of_lost_load = [1.0, 2.0, 3.0]

[nox]
grid_cost_per_tonne = 5000.0
escalation_rate = 0.0"
            )
            .unwrap();
        }

        let inputs = FinancialInputs::from_path(dir.path()).unwrap();
        assert_eq!(inputs.analysis_years, 20);
        assert_eq!(inputs.offtaker_discount_rate, Dimensionless(0.08));
        assert_eq!(
            inputs.value_of_lost_load,
            ValueOfLostLoad::Series(vec![
                MoneyPerEnergy(1.0),
                MoneyPerEnergy(2.0),
                MoneyPerEnergy(3.0)
            ])
        );
        assert_eq!(inputs.nox.grid_cost_per_tonne, Some(MoneyPerTonne(5000.0)));
        assert_eq!(inputs.nox.onsite_cost_per_tonne, None);
        assert_eq!(inputs.nox.escalation_rate, Some(Dimensionless(0.0)));
        assert_eq!(inputs.so2, PollutantCostInputs::default());
    }

    #[test]
    fn test_from_path_invalid() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(FINANCIAL_FILE_NAME)).unwrap();
            writeln!(file, "analysis_years = 0").unwrap();
        }

        assert!(FinancialInputs::from_path(dir.path()).is_err());
    }

    #[rstest]
    #[case(FinancialInputs { analysis_years: 0, ..Default::default() },
        "analysis_years cannot be zero")]
    #[case(FinancialInputs { elec_cost_escalation_rate: Dimensionless(-1.0), ..Default::default() },
        "elec_cost_escalation_rate must be a finite number greater than -1")]
    #[case(FinancialInputs { owner_discount_rate: Dimensionless(f64::NAN), ..Default::default() },
        "owner_discount_rate must be a finite number greater than -1")]
    #[case(FinancialInputs { offtaker_tax_rate: Dimensionless(1.5), ..Default::default() },
        "offtaker_tax_rate must be between 0 and 1")]
    #[case(FinancialInputs { macrs_five_year: to_rates(&[0.6, 0.6]), ..Default::default() },
        "macrs_five_year must sum to no more than 1 (sum is 1.2)")]
    #[case(FinancialInputs { macrs_seven_year: to_rates(&[-0.1]), ..Default::default() },
        "macrs_seven_year must be between 0 and 1")]
    #[case(FinancialInputs {
            value_of_lost_load: ValueOfLostLoad::Series(Vec::new()),
            ..Default::default()
        },
        "value_of_lost_load cannot be empty")]
    #[case(FinancialInputs {
            value_of_lost_load: ValueOfLostLoad::Scalar(MoneyPerEnergy(-1.0)),
            ..Default::default()
        },
        "value_of_lost_load must be a finite number which is not negative")]
    #[case(FinancialInputs {
            so2: PollutantCostInputs {
                grid_cost_per_tonne: Some(MoneyPerTonne(-5.0)),
                ..Default::default()
            },
            ..Default::default()
        },
        "SO2 grid_cost_per_tonne must be a finite number which is not negative")]
    fn test_validate_invalid(#[case] inputs: FinancialInputs, #[case] msg: &str) {
        assert_error!(inputs.validate(), msg);
    }

    #[test]
    fn test_validate_defaults() {
        assert!(FinancialInputs::default().validate().is_ok());
    }

    #[rstest]
    fn test_from_inputs_owner_is_offtaker(site: Site, mut resolver: Resolver) {
        let inputs = FinancialInputs {
            offtaker_tax_rate: Dimensionless(0.3),
            offtaker_discount_rate: Dimensionless(0.05),
            owner_tax_rate: Dimensionless(0.1),
            owner_discount_rate: Dimensionless(0.12),
            ..Default::default()
        };

        let financial = Financial::from_inputs(inputs, &site, &mut resolver).unwrap();
        assert_eq!(financial.owner_tax_rate, Dimensionless(0.3));
        assert_eq!(financial.owner_discount_rate, Dimensionless(0.05));
    }

    #[rstest]
    fn test_from_inputs_third_party_owner(site: Site, mut resolver: Resolver) {
        let inputs = FinancialInputs {
            third_party_ownership: true,
            owner_tax_rate: Dimensionless(0.1),
            owner_discount_rate: Dimensionless(0.12),
            ..Default::default()
        };

        let financial = Financial::from_inputs(inputs, &site, &mut resolver).unwrap();
        assert_eq!(financial.owner_tax_rate, Dimensionless(0.1));
        assert_eq!(financial.owner_discount_rate, Dimensionless(0.12));
        assert_eq!(financial.offtaker_tax_rate, default_tax_rate());
    }

    #[rstest]
    fn test_from_inputs_off_grid(site: Site, mut resolver: Resolver) {
        let inputs = FinancialInputs {
            off_grid: true,
            microgrid_upgrade_cost_fraction: Dimensionless(0.3),
            offgrid_other_capital_costs: Money(1000.0),
            offgrid_other_annual_costs: Money(50.0),
            ..Default::default()
        };

        let financial = Financial::from_inputs(inputs, &site, &mut resolver).unwrap();
        assert_eq!(financial.microgrid_upgrade_cost_fraction, Dimensionless(0.0));
        assert_eq!(financial.offgrid_other_capital_costs, Money(1000.0));
        assert_eq!(financial.offgrid_other_annual_costs, Money(50.0));
    }

    #[rstest]
    fn test_from_inputs_grid_connected(site: Site, mut resolver: Resolver) {
        let inputs = FinancialInputs {
            microgrid_upgrade_cost_fraction: Dimensionless(0.3),
            offgrid_other_capital_costs: Money(1000.0),
            offgrid_other_annual_costs: Money(50.0),
            ..Default::default()
        };

        let financial = Financial::from_inputs(inputs, &site, &mut resolver).unwrap();
        assert_eq!(financial.microgrid_upgrade_cost_fraction, Dimensionless(0.3));
        assert_eq!(financial.offgrid_other_capital_costs, Money(0.0));
        assert_eq!(financial.offgrid_other_annual_costs, Money(0.0));
    }

    #[rstest]
    fn test_from_inputs_looks_up_health_costs(site: Site, mut resolver: Resolver) {
        let financial =
            Financial::from_inputs(FinancialInputs::default(), &site, &mut resolver).unwrap();
        assert!(financial.health_costs_resolved);

        let grid = resolver
            .resolve_costs(site.latitude, site.longitude, SiteKind::Grid)
            .found()
            .unwrap();
        let onsite = resolver
            .resolve_costs(site.latitude, site.longitude, SiteKind::Onsite)
            .found()
            .unwrap();
        let rates = resolver
            .resolve_escalation(
                site.latitude,
                site.longitude,
                default_om_cost_escalation_rate(),
            )
            .found()
            .unwrap();
        for pollutant in Pollutant::iter() {
            let costs = &financial.health_costs[&pollutant];
            assert_approx_eq!(MoneyPerTonne, costs.grid_cost_per_tonne, grid[&pollutant]);
            assert_approx_eq!(
                MoneyPerTonne,
                costs.onsite_cost_per_tonne,
                onsite[&pollutant]
            );
            assert_approx_eq!(Dimensionless, costs.escalation_rate, rates[&pollutant]);
        }
    }

    #[rstest]
    fn test_from_inputs_keeps_user_values(site: Site, mut resolver: Resolver) {
        let inputs = FinancialInputs {
            nox: all_costs_given(),
            so2: PollutantCostInputs {
                escalation_rate: Some(Dimensionless(0.0)),
                ..Default::default()
            },
            ..Default::default()
        };

        let financial = Financial::from_inputs(inputs, &site, &mut resolver).unwrap();
        let nox = financial.health_costs[&Pollutant::NOx];
        assert_eq!(nox.grid_cost_per_tonne, MoneyPerTonne(10.0));
        assert_eq!(nox.onsite_cost_per_tonne, MoneyPerTonne(20.0));
        assert_eq!(nox.escalation_rate, Dimensionless(0.03));

        // An explicit zero is not replaced
        let so2 = financial.health_costs[&Pollutant::SO2];
        assert_eq!(so2.escalation_rate, Dimensionless(0.0));
        assert!(so2.grid_cost_per_tonne > MoneyPerTonne(0.0));
    }

    #[rstest]
    fn test_from_inputs_skips_lookup_when_all_given(site: Site, mut resolver: Resolver) {
        let inputs = FinancialInputs {
            nox: all_costs_given(),
            so2: all_costs_given(),
            pm25: all_costs_given(),
            include_health_in_objective: true,
            ..Default::default()
        };

        let financial = Financial::from_inputs(inputs, &site, &mut resolver).unwrap();
        assert!(financial.health_costs_resolved);
        assert!(resolver.cache().is_empty());
    }

    #[rstest]
    fn test_from_inputs_outside_coverage(mut resolver: Resolver) {
        let site = Site {
            latitude: -33.87,
            longitude: 151.21,
        };

        // Health costs are not needed, so they are zero-filled
        let financial =
            Financial::from_inputs(FinancialInputs::default(), &site, &mut resolver).unwrap();
        assert!(!financial.health_costs_resolved);
        for costs in financial.health_costs.values() {
            assert_eq!(*costs, HealthCosts::default());
        }
    }

    #[rstest]
    fn test_from_inputs_missing_health_costs(mut resolver: Resolver) {
        let site = Site {
            latitude: -33.87,
            longitude: 151.21,
        };
        let inputs = FinancialInputs {
            include_health_in_objective: true,
            nox: all_costs_given(),
            so2: all_costs_given(),
            pm25: PollutantCostInputs {
                grid_cost_per_tonne: Some(MoneyPerTonne(1.0)),
                onsite_cost_per_tonne: Some(MoneyPerTonne(1.0)),
                escalation_rate: None,
            },
            ..Default::default()
        };

        let err = Financial::from_inputs(inputs, &site, &mut resolver).unwrap_err();
        assert_eq!(
            err.downcast::<FinancialError>().unwrap(),
            FinancialError::MissingHealthCostInputs(vec!["PM2.5 escalation rate".into()])
        );
    }

    #[rstest]
    fn test_from_inputs_invalid_site(mut resolver: Resolver) {
        let site = Site {
            latitude: 91.0,
            longitude: 0.0,
        };
        assert_error!(
            Financial::from_inputs(FinancialInputs::default(), &site, &mut resolver),
            "Invalid site"
        );
    }
}
