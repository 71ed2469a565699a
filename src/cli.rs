//! The command line interface.
use crate::emissions::resolver::{EmissionsCostResolver, Lookup, SiteKind};
use crate::emissions::store::CsvEmissionsStore;
use crate::financial::{Financial, FinancialInputs, Site};
use crate::log;
use crate::projection::Datum;
use crate::settings::Settings;
use crate::units::Dimensionless;
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Where a site is and where to find emissions data for it
#[derive(Args)]
pub struct SiteOpts {
    /// Latitude of the site in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,
    /// Longitude of the site in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,
    /// Datum of the coordinates (nad83 or wgs84)
    #[arg(long, default_value_t = Datum::default())]
    pub datum: Datum,
    /// Directory containing the emissions cost dataset. Overrides the program settings.
    #[arg(long)]
    pub emissions_dir: Option<PathBuf>,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Complete and validate the financial inputs for a site.
    Validate {
        /// Directory containing `financial.toml`.
        input_dir: PathBuf,
        /// Site options
        #[command(flatten)]
        site: SiteOpts,
    },
    /// Look up the emissions costs for a site.
    Emissions {
        /// Site options
        #[command(flatten)]
        site: SiteOpts,
        /// Baseline inflation rate added to the cost escalation rates
        #[arg(long, default_value_t = 0.025)]
        inflation: f64,
    },
    /// Manage program settings.
    Settings {
        /// The available subcommands for managing settings.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Validate { input_dir, site } => {
                handle_validate_command(&input_dir, &site, None).map(|_| ())
            }
            Self::Emissions { site, inflation } => {
                handle_emissions_command(&site, Dimensionless(inflation), None)
            }
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and run the requested command
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load program settings (if not provided) and start the logger
fn load_settings_and_init_log(settings: Option<Settings>) -> Result<Settings> {
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // The logger may already be running, e.g. if several commands are run from tests
    if !log::is_logger_initialised() {
        log::init(Some(settings.log_level.as_str()), None)
            .context("Failed to initialise logging.")?;
    }

    Ok(settings)
}

/// Build a resolver reading from the configured emissions dataset
fn emissions_resolver(
    opts: &SiteOpts,
    settings: &Settings,
) -> EmissionsCostResolver<CsvEmissionsStore> {
    let dir = opts
        .emissions_dir
        .clone()
        .unwrap_or_else(|| settings.emissions_data_dir.clone());
    info!("Reading emissions data from {}", dir.display());

    EmissionsCostResolver::new(CsvEmissionsStore::new(dir)).with_datum(opts.datum)
}

/// Handle the `validate` command.
pub fn handle_validate_command(
    input_dir: &Path,
    opts: &SiteOpts,
    settings: Option<Settings>,
) -> Result<Financial> {
    let settings = load_settings_and_init_log(settings)?;

    let inputs = FinancialInputs::from_path(input_dir).context("Failed to load inputs.")?;
    let site = Site {
        latitude: opts.lat,
        longitude: opts.lon,
    };
    let mut resolver = emissions_resolver(opts, &settings);
    let financial = Financial::from_inputs(inputs, &site, &mut resolver)
        .context("Failed to validate financial inputs.")?;

    for (pollutant, costs) in &financial.health_costs {
        info!(
            "{pollutant}: grid {} /t, onsite {} /t, escalation {}",
            costs.grid_cost_per_tonne, costs.onsite_cost_per_tonne, costs.escalation_rate
        );
    }
    if !financial.health_costs_resolved {
        warn!("Some health costs could not be resolved and will be omitted");
    }
    info!("Validation successful!");

    Ok(financial)
}

/// Handle the `emissions` command.
pub fn handle_emissions_command(
    opts: &SiteOpts,
    inflation: Dimensionless,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings_and_init_log(settings)?;
    let mut resolver = emissions_resolver(opts, &settings);

    for kind in [SiteKind::Grid, SiteKind::Onsite] {
        match resolver.resolve_costs(opts.lat, opts.lon, kind) {
            Lookup::Found(costs) => {
                for (pollutant, cost) in costs {
                    println!("{kind} {pollutant} cost per tonne: {cost}");
                }
            }
            Lookup::NotAvailable(reason) => println!("{kind} costs not available: {reason}"),
        }
    }

    match resolver.resolve_escalation(opts.lat, opts.lon, inflation) {
        Lookup::Found(rates) => {
            for (pollutant, rate) in rates {
                println!("{pollutant} cost escalation rate: {rate}");
            }
        }
        Lookup::NotAvailable(reason) => println!("Escalation rates not available: {reason}"),
    }

    Ok(())
}
