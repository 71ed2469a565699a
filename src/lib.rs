//! Financial parameters, emissions costs and cash-flow tools for distributed energy system models.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod emissions;
pub mod error;
pub mod finance;
pub mod financial;
pub mod input;
pub mod log;
pub mod projection;
pub mod settings;
pub mod time_series;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the directory where program configuration is stored.
///
/// If the platform has no configuration directory, a relative path is returned.
pub fn get_enfin_config_dir() -> PathBuf {
    let mut config_dir = dirs::config_dir().unwrap_or_default();
    config_dir.push("enfin");
    config_dir
}
