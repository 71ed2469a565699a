//! Fixed adjustment tables for the emissions cost dataset.
use crate::error::EmissionsError;
use crate::units::Dimensionless;

/// The population, income and dollar year of the baseline dataset
pub const BASE_YEAR: i32 = 2005;

/// The dollar year in which the baseline dataset is expressed
pub const BASE_DOLLAR_YEAR: i32 = 2010;

const FIRST_INCOME_YEAR: i32 = 1990;

/// Mortality income growth adjustment factors for 1990 to 2024 (BenMAP)
const INCOME_GROWTH_ADJUSTMENT: [f64; 35] = [
    1.000_000, 0.992_025, 0.998_182, 1.003_087, 1.012_843, // 1990-1994
    1.016_989, 1.024_362, 1.034_171, 1.038_842, 1.042_804, // 1995-1999
    1.038_054, 1.035_201, 1.038_089, 1.040_519, 1.043_000, // 2000-2004
    1.045_431, 1.048_000, 1.051_000, 1.053_000, 1.056_000, // 2005-2009
    1.058_000, 1.061_000, 1.063_000, 1.066_000, 1.068_000, // 2010-2014
    1.071_000, 1.073_000, 1.076_000, 1.078_000, 1.081_000, // 2015-2019
    1.083_000, 1.086_000, 1.088_000, 1.091_000, 1.093_000, // 2020-2024
];

const FIRST_DOLLAR_YEAR: i32 = 1980;

/// GDP implicit price deflator for 1980 to 2010 (2000 = 100)
const GDP_DEFLATOR: [f64; 31] = [
    54.062, 59.128, 62.738, 65.214, 67.664, // 1980-1984
    69.724, 71.269, 73.204, 75.706, 78.569, // 1985-1989
    81.614, 84.457, 86.402, 88.390, 90.265, // 1990-1994
    92.115, 93.859, 95.415, 96.475, 97.868, // 1995-1999
    100.000, 102.402, 104.193, 106.409, 109.462, // 2000-2004
    113.039, 116.676, 119.819, 122.422, 123.637, // 2005-2009
    124.986, // 2010
];

/// Look up a value in a table indexed by consecutive years
fn lookup(table: &[f64], first_year: i32, year: i32) -> Option<f64> {
    let idx = usize::try_from(year.checked_sub(first_year)?).ok()?;
    table.get(idx).copied()
}

/// The factor by which to scale baseline costs to reflect income in `income_year`
pub fn income_adjustment(income_year: i32) -> Result<Dimensionless, EmissionsError> {
    let factor = lookup(&INCOME_GROWTH_ADJUSTMENT, FIRST_INCOME_YEAR, income_year)
        .ok_or(EmissionsError::UnsupportedIncomeYear(income_year))?;
    let base = lookup(&INCOME_GROWTH_ADJUSTMENT, FIRST_INCOME_YEAR, BASE_YEAR)
        .ok_or(EmissionsError::UnsupportedIncomeYear(BASE_YEAR))?;

    Ok(Dimensionless(factor / base))
}

/// The factor by which to convert baseline costs into `dollar_year` dollars
pub fn dollar_adjustment(dollar_year: i32) -> Result<Dimensionless, EmissionsError> {
    let factor = lookup(&GDP_DEFLATOR, FIRST_DOLLAR_YEAR, dollar_year)
        .ok_or(EmissionsError::UnsupportedDollarYear(dollar_year))?;
    let base = lookup(&GDP_DEFLATOR, FIRST_DOLLAR_YEAR, BASE_DOLLAR_YEAR)
        .ok_or(EmissionsError::UnsupportedDollarYear(BASE_DOLLAR_YEAR))?;

    Ok(Dimensionless(factor / base))
}
