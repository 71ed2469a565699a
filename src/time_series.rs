//! Code for building annual time series at the model's time resolution.
//!
//! Series always cover 8760 hours. In leap years the final day (31 December) is dropped.
use crate::error::TimeSeriesError;
use chrono::{Datelike, Days, NaiveDate};
use log::{debug, warn};
use serde::Deserialize;
use std::ops::Range;

/// Number of hours in the modelled year
pub const HOURS_PER_YEAR: usize = 8760;

/// Days in each month of a non-leap year
const DAYS_IN_MONTH: [usize; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

fn check_steps_per_hour(steps_per_hour: usize) -> Result<(), TimeSeriesError> {
    if steps_per_hour == 0 {
        Err(TimeSeriesError::InvalidStepsPerHour)
    } else {
        Ok(())
    }
}

/// Number of hours in the calendar year `year`
pub fn hours_in_year(year: i32) -> usize {
    let days = NaiveDate::from_ymd_opt(year, 12, 31).map_or(365, |date| date.ordinal() as usize);
    days * 24
}

/// The range of time steps covered by each month, for a non-leap year
pub fn monthly_time_steps(steps_per_hour: usize) -> Vec<Range<usize>> {
    let mut start = 0;
    DAYS_IN_MONTH
        .iter()
        .map(|days| {
            let end = start + days * 24 * steps_per_hour;
            let range = start..end;
            start = end;
            range
        })
        .collect()
}

/// Expand a per-hour value into a series with `steps_per_hour` time steps per hour.
///
/// The value is divided evenly between the time steps in each hour.
pub fn expand_scalar_to_hourly(
    value: f64,
    steps_per_hour: usize,
) -> Result<Vec<f64>, TimeSeriesError> {
    check_steps_per_hour(steps_per_hour)?;

    Ok(vec![
        value / steps_per_hour as f64;
        HOURS_PER_YEAR * steps_per_hour
    ])
}

/// Expand per-hour values into a series with `steps_per_hour` time steps per hour.
///
/// `values` may be:
///
/// * a full series (`8760 * steps_per_hour` entries), which is returned unchanged
/// * twelve monthly values, each of which applies to every hour of its month
///
/// Use [`expand_scalar_to_hourly`] for a single value.
///
/// Each hour's value is divided evenly between its time steps.
pub fn expand_to_hourly(values: &[f64], steps_per_hour: usize) -> Result<Vec<f64>, TimeSeriesError> {
    check_steps_per_hour(steps_per_hour)?;

    let expected = HOURS_PER_YEAR * steps_per_hour;
    match values.len() {
        len if len == expected => Ok(values.to_vec()),
        12 => {
            let step_fraction = 1.0 / steps_per_hour as f64;
            let mut series = Vec::with_capacity(expected);
            for (value, days) in values.iter().zip(DAYS_IN_MONTH) {
                let steps = days * 24 * steps_per_hour;
                series.extend(std::iter::repeat_n(value * step_fraction, steps));
            }
            Ok(series)
        }
        len => Err(TimeSeriesError::InvalidSeriesLength { len, expected }),
    }
}

/// A recurring period of time within a year, such as a demand charge window.
///
/// Weeks of the month are calendar weeks beginning on Monday: week 1 is the week containing the
/// first day of the month, so a month can span up to six weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CalendarPeriod {
    /// Month of the year (1 to 12)
    pub month: u32,
    /// Week of the month in which the period starts (1 to 6)
    pub start_week_of_month: u32,
    /// Day of the week on which the period starts (1 = Monday to 7 = Sunday)
    pub start_day_of_week: u32,
    /// Hour of the day at which the period starts (1 to 24)
    pub start_hour: u32,
    /// Length of the period in hours
    pub duration_hours: u32,
}

impl CalendarPeriod {
    fn validate(&self) -> Result<(), TimeSeriesError> {
        let check = |valid: bool, message: String| {
            if valid {
                Ok(())
            } else {
                Err(TimeSeriesError::InvalidPeriod(message))
            }
        };

        check(
            (1..=12).contains(&self.month),
            format!("month {} must be between 1 and 12", self.month),
        )?;
        check(
            (1..=6).contains(&self.start_week_of_month),
            format!(
                "start_week_of_month {} must be between 1 and 6",
                self.start_week_of_month
            ),
        )?;
        check(
            (1..=7).contains(&self.start_day_of_week),
            format!(
                "start_day_of_week {} must be between 1 and 7",
                self.start_day_of_week
            ),
        )?;
        check(
            (1..=24).contains(&self.start_hour),
            format!("start_hour {} must be between 1 and 24", self.start_hour),
        )?;
        check(
            self.duration_hours > 0,
            "duration_hours must be greater than zero".into(),
        )
    }

    /// The date on which the period starts in `year`
    pub fn start_date(&self, year: i32) -> Result<NaiveDate, TimeSeriesError> {
        self.validate()?;

        let first_of_month = NaiveDate::from_ymd_opt(year, self.month, 1)
            .ok_or_else(|| TimeSeriesError::InvalidPeriod(format!("year {year} is out of range")))?;
        let week_start = first_of_month
            .checked_sub_days(Days::new(
                first_of_month.weekday().num_days_from_monday().into(),
            ))
            .and_then(|date| {
                date.checked_add_days(Days::new(
                    (7 * (self.start_week_of_month - 1) + self.start_day_of_week - 1).into(),
                ))
            })
            .ok_or_else(|| TimeSeriesError::InvalidPeriod(format!("year {year} is out of range")))?;

        if week_start.month() != self.month || week_start.year() != year {
            return Err(TimeSeriesError::PeriodStartsInOtherMonth {
                year,
                month: self.month,
                week: self.start_week_of_month,
                day_of_week: self.start_day_of_week,
            });
        }

        Ok(week_start)
    }

    /// The zero-based hours of the year covered by the period in `year`
    pub fn hours(&self, year: i32) -> Result<Range<usize>, TimeSeriesError> {
        let date = self.start_date(year)?;
        let start = date.ordinal0() as usize * 24 + (self.start_hour as usize - 1);
        let end = start + self.duration_hours as usize;
        if end > HOURS_PER_YEAR {
            return Err(TimeSeriesError::PeriodCrossesYearEnd { end });
        }

        Ok(start..end)
    }
}

/// Build an hourly mask which is 1.0 for hours within any of `periods` and 0.0 otherwise.
///
/// Periods which cannot be placed in `year` are logged and skipped.
pub fn recurring_period_mask(year: i32, periods: &[CalendarPeriod]) -> Vec<f64> {
    if hours_in_year(year) > HOURS_PER_YEAR {
        debug!("{year} is a leap year: 31 December is excluded from the mask");
    }

    let mut mask = vec![0.0; HOURS_PER_YEAR];
    for period in periods {
        match period.hours(year) {
            Ok(hours) => mask[hours].fill(1.0),
            Err(err) => warn!("Skipping calendar period {period:?}: {err}"),
        }
    }

    mask
}
