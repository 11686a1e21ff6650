//! Date parsing and age arithmetic.

use chrono::NaiveDate;

use crate::constants::DAYS_PER_YEAR;
use crate::error::ModelError;
use crate::numbers::{i64_to_f64, round_to};

const DATE_FORMATS: [&str; 3] = ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y"];

/// Parse a survey or construction date, ignoring any trailing time portion.
///
/// # Errors
///
/// Returns [`ModelError::InvalidDate`] tagged with `segment` when no supported
/// format matches.
pub fn parse_date(segment: &str, field: &'static str, value: &str) -> Result<NaiveDate, ModelError> {
    let day = value.split_whitespace().next().unwrap_or_default();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day, fmt).ok())
        .ok_or_else(|| ModelError::InvalidDate {
            segment: segment.to_string(),
            field,
            value: value.to_string(),
        })
}

/// Years from `date` to `base`, positive when `date` is in the past.
#[must_use]
pub fn years_before(base: NaiveDate, date: NaiveDate) -> f64 {
    i64_to_f64((base - date).num_days()) / DAYS_PER_YEAR
}

/// [`years_before`] rounded to two decimals, with a warning for future dates.
#[must_use]
pub fn age_in_years(segment: &str, what: &str, base: NaiveDate, date: NaiveDate) -> f64 {
    let age = round_to(years_before(base, date), 2);
    if age < 0.0 {
        log::warn!("{segment}: {what} date {date} is after the base date {base}");
    }
    age
}
