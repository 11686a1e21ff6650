use chrono::NaiveDate;

use super::ModelContext;
use crate::constants::{CALIBRATION_TOLERANCE, MIN_SURFACE_AGE};
use crate::dates::{age_in_years, parse_date, years_before};
use crate::distress::{CurveFitter, DistressKind};
use crate::error::ModelError;
use crate::indices::compute_indices;
use crate::inputs::{RawRow, segment_from_row};
use crate::roughness::RoughnessMeasure;
use crate::segment::Segment;

/// Build the starting state of a segment from its raw input row.
///
/// Ages come from the construction and surfacing dates relative to the base
/// date. Distress percentages are corrected for surveys that predate the
/// current surface and then calibrated into curve parameters. Rut and
/// roughness start from the surveyed values, corrected the same way.
///
/// # Errors
///
/// Returns an error for malformed columns or dates, missing lookups, or a
/// non-positive life denominator.
pub fn initialise<R, F>(
    ctx: &ModelContext,
    element_index: i32,
    row: &R,
    fitter: &F,
) -> Result<Segment, ModelError>
where
    R: RawRow + ?Sized,
    F: CurveFitter + ?Sized,
{
    let lookups = ctx.lookups();
    let constants = ctx.constants();
    let base = constants.base_date;

    let mut segment = segment_from_row(element_index, row, lookups)?;
    let code = segment.feedback_code();

    segment.adt = segment.adt.max(1.0);
    let pavement_date = parse_date(&code, "pavement", &segment.survey.pavement_date)?;
    segment.pavement_age = age_in_years(&code, "pavement", base, pavement_date);
    let surface_date = parse_date(&code, "surface", &segment.survey.surface_date)?;
    segment.surface_age = age_in_years(&code, "surface", base, surface_date).max(MIN_SURFACE_AGE);

    for kind in DistressKind::ALL {
        let model = ctx.distress_model(kind);
        let observed = segment.survey.observed[kind.index()];
        let value = model.initial_value(&segment, observed, base)?;
        segment.distresses.get_mut(kind).value = value;
        let params = model.calibrated_setup(&segment, value, CALIBRATION_TOLERANCE, fitter)?;
        segment.distresses.get_mut(kind).params = params;
    }

    let rut_survey_age = survey_age(&code, "high-speed survey", base, &segment.survey.rut_date)?;
    let raw_rut = segment.survey.rut_lwp_85.max(segment.survey.rut_rwp_85);
    let rut = RoughnessMeasure::Rut;
    segment.rut = rut.initial_value(&segment, raw_rut, rut_survey_age, lookups)?;
    segment.rut_increment =
        rut.increment_estimate(segment.rut, rut.settling_in(constants), segment.surface_age);

    let naasra_survey_age =
        survey_age(&code, "roughness survey", base, &segment.survey.roughness_date)?;
    let naasra = RoughnessMeasure::Naasra;
    segment.naasra =
        naasra.initial_value(&segment, segment.survey.naasra_85, naasra_survey_age, lookups)?;
    segment.naasra_increment =
        naasra.increment_estimate(segment.naasra, naasra.settling_in(constants), segment.surface_age);

    segment.indices = compute_indices(&segment, lookups, constants)?;
    log::debug!(
        "{code}: initialised at pavement age {:.2}, surface age {:.2}",
        segment.pavement_age,
        segment.surface_age
    );
    Ok(segment)
}

fn survey_age(
    code: &str,
    field: &'static str,
    base: NaiveDate,
    value: &str,
) -> Result<f64, ModelError> {
    let date = parse_date(code, field, value)?;
    let age = years_before(base, date);
    if age < 0.0 {
        log::warn!("{code}: {field} date {date} is in the future");
    }
    Ok(age)
}
