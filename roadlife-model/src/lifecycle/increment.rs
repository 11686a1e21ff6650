use super::ModelContext;
use crate::distress::{CurveFitter, DistressKind};
use crate::error::ModelError;
use crate::indices::compute_indices;
use crate::roughness::{IncrementSampler, RoughnessMeasure};
use crate::segment::Segment;

/// Advance an untreated segment by one period.
///
/// Traffic grows, both ages advance by a year and each distress moves along
/// its curve. Once a segment has been treated its rut and roughness rates
/// are resampled every period; before that the historical rates are kept.
///
/// # Errors
///
/// Returns an error when a life calculation, the sampler or an index lookup fails.
pub fn increment<F, S>(
    ctx: &ModelContext,
    segment: &mut Segment,
    period: i32,
    fitter: &F,
    sampler: &S,
) -> Result<(), ModelError>
where
    F: CurveFitter + ?Sized,
    S: IncrementSampler + ?Sized,
{
    segment.adt *= 1.0 + segment.growth_percent / 100.0;
    segment.pavement_age += 1.0;
    segment.pavement_remaining_life -= 1.0;
    segment.surface_age += 1.0;

    for kind in DistressKind::ALL {
        let state = *segment.distresses.get(kind);
        let next = ctx
            .distress_model(kind)
            .next_value_after_increment(segment, state.value, state.params, fitter);
        segment.distresses.get_mut(kind).value = next;
    }

    if segment.is_treated() {
        segment.rut_increment = RoughnessMeasure::Rut.increment_after_treatment(segment, sampler)?;
    }
    segment.rut += segment.rut_increment;

    if segment.is_treated() {
        segment.naasra_increment =
            RoughnessMeasure::Naasra.increment_after_treatment(segment, sampler)?;
    }
    segment.naasra += segment.naasra_increment;

    segment.indices = compute_indices(segment, ctx.lookups(), ctx.constants())?;
    log::debug!(
        "{}: incremented in period {period}, surface age {:.2}",
        segment.feedback_code(),
        segment.surface_age
    );
    Ok(())
}
