//! Treatment suitability scores (TSS) on a roughly 0-100 scale.
//!
//! Scores are driven by the host-written percentile ranks of the condition
//! indices, so a segment ranks against the rest of the network.

use crate::config::SuitabilityThresholds;
use crate::error::ModelError;
use crate::piecewise::{ControlPoint, PiecewiseLinear};
use crate::segment::Segment;

fn curve(points: &[(f64, f64)], extrapolate: bool) -> Result<PiecewiseLinear, ModelError> {
    let points = points.iter().map(|&(x, y)| ControlPoint { x, y }).collect();
    PiecewiseLinear::new(points, extrapolate)
}

/// Preservation score: rises with the surface distress rank, less half the PDI.
///
/// # Errors
///
/// Returns an error when the rank anchor is not finite.
pub fn preservation_score(
    segment: &Segment,
    thresholds: &SuitabilityThresholds,
) -> Result<f64, ModelError> {
    let by_rank = curve(&[(thresholds.preserve_sdi_rank, 0.0), (100.0, 100.0)], true)?;
    Ok(by_rank.value(segment.indices.sdi_rank) - 0.5 * segment.indices.pdi)
}

/// Rehabilitation score: rises with the pavement distress rank, plus a bonus
/// for rutting above the excess threshold.
///
/// # Errors
///
/// Returns an error when the rank anchor is not finite.
pub fn rehabilitation_score(
    segment: &Segment,
    thresholds: &SuitabilityThresholds,
) -> Result<f64, ModelError> {
    let by_rank = curve(&[(thresholds.rehab_pdi_rank, 0.0), (100.0, 100.0)], false)?;
    let mut score = by_rank.value(segment.indices.pdi_rank);
    if segment.rut > thresholds.rehab_excess_rut_threshold {
        score += (segment.rut - thresholds.rehab_excess_rut_threshold)
            * thresholds.rehab_excess_rut_factor;
    }
    Ok(score)
}

/// Score for pre-seal repairs used as a holding action. Peaks at the middle
/// rank anchor; heavily rutted segments score 0.
///
/// # Errors
///
/// Returns an error when a rank anchor is not finite.
pub fn holding_score(
    segment: &Segment,
    thresholds: &SuitabilityThresholds,
) -> Result<f64, ModelError> {
    if segment.rut > thresholds.holding_max_rut {
        return Ok(0.0);
    }
    let [pt1, pt2, pt3] = thresholds.holding_pdi_rank_points;
    let by_rank = curve(&[(pt1, 0.0), (pt2, 100.0), (100.0, pt3)], true)?;
    Ok(by_rank.value(segment.indices.pdi_rank))
}
