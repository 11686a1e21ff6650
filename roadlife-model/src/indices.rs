//! Condition indices, economic objective scores and maintenance cost.

use crate::config::ModelConstants;
use crate::constants::SET_BCA_WEIGHTING;
use crate::distress::DistressKind;
use crate::error::ModelError;
use crate::lookups::LookupTables;
use crate::numbers::logit;
use crate::segment::{Segment, SegmentIndices};

const LN_FLOOR: f64 = 0.001;

/// Pavement distress index.
#[must_use]
pub fn pavement_distress_index(segment: &Segment, pothole_booster: f64) -> f64 {
    let d = &segment.distresses;
    0.2 * d.value(DistressKind::LongTransCracks)
        + d.value(DistressKind::MeshCracks)
        + d.value(DistressKind::Shoving)
        + d.value(DistressKind::Potholes) * pothole_booster
        + segment.pavement_fault_percent()
}

/// Surface distress index.
#[must_use]
pub fn surface_distress_index(segment: &Segment, pothole_booster: f64) -> f64 {
    let d = &segment.distresses;
    d.value(DistressKind::Flushing)
        + d.value(DistressKind::Scabbing)
        + 0.5 * d.value(DistressKind::LongTransCracks)
        + d.value(DistressKind::Potholes) * pothole_booster
        + segment.surfacing_fault_percent()
}

/// Predicted routine maintenance cost per kilometre.
#[must_use]
pub fn maintenance_cost_per_km(segment: &Segment, pdi: f64, constants: &ModelConstants) -> f64 {
    if !segment.is_chipseal_or_asphalt() || pdi < constants.maintenance_pdi_threshold {
        return 0.0;
    }
    let d = &segment.distresses;
    let ln = |v: f64| v.max(LN_FLOOR).ln();
    let exponent = 0.0122 * segment.naasra
        + 0.055 * ln(d.value(DistressKind::Shoving))
        + 0.048 * ln(d.value(DistressKind::MeshCracks))
        + 0.243 * ln(segment.adt)
        + 0.644 * ln(segment.rut)
        + 0.01 * segment.pavement_age
        + 0.03 * ln(d.value(DistressKind::Potholes))
        + 5.227;
    constants.maintenance_calibration * exponent.exp()
}

/// Recompute every derived index. Host-written ranks and the candidate verdict
/// are carried over from the current values.
///
/// # Errors
///
/// Returns an error when a weighting or threshold lookup is missing.
pub fn compute_indices(
    segment: &Segment,
    lookups: &LookupTables,
    constants: &ModelConstants,
) -> Result<SegmentIndices, ModelError> {
    let booster = constants.pothole_booster;
    let pdi = pavement_distress_index(segment, booster);
    let sdi = surface_distress_index(segment, booster);

    let objective_distress = 100.0 * logit(0.4 * (0.7 * pdi + 0.3 * sdi) - 4.0);
    let objective_rsl = 100.0 * logit(-0.5 * segment.surface_remaining_life() - 2.5);
    let rut_threshold = lookups.number_value("reset_exceed_thresh_rut", "preserve")?;
    let objective_rutting = 100.0 * logit(0.55 * (segment.rut - rut_threshold) - 1.65);
    let naasra_threshold =
        lookups.number_value("reset_exceed_thresh_naasra", &segment.surface_road_type())?;
    let objective_naasra = 100.0 * logit(0.044 * (segment.naasra - naasra_threshold) - 1.76);

    let objective_raw = 0.3 * objective_distress
        + 0.2 * objective_rsl
        + 0.25 * objective_rutting
        + 0.25 * objective_naasra;
    let weight = lookups.number_value(SET_BCA_WEIGHTING, &segment.road_type())?;
    let objective = objective_raw * weight + 30.0 * (1.0 - weight);

    Ok(SegmentIndices {
        pdi,
        sdi,
        objective_distress,
        objective_rsl,
        objective_rutting,
        objective_naasra,
        objective_raw,
        objective,
        objective_auc: objective * segment.area,
        maintenance_cost_per_km: maintenance_cost_per_km(segment, pdi, constants),
        ..segment.indices.clone()
    })
}
