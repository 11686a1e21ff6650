//! Routine maintenance reported alongside the optional treatments.

use std::collections::BTreeMap;

use crate::constants::ROUTINE_MAINTENANCE;
use crate::numbers::round_to;
use crate::segment::Segment;
use crate::triggers::TreatmentProposal;

/// Routine maintenance for the period, costed from the predicted cost per km.
///
/// The quantity is the cost itself; routine maintenance has a unit rate of 1.0.
#[must_use]
pub fn routine_maintenance(segment: &Segment, period: i32) -> Option<TreatmentProposal> {
    let per_km = segment.indices.maintenance_cost_per_km;
    if per_km <= 0.0 {
        return None;
    }
    Some(TreatmentProposal {
        element_index: segment.element_index,
        treatment: ROUTINE_MAINTENANCE.to_string(),
        period,
        quantity: per_km * segment.length / 1000.0,
        forced: false,
        score: 0.0,
        reason: "Routine Maintenance".to_string(),
        comment: format!(
            "PDI = {}; Rut = {}mm",
            round_to(segment.indices.pdi, 2),
            round_to(segment.rut, 2)
        ),
        budget_fractions: BTreeMap::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::tests::sample_segment;

    #[test]
    fn no_cost_means_no_maintenance() {
        assert!(routine_maintenance(&sample_segment(), 1).is_none());
    }

    #[test]
    fn quantity_is_cost_over_length() {
        let mut s = sample_segment();
        s.indices.maintenance_cost_per_km = 4000.0;
        s.indices.pdi = 6.125;
        s.rut = 7.333;
        let p = routine_maintenance(&s, 2).unwrap();
        assert_eq!(p.treatment, "RMaint");
        assert!((p.quantity - 1000.0).abs() < 1e-9);
        assert_eq!(p.comment, "PDI = 6.13; Rut = 7.33mm");
        assert!(!p.forced);
    }
}
