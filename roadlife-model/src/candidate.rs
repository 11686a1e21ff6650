//! Candidate selection: whether a segment may be considered for treatment.
//!
//! The rules form a short-circuit chain. The first rule that reaches a verdict
//! wins; a segment that passes every rejection is accepted.

use serde::{Deserialize, Serialize};

use crate::config::CandidateThresholds;
use crate::constants::{NO_PREVIOUS_TREATMENT_PERIODS, ROUTINE_MAINTENANCE};
use crate::error::ModelError;
use crate::numbers::round_to;
use crate::segment::{Segment, SurfaceFunction};

/// Treatment history and commitments the host tracks for a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSchedule {
    /// Periods until the next treatment already committed by the host.
    pub periods_to_next_treatment: i32,
    pub periods_since_last_treatment: i32,
    pub last_treatment: Option<String>,
}

impl Default for HostSchedule {
    fn default() -> Self {
        Self {
            periods_to_next_treatment: NO_PREVIOUS_TREATMENT_PERIODS,
            periods_since_last_treatment: NO_PREVIOUS_TREATMENT_PERIODS,
            last_treatment: None,
        }
    }
}

impl HostSchedule {
    /// Periods since the last treatment other than routine maintenance.
    #[must_use]
    pub fn periods_since_last_works(&self) -> i32 {
        match self.last_treatment.as_deref() {
            Some(name) if name.eq_ignore_ascii_case(ROUTINE_MAINTENANCE) => {
                NO_PREVIOUS_TREATMENT_PERIODS
            }
            _ => self.periods_since_last_treatment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateVerdict {
    pub accepted: bool,
    pub reason: String,
}

impl CandidateVerdict {
    fn accept(reason: impl Into<String>) -> Self {
        Self {
            accepted: true,
            reason: reason.into(),
        }
    }

    fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: reason.into(),
        }
    }

    /// `ok` for an accepted segment, otherwise the rejection reason.
    #[must_use]
    pub fn outcome(&self) -> &str {
        if self.accepted { "ok" } else { &self.reason }
    }
}

/// Run the selection chain for `period`.
///
/// # Errors
///
/// Returns an error when the surface achieved life cannot be computed for a
/// chipseal or asphalt surface.
pub fn evaluate_candidate(
    segment: &Segment,
    period: i32,
    schedule: &HostSchedule,
    thresholds: &CandidateThresholds,
) -> Result<CandidateVerdict, ModelError> {
    if schedule.periods_to_next_treatment <= thresholds.min_periods_to_next_treatment {
        return Ok(CandidateVerdict::reject(format!(
            "Next treatment in {} periods: too soon",
            schedule.periods_to_next_treatment
        )));
    }
    if segment.second_coat_needed() {
        return Ok(CandidateVerdict::accept("Second-Coat Needed"));
    }
    if *segment.surface_function() == SurfaceFunction::Preseal {
        return Ok(CandidateVerdict::accept(
            "Second-Coat Needed over Preseal Repairs",
        ));
    }
    // Host flags lag the period by one.
    if period + 1 < segment.earliest_treatment_period {
        return Ok(CandidateVerdict::reject(format!(
            "Earliest treatment period {} not reached",
            segment.earliest_treatment_period
        )));
    }
    if segment.surface_age < thresholds.min_surface_age {
        return Ok(CandidateVerdict::reject(format!(
            "Surface Age = {}: below threshold ({})",
            round_to(segment.surface_age, 2),
            thresholds.min_surface_age
        )));
    }
    let min_sla = if segment.is_asphalt() {
        Some(thresholds.min_sla_asphalt)
    } else if segment.is_chipseal() {
        Some(thresholds.min_sla_chipseal)
    } else {
        None
    };
    if let Some(min_sla) = min_sla {
        let sla = segment.surface_achieved_life_percent()?;
        if sla < min_sla {
            return Ok(CandidateVerdict::reject(format!(
                "SLA = {}: below threshold ({min_sla})",
                round_to(sla, 2)
            )));
        }
    }
    let (sdi, pdi) = (segment.indices.sdi, segment.indices.pdi);
    if sdi < thresholds.min_sdi && pdi < thresholds.min_pdi {
        return Ok(CandidateVerdict::reject(format!(
            "SDI = {} and PDI = {}: below thresholds ({}, {})",
            round_to(sdi, 2),
            round_to(pdi, 2),
            thresholds.min_sdi,
            thresholds.min_pdi
        )));
    }
    Ok(CandidateVerdict::accept("Distress threshold reached"))
}

/// Store the verdict for `period` on the segment's indices.
///
/// # Errors
///
/// Propagates [`evaluate_candidate`] failures.
pub fn refresh_candidate(
    segment: &mut Segment,
    period: i32,
    schedule: &HostSchedule,
    thresholds: &CandidateThresholds,
) -> Result<CandidateVerdict, ModelError> {
    let verdict = evaluate_candidate(segment, period, schedule, thresholds)?;
    segment.indices.candidate = verdict.accepted;
    segment.indices.candidate_outcome = verdict.outcome().to_string();
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::tests::context;
    use crate::segment::SurfaceClass;
    use crate::segment::tests::sample_segment;

    fn thresholds() -> &'static CandidateThresholds {
        &context().constants().candidate
    }

    fn distressed() -> Segment {
        let mut s = sample_segment();
        s.indices.sdi = 12.0;
        s.indices.pdi = 8.0;
        s
    }

    fn verdict(s: &Segment, period: i32, schedule: &HostSchedule) -> CandidateVerdict {
        evaluate_candidate(s, period, schedule, thresholds()).unwrap()
    }

    #[test]
    fn committed_treatment_blocks_selection() {
        let schedule = HostSchedule {
            periods_to_next_treatment: 2,
            ..HostSchedule::default()
        };
        let v = verdict(&distressed(), 3, &schedule);
        assert!(!v.accepted);
        assert_eq!(v.outcome(), "Next treatment in 2 periods: too soon");
    }

    #[test]
    fn second_coat_wins_before_other_checks() {
        let mut s = sample_segment();
        s.set_surface_function(SurfaceFunction::FirstCoat);
        s.surface_age = 11.5;
        s.earliest_treatment_period = 10;
        let v = verdict(&s, 1, &HostSchedule::default());
        assert!(v.accepted);
        assert_eq!(v.reason, "Second-Coat Needed");
        assert_eq!(v.outcome(), "ok");
    }

    #[test]
    fn preseal_repairs_open_the_gate() {
        let mut s = sample_segment();
        s.set_surface_function(SurfaceFunction::Preseal);
        s.surface_age = 0.5;
        let v = verdict(&s, 1, &HostSchedule::default());
        assert_eq!(v.reason, "Second-Coat Needed over Preseal Repairs");
    }

    #[test]
    fn earliest_period_uses_next_period() {
        let mut s = distressed();
        s.earliest_treatment_period = 5;
        assert!(!verdict(&s, 3, &HostSchedule::default()).accepted);
        assert!(verdict(&s, 4, &HostSchedule::default()).accepted);
    }

    #[test]
    fn young_surfaces_are_rejected() {
        let mut s = distressed();
        s.surface_age = 2.456;
        let v = verdict(&s, 1, &HostSchedule::default());
        assert_eq!(v.reason, "Surface Age = 2.46: below threshold (3)");
    }

    #[test]
    fn low_achieved_life_is_rejected_for_bituminous_surfaces() {
        let mut s = distressed();
        s.surface_age = 6.0;
        let v = verdict(&s, 1, &HostSchedule::default());
        assert_eq!(v.reason, "SLA = 50: below threshold (60)");

        s.surface_class = SurfaceClass::Blocks;
        assert!(verdict(&s, 1, &HostSchedule::default()).accepted);
    }

    #[test]
    fn needs_surface_or_pavement_distress() {
        let mut s = sample_segment();
        s.indices.sdi = 1.0;
        s.indices.pdi = 2.0;
        let v = verdict(&s, 1, &HostSchedule::default());
        assert!(!v.accepted);
        assert!(v.reason.starts_with("SDI = 1 and PDI = 2"));
        s.indices.pdi = 5.0;
        assert!(verdict(&s, 1, &HostSchedule::default()).accepted);
    }

    #[test]
    fn refresh_is_idempotent() {
        let mut s = distressed();
        let first = refresh_candidate(&mut s, 2, &HostSchedule::default(), thresholds()).unwrap();
        let after_first = s.clone();
        let second = refresh_candidate(&mut s, 2, &HostSchedule::default(), thresholds()).unwrap();
        assert_eq!(first, second);
        assert_eq!(s, after_first);
        assert!(s.indices.candidate);
        assert_eq!(s.indices.candidate_outcome, "ok");
    }

    #[test]
    fn routine_maintenance_does_not_count_as_works() {
        let schedule = HostSchedule {
            periods_since_last_treatment: 1,
            last_treatment: Some("RMaint".to_string()),
            ..HostSchedule::default()
        };
        assert_eq!(schedule.periods_since_last_works(), NO_PREVIOUS_TREATMENT_PERIODS);
        let schedule = HostSchedule {
            last_treatment: Some("ThinAC_P".to_string()),
            ..schedule
        };
        assert_eq!(schedule.periods_since_last_works(), 1);
    }
}
