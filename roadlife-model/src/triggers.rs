//! Treatment triggering for multi-criteria optimisation.
//!
//! A candidate segment either receives one forced treatment (second coat,
//! pre-seal follow-up or a birthday renewal) or a set of optional treatments,
//! each carrying a suitability score for the optimiser to weigh.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::candidate::HostSchedule;
use crate::constants::{FORCED_TREATMENT_SCORE, SET_PRESEAL_EFFECTIVE};
use crate::error::ModelError;
use crate::lifecycle::ModelContext;
use crate::numbers::round_to;
use crate::segment::{Segment, SurfaceClass, SurfaceFunction};
use crate::suitability::{holding_score, preservation_score, rehabilitation_score};

/// A treatment offered to the optimiser for one segment and period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentProposal {
    pub element_index: i32,
    pub treatment: String,
    pub period: i32,
    pub quantity: f64,
    pub forced: bool,
    pub score: f64,
    pub reason: String,
    pub comment: String,
    /// Share of the cost charged to each budget category, when split.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub budget_fractions: BTreeMap<String, f64>,
}

impl TreatmentProposal {
    fn forced(segment: &Segment, treatment: &str, period: i32, reason: &str, comment: &str) -> Self {
        Self {
            element_index: segment.element_index,
            treatment: treatment.to_string(),
            period,
            quantity: segment.area,
            forced: true,
            score: FORCED_TREATMENT_SCORE,
            reason: reason.to_string(),
            comment: comment.to_string(),
            budget_fractions: BTreeMap::new(),
        }
    }
}

pub type ProposalList = SmallVec<[TreatmentProposal; 4]>;

/// Values shared by every optional treatment check.
struct Gate {
    sla: f64,
    min_score: f64,
}

impl Gate {
    fn proposal(
        &self,
        segment: &Segment,
        treatment: &str,
        period: i32,
        quantity: f64,
        score: f64,
        comment: String,
    ) -> Option<TreatmentProposal> {
        (score > self.min_score).then(|| TreatmentProposal {
            element_index: segment.element_index,
            treatment: treatment.to_string(),
            period,
            quantity,
            forced: false,
            score,
            reason: format!("SLA={}", round_to(self.sla, 1)),
            comment,
            budget_fractions: BTreeMap::new(),
        })
    }
}

fn surface_comment(segment: &Segment, score: f64) -> String {
    format!(
        "SDI={}, TSS={}",
        round_to(segment.indices.sdi, 1),
        round_to(score, 2)
    )
}

fn pavement_comment(segment: &Segment, score: f64) -> String {
    format!(
        "PDI={}, TSS={}",
        round_to(segment.indices.pdi, 1),
        round_to(score, 2)
    )
}

/// Treatments the optimiser may choose for `segment` in `period`.
///
/// Nothing is proposed unless the segment's stored candidate verdict accepts it
/// and no committed treatment is close.
///
/// # Errors
///
/// Returns an error for a missing catalogue entry or lookup, a combined asphalt
/// treatment whose unit rate is not 1.0, or an unusable expected surface life.
pub fn treatment_proposals(
    ctx: &ModelContext,
    segment: &Segment,
    period: i32,
    schedule: &HostSchedule,
) -> Result<ProposalList, ModelError> {
    let mut proposals = ProposalList::new();
    if !segment.indices.candidate
        || schedule.periods_to_next_treatment
            <= ctx.constants().candidate.min_periods_to_next_treatment
    {
        return Ok(proposals);
    }

    if let Some(forced) = forced_treatment(segment, period) {
        proposals.push(forced);
        return Ok(proposals);
    }

    let next_cs = segment.next_surface_is(SurfaceClass::Chipseal);
    if !next_cs && !segment.next_surface_is(SurfaceClass::Asphalt) {
        return Ok(proposals);
    }

    let gate = Gate {
        sla: segment.surface_achieved_life_percent()?,
        min_score: ctx.constants().min_suitability_score,
    };
    if next_cs {
        proposals.extend(chipseal_preservation(ctx, segment, period, &gate)?);
        proposals.extend(preseal_repairs(ctx, segment, period, &gate)?);
    } else {
        proposals.extend(asphalt_preservation(ctx, segment, period, &gate)?);
        proposals.extend(asphalt_holding(ctx, segment, period, &gate)?);
        proposals.extend(asphalt_heavy_maintenance(ctx, segment, period, schedule, &gate)?);
    }
    proposals.extend(rehabilitation(ctx, segment, period, &gate)?);

    log::debug!(
        "{}: {} treatment(s) proposed for period {period}",
        segment.feedback_code(),
        proposals.len()
    );
    Ok(proposals)
}

fn forced_treatment(segment: &Segment, period: i32) -> Option<TreatmentProposal> {
    if segment.second_coat_needed() {
        return Some(TreatmentProposal::forced(
            segment,
            "Chipseal_S",
            period,
            "Second coat",
            "Second coat",
        ));
    }
    if *segment.surface_function() == SurfaceFunction::Preseal
        && segment.next_surface_is(SurfaceClass::Chipseal)
    {
        return Some(TreatmentProposal::forced(
            segment,
            "ChipSeal_H",
            period,
            "Pre-seal follow-up",
            "",
        ));
    }
    birthday_treatment(segment)
        .filter(|_| {
            segment.can_treat
                && segment.surface_remaining_life() <= 1.0
                && period >= segment.earliest_treatment_period
        })
        .map(|name| TreatmentProposal::forced(segment, name, period, "Birthday treatment", ""))
}

/// Like-for-like renewal for surfaces that are not chipseal or asphalt.
fn birthday_treatment(segment: &Segment) -> Option<&'static str> {
    if segment.next_surface_is(SurfaceClass::Blocks) {
        Some("BlockRep")
    } else if segment.next_surface_is(SurfaceClass::Concrete) {
        Some("ConcRep")
    } else if segment.next_surface_is(SurfaceClass::Other) {
        Some("Xtreat")
    } else {
        None
    }
}

fn passes_preservation_gates(ctx: &ModelContext, segment: &Segment, gate: &Gate, max_pdi: f64) -> bool {
    let s = &ctx.constants().suitability;
    segment.rut <= s.preserve_max_rut && gate.sla >= s.preserve_min_sla && segment.indices.pdi <= max_pdi
}

fn chipseal_preservation(
    ctx: &ModelContext,
    segment: &Segment,
    period: i32,
    gate: &Gate,
) -> Result<Option<TreatmentProposal>, ModelError> {
    let s = &ctx.constants().suitability;
    if !passes_preservation_gates(ctx, segment, gate, s.preserve_max_pdi_chipseal) {
        return Ok(None);
    }
    let score = preservation_score(segment, s)?;
    let comment = surface_comment(segment, score);
    Ok(gate.proposal(segment, "ChipSeal_P", period, segment.area, score, comment))
}

fn asphalt_preservation(
    ctx: &ModelContext,
    segment: &Segment,
    period: i32,
    gate: &Gate,
) -> Result<Option<TreatmentProposal>, ModelError> {
    let s = &ctx.constants().suitability;
    if !passes_preservation_gates(ctx, segment, gate, s.preserve_max_pdi_asphalt) {
        return Ok(None);
    }
    let score = preservation_score(segment, s)?;
    let comment = surface_comment(segment, score);
    Ok(gate.proposal(segment, "ThinAC_P", period, segment.area, score, comment))
}

/// Thin asphalt overlay over repairs. The quantity is the combined cost, so
/// the catalogue rate of the combined treatment must be 1.0.
fn asphalt_holding(
    ctx: &ModelContext,
    segment: &Segment,
    period: i32,
    gate: &Gate,
) -> Result<Option<TreatmentProposal>, ModelError> {
    let s = &ctx.constants().suitability;
    if !passes_preservation_gates(ctx, segment, gate, s.holding_max_pdi_asphalt) {
        return Ok(None);
    }
    let score = preservation_score(segment, s)?;
    let comment = surface_comment(segment, score);
    let Some(mut proposal) = gate.proposal(segment, "ThinAC_H", period, 0.0, score, comment) else {
        return Ok(None);
    };

    let catalog = ctx.catalog();
    let combined_rate = catalog.unit_rate("ThinAC_H")?;
    if (combined_rate - 1.0).abs() > f64::EPSILON {
        return Err(ModelError::InvalidUnitRate {
            name: "ThinAC_H".to_string(),
            expected: 1.0,
            actual: combined_rate,
        });
    }
    let overlay_cost = segment.area * catalog.unit_rate("ThinAC_P")?;
    let repair_area = segment.area * segment.indices.pdi.min(100.0) / 100.0;
    let repair_cost = repair_area * catalog.unit_rate("HMaint_AC")?;
    let total = overlay_cost + repair_cost;

    proposal.quantity = total;
    if total > 0.0 {
        proposal
            .budget_fractions
            .insert("Resurfacing".to_string(), overlay_cost / total);
        proposal
            .budget_fractions
            .insert("Pre-Repairs".to_string(), repair_cost / total);
    }
    Ok(Some(proposal))
}

fn preseal_fraction(ctx: &ModelContext, segment: &Segment) -> Result<f64, ModelError> {
    let curve = ctx.lookups().curve(SET_PRESEAL_EFFECTIVE, "para_pdi", false)?;
    Ok(curve.value(segment.indices.pdi))
}

/// Pre-seal repairs compete with rehabilitation on rehab routes and stand in
/// for it elsewhere.
fn preseal_style(
    ctx: &ModelContext,
    segment: &Segment,
    period: i32,
    treatment: &str,
    fraction: f64,
    gate: &Gate,
) -> Result<Option<TreatmentProposal>, ModelError> {
    let s = &ctx.constants().suitability;
    let score = if segment.can_rehab {
        holding_score(segment, s)?
    } else {
        rehabilitation_score(segment, s)?
    };
    let comment = pavement_comment(segment, score);
    Ok(gate.proposal(segment, treatment, period, segment.area * fraction, score, comment))
}

fn preseal_repairs(
    ctx: &ModelContext,
    segment: &Segment,
    period: i32,
    gate: &Gate,
) -> Result<Option<TreatmentProposal>, ModelError> {
    if *segment.surface_function() == SurfaceFunction::Preseal {
        return Ok(None);
    }
    let fraction = preseal_fraction(ctx, segment)?;
    if fraction <= 0.0 {
        return Ok(None);
    }
    preseal_style(ctx, segment, period, "PreSeal", fraction, gate)
}

fn asphalt_heavy_maintenance(
    ctx: &ModelContext,
    segment: &Segment,
    period: i32,
    schedule: &HostSchedule,
    gate: &Gate,
) -> Result<Option<TreatmentProposal>, ModelError> {
    let s = &ctx.constants().suitability;
    if schedule.periods_since_last_works() < s.asphalt_heavy_maint_min_periods {
        return Ok(None);
    }
    // Without an overlay option the segment would otherwise wait for rehab.
    if segment.asphalt_ok && gate.sla > s.asphalt_heavy_maint_max_sla {
        return Ok(None);
    }
    let fraction = preseal_fraction(ctx, segment)?;
    if fraction <= 0.0 {
        return Ok(None);
    }
    preseal_style(ctx, segment, period, "HMaint_AC", fraction, gate)
}

fn rehabilitation(
    ctx: &ModelContext,
    segment: &Segment,
    period: i32,
    gate: &Gate,
) -> Result<Option<TreatmentProposal>, ModelError> {
    if !segment.can_rehab {
        return Ok(None);
    }
    let next = if segment.next_surface_is(SurfaceClass::Chipseal) {
        if !segment.is_chipseal() {
            return Ok(None);
        }
        SurfaceClass::Chipseal
    } else if segment.next_surface_is(SurfaceClass::Asphalt) && !segment.is_chipseal() {
        SurfaceClass::Asphalt
    } else {
        return Ok(None);
    };
    let score = rehabilitation_score(segment, &ctx.constants().suitability)?;
    let name = format!(
        "Rehab_{}",
        format!("{}_{}", next.as_str(), segment.road_type()).to_uppercase()
    );
    let comment = pavement_comment(segment, score);
    Ok(gate.proposal(segment, &name, period, segment.area, score, comment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::tests::context;
    use crate::segment::tests::sample_segment;
    use crate::treatments::TreatmentCatalog;

    fn candidate(mut s: Segment) -> Segment {
        s.indices.candidate = true;
        s.rut = 5.0;
        s
    }

    fn propose(s: &Segment) -> ProposalList {
        treatment_proposals(context(), s, 3, &HostSchedule::default()).unwrap()
    }

    fn names(list: &ProposalList) -> Vec<&str> {
        list.iter().map(|p| p.treatment.as_str()).collect()
    }

    fn asphalt_segment() -> Segment {
        let mut s = candidate(sample_segment());
        s.surface_class = SurfaceClass::Asphalt;
        s.next_surface = "ac".to_string();
        s.surface_material = "ac10".to_string();
        s.indices.pdi = 8.0;
        s.indices.sdi = 6.0;
        s.indices.sdi_rank = 70.0;
        s.indices.pdi_rank = 80.0;
        s
    }

    #[test]
    fn non_candidates_get_nothing() {
        let mut s = candidate(sample_segment());
        s.indices.candidate = false;
        assert!(propose(&s).is_empty());
    }

    #[test]
    fn committed_work_suppresses_proposals() {
        let s = candidate(sample_segment());
        let schedule = HostSchedule {
            periods_to_next_treatment: 1,
            ..HostSchedule::default()
        };
        assert!(treatment_proposals(context(), &s, 3, &schedule).unwrap().is_empty());
    }

    #[test]
    fn second_coat_is_forced_alone() {
        let mut s = candidate(sample_segment());
        s.set_surface_function(SurfaceFunction::FirstCoat);
        s.surface_age = 11.5;
        s.indices.sdi_rank = 90.0;
        let list = propose(&s);
        assert_eq!(names(&list), ["Chipseal_S"]);
        let p = &list[0];
        assert!(p.forced);
        assert!((p.score - 102.0).abs() < f64::EPSILON);
        assert!((p.quantity - 1750.0).abs() < f64::EPSILON);
        assert_eq!(p.reason, "Second coat");
    }

    #[test]
    fn preseal_is_followed_by_holding_seal() {
        let mut s = candidate(sample_segment());
        s.set_surface_function(SurfaceFunction::Preseal);
        let list = propose(&s);
        assert_eq!(names(&list), ["ChipSeal_H"]);
        assert_eq!(list[0].reason, "Pre-seal follow-up");
    }

    #[test]
    fn blocks_get_a_birthday_renewal() {
        let mut s = candidate(sample_segment());
        s.surface_class = SurfaceClass::Blocks;
        s.next_surface = "blocks".to_string();
        s.surface_age = 11.5;
        let list = propose(&s);
        assert_eq!(names(&list), ["BlockRep"]);
        assert_eq!(list[0].reason, "Birthday treatment");

        s.can_treat = false;
        assert!(propose(&s).is_empty());
        s.can_treat = true;
        s.earliest_treatment_period = 4;
        assert!(propose(&s).is_empty());
    }

    #[test]
    fn chipseal_route_offers_preservation_and_preseal() {
        let mut s = candidate(sample_segment());
        s.indices.pdi = 4.0;
        s.indices.sdi = 10.0;
        s.indices.sdi_rank = 70.0;
        s.indices.pdi_rank = 30.0;
        let list = propose(&s);
        assert_eq!(names(&list), ["ChipSeal_P", "PreSeal"]);

        let seal = &list[0];
        assert!(!seal.forced);
        assert!((seal.score - 48.0).abs() < 1e-9);
        assert_eq!(seal.reason, "SLA=66.7");
        assert_eq!(seal.comment, "SDI=10, TSS=48");

        let preseal = &list[1];
        assert!((preseal.score - 25.0).abs() < 1e-9);
        assert!((preseal.quantity - 140.0).abs() < 1e-9);
        assert_eq!(preseal.comment, "PDI=4, TSS=25");
    }

    #[test]
    fn preseal_scores_as_rehab_off_rehab_routes() {
        let mut s = candidate(sample_segment());
        s.can_rehab = false;
        s.indices.pdi = 20.0;
        s.indices.pdi_rank = 80.0;
        let list = propose(&s);
        assert_eq!(names(&list), ["PreSeal"]);
        assert!((list[0].score - 50.0).abs() < 1e-9);
        assert!((list[0].quantity - 1750.0 * 0.3).abs() < 1e-9);
    }

    #[test]
    fn asphalt_route_offers_overlays_repairs_and_rehab() {
        let s = asphalt_segment();
        let list = propose(&s);
        assert_eq!(names(&list), ["ThinAC_P", "ThinAC_H", "HMaint_AC", "Rehab_AC_RL"]);

        let holding = &list[1];
        let overlay = 1750.0 * 35.0;
        let repairs = 1750.0 * 0.08 * 60.0;
        assert!((holding.quantity - (overlay + repairs)).abs() < 1e-6);
        let resurfacing = holding.budget_fractions["Resurfacing"];
        let pre_repairs = holding.budget_fractions["Pre-Repairs"];
        assert!((resurfacing + pre_repairs - 1.0).abs() < 1e-12);
        assert!((resurfacing - overlay / (overlay + repairs)).abs() < 1e-12);

        let heavy = &list[2];
        assert!((heavy.score - 70.0).abs() < 1e-9);
        assert!((heavy.quantity - 1750.0 * 0.14).abs() < 1e-9);

        let rehab = &list[3];
        assert!((rehab.score - 50.0).abs() < 1e-9);
    }

    #[test]
    fn recent_works_hold_off_heavy_maintenance() {
        let s = asphalt_segment();
        let schedule = HostSchedule {
            periods_since_last_treatment: 2,
            last_treatment: Some("ThinAC_P".to_string()),
            ..HostSchedule::default()
        };
        let list = treatment_proposals(context(), &s, 3, &schedule).unwrap();
        assert!(!names(&list).contains(&"HMaint_AC"));

        let schedule = HostSchedule {
            last_treatment: Some("RMaint".to_string()),
            ..schedule
        };
        let list = treatment_proposals(context(), &s, 3, &schedule).unwrap();
        assert!(names(&list).contains(&"HMaint_AC"));
    }

    #[test]
    fn low_scores_are_discarded() {
        let mut s = asphalt_segment();
        s.can_rehab = false;
        s.indices.sdi_rank = 40.0;
        s.indices.pdi_rank = 10.0;
        let list = propose(&s);
        assert!(list.is_empty(), "{:?}", names(&list));
    }

    #[test]
    fn combined_overlay_needs_unit_rate_of_one() {
        let mut catalog: TreatmentCatalog = context().catalog().clone();
        for t in &mut catalog.treatments {
            if t.name == "ThinAC_H" {
                t.unit_rate = 2.0;
            }
        }
        let ctx = ModelContext::new(context().lookups().clone(), catalog).unwrap();
        let err = treatment_proposals(&ctx, &asphalt_segment(), 3, &HostSchedule::default())
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidUnitRate { .. }));
    }
}
