use chrono::NaiveDate;

use super::fit::{CalibrationRequest, CurveBounds, CurveFitter, ParamBounds};
use super::params::CurveParams;
use super::DistressKind;
use crate::dates::{parse_date, years_before};
use crate::error::ModelError;
use crate::lookups::LookupTables;
use crate::numbers::logit;
use crate::piecewise::PiecewiseLinear;
use crate::segment::{Segment, SurfaceClass, SurfaceFunction};

/// Curve limits and reset curves for one distress, read from its lookup set.
#[derive(Debug, Clone, PartialEq)]
pub struct DistressLimits {
    pub bounds: CurveBounds,
    pub expected_initial_value: f64,
    pub historic_chipseal: PiecewiseLinear,
    pub historic_asphalt: PiecewiseLinear,
    pub resurfacing_penalty: PiecewiseLinear,
    pub holding_penalty: PiecewiseLinear,
}

impl DistressLimits {
    /// # Errors
    ///
    /// Returns an error when any limit is missing or a curve cannot be parsed.
    pub fn from_lookups(lookups: &LookupTables, set: &str) -> Result<Self, ModelError> {
        let num = |key: &str| lookups.number_value(set, key);
        let penalty = |first: &str, second: &str| -> Result<PiecewiseLinear, ModelError> {
            let setup = format!("{},1|{},0", num(first)?, num(second)?);
            PiecewiseLinear::from_setup(&setup, false)
        };
        let limits = Self {
            bounds: CurveBounds {
                aadi: ParamBounds::new(num("aadi_min")?, num("aadi_max")?),
                initial_value: ParamBounds::new(num("iv_min")?, num("iv_max")?),
                t100: ParamBounds::new(num("t100_min")?, num("t100_max")?),
            },
            expected_initial_value: num("iv_expected")?,
            historic_chipseal: lookups.curve(set, "historic_reset_cs", false)?,
            historic_asphalt: lookups.curve(set, "historic_reset_ac", false)?,
            resurfacing_penalty: penalty("reset_resurf_thresh1", "reset_resurf_thresh2")?,
            holding_penalty: penalty("reset_holding_thresh1", "reset_holding_thresh2")?,
        };
        for (field, bounds) in [
            ("aadi", limits.bounds.aadi),
            ("iv", limits.bounds.initial_value),
            ("t100", limits.bounds.t100),
        ] {
            if bounds.min > bounds.max {
                return Err(ModelError::RangeViolation {
                    field: format!("{set}.{field}_min"),
                    min: f64::MIN,
                    max: bounds.max,
                    value: bounds.min,
                });
            }
        }
        Ok(limits)
    }
}

/// S-curve model for one distress kind.
#[derive(Debug, Clone, PartialEq)]
pub struct DistressModel {
    kind: DistressKind,
    limits: DistressLimits,
}

impl DistressModel {
    #[must_use]
    pub const fn new(kind: DistressKind, limits: DistressLimits) -> Self {
        Self { kind, limits }
    }

    /// # Errors
    ///
    /// Returns an error when the kind's lookup set is incomplete.
    pub fn from_lookups(kind: DistressKind, lookups: &LookupTables) -> Result<Self, ModelError> {
        Ok(Self::new(kind, DistressLimits::from_lookups(lookups, &kind.lookup_set())?))
    }

    #[must_use]
    pub const fn kind(&self) -> DistressKind {
        self.kind
    }

    #[must_use]
    pub const fn limits(&self) -> &DistressLimits {
        &self.limits
    }

    /// Probability that the distress develops on this segment.
    ///
    /// # Errors
    ///
    /// Propagates segment life-calculation failures.
    pub fn probability(&self, segment: &Segment) -> Result<f64, ModelError> {
        Ok(logit(self.kind.occurrence_logit(&segment.occurrence_inputs()?)))
    }

    fn expected_aadi(&self, segment: &Segment, probability: f64) -> f64 {
        self.limits
            .bounds
            .aadi
            .clamp(segment.surface_expected_life * (1.0 - probability))
    }

    fn expected_t100(&self, probability: f64) -> f64 {
        self.limits.bounds.t100.max * (1.0 - probability)
    }

    /// Starting percentage, corrected for surveys that predate the current surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the condition survey date cannot be parsed, or the
    /// survey is stale and the surface class has no historic reset curve.
    pub fn initial_value(
        &self,
        segment: &Segment,
        observed: f64,
        base_date: NaiveDate,
    ) -> Result<f64, ModelError> {
        let code = segment.feedback_code();
        let survey_date = parse_date(&code, "condition survey", &segment.survey.condition_date)?;
        let survey_age = years_before(base_date, survey_date);
        if survey_age < 0.0 {
            log::warn!("{code}: condition survey date {survey_date} is in the future");
        }
        if segment.surface_age >= survey_age {
            return Ok(observed);
        }
        if *segment.surface_function() == SurfaceFunction::FirstCoat {
            return Ok(0.0);
        }
        match segment.surface_class {
            SurfaceClass::Chipseal => Ok(self.limits.historic_chipseal.value(observed)),
            SurfaceClass::Asphalt => Ok(self.limits.historic_asphalt.value(observed)),
            other => Err(ModelError::NoHistoricCurve {
                segment: code,
                class: other.to_string(),
            }),
        }
    }

    /// Fit curve parameters so the curve reproduces `observed` at the current surface age.
    ///
    /// # Errors
    ///
    /// Propagates segment life-calculation failures.
    pub fn calibrated_setup<F>(
        &self,
        segment: &Segment,
        observed: f64,
        tolerance: f64,
        fitter: &F,
    ) -> Result<CurveParams, ModelError>
    where
        F: CurveFitter + ?Sized,
    {
        let probability = self.probability(segment)?;
        let bounds = self.limits.bounds;
        let expected = CurveParams::new(
            bounds.aadi.nudge_inside(self.expected_aadi(segment, probability)),
            bounds
                .initial_value
                .nudge_inside(self.limits.expected_initial_value),
            bounds.t100.nudge_inside(self.expected_t100(probability)),
        );
        let request = CalibrationRequest {
            surface_age: segment.surface_age,
            observed,
            expected,
            bounds,
            tolerance,
        };
        Ok(fitter.calibrate(&request).rounded())
    }

    /// Growth over the period just completed.
    #[must_use]
    pub fn increment<F>(&self, segment: &Segment, params: CurveParams, fitter: &F) -> f64
    where
        F: CurveFitter + ?Sized,
    {
        let age = segment.surface_age;
        if age < params.aadi {
            0.0
        } else if age - 1.0 < params.aadi {
            params.initial_value
        } else {
            fitter.progression_increment(params.t100, age - params.aadi)
        }
    }

    /// Value after one period. Only chipseal and asphalt surfaces deteriorate.
    #[must_use]
    pub fn next_value_after_increment<F>(
        &self,
        segment: &Segment,
        current: f64,
        params: CurveParams,
        fitter: &F,
    ) -> f64
    where
        F: CurveFitter + ?Sized,
    {
        if !segment.is_chipseal_or_asphalt() {
            return current;
        }
        current + self.increment(segment, params, fitter)
    }

    /// Every treatment removes the visible distress.
    #[must_use]
    pub const fn value_after_reset(&self) -> f64 {
        0.0
    }

    /// Curve parameters for the surface laid by a treatment of `category`.
    ///
    /// Pre-seal repairs keep the previous curve. Rehabilitation starts a fresh
    /// curve; holding and resurfacing treatments shorten it according to how
    /// much distress was present before treatment.
    ///
    /// # Errors
    ///
    /// Propagates segment life-calculation failures.
    pub fn resetted_setup(
        &self,
        segment: &Segment,
        pre_treatment_value: f64,
        category: &str,
        previous: CurveParams,
    ) -> Result<CurveParams, ModelError> {
        if segment.previous_surface_function() == Some(&SurfaceFunction::Preseal) {
            return Ok(previous);
        }
        let probability = self.probability(segment)?;
        let bounds = self.limits.bounds;
        let aadi = self.expected_aadi(segment, probability);
        let t100 = self.expected_t100(probability);
        let fresh = CurveParams::new(aadi, self.limits.expected_initial_value, t100);

        let category = category.to_lowercase();
        if !self.kind.penalised_reset() || category.contains("rehab") {
            return Ok(fresh.rounded());
        }
        let penalty = if category.contains("holding") {
            &self.limits.holding_penalty
        } else {
            &self.limits.resurfacing_penalty
        };
        let factor = penalty.value(pre_treatment_value);
        Ok(CurveParams::new(
            bounds.aadi.clamp(aadi * factor),
            self.limits.expected_initial_value,
            bounds.t100.clamp(t100 * factor),
        )
        .rounded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distress::LogisticCurveFitter;
    use crate::segment::tests::sample_segment;

    fn model(kind: DistressKind) -> DistressModel {
        DistressModel::from_lookups(kind, LookupTables::default_tables()).unwrap()
    }

    fn base_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
    }

    #[test]
    fn dormant_increment_is_zero() {
        let m = model(DistressKind::MeshCracks);
        let mut s = sample_segment();
        s.surface_age = 4.0;
        let params = CurveParams::new(6.0, 2.0, 20.0);
        assert!(m.increment(&s, params, &LogisticCurveFitter).abs() < f64::EPSILON);
    }

    #[test]
    fn first_period_after_initiation_adds_initial_value() {
        let m = model(DistressKind::MeshCracks);
        let mut s = sample_segment();
        s.surface_age = 6.5;
        let params = CurveParams::new(6.0, 2.0, 20.0);
        assert!((m.increment(&s, params, &LogisticCurveFitter) - 2.0).abs() < f64::EPSILON);
        let next = m.next_value_after_increment(&s, 0.0, params, &LogisticCurveFitter);
        assert!((next - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn non_bituminous_surfaces_do_not_deteriorate() {
        let m = model(DistressKind::Shoving);
        let mut s = sample_segment();
        s.surface_class = SurfaceClass::Concrete;
        s.surface_age = 20.0;
        let params = CurveParams::new(2.0, 2.0, 20.0);
        let next = m.next_value_after_increment(&s, 3.0, params, &LogisticCurveFitter);
        assert!((next - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reset_value_is_always_zero() {
        for kind in DistressKind::ALL {
            assert!(model(kind).value_after_reset().abs() < f64::EPSILON);
        }
    }

    #[test]
    fn current_survey_keeps_observed_value() {
        let m = model(DistressKind::Scabbing);
        let mut s = sample_segment();
        s.survey.condition_date = "01/07/2022".to_string();
        s.surface_age = 8.0;
        assert!((m.initial_value(&s, 4.2, base_date()).unwrap() - 4.2).abs() < f64::EPSILON);
    }

    #[test]
    fn stale_survey_on_first_coat_starts_clean() {
        let m = model(DistressKind::Scabbing);
        let mut s = sample_segment();
        s.survey.condition_date = "01/07/2020".to_string();
        s.surface_age = 1.0;
        s.set_surface_function(SurfaceFunction::FirstCoat);
        assert!(m.initial_value(&s, 9.0, base_date()).unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn stale_survey_uses_historic_curve() {
        let m = model(DistressKind::Scabbing);
        let mut s = sample_segment();
        s.survey.condition_date = "01/07/2020".to_string();
        s.surface_age = 1.0;
        let expected = m.limits().historic_chipseal.value(9.0);
        assert!((m.initial_value(&s, 9.0, base_date()).unwrap() - expected).abs() < 1e-12);
        s.surface_class = SurfaceClass::Blocks;
        assert!(matches!(
            m.initial_value(&s, 9.0, base_date()),
            Err(ModelError::NoHistoricCurve { .. })
        ));
    }

    #[test]
    fn calibrated_setup_stays_in_bounds_and_is_rounded() {
        let m = model(DistressKind::MeshCracks);
        let s = sample_segment();
        let params = m.calibrated_setup(&s, 3.0, 0.5, &LogisticCurveFitter).unwrap();
        let b = m.limits().bounds;
        assert!(params.aadi >= b.aadi.min && params.aadi <= b.aadi.max);
        assert!(params.t100 >= b.t100.min && params.t100 <= b.t100.max);
        assert_eq!(params, params.rounded());
    }

    #[test]
    fn preseal_keeps_previous_parameters() {
        let m = model(DistressKind::Potholes);
        let mut s = sample_segment();
        s.set_surface_function(SurfaceFunction::Preseal);
        s.set_surface_function(SurfaceFunction::Holding);
        let previous = CurveParams::new(4.0, 1.0, 15.0);
        let reset = m.resetted_setup(&s, 5.0, "resurfacing", previous).unwrap();
        assert_eq!(reset, previous);
    }

    #[test]
    fn penalties_shorten_the_curve() {
        let m = model(DistressKind::MeshCracks);
        let s = sample_segment();
        let previous = CurveParams::default();
        let fresh = m.resetted_setup(&s, 50.0, "Rehab", previous).unwrap();
        let penalised = m.resetted_setup(&s, 50.0, "resurfacing", previous).unwrap();
        assert!(penalised.aadi <= fresh.aadi);
        assert!(penalised.t100 <= fresh.t100);
    }

    #[test]
    fn surface_distresses_reset_without_penalty() {
        let m = model(DistressKind::Flushing);
        let s = sample_segment();
        let clean = m.resetted_setup(&s, 0.0, "holding", CurveParams::default()).unwrap();
        let heavy = m.resetted_setup(&s, 80.0, "holding", CurveParams::default()).unwrap();
        assert_eq!(clean, heavy);
    }
}
