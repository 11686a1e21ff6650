//! Rutting and roughness (NAASRA) estimators.
//!
//! Both measures share the same shape: an initial value corrected for surveys
//! that predate recent works, a yearly increment, and a reset after treatment
//! driven by how far the value exceeded its reset threshold.

use serde::{Deserialize, Serialize};

use crate::config::ModelConstants;
use crate::constants::{
    NAASRA_INCREMENT_CENTRAL, NAASRA_INCREMENT_DISTRIBUTION, NAASRA_INCREMENT_RANGE,
    RUT_INCREMENT_CENTRAL, RUT_INCREMENT_DISTRIBUTION, RUT_INCREMENT_RANGE,
};
use crate::distress::DistressKind;
use crate::error::ModelError;
use crate::lookups::LookupTables;
use crate::numbers::logit;
use crate::segment::{Segment, SurfaceFunction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoughnessMeasure {
    Rut,
    Naasra,
}

impl RoughnessMeasure {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Rut => "rut",
            Self::Naasra => "naasra",
        }
    }

    #[must_use]
    pub const fn increment_range(self) -> (f64, f64) {
        match self {
            Self::Rut => RUT_INCREMENT_RANGE,
            Self::Naasra => NAASRA_INCREMENT_RANGE,
        }
    }

    #[must_use]
    pub const fn distribution(self) -> (&'static str, f64) {
        match self {
            Self::Rut => (RUT_INCREMENT_DISTRIBUTION, RUT_INCREMENT_CENTRAL),
            Self::Naasra => (NAASRA_INCREMENT_DISTRIBUTION, NAASRA_INCREMENT_CENTRAL),
        }
    }

    #[must_use]
    pub const fn settling_in(self, constants: &ModelConstants) -> f64 {
        match self {
            Self::Rut => constants.settling_in_rut,
            Self::Naasra => constants.settling_in_naasra,
        }
    }

    #[must_use]
    pub const fn current(self, segment: &Segment) -> f64 {
        match self {
            Self::Rut => segment.rut,
            Self::Naasra => segment.naasra,
        }
    }

    fn lookup(self, lookups: &LookupTables, prefix: &str, segment: &Segment) -> Result<f64, ModelError> {
        lookups.number_value(&format!("{prefix}_{}", self.key()), &segment.surface_road_type())
    }

    /// Value after treatment when the pre-treatment value is corrected by the
    /// exceedance rule with this segment's threshold and improvement factor.
    ///
    /// # Errors
    ///
    /// Returns an error when either lookup is missing.
    pub fn exceedance_reset_for(
        self,
        segment: &Segment,
        value: f64,
        lookups: &LookupTables,
    ) -> Result<f64, ModelError> {
        let threshold = self.lookup(lookups, "reset_exceed_thresh", segment)?;
        let improvement = self.lookup(lookups, "reset_perc_improv_facts", segment)?;
        Ok(exceedance_reset(value, threshold, improvement))
    }

    /// Value after rehabilitation.
    ///
    /// # Errors
    ///
    /// Returns an error when the `rehab_resets_*` lookup is missing.
    pub fn rehab_reset(self, segment: &Segment, lookups: &LookupTables) -> Result<f64, ModelError> {
        self.lookup(lookups, "rehab_resets", segment)
    }

    /// Starting value given the raw survey value and the survey's age in years.
    ///
    /// A survey older than the pavement means the segment has been rebuilt
    /// since; older than the surface means it has been resurfaced since.
    ///
    /// # Errors
    ///
    /// Returns an error when a reset lookup is missing.
    pub fn initial_value(
        self,
        segment: &Segment,
        raw: f64,
        survey_age: f64,
        lookups: &LookupTables,
    ) -> Result<f64, ModelError> {
        if segment.pavement_age < survey_age {
            return self.rehab_reset(segment, lookups);
        }
        if segment.surface_age < survey_age {
            return self.exceedance_reset_for(segment, raw, lookups);
        }
        Ok(raw)
    }

    /// Yearly increment implied by the deterioration since the surface settled in.
    #[must_use]
    pub fn increment_estimate(self, value: f64, settling_in: f64, surface_age: f64) -> f64 {
        let (low, high) = self.increment_range();
        ((value - settling_in).max(0.0) / (surface_age + 0.1)).clamp(low, high)
    }

    /// Value after a treatment. Non-bituminous surfaces and pre-seal repairs leave it unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error when a reset lookup is missing.
    pub fn value_after_treatment(
        self,
        segment: &Segment,
        is_rehab: bool,
        lookups: &LookupTables,
    ) -> Result<f64, ModelError> {
        let current = self.current(segment);
        if !segment.is_chipseal_or_asphalt() || *segment.surface_function() == SurfaceFunction::Preseal
        {
            return Ok(current);
        }
        if is_rehab {
            self.rehab_reset(segment, lookups)
        } else {
            self.exceedance_reset_for(segment, current, lookups)
        }
    }

    /// Probability that the segment belongs to the fast-deteriorating group.
    #[must_use]
    pub fn high_progression_probability(self, segment: &Segment, hcv_risk: f64) -> f64 {
        let d = &segment.distresses;
        let cs = if segment.is_chipseal() { 1.0 } else { 0.0 };
        let urban = if segment.is_urban() { 1.0 } else { 0.0 };
        let shove = d.value(DistressKind::Shoving);
        let mesh = d.value(DistressKind::MeshCracks);
        let scab = d.value(DistressKind::Scabbing);
        let x = match self {
            Self::Rut => {
                -1.6 + 1.1 * cs - 0.4 * urban
                    + 0.02 * hcv_risk
                    + 0.06 * shove
                    + 0.02 * mesh
                    + 0.04 * scab
                    + 0.01 * d.value(DistressKind::Flushing)
            }
            Self::Naasra => {
                -2.8 + 0.6 * cs
                    + 0.5 * urban
                    + 0.03 * hcv_risk
                    + 0.02 * shove
                    + 0.01 * mesh
                    + 0.03 * scab
                    + 1.67 * d.value(DistressKind::Potholes)
                    + 0.09 * segment.rut
            }
        };
        logit(x)
    }

    /// Increment drawn from the sampler once the segment has been treated.
    ///
    /// # Errors
    ///
    /// Propagates life-calculation and sampler failures.
    pub fn increment_after_treatment<S>(self, segment: &Segment, sampler: &S) -> Result<f64, ModelError>
    where
        S: IncrementSampler + ?Sized,
    {
        let probability = self.high_progression_probability(segment, segment.hcv_risk()?);
        let (distribution, central) = self.distribution();
        sampler.sample(distribution, central, probability)
    }
}

/// Reduce the part of `value` above `threshold` by `improvement`.
#[must_use]
pub fn exceedance_reset(value: f64, threshold: f64, improvement: f64) -> f64 {
    if value <= threshold {
        value
    } else {
        value - (value - threshold) * improvement
    }
}

/// Draws a yearly increment from an inverse probability distribution.
pub trait IncrementSampler: Send + Sync {
    /// # Errors
    ///
    /// Returns an error for unsupported distribution codes.
    fn sample(&self, distribution: &str, central: f64, probability: f64) -> Result<f64, ModelError>;
}

/// Inverse CDF sampler.
///
/// Distribution `a` is exponential with its median at the central tendency, so
/// `probability = 0.5` returns `central` and higher probabilities return larger
/// increments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InverseDistributionSampler;

impl IncrementSampler for InverseDistributionSampler {
    fn sample(&self, distribution: &str, central: f64, probability: f64) -> Result<f64, ModelError> {
        match distribution {
            "a" | "A" => {
                let p = probability.clamp(0.001, 0.999);
                Ok(central * (1.0 - p).ln() / 0.5_f64.ln())
            }
            other => Err(ModelError::UnknownDistribution {
                code: other.to_string(),
            }),
        }
    }
}
