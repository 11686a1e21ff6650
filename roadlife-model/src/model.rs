//! Host-facing model: parameter maps in, parameter maps and proposals out.
//!
//! Every call rebuilds the segment from the map the host passes back, so the
//! model holds no per-segment state between calls and the same instance can
//! serve many threads.

use crate::candidate::{HostSchedule, refresh_candidate};
use crate::distress::{CurveFitter, LogisticCurveFitter};
use crate::error::{ModelError, SegmentError};
use crate::indices::compute_indices;
use crate::inputs::RawRow;
use crate::lifecycle::{self, ModelContext};
use crate::maintenance;
use crate::params::ParameterMap;
use crate::roughness::{IncrementSampler, InverseDistributionSampler};
use crate::segment::Segment;
use crate::triggers::{self, ProposalList, TreatmentProposal};

/// Road deterioration and treatment trigger model.
pub struct RoadModel<F = LogisticCurveFitter, S = InverseDistributionSampler>
where
    F: CurveFitter,
    S: IncrementSampler,
{
    context: ModelContext,
    fitter: F,
    sampler: S,
}

impl RoadModel {
    /// Model over the embedded lookups and catalogue with the default fitter and sampler.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded lookups are incomplete.
    pub fn with_defaults() -> Result<Self, ModelError> {
        Ok(Self::new(
            ModelContext::with_defaults()?,
            LogisticCurveFitter,
            InverseDistributionSampler,
        ))
    }
}

impl<F, S> RoadModel<F, S>
where
    F: CurveFitter,
    S: IncrementSampler,
{
    pub const fn new(context: ModelContext, fitter: F, sampler: S) -> Self {
        Self {
            context,
            fitter,
            sampler,
        }
    }

    #[must_use]
    pub const fn context(&self) -> &ModelContext {
        &self.context
    }

    /// Starting parameter map for a segment.
    ///
    /// # Errors
    ///
    /// Returns the failure tagged with the element index.
    pub fn initialise<R>(
        &self,
        element_index: i32,
        row: &R,
        schedule: &HostSchedule,
    ) -> Result<ParameterMap, SegmentError>
    where
        R: RawRow + ?Sized,
    {
        let tag = |e: ModelError| SegmentError::new(element_index, "initialise", e);
        let mut segment =
            lifecycle::initialise(&self.context, element_index, row, &self.fitter).map_err(tag)?;
        self.refresh(&mut segment, 0, schedule).map_err(tag)?;
        segment.parameter_map().map_err(tag)
    }

    /// Advance an untreated segment by one period.
    ///
    /// # Errors
    ///
    /// Returns the failure tagged with the element index.
    pub fn increment(
        &self,
        element_index: i32,
        map: &ParameterMap,
        period: i32,
        schedule: &HostSchedule,
    ) -> Result<ParameterMap, SegmentError> {
        let tag = |e: ModelError| SegmentError::new(element_index, "increment", e);
        let mut segment = self.load(element_index, map, period).map_err(tag)?;
        self.refresh(&mut segment, period, schedule).map_err(tag)?;
        // Increments carry the verdict as evaluated at period 0.
        refresh_candidate(&mut segment, 0, schedule, &self.context.constants().candidate)
            .map_err(tag)?;
        lifecycle::increment(&self.context, &mut segment, period, &self.fitter, &self.sampler)
            .map_err(tag)?;
        self.refresh(&mut segment, period, schedule).map_err(tag)?;
        segment.parameter_map().map_err(tag)
    }

    /// Apply a treatment chosen by the optimiser. `None` only refreshes the indices.
    ///
    /// # Errors
    ///
    /// Returns the failure tagged with the element index.
    pub fn reset(
        &self,
        element_index: i32,
        map: &ParameterMap,
        period: i32,
        treatment: Option<&str>,
        schedule: &HostSchedule,
    ) -> Result<ParameterMap, SegmentError> {
        let tag = |e: ModelError| SegmentError::new(element_index, "reset", e);
        let mut segment = self.load(element_index, map, period).map_err(tag)?;
        self.refresh(&mut segment, period, schedule).map_err(tag)?;
        lifecycle::reset(&self.context, &mut segment, period, treatment, &self.sampler)
            .map_err(tag)?;
        self.refresh(&mut segment, period, schedule).map_err(tag)?;
        segment.parameter_map().map_err(tag)
    }

    /// Treatments to offer the optimiser, judged on the stored candidate verdict.
    ///
    /// # Errors
    ///
    /// Returns the failure tagged with the element index.
    pub fn treatment_candidates(
        &self,
        element_index: i32,
        map: &ParameterMap,
        period: i32,
        schedule: &HostSchedule,
    ) -> Result<ProposalList, SegmentError> {
        let tag = |e: ModelError| SegmentError::new(element_index, "treatment candidates", e);
        let segment = self.load(element_index, map, period).map_err(tag)?;
        triggers::treatment_proposals(&self.context, &segment, period, schedule).map_err(tag)
    }

    /// Routine maintenance triggered after treatment selection.
    ///
    /// # Errors
    ///
    /// Returns the failure tagged with the element index.
    pub fn routine_maintenance(
        &self,
        element_index: i32,
        map: &ParameterMap,
        period: i32,
        schedule: &HostSchedule,
    ) -> Result<Option<TreatmentProposal>, SegmentError> {
        let tag = |e: ModelError| SegmentError::new(element_index, "routine maintenance", e);
        let mut segment = self.load(element_index, map, period).map_err(tag)?;
        self.refresh(&mut segment, period, schedule).map_err(tag)?;
        Ok(maintenance::routine_maintenance(&segment, period))
    }

    /// Rebuild the segment for `period`. Every segment may be rehabilitated
    /// once the rehab restriction period has passed.
    ///
    /// # Errors
    ///
    /// Returns an error when the map is incomplete or malformed.
    pub fn load(
        &self,
        element_index: i32,
        map: &ParameterMap,
        period: i32,
    ) -> Result<Segment, ModelError> {
        let mut segment = Segment::from_parameter_map(element_index, map, self.context.lookups())?;
        if period > self.context.constants().rehab_open_after_period {
            segment.can_rehab = true;
        }
        Ok(segment)
    }

    fn refresh(
        &self,
        segment: &mut Segment,
        period: i32,
        schedule: &HostSchedule,
    ) -> Result<(), ModelError> {
        segment.indices = compute_indices(segment, self.context.lookups(), self.context.constants())?;
        refresh_candidate(segment, period, schedule, &self.context.constants().candidate)?;
        Ok(())
    }
}
