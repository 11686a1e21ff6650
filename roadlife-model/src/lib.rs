//! Roadlife Model
//!
//! Platform-agnostic road segment deterioration and treatment trigger model.
//! Segments are initialised from raw inventory rows, then advanced period by
//! period through increments (no works) and resets (a treatment applied).
//! Each period the model proposes scored treatments for a network optimiser
//! and reports routine maintenance. The host owns all persistence; state
//! travels between calls as a flat parameter map.

pub mod candidate;
pub mod config;
pub mod constants;
pub mod dates;
pub mod distress;
pub mod error;
pub mod indices;
pub mod inputs;
pub mod lifecycle;
pub mod lookups;
pub mod maintenance;
pub mod model;
pub mod numbers;
pub mod params;
pub mod piecewise;
pub mod roughness;
pub mod segment;
pub mod suitability;
pub mod treatments;
pub mod triggers;

// Re-export commonly used types
pub use candidate::{CandidateVerdict, HostSchedule, evaluate_candidate, refresh_candidate};
pub use config::{CandidateThresholds, ModelConstants, SuitabilityThresholds};
pub use distress::{
    CurveFitter, CurveParams, DistressKind, DistressModel, DistressSet, DistressState,
    LogisticCurveFitter,
};
pub use error::{ModelError, SegmentError};
pub use indices::compute_indices;
pub use inputs::{RawRow, segment_from_row};
pub use lifecycle::{ModelContext, TreatmentKind, increment, initialise, reset};
pub use lookups::{LookupTables, LookupValue};
pub use maintenance::routine_maintenance;
pub use model::RoadModel;
pub use params::{ParamValue, ParameterMap};
pub use piecewise::{ControlPoint, PiecewiseLinear};
pub use roughness::{IncrementSampler, InverseDistributionSampler, RoughnessMeasure};
pub use segment::{Segment, SegmentIndices, SurfaceClass, SurfaceFunction};
pub use suitability::{holding_score, preservation_score, rehabilitation_score};
pub use treatments::{TreatmentCatalog, TreatmentType};
pub use triggers::{ProposalList, TreatmentProposal, treatment_proposals};
