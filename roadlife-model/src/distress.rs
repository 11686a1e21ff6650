//! Visual distress progression.
//!
//! Seven distresses share one S-curve model. [`DistressKind`] carries the
//! per-distress differences: the probability-of-occurrence coefficients, the
//! raw-data column, the lookup set holding curve limits, and whether resets
//! after treatment are penalised.

pub mod fit;
pub mod model;
pub mod params;

use serde::{Deserialize, Serialize};

pub use fit::{CalibrationRequest, CurveBounds, CurveFitter, LogisticCurveFitter, ParamBounds};
pub use model::{DistressLimits, DistressModel};
pub use params::CurveParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistressKind {
    Flushing,
    EdgeBreak,
    Scabbing,
    LongTransCracks,
    MeshCracks,
    Shoving,
    Potholes,
}

impl DistressKind {
    /// Evaluation order. Later kinds read the current values of earlier ones.
    pub const ALL: [Self; 7] = [
        Self::Flushing,
        Self::EdgeBreak,
        Self::Scabbing,
        Self::LongTransCracks,
        Self::MeshCracks,
        Self::Shoving,
        Self::Potholes,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Flushing => 0,
            Self::EdgeBreak => 1,
            Self::Scabbing => 2,
            Self::LongTransCracks => 3,
            Self::MeshCracks => 4,
            Self::Shoving => 5,
            Self::Potholes => 6,
        }
    }

    /// Short key used in parameter names and lookup-set names.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Flushing => "flush",
            Self::EdgeBreak => "edgeb",
            Self::Scabbing => "scabb",
            Self::LongTransCracks => "lt_cracks",
            Self::MeshCracks => "mesh_cracks",
            Self::Shoving => "shove",
            Self::Potholes => "poth",
        }
    }

    /// Raw-data column holding the surveyed percentage.
    #[must_use]
    pub const fn raw_column(self) -> &'static str {
        match self {
            Self::Flushing => "file_pct_flush",
            Self::EdgeBreak => "file_pct_edgebreak",
            Self::Scabbing => "file_pct_scabb",
            Self::LongTransCracks => "file_pct_lt_crax",
            Self::MeshCracks => "file_pct_allig",
            Self::Shoving => "file_pct_shove",
            Self::Potholes => "file_pct_poth",
        }
    }

    #[must_use]
    pub fn lookup_set(self) -> String {
        format!("scurve_{}", self.key())
    }

    #[must_use]
    pub fn percent_parameter(self) -> String {
        format!("para_{}_pct", self.key())
    }

    #[must_use]
    pub fn setup_parameter(self) -> String {
        format!("para_{}_info", self.key())
    }

    /// Surface-level distresses come back as new after any treatment.
    #[must_use]
    pub const fn penalised_reset(self) -> bool {
        !matches!(self, Self::Flushing | Self::EdgeBreak | Self::Scabbing)
    }

    /// Linear predictor of the probability that the distress develops.
    #[must_use]
    pub fn occurrence_logit(self, x: &OccurrenceInputs) -> f64 {
        match self {
            Self::Flushing => -11.95 + 10.0 * x.chipseal - 0.37 * x.urban + 0.05 * x.hcv_risk,
            Self::EdgeBreak => 4.0 - x.width - 10.0 * x.urban,
            Self::Scabbing => -2.89 + 1.71 * x.chipseal + 0.62 * x.urban + 0.06 * x.hcv_risk,
            Self::LongTransCracks => {
                -1.39 - 1.24 * x.chipseal + 0.82 * x.urban + 0.09 * x.hcv_risk + 0.03 * x.scabbing
            }
            Self::MeshCracks => {
                -2.18 - 0.43 * x.chipseal
                    + 0.28 * x.urban
                    + 0.12 * x.hcv_risk
                    + 0.02 * x.lt_cracks
                    + 0.01 * x.scabbing
            }
            Self::Shoving => {
                -3.63 + 0.62 * x.chipseal
                    + 0.31 * x.urban
                    + 0.08 * x.hcv_risk
                    + 0.03 * x.mesh_cracks
                    + 0.01 * x.scabbing
            }
            Self::Potholes => {
                -3.0 + 1.15 * x.chipseal
                    + 0.36 * x.urban
                    + 0.03 * x.hcv_risk
                    + 0.03 * x.shoving
                    + 0.02 * x.mesh_cracks
                    + 0.02 * x.scabbing
            }
        }
    }
}

/// Covariates for [`DistressKind::occurrence_logit`]. Flags are 0 or 1.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OccurrenceInputs {
    pub chipseal: f64,
    pub urban: f64,
    pub hcv_risk: f64,
    pub width: f64,
    pub scabbing: f64,
    pub lt_cracks: f64,
    pub mesh_cracks: f64,
    pub shoving: f64,
}

/// Current percentage and curve parameters of one distress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DistressState {
    pub value: f64,
    pub params: CurveParams,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DistressSet {
    states: [DistressState; 7],
}

impl DistressSet {
    #[must_use]
    pub const fn get(&self, kind: DistressKind) -> &DistressState {
        &self.states[kind.index()]
    }

    pub const fn get_mut(&mut self, kind: DistressKind) -> &mut DistressState {
        &mut self.states[kind.index()]
    }

    #[must_use]
    pub const fn value(&self, kind: DistressKind) -> f64 {
        self.states[kind.index()].value
    }

    pub fn iter(&self) -> impl Iterator<Item = (DistressKind, &DistressState)> {
        DistressKind::ALL.into_iter().map(|kind| (kind, self.get(kind)))
    }
}
