//! Curve fitting for distress S-curves.
//!
//! The fitter owns the shape of the progression curve. The default
//! [`LogisticCurveFitter`] uses a logistic that passes through 1% at
//! initiation and 99% after `T100` years.

use serde::{Deserialize, Serialize};

use super::params::CurveParams;

const MAX_ITERATIONS: usize = 60;

/// Closed interval for one curve parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamBounds {
    pub min: f64,
    pub max: f64,
}

impl ParamBounds {
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    /// Nudge values sitting at or beyond a bound inside the interval so the
    /// fitter has room to move in both directions.
    #[must_use]
    pub fn nudge_inside(&self, value: f64) -> f64 {
        if value <= self.min {
            self.min * 1.05
        } else if value >= self.max {
            self.max * 0.95
        } else {
            value
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveBounds {
    pub aadi: ParamBounds,
    pub initial_value: ParamBounds,
    pub t100: ParamBounds,
}

impl CurveBounds {
    #[must_use]
    pub fn clamp(&self, params: CurveParams) -> CurveParams {
        CurveParams::new(
            self.aadi.clamp(params.aadi),
            self.initial_value.clamp(params.initial_value),
            self.t100.clamp(params.t100),
        )
    }
}

/// Everything a fitter needs to calibrate one distress curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationRequest {
    pub surface_age: f64,
    pub observed: f64,
    pub expected: CurveParams,
    pub bounds: CurveBounds,
    pub tolerance: f64,
}

/// Calibrates curve parameters and evaluates yearly progression.
pub trait CurveFitter: Send + Sync {
    /// Adjust `request.expected` so the curve reproduces the observed value at
    /// the current surface age, staying inside the bounds.
    fn calibrate(&self, request: &CalibrationRequest) -> CurveParams;

    /// Growth over the year ending `periods_since_initiation` years after initiation.
    fn progression_increment(&self, t100: f64, periods_since_initiation: f64) -> f64;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogisticCurveFitter;

impl LogisticCurveFitter {
    /// Cumulative logistic percentage `t` years after initiation.
    #[must_use]
    pub fn cumulative(t100: f64, t: f64) -> f64 {
        if t100 <= 0.0 {
            return 100.0;
        }
        let steepness = 2.0 * 99_f64.ln() / t100;
        100.0 / (1.0 + (-steepness * (t - t100 / 2.0)).exp())
    }

    /// Distress percentage the curve predicts at `surface_age`.
    ///
    /// Matches the sum of yearly increments: zero before initiation, the initial
    /// value in the first year, then logistic growth on top.
    #[must_use]
    pub fn value_at(params: CurveParams, surface_age: f64) -> f64 {
        let t = surface_age - params.aadi;
        if t < 0.0 {
            return 0.0;
        }
        if t < 1.0 {
            return params.initial_value;
        }
        params.initial_value + Self::cumulative(params.t100, t)
            - Self::cumulative(params.t100, t.fract())
    }

    fn error(params: CurveParams, request: &CalibrationRequest) -> f64 {
        Self::value_at(params, request.surface_age) - request.observed
    }

    fn fit_dormant(mut params: CurveParams, request: &CalibrationRequest) -> CurveParams {
        let bounds = &request.bounds;
        params.aadi = bounds.aadi.clamp((request.surface_age + 1.0).max(params.aadi));
        if params.aadi <= request.surface_age {
            params.initial_value = bounds.initial_value.min;
        }
        params
    }

    fn fit_t100(mut params: CurveParams, request: &CalibrationRequest) -> CurveParams {
        let bounds = &request.bounds;
        let mut fastest = params;
        fastest.t100 = bounds.t100.min;
        let shortfall = Self::error(fastest, request);
        if shortfall < -request.tolerance {
            fastest.initial_value = bounds.initial_value.clamp(fastest.initial_value - shortfall);
            return fastest;
        }
        let (mut quick, mut slow) = (bounds.t100.min, params.t100);
        let mut best = (shortfall.abs(), fastest);
        for _ in 0..MAX_ITERATIONS {
            params.t100 = 0.5 * (quick + slow);
            let err = Self::error(params, request);
            if err.abs() < best.0 {
                best = (err.abs(), params);
            }
            if err.abs() <= request.tolerance {
                break;
            }
            if err > 0.0 {
                quick = params.t100;
            } else {
                slow = params.t100;
            }
        }
        best.1
    }

    fn fit_aadi(
        mut params: CurveParams,
        request: &CalibrationRequest,
        earliest: f64,
        latest: f64,
    ) -> CurveParams {
        let (mut early, mut late) = (earliest, latest);
        let mut best = (f64::INFINITY, params);
        for _ in 0..MAX_ITERATIONS {
            params.aadi = 0.5 * (early + late);
            let err = Self::error(params, request);
            if err.abs() < best.0 {
                best = (err.abs(), params);
            }
            if err.abs() <= request.tolerance {
                break;
            }
            if err > 0.0 {
                early = params.aadi;
            } else {
                late = params.aadi;
            }
        }
        best.1
    }
}

impl CurveFitter for LogisticCurveFitter {
    fn calibrate(&self, request: &CalibrationRequest) -> CurveParams {
        let bounds = &request.bounds;
        let mut params = bounds.clamp(request.expected);
        if Self::error(params, request).abs() <= request.tolerance {
            return params;
        }
        if request.observed <= request.tolerance {
            return Self::fit_dormant(params, request);
        }

        let earliest = bounds.aadi.min;
        let latest = request.surface_age.min(bounds.aadi.max);
        if latest < earliest {
            params.aadi = earliest;
            return params;
        }

        params.aadi = latest;
        let excess = Self::error(params, request);
        if excess > request.tolerance {
            params.initial_value = bounds.initial_value.clamp(params.initial_value - excess);
            return params;
        }

        params.aadi = earliest;
        if Self::error(params, request) < -request.tolerance {
            return Self::fit_t100(params, request);
        }
        Self::fit_aadi(params, request, earliest, latest)
    }

    fn progression_increment(&self, t100: f64, periods_since_initiation: f64) -> f64 {
        if t100 <= 0.0 {
            return 0.0;
        }
        Self::cumulative(t100, periods_since_initiation)
            - Self::cumulative(t100, periods_since_initiation - 1.0)
    }
}
