//! Piecewise-linear curves defined by `(x, y)` control points.
//!
//! Curves are configured through compact setup strings such as `"0,1|5,0.5|10,0"`
//! so they can live inside lookup tables. Outside the control-point range a curve
//! either holds the end value or extrapolates along the end segment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiecewiseLinear {
    points: Vec<ControlPoint>,
    extrapolate: bool,
}

impl PiecewiseLinear {
    /// Build a curve from control points, sorting them by `x`.
    ///
    /// # Errors
    ///
    /// Returns an error when no points are supplied or any coordinate is not finite.
    pub fn new(mut points: Vec<ControlPoint>, extrapolate: bool) -> Result<Self, ModelError> {
        if points.is_empty() {
            return Err(ModelError::InvalidPiecewise {
                setup: String::new(),
                reason: "no control points".to_string(),
            });
        }
        if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(ModelError::InvalidPiecewise {
                setup: format_points(&points),
                reason: "non-finite coordinate".to_string(),
            });
        }
        // Stable sort keeps the first of any duplicated x ahead of later ones.
        points.sort_by(|a, b| a.x.total_cmp(&b.x));
        Ok(Self {
            points,
            extrapolate,
        })
    }

    /// Parse a setup string of the form `"x1,y1|x2,y2|..."`.
    ///
    /// # Errors
    ///
    /// Returns an error for empty strings, pairs without exactly two values, or
    /// values that are not numbers.
    pub fn from_setup(setup: &str, extrapolate: bool) -> Result<Self, ModelError> {
        let invalid = |reason: &str| ModelError::InvalidPiecewise {
            setup: setup.to_string(),
            reason: reason.to_string(),
        };
        let mut points = Vec::new();
        for pair in setup.split('|') {
            let pair = pair.trim();
            if pair.is_empty() {
                return Err(invalid("empty control point"));
            }
            let mut coords = pair.split(',').map(str::trim);
            let (Some(x), Some(y), None) = (coords.next(), coords.next(), coords.next()) else {
                return Err(invalid("control points need exactly two values"));
            };
            let x = x.parse::<f64>().map_err(|_| invalid("x is not a number"))?;
            let y = y.parse::<f64>().map_err(|_| invalid("y is not a number"))?;
            points.push(ControlPoint { x, y });
        }
        Self::new(points, extrapolate).map_err(|err| match err {
            ModelError::InvalidPiecewise { reason, .. } => invalid(&reason),
            other => other,
        })
    }

    #[must_use]
    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    #[must_use]
    pub const fn extrapolates(&self) -> bool {
        self.extrapolate
    }

    /// Evaluate the curve at `x`.
    #[must_use]
    pub fn value(&self, x: f64) -> f64 {
        let points = &self.points;
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            return 0.0;
        };
        if points.len() == 1 {
            return first.y;
        }
        if x < first.x {
            return if self.extrapolate {
                along(points[0], points[1], x)
            } else {
                first.y
            };
        }
        if x > last.x {
            let n = points.len();
            return if self.extrapolate {
                along(points[n - 2], points[n - 1], x)
            } else {
                last.y
            };
        }
        if let Some(hit) = points.iter().find(|p| p.x == x) {
            return hit.y;
        }
        points
            .windows(2)
            .find(|w| x > w[0].x && x < w[1].x)
            .map_or(last.y, |w| along(w[0], w[1], x))
    }
}

impl FromStr for PiecewiseLinear {
    type Err = ModelError;

    /// Parses a clamping curve; use [`PiecewiseLinear::from_setup`] to extrapolate.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_setup(s, false)
    }
}

impl fmt::Display for PiecewiseLinear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_points(&self.points))
    }
}

fn along(a: ControlPoint, b: ControlPoint, x: f64) -> f64 {
    let dx = b.x - a.x;
    if dx == 0.0 {
        return a.y;
    }
    a.y + (x - a.x) * (b.y - a.y) / dx
}

fn format_points(points: &[ControlPoint]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join("|")
}
