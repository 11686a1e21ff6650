//! Error types shared by every model component.

use thiserror::Error;

/// Failures raised while configuring or advancing a segment.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("lookup set '{set}' has no key '{key}'")]
    MissingLookup { set: String, key: String },
    #[error("lookup '{set}.{key}' is not a {expected} (got '{value}')")]
    LookupType {
        set: String,
        key: String,
        expected: &'static str,
        value: String,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: String,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("{segment}: cannot parse {field} date '{value}'")]
    InvalidDate {
        segment: String,
        field: &'static str,
        value: String,
    },
    #[error("curve parameters '{value}' must be three underscore-separated numbers")]
    InvalidCurveParams { value: String },
    #[error("piecewise setup '{setup}' is invalid: {reason}")]
    InvalidPiecewise { setup: String, reason: String },
    #[error("{segment}: {what} denominator must be positive (got {value:.2})")]
    NonPositiveLife {
        segment: String,
        what: &'static str,
        value: f64,
    },
    #[error("unknown surface class '{value}'")]
    UnknownSurfaceClass { value: String },
    #[error("{segment}: no historic reset curve for surface class '{class}'")]
    NoHistoricCurve { segment: String, class: String },
    #[error("treatment '{name}' is not in the catalogue")]
    UnknownTreatment { name: String },
    #[error("treatment '{name}' must have unit rate {expected:.2} (got {actual:.2})")]
    InvalidUnitRate {
        name: String,
        expected: f64,
        actual: f64,
    },
    #[error("unknown increment distribution '{code}'")]
    UnknownDistribution { code: String },
    #[error("raw column '{column}' is missing")]
    MissingColumn { column: String },
    #[error("raw column '{column}' has invalid value '{value}'")]
    InvalidColumn { column: String, value: String },
    #[error("parameter '{key}' is missing")]
    MissingParameter { key: String },
    #[error("parameter '{key}' is not a {expected}")]
    InvalidParameter { key: String, expected: &'static str },
}

impl ModelError {
    pub(crate) fn missing_lookup(set: &str, key: &str) -> Self {
        Self::MissingLookup {
            set: set.to_string(),
            key: key.to_string(),
        }
    }
}

/// A [`ModelError`] tagged with the segment and the operation that raised it.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("element {element_index} ({operation}): {source}")]
pub struct SegmentError {
    pub element_index: i32,
    pub operation: &'static str,
    #[source]
    pub source: ModelError,
}

impl SegmentError {
    #[must_use]
    pub const fn new(element_index: i32, operation: &'static str, source: ModelError) -> Self {
        Self {
            element_index,
            operation,
            source,
        }
    }
}

pub type ModelResult<T> = Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_error_names_element_and_operation() {
        let err = SegmentError::new(
            12,
            "increment",
            ModelError::missing_lookup("general", "base_date"),
        );
        let text = err.to_string();
        assert!(text.starts_with("element 12 (increment)"));
        assert!(text.contains("'general' has no key 'base_date'"));
    }

    #[test]
    fn range_violation_formats_bounds() {
        let err = ModelError::RangeViolation {
            field: "poth_booster".to_string(),
            min: 0.0,
            max: 10.0,
            value: 12.0,
        };
        assert_eq!(
            err.to_string(),
            "poth_booster must be between 0.00 and 10.00 (got 12.00)"
        );
    }
}
