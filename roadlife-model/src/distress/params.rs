use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ModelError;
use crate::numbers::round_to;

/// S-curve parameters for one distress.
///
/// On the wire the parameters travel as `"AADI_IV_T100"` with each value rounded
/// to two decimals; they are parsed into this struct at the boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CurveParams {
    /// Age at distress initiation (years).
    pub aadi: f64,
    /// Percentage of area affected in the first period after initiation.
    pub initial_value: f64,
    /// Years from initiation until the distress covers the whole segment.
    pub t100: f64,
}

impl CurveParams {
    #[must_use]
    pub const fn new(aadi: f64, initial_value: f64, t100: f64) -> Self {
        Self {
            aadi,
            initial_value,
            t100,
        }
    }

    /// Round every field to the precision used on the wire.
    #[must_use]
    pub fn rounded(self) -> Self {
        Self::new(
            round_to(self.aadi, 2),
            round_to(self.initial_value, 2),
            round_to(self.t100, 2),
        )
    }
}

impl fmt::Display for CurveParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.rounded();
        write!(f, "{}_{}_{}", r.aadi, r.initial_value, r.t100)
    }
}

impl FromStr for CurveParams {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidCurveParams {
            value: s.to_string(),
        };
        let mut parts = s.split('_');
        let (Some(aadi), Some(iv), Some(t100), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        let parse = |part: &str| {
            part.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(invalid)
        };
        Ok(Self::new(parse(aadi)?, parse(iv)?, parse(t100)?))
    }
}

impl Serialize for CurveParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CurveParams {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
