//! Named lookup sets supplied by the host.
//!
//! Each set maps string keys to a number or a text value. The model only reads
//! lookups; a missing key is a configuration error for the segment being run.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::piecewise::PiecewiseLinear;

const DEFAULT_LOOKUP_DATA: &str = include_str!("../data/lookups.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LookupValue {
    Number(f64),
    Text(String),
}

impl LookupValue {
    fn describe(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(t) => t.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LookupTables {
    sets: HashMap<String, HashMap<String, LookupValue>>,
}

impl LookupTables {
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into lookup sets.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Lookup sets shipped with the crate, used by the tester and the tests.
    #[must_use]
    pub fn load_from_static() -> Self {
        serde_json::from_str(DEFAULT_LOOKUP_DATA).unwrap_or_default()
    }

    #[must_use]
    pub fn default_tables() -> &'static Self {
        static TABLES: OnceLock<LookupTables> = OnceLock::new();
        TABLES.get_or_init(Self::load_from_static)
    }

    /// Insert or replace a single value.
    pub fn insert(&mut self, set: &str, key: &str, value: LookupValue) {
        self.sets
            .entry(set.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    #[must_use]
    pub fn contains(&self, set: &str, key: &str) -> bool {
        self.sets.get(set).is_some_and(|s| s.contains_key(key))
    }

    fn get(&self, set: &str, key: &str) -> Result<&LookupValue, ModelError> {
        self.sets
            .get(set)
            .and_then(|s| s.get(key))
            .ok_or_else(|| ModelError::missing_lookup(set, key))
    }

    /// Numeric lookup. Text values that parse as numbers are accepted.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is missing or the value is not numeric.
    pub fn number_value(&self, set: &str, key: &str) -> Result<f64, ModelError> {
        match self.get(set, key)? {
            LookupValue::Number(n) => Ok(*n),
            LookupValue::Text(t) => t.trim().parse().map_err(|_| ModelError::LookupType {
                set: set.to_string(),
                key: key.to_string(),
                expected: "number",
                value: t.clone(),
            }),
        }
    }

    /// Text lookup. Numbers are rendered with their shortest representation.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is missing.
    pub fn text_value(&self, set: &str, key: &str) -> Result<String, ModelError> {
        Ok(self.get(set, key)?.describe())
    }

    /// Parse a text lookup as a piecewise-linear setup string.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is missing or the setup string is malformed.
    pub fn curve(&self, set: &str, key: &str, extrapolate: bool) -> Result<PiecewiseLinear, ModelError> {
        let setup = self.text_value(set, key)?;
        PiecewiseLinear::from_setup(&setup, extrapolate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "general": { "base_date": "01/07/2024", "rehab_open_after_period": 3 },
        "road_class": { "arterial": "a", "4": 2.5 }
    }"#;

    #[test]
    fn reads_numbers_and_text() {
        let tables = LookupTables::from_json(SAMPLE).unwrap();
        assert_eq!(tables.text_value("general", "base_date").unwrap(), "01/07/2024");
        assert!((tables.number_value("general", "rehab_open_after_period").unwrap() - 3.0).abs() < 1e-12);
        assert_eq!(tables.text_value("road_class", "4").unwrap(), "2.5");
    }

    #[test]
    fn missing_and_mistyped_keys_fail() {
        let tables = LookupTables::from_json(SAMPLE).unwrap();
        assert!(matches!(
            tables.number_value("general", "nope"),
            Err(ModelError::MissingLookup { .. })
        ));
        assert!(matches!(
            tables.number_value("general", "base_date"),
            Err(ModelError::LookupType { .. })
        ));
        assert!(!tables.contains("absent", "x"));
    }

    #[test]
    fn insert_overrides_values() {
        let mut tables = LookupTables::from_json(SAMPLE).unwrap();
        tables.insert("general", "rehab_open_after_period", LookupValue::Number(5.0));
        assert!((tables.number_value("general", "rehab_open_after_period").unwrap() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn static_tables_load() {
        let tables = LookupTables::default_tables();
        assert!(tables.contains("general", "base_date"));
        assert!(tables.contains("scurve_mesh_cracks", "aadi_min"));
    }
}
