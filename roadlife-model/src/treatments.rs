//! Treatment catalogue: category and unit rate per treatment name.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

const DEFAULT_TREATMENT_DATA: &str = include_str!("../data/treatments.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentType {
    pub name: String,
    pub category: String,
    #[serde(default = "TreatmentType::default_unit_rate")]
    pub unit_rate: f64,
}

impl TreatmentType {
    #[must_use]
    pub const fn default_unit_rate() -> f64 {
        1.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreatmentCatalog {
    #[serde(default)]
    pub treatments: Vec<TreatmentType>,
}

impl TreatmentCatalog {
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a treatment catalogue.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn load_from_static() -> Self {
        serde_json::from_str(DEFAULT_TREATMENT_DATA).unwrap_or_default()
    }

    #[must_use]
    pub fn default_catalog() -> &'static Self {
        static CATALOG: OnceLock<TreatmentCatalog> = OnceLock::new();
        CATALOG.get_or_init(Self::load_from_static)
    }

    /// Case-insensitive lookup by treatment name.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownTreatment`] when the name is not catalogued.
    pub fn get(&self, name: &str) -> Result<&TreatmentType, ModelError> {
        self.treatments
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ModelError::UnknownTreatment {
                name: name.to_string(),
            })
    }

    /// # Errors
    ///
    /// Returns [`ModelError::UnknownTreatment`] when the name is not catalogued.
    pub fn category(&self, name: &str) -> Result<&str, ModelError> {
        self.get(name).map(|t| t.category.as_str())
    }

    /// # Errors
    ///
    /// Returns [`ModelError::UnknownTreatment`] when the name is not catalogued.
    pub fn unit_rate(&self, name: &str) -> Result<f64, ModelError> {
        self.get(name).map(|t| t.unit_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_catalogue_has_core_treatments() {
        let catalog = TreatmentCatalog::default_catalog();
        for name in ["Chipseal_S", "PreSeal", "ThinAC_H", "HMaint_AC", "Rehab_CS_RL", "RMaint"] {
            assert!(catalog.get(name).is_ok(), "{name} missing");
        }
        assert!((catalog.unit_rate("ThinAC_H").unwrap() - 1.0).abs() < f64::EPSILON);
        assert_eq!(catalog.category("rehab_ac_ua").unwrap(), "rehab");
    }

    #[test]
    fn unknown_treatment_fails() {
        let catalog = TreatmentCatalog::from_json(r#"{"treatments": [{"name": "X", "category": "c"}]}"#)
            .unwrap();
        assert!((catalog.unit_rate("X").unwrap() - 1.0).abs() < f64::EPSILON);
        assert!(matches!(
            catalog.category("Y"),
            Err(ModelError::UnknownTreatment { .. })
        ));
    }
}
