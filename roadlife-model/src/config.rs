//! Scalar model settings read once from the lookup tables.

use chrono::NaiveDate;

use crate::constants::{
    SET_CANDIDATE_SELECTION, SET_DISTRESS, SET_GENERAL, SET_MAINT_PRED, SET_SETTLING_IN,
    SET_SUITABILITY,
};
use crate::dates::parse_date;
use crate::error::ModelError;
use crate::lookups::LookupTables;
use crate::numbers::round_f64_to_i32;

/// Thresholds for the candidate-selection rule chain.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateThresholds {
    pub min_periods_to_next_treatment: i32,
    pub min_sdi: f64,
    pub min_pdi: f64,
    pub min_sla_asphalt: f64,
    pub min_sla_chipseal: f64,
    pub min_surface_age: f64,
}

/// Thresholds and curve anchors for treatment suitability scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct SuitabilityThresholds {
    pub rehab_excess_rut_threshold: f64,
    pub rehab_excess_rut_factor: f64,
    pub rehab_pdi_rank: f64,
    pub holding_pdi_rank_points: [f64; 3],
    pub holding_max_rut: f64,
    pub preserve_sdi_rank: f64,
    pub preserve_max_pdi_chipseal: f64,
    pub preserve_max_pdi_asphalt: f64,
    pub holding_max_pdi_asphalt: f64,
    pub preserve_max_rut: f64,
    pub preserve_min_sla: f64,
    pub asphalt_heavy_maint_min_periods: i32,
    pub asphalt_heavy_maint_max_sla: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConstants {
    pub base_date: NaiveDate,
    pub rehab_open_after_period: i32,
    pub min_suitability_score: f64,
    pub pothole_booster: f64,
    pub maintenance_calibration: f64,
    pub maintenance_pdi_threshold: f64,
    pub settling_in_rut: f64,
    pub settling_in_naasra: f64,
    pub candidate: CandidateThresholds,
    pub suitability: SuitabilityThresholds,
}

impl ModelConstants {
    /// Read every scalar setting and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error when a lookup is missing, mistyped, or out of range.
    pub fn from_lookups(lookups: &LookupTables) -> Result<Self, ModelError> {
        let num = |set: &str, key: &str| lookups.number_value(set, key);
        let int = |set: &str, key: &str| num(set, key).map(round_f64_to_i32);

        let base_date_text = lookups.text_value(SET_GENERAL, "base_date")?;
        let base_date = parse_date("lookups", "base", &base_date_text)?;

        let candidate = CandidateThresholds {
            min_periods_to_next_treatment: int(SET_CANDIDATE_SELECTION, "min_periods_to_next_treat")?,
            min_sdi: num(SET_CANDIDATE_SELECTION, "min_sdi_to_treat")?,
            min_pdi: num(SET_CANDIDATE_SELECTION, "min_pdi_to_treat")?,
            min_sla_asphalt: num(SET_CANDIDATE_SELECTION, "min_sla_to_treat_ac")?,
            min_sla_chipseal: num(SET_CANDIDATE_SELECTION, "min_sla_to_treat_cs")?,
            min_surface_age: num(SET_CANDIDATE_SELECTION, "min_surf_age")?,
        };

        let suitability = SuitabilityThresholds {
            rehab_excess_rut_threshold: num(SET_SUITABILITY, "rehab_excess_rut_thresh")?,
            rehab_excess_rut_factor: num(SET_SUITABILITY, "rehab_excess_rut_fact")?,
            rehab_pdi_rank: num(SET_SUITABILITY, "rehab_pdi_rank")?,
            holding_pdi_rank_points: [
                num(SET_SUITABILITY, "holding_pdi_rank_pt1")?,
                num(SET_SUITABILITY, "holding_pdi_rank_pt2")?,
                num(SET_SUITABILITY, "holding_pdi_rank_pt3")?,
            ],
            holding_max_rut: num(SET_SUITABILITY, "holding_max_rut")?,
            preserve_sdi_rank: num(SET_SUITABILITY, "preserve_sdi_rank")?,
            preserve_max_pdi_chipseal: num(SET_SUITABILITY, "preserve_max_pdi_cs")?,
            preserve_max_pdi_asphalt: num(SET_SUITABILITY, "preserve_max_pdi_ac")?,
            holding_max_pdi_asphalt: num(SET_SUITABILITY, "holding_max_pdi_ac")?,
            preserve_max_rut: num(SET_SUITABILITY, "preserve_max_rut")?,
            preserve_min_sla: num(SET_SUITABILITY, "preserve_min_sla")?,
            asphalt_heavy_maint_min_periods: int(SET_SUITABILITY, "ac_hmaint_min_periods")?,
            asphalt_heavy_maint_max_sla: num(SET_SUITABILITY, "ac_hmaint_max_sla")?,
        };

        let constants = Self {
            base_date,
            rehab_open_after_period: int(SET_GENERAL, "rehab_open_after_period")?,
            min_suitability_score: num(SET_GENERAL, "min_tss_allowed")?,
            pothole_booster: num(SET_DISTRESS, "poth_booster")?,
            maintenance_calibration: num(SET_MAINT_PRED, "cal_maint_pred")?,
            maintenance_pdi_threshold: num(SET_MAINT_PRED, "maint_pdi_threshold")?,
            settling_in_rut: num(SET_SETTLING_IN, "rut")?,
            settling_in_naasra: num(SET_SETTLING_IN, "naasra")?,
            candidate,
            suitability,
        };
        constants.validate()?;
        Ok(constants)
    }

    /// Validate setting invariants that the scoring curves depend on.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::RangeViolation`] for the first setting out of range.
    pub fn validate(&self) -> Result<(), ModelError> {
        let s = &self.suitability;
        check_range("rehab_pdi_rank", s.rehab_pdi_rank, 0.0, 99.99)?;
        check_range("preserve_sdi_rank", s.preserve_sdi_rank, 0.0, 99.99)?;
        let [pt1, pt2, pt3] = s.holding_pdi_rank_points;
        check_range("holding_pdi_rank_pt1", pt1, 0.0, 99.99)?;
        check_range("holding_pdi_rank_pt2", pt2, pt1, 99.99)?;
        check_range("holding_pdi_rank_pt3", pt3, 0.0, 100.0)?;
        check_range("poth_booster", self.pothole_booster, 0.0, 100.0)?;
        check_range("cal_maint_pred", self.maintenance_calibration, 0.0, f64::MAX)?;
        check_range("min_surf_age", self.candidate.min_surface_age, 0.0, f64::MAX)?;
        Ok(())
    }
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), ModelError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ModelError::RangeViolation {
            field: field.to_string(),
            min,
            max,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookups::LookupValue;

    #[test]
    fn default_tables_produce_constants() {
        let constants = ModelConstants::from_lookups(LookupTables::default_tables()).unwrap();
        assert_eq!(constants.base_date, NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
        assert!(constants.candidate.min_periods_to_next_treatment > 0);
        assert!(constants.pothole_booster > 0.0);
    }

    #[test]
    fn missing_setting_is_reported() {
        let tables = LookupTables::from_json(r#"{"general": {"base_date": "01/07/2024"}}"#).unwrap();
        let err = ModelConstants::from_lookups(&tables).unwrap_err();
        assert!(matches!(err, ModelError::MissingLookup { .. }));
    }

    #[test]
    fn out_of_range_anchor_is_rejected() {
        let mut tables = LookupTables::default_tables().clone();
        tables.insert(SET_SUITABILITY, "rehab_pdi_rank", LookupValue::Number(100.0));
        let err = ModelConstants::from_lookups(&tables).unwrap_err();
        assert!(matches!(err, ModelError::RangeViolation { ref field, .. } if field == "rehab_pdi_rank"));
    }
}
