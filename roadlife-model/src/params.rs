//! Flat parameter map exchanged with the host every period.
//!
//! The map holds the static `file_*` inputs and the evolving `para_*` state.
//! [`Segment::parameter_map`] followed by [`Segment::from_parameter_map`]
//! rebuilds the same segment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::distress::{CurveParams, DistressKind};
use crate::error::ModelError;
use crate::inputs::{RawRow, segment_from_row};
use crate::lookups::LookupTables;
use crate::numbers::round_f64_to_i32;
use crate::segment::{Segment, SurfaceFunction};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl ParamValue {
    #[must_use]
    pub fn flag(on: bool) -> Self {
        Self::Number(if on { 1.0 } else { 0.0 })
    }

    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(t) => t.trim().parse().ok(),
        }
    }

    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(t) => t.clone(),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

pub type ParameterMap = BTreeMap<String, ParamValue>;

fn put(map: &mut ParameterMap, key: &str, value: impl Into<ParamValue>) {
    map.insert(key.to_string(), value.into());
}

fn number(map: &ParameterMap, key: &str) -> Result<f64, ModelError> {
    map.get(key)
        .ok_or_else(|| ModelError::MissingParameter {
            key: key.to_string(),
        })?
        .as_number()
        .ok_or_else(|| ModelError::InvalidParameter {
            key: key.to_string(),
            expected: "number",
        })
}

fn text(map: &ParameterMap, key: &str) -> Result<String, ModelError> {
    map.get(key)
        .map(ParamValue::to_text)
        .ok_or_else(|| ModelError::MissingParameter {
            key: key.to_string(),
        })
}

fn optional_number(map: &ParameterMap, key: &str) -> f64 {
    map.get(key).and_then(ParamValue::as_number).unwrap_or(0.0)
}

impl Segment {
    /// Snapshot the segment as `file_*` inputs plus `para_*` state and derived values.
    ///
    /// # Errors
    ///
    /// Returns an error when a derived life percentage cannot be computed.
    pub fn parameter_map(&self) -> Result<ParameterMap, ModelError> {
        let mut map = ParameterMap::new();
        self.write_inputs(&mut map);

        put(&mut map, "para_adt", self.adt);
        put(&mut map, "para_hcv", self.heavy_vehicles_per_day());
        put(&mut map, "para_pave_age", self.pavement_age);
        put(&mut map, "para_pave_remlife", self.pavement_remaining_life);
        put(&mut map, "para_pave_life_ach", self.pavement_achieved_life()?);
        put(&mut map, "para_hcv_risk", self.hcv_risk()?);

        put(&mut map, "para_surf_mat", ParamValue::text(&self.surface_material));
        put(&mut map, "para_surf_class", ParamValue::text(self.surface_class.as_str()));
        put(&mut map, "para_surf_cs_flag", ParamValue::flag(self.is_chipseal()));
        put(&mut map, "para_surf_cs_or_ac_flag", ParamValue::flag(self.is_chipseal_or_asphalt()));
        put(&mut map, "para_surf_road_type", ParamValue::text(self.surface_road_type()));
        put(&mut map, "para_surf_thick", self.surface_thickness);
        put(&mut map, "para_surf_layers", self.surface_layers);
        put(&mut map, "para_surf_func", ParamValue::text(self.surface_function().as_str()));
        put(&mut map, "para_surf_exp_life", self.surface_expected_life);
        put(&mut map, "para_surf_age", self.surface_age);
        put(&mut map, "para_surf_life_ach", self.surface_achieved_life_percent()?);
        put(&mut map, "para_surf_remain_life", self.surface_remaining_life());

        for (kind, state) in self.distresses.iter() {
            put(&mut map, &kind.percent_parameter(), state.value);
            put(&mut map, &kind.setup_parameter(), ParamValue::text(state.params.to_string()));
        }

        put(&mut map, "para_rut_increm", self.rut_increment);
        put(&mut map, "para_rut", self.rut);
        put(&mut map, "para_naasra_increm", self.naasra_increment);
        put(&mut map, "para_naasra", self.naasra);

        let idx = &self.indices;
        put(&mut map, "para_sdi", idx.sdi);
        put(&mut map, "para_pdi", idx.pdi);
        put(&mut map, "para_obj_distress", idx.objective_distress);
        put(&mut map, "para_obj_rsl", idx.objective_rsl);
        put(&mut map, "para_obj_rutting", idx.objective_rutting);
        put(&mut map, "para_obj_naasra", idx.objective_naasra);
        put(&mut map, "para_obj_o", idx.objective_raw);
        put(&mut map, "para_obj", idx.objective);
        put(&mut map, "para_obj_auc", idx.objective_auc);
        put(&mut map, "para_maint_cost_perkm", idx.maintenance_cost_per_km);
        put(&mut map, "para_csl_status", ParamValue::text(&idx.candidate_outcome));
        put(&mut map, "para_csl_flag", ParamValue::flag(idx.candidate));
        put(&mut map, "para_pdi_rank", idx.pdi_rank);
        put(&mut map, "para_sdi_rank", idx.sdi_rank);
        put(&mut map, "para_rut_rank", idx.rut_rank);
        put(&mut map, "para_sla_rank", idx.sla_rank);

        put(&mut map, "para_is_treated_flag", ParamValue::flag(self.is_treated()));
        put(&mut map, "para_treat_count", self.treatment_count());
        Ok(map)
    }

    fn write_inputs(&self, map: &mut ParameterMap) {
        let s = &self.survey;
        let texts = [
            ("file_seg_name", self.name.as_str()),
            ("file_section_id", self.section_id.as_str()),
            ("file_section_name", self.section_name.as_str()),
            ("file_lane_name", self.lane.as_str()),
            ("file_urban_rural", self.urban_rural.as_str()),
            ("file_onrc", self.onrc.as_str()),
            ("file_surf_class", self.surface_class.as_str()),
            ("file_next_surf", self.next_surface.as_str()),
            ("file_pave_type", self.pavement_type.as_str()),
            ("file_surf_function", self.surface_function().as_str()),
            ("file_surf_material", self.surface_material.as_str()),
            ("file_surf_date", s.surface_date.as_str()),
            ("file_pave_date", s.pavement_date.as_str()),
            ("file_cond_survey_date", s.condition_date.as_str()),
            ("file_roughsegment_date", s.roughness_date.as_str()),
            ("file_hsd_date", s.rut_date.as_str()),
        ];
        for (key, value) in texts {
            put(map, key, ParamValue::text(value));
        }
        let numbers = [
            ("file_loc_from", self.location_from),
            ("file_loc_to", self.location_to),
            ("file_length", self.length),
            ("file_area_m2", self.area),
            ("file_adt", self.adt),
            ("file_heavy_perc", self.heavy_percent),
            ("file_no_of_bus_routes", self.bus_routes),
            ("file_traff_growth_perc", self.growth_percent),
            ("file_pave_remlife", self.pavement_remaining_life),
            ("file_surf_life_expected", self.surface_expected_life),
            ("file_surf_thick", self.surface_thickness),
            ("file_su_fault_qty", self.surfacing_faults_m2),
            ("file_pa_fault_qty", self.pavement_faults_m2),
            ("file_naasra_85", s.naasra_85),
            ("file_rut_lwpmean_85", s.rut_lwp_85),
            ("file_rut_rwpmean_85", s.rut_rwp_85),
        ];
        for (key, value) in numbers {
            put(map, key, value);
        }
        put(map, "file_surf_layer_no", self.surface_layers);
        put(map, "file_earliest_treat_period", self.earliest_treatment_period);
        put(map, "file_is_roundabout_flag", ParamValue::flag(self.is_roundabout));
        put(map, "file_can_treat_flag", ParamValue::flag(self.can_treat));
        put(map, "file_can_rehab_flag", ParamValue::flag(self.can_rehab));
        put(map, "file_ac_ok_flag", ParamValue::flag(self.asphalt_ok));
        for kind in DistressKind::ALL {
            put(map, kind.raw_column(), s.observed[kind.index()]);
        }
    }

    /// Rebuild a segment from a map produced by [`Segment::parameter_map`]
    /// (or the host's equivalent input-and-parameter map).
    ///
    /// Host-written ranks and the candidate verdict are optional.
    ///
    /// # Errors
    ///
    /// Returns an error for missing inputs or state, unparseable curve
    /// parameters, or an unknown surface class.
    pub fn from_parameter_map(
        element_index: i32,
        map: &ParameterMap,
        lookups: &LookupTables,
    ) -> Result<Self, ModelError> {
        let mut segment = segment_from_row(element_index, map, lookups)?;

        segment.adt = number(map, "para_adt")?;
        segment.pavement_age = number(map, "para_pave_age")?;
        segment.pavement_remaining_life = number(map, "para_pave_remlife")?;

        segment.surface_material = text(map, "para_surf_mat")?;
        segment.surface_class = text(map, "para_surf_class")?.parse()?;
        segment.surface_thickness = number(map, "para_surf_thick")?;
        segment.surface_layers = round_f64_to_i32(number(map, "para_surf_layers")?);
        segment.surface_function = SurfaceFunction::from(text(map, "para_surf_func")?.as_str());
        segment.surface_expected_life = number(map, "para_surf_exp_life")?;
        segment.surface_age = number(map, "para_surf_age")?;

        for kind in DistressKind::ALL {
            let state = segment.distresses.get_mut(kind);
            state.value = number(map, &kind.percent_parameter())?;
            state.params = text(map, &kind.setup_parameter())?.parse::<CurveParams>()?;
        }

        segment.rut_increment = number(map, "para_rut_increm")?;
        segment.rut = number(map, "para_rut")?;
        segment.naasra_increment = number(map, "para_naasra_increm")?;
        segment.naasra = number(map, "para_naasra")?;

        let idx = &mut segment.indices;
        idx.sdi = number(map, "para_sdi")?;
        idx.pdi = number(map, "para_pdi")?;
        idx.objective_distress = number(map, "para_obj_distress")?;
        idx.objective_rsl = number(map, "para_obj_rsl")?;
        idx.objective_rutting = number(map, "para_obj_rutting")?;
        idx.objective_naasra = number(map, "para_obj_naasra")?;
        idx.objective_raw = number(map, "para_obj_o")?;
        idx.objective = number(map, "para_obj")?;
        idx.objective_auc = number(map, "para_obj_auc")?;
        idx.maintenance_cost_per_km = number(map, "para_maint_cost_perkm")?;
        idx.candidate_outcome = map
            .get("para_csl_status")
            .map(ParamValue::to_text)
            .unwrap_or_default();
        idx.candidate = map.flag("para_csl_flag").unwrap_or(false);
        idx.pdi_rank = optional_number(map, "para_pdi_rank");
        idx.sdi_rank = optional_number(map, "para_sdi_rank");
        idx.rut_rank = optional_number(map, "para_rut_rank");
        idx.sla_rank = optional_number(map, "para_sla_rank");

        let count = number(map, "para_treat_count")?;
        segment.restore_treatment_count(u32::try_from(round_f64_to_i32(count)).unwrap_or(0));
        Ok(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::tests::sample_row;

    fn prepared_segment() -> Segment {
        let mut segment = segment_from_row(5, &sample_row(), LookupTables::default_tables()).unwrap();
        segment.pavement_age = 30.0;
        segment.surface_age = 8.0;
        segment.rut = 8.5;
        segment.naasra = 95.0;
        segment.distresses.get_mut(DistressKind::MeshCracks).params = CurveParams::new(6.5, 1.5, 31.25);
        segment.indices.pdi_rank = 81.5;
        segment
    }

    #[test]
    fn map_round_trip_is_lossless() {
        let segment = prepared_segment();
        let map = segment.parameter_map().unwrap();
        let rebuilt = Segment::from_parameter_map(5, &map, LookupTables::default_tables()).unwrap();
        assert_eq!(rebuilt, segment);
        assert_eq!(rebuilt.parameter_map().unwrap(), map);
    }

    #[test]
    fn treated_segments_restore_without_faults() {
        let mut segment = prepared_segment();
        segment.record_treatment();
        let map = segment.parameter_map().unwrap();
        assert_eq!(map.get("para_treat_count"), Some(&ParamValue::Number(1.0)));
        assert_eq!(map.get("para_is_treated_flag"), Some(&ParamValue::Number(1.0)));
        let rebuilt = Segment::from_parameter_map(5, &map, LookupTables::default_tables()).unwrap();
        assert_eq!(rebuilt.treatment_count(), 1);
        assert!(rebuilt.pavement_faults_m2.abs() < f64::EPSILON);
    }

    #[test]
    fn curve_parameters_travel_encoded() {
        let map = prepared_segment().parameter_map().unwrap();
        assert_eq!(
            map.get("para_mesh_cracks_info"),
            Some(&ParamValue::text("6.5_1.5_31.25"))
        );
    }

    #[test]
    fn malformed_curve_parameters_fail() {
        let mut map = prepared_segment().parameter_map().unwrap();
        map.insert("para_poth_info".to_string(), ParamValue::text("1_2"));
        let err = Segment::from_parameter_map(5, &map, LookupTables::default_tables()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidCurveParams { .. }));
    }

    #[test]
    fn missing_state_is_reported() {
        let mut map = prepared_segment().parameter_map().unwrap();
        map.remove("para_rut");
        let err = Segment::from_parameter_map(5, &map, LookupTables::default_tables()).unwrap_err();
        assert_eq!(
            err,
            ModelError::MissingParameter {
                key: "para_rut".to_string()
            }
        );
    }
}
