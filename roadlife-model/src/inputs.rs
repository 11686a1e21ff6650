//! Typed access to raw input rows and construction of a segment from them.

use std::collections::{BTreeMap, HashMap};

use crate::constants::SET_ROAD_CLASS;
use crate::distress::DistressKind;
use crate::error::ModelError;
use crate::lookups::LookupTables;
use crate::numbers::round_f64_to_i32;
use crate::params::ParamValue;
use crate::segment::{Segment, SurfaceFunction, SurveyInputs};

/// Column accessor over one raw input row.
pub trait RawRow {
    /// # Errors
    ///
    /// Returns [`ModelError::MissingColumn`] when the column is absent.
    fn text(&self, column: &str) -> Result<String, ModelError>;

    /// # Errors
    ///
    /// Returns an error when the column is absent or not numeric.
    fn number(&self, column: &str) -> Result<f64, ModelError> {
        let text = self.text(column)?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(0.0);
        }
        trimmed.parse().map_err(|_| ModelError::InvalidColumn {
            column: column.to_string(),
            value: text.clone(),
        })
    }

    /// Flags accept `1`/`0` as well as `true`/`false`, `yes`/`no` and `y`/`n`.
    ///
    /// # Errors
    ///
    /// Returns an error when the column is absent or not a recognisable flag.
    fn flag(&self, column: &str) -> Result<bool, ModelError> {
        let text = self.text(column)?;
        match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" => Ok(true),
            "false" | "no" | "n" | "" => Ok(false),
            _ => self.number(column).map(|n| n != 0.0),
        }
    }
}

impl RawRow for HashMap<String, String> {
    fn text(&self, column: &str) -> Result<String, ModelError> {
        self.get(column).cloned().ok_or_else(|| ModelError::MissingColumn {
            column: column.to_string(),
        })
    }
}

impl RawRow for BTreeMap<String, ParamValue> {
    fn text(&self, column: &str) -> Result<String, ModelError> {
        self.get(column)
            .map(ParamValue::to_text)
            .ok_or_else(|| ModelError::MissingColumn {
                column: column.to_string(),
            })
    }

    fn number(&self, column: &str) -> Result<f64, ModelError> {
        match self.get(column) {
            Some(ParamValue::Number(n)) => Ok(*n),
            Some(ParamValue::Text(t)) => t.trim().parse().map_err(|_| ModelError::InvalidColumn {
                column: column.to_string(),
                value: t.clone(),
            }),
            None => Err(ModelError::MissingColumn {
                column: column.to_string(),
            }),
        }
    }
}

/// Build a segment from the `file_*` columns. Ages, curve parameters and the
/// rut/roughness state are left for the initialiser.
///
/// # Errors
///
/// Returns an error for missing or malformed columns, an unknown surface
/// class, or an ONRC category without a road-class lookup.
pub fn segment_from_row<R>(
    element_index: i32,
    row: &R,
    lookups: &LookupTables,
) -> Result<Segment, ModelError>
where
    R: RawRow + ?Sized,
{
    let onrc = row.text("file_onrc")?;
    let road_class = lookups.text_value(SET_ROAD_CLASS, onrc.trim())?;

    let mut observed = [0.0; 7];
    for kind in DistressKind::ALL {
        observed[kind.index()] = row.number(kind.raw_column())?;
    }

    Ok(Segment {
        element_index,
        name: row.text("file_seg_name")?,
        section_id: row.text("file_section_id")?,
        section_name: row.text("file_section_name")?,
        location_from: row.number("file_loc_from")?,
        location_to: row.number("file_loc_to")?,
        lane: row.text("file_lane_name")?,
        length: row.number("file_length")?,
        area: row.number("file_area_m2")?,
        urban_rural: row.text("file_urban_rural")?.trim().to_lowercase(),
        onrc,
        road_class: road_class.trim().to_lowercase(),
        surface_class: row.text("file_surf_class")?.parse()?,
        next_surface: row.text("file_next_surf")?.trim().to_lowercase(),
        pavement_type: row.text("file_pave_type")?,
        is_roundabout: row.flag("file_is_roundabout_flag")?,
        can_treat: row.flag("file_can_treat_flag")?,
        can_rehab: row.flag("file_can_rehab_flag")?,
        asphalt_ok: row.flag("file_ac_ok_flag")?,
        earliest_treatment_period: round_f64_to_i32(row.number("file_earliest_treat_period")?),
        adt: row.number("file_adt")?,
        heavy_percent: row.number("file_heavy_perc")?,
        bus_routes: row.number("file_no_of_bus_routes")?,
        growth_percent: row.number("file_traff_growth_perc")?,
        pavement_remaining_life: row.number("file_pave_remlife")?,
        surface_material: row.text("file_surf_material")?.trim().to_lowercase(),
        surface_layers: round_f64_to_i32(row.number("file_surf_layer_no")?),
        surface_thickness: row.number("file_surf_thick")?,
        surface_expected_life: row.number("file_surf_life_expected")?,
        surfacing_faults_m2: row.number("file_su_fault_qty")?,
        pavement_faults_m2: row.number("file_pa_fault_qty")?,
        survey: SurveyInputs {
            surface_date: row.text("file_surf_date")?,
            pavement_date: row.text("file_pave_date")?,
            condition_date: row.text("file_cond_survey_date")?,
            roughness_date: row.text("file_roughsegment_date")?,
            rut_date: row.text("file_hsd_date")?,
            naasra_85: row.number("file_naasra_85")?,
            rut_lwp_85: row.number("file_rut_lwpmean_85")?,
            rut_rwp_85: row.number("file_rut_rwpmean_85")?,
            observed,
        },
        surface_function: SurfaceFunction::from(row.text("file_surf_function")?.as_str()),
        ..Segment::default()
    })
}
