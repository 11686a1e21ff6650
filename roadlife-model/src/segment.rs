//! Road segment state and the values derived from it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::MAX_SURFACE_LIFE_ACHIEVED;
use crate::distress::{DistressKind, DistressSet, OccurrenceInputs};
use crate::error::ModelError;

/// Surfacing family of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceClass {
    #[serde(rename = "cs")]
    Chipseal,
    #[serde(rename = "ac")]
    Asphalt,
    #[serde(rename = "blocks")]
    Blocks,
    #[serde(rename = "concrete")]
    Concrete,
    #[serde(rename = "other")]
    Other,
}

impl SurfaceClass {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chipseal => "cs",
            Self::Asphalt => "ac",
            Self::Blocks => "blocks",
            Self::Concrete => "concrete",
            Self::Other => "other",
        }
    }

    #[must_use]
    pub const fn is_chipseal_or_asphalt(self) -> bool {
        matches!(self, Self::Chipseal | Self::Asphalt)
    }
}

impl fmt::Display for SurfaceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SurfaceClass {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cs" => Ok(Self::Chipseal),
            "ac" => Ok(Self::Asphalt),
            "blocks" => Ok(Self::Blocks),
            "concrete" => Ok(Self::Concrete),
            "other" => Ok(Self::Other),
            _ => Err(ModelError::UnknownSurfaceClass {
                value: s.to_string(),
            }),
        }
    }
}

/// Role of the current surfacing layer.
///
/// `1` is a first coat, `2` a second coat, `R` a reseal, `1a` a pre-seal repair
/// and `H` the surface after pre-seal repairs were covered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SurfaceFunction {
    FirstCoat,
    SecondCoat,
    Reseal,
    Preseal,
    Holding,
    Other(String),
}

impl SurfaceFunction {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::FirstCoat => "1",
            Self::SecondCoat => "2",
            Self::Reseal => "R",
            Self::Preseal => "1a",
            Self::Holding => "H",
            Self::Other(code) => code,
        }
    }

    /// Function after a non-rehabilitation, non-pre-seal resurfacing.
    #[must_use]
    pub fn after_resurfacing(&self) -> Self {
        match self {
            Self::Preseal => Self::Holding,
            Self::FirstCoat | Self::Holding => Self::SecondCoat,
            Self::SecondCoat | Self::Reseal => Self::Reseal,
            other => other.clone(),
        }
    }
}

impl From<&str> for SurfaceFunction {
    fn from(value: &str) -> Self {
        match value.trim() {
            "1" => Self::FirstCoat,
            "2" => Self::SecondCoat,
            "R" | "r" => Self::Reseal,
            "1a" | "1A" => Self::Preseal,
            "H" | "h" => Self::Holding,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for SurfaceFunction {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<SurfaceFunction> for String {
    fn from(value: SurfaceFunction) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SurfaceFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Survey dates and raw survey values used at initialisation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveyInputs {
    pub surface_date: String,
    pub pavement_date: String,
    pub condition_date: String,
    pub roughness_date: String,
    pub rut_date: String,
    pub naasra_85: f64,
    pub rut_lwp_85: f64,
    pub rut_rwp_85: f64,
    pub observed: [f64; 7],
}

/// Indices and objective scores recomputed each period, plus host-written ranks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentIndices {
    pub pdi: f64,
    pub sdi: f64,
    pub objective_distress: f64,
    pub objective_rsl: f64,
    pub objective_rutting: f64,
    pub objective_naasra: f64,
    pub objective_raw: f64,
    pub objective: f64,
    pub objective_auc: f64,
    pub maintenance_cost_per_km: f64,
    pub candidate: bool,
    pub candidate_outcome: String,
    pub pdi_rank: f64,
    pub sdi_rank: f64,
    pub rut_rank: f64,
    pub sla_rank: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub element_index: i32,
    pub name: String,
    pub section_id: String,
    pub section_name: String,
    pub location_from: f64,
    pub location_to: f64,
    pub lane: String,

    pub length: f64,
    pub area: f64,

    pub urban_rural: String,
    pub onrc: String,
    pub road_class: String,
    pub surface_class: SurfaceClass,
    pub next_surface: String,
    pub pavement_type: String,

    pub is_roundabout: bool,
    pub can_treat: bool,
    pub can_rehab: bool,
    pub asphalt_ok: bool,
    pub earliest_treatment_period: i32,

    pub adt: f64,
    pub heavy_percent: f64,
    pub bus_routes: f64,
    pub growth_percent: f64,

    pub pavement_age: f64,
    pub pavement_remaining_life: f64,

    pub surface_age: f64,
    pub(crate) surface_function: SurfaceFunction,
    #[serde(skip)]
    pub(crate) previous_surface_function: Option<SurfaceFunction>,
    #[serde(skip)]
    pub(crate) surface_age_before_reset: Option<f64>,
    pub surface_material: String,
    pub surface_layers: i32,
    pub surface_thickness: f64,
    pub surface_expected_life: f64,

    pub surfacing_faults_m2: f64,
    pub pavement_faults_m2: f64,

    pub distresses: DistressSet,
    pub rut: f64,
    pub rut_increment: f64,
    pub naasra: f64,
    pub naasra_increment: f64,
    pub survey: SurveyInputs,

    pub indices: SegmentIndices,
    pub(crate) treatment_count: u32,
}

impl Default for Segment {
    fn default() -> Self {
        Self {
            element_index: 0,
            name: String::new(),
            section_id: String::new(),
            section_name: String::new(),
            location_from: 0.0,
            location_to: 0.0,
            lane: String::new(),
            length: 0.0,
            area: 0.0,
            urban_rural: String::new(),
            onrc: String::new(),
            road_class: String::new(),
            surface_class: SurfaceClass::Other,
            next_surface: String::new(),
            pavement_type: String::new(),
            is_roundabout: false,
            can_treat: true,
            can_rehab: true,
            asphalt_ok: true,
            earliest_treatment_period: 0,
            adt: 1.0,
            heavy_percent: 0.0,
            bus_routes: 0.0,
            growth_percent: 0.0,
            pavement_age: 0.0,
            pavement_remaining_life: 0.0,
            surface_age: 0.0,
            surface_function: SurfaceFunction::Other(String::new()),
            previous_surface_function: None,
            surface_age_before_reset: None,
            surface_material: String::new(),
            surface_layers: 0,
            surface_thickness: 0.0,
            surface_expected_life: 0.0,
            surfacing_faults_m2: 0.0,
            pavement_faults_m2: 0.0,
            distresses: DistressSet::default(),
            rut: 0.0,
            rut_increment: 0.0,
            naasra: 0.0,
            naasra_increment: 0.0,
            survey: SurveyInputs::default(),
            indices: SegmentIndices::default(),
            treatment_count: 0,
        }
    }
}

impl Segment {
    /// Identity string used in every diagnostic about this segment.
    #[must_use]
    pub fn feedback_code(&self) -> String {
        format!("elem_index: {:04} - {}", self.element_index, self.name)
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        if self.length > 0.0 {
            self.area / self.length
        } else {
            0.0
        }
    }

    #[must_use]
    pub fn is_urban(&self) -> bool {
        self.urban_rural.trim().eq_ignore_ascii_case("u")
    }

    #[must_use]
    pub fn is_chipseal(&self) -> bool {
        self.surface_class == SurfaceClass::Chipseal
    }

    #[must_use]
    pub fn is_asphalt(&self) -> bool {
        self.surface_class == SurfaceClass::Asphalt
    }

    #[must_use]
    pub const fn is_chipseal_or_asphalt(&self) -> bool {
        self.surface_class.is_chipseal_or_asphalt()
    }

    /// Urban/rural code followed by road class, e.g. `rl`.
    #[must_use]
    pub fn road_type(&self) -> String {
        format!("{}{}", self.urban_rural.trim(), self.road_class.trim()).to_lowercase()
    }

    /// Surface class and road type, e.g. `cs_rl`.
    #[must_use]
    pub fn surface_road_type(&self) -> String {
        format!("{}_{}", self.surface_class.as_str(), self.road_type())
    }

    #[must_use]
    pub fn next_surface_is(&self, class: SurfaceClass) -> bool {
        self.next_surface.trim().eq_ignore_ascii_case(class.as_str())
    }

    #[must_use]
    pub fn heavy_vehicles_per_day(&self) -> f64 {
        self.adt * self.heavy_percent / 100.0
    }

    /// Pavement age as a percentage of total pavement life.
    ///
    /// # Errors
    ///
    /// Returns an error when age plus remaining life is not positive.
    pub fn pavement_achieved_life(&self) -> Result<f64, ModelError> {
        let total = self.pavement_age + self.pavement_remaining_life;
        if total <= 0.0 {
            return Err(ModelError::NonPositiveLife {
                segment: self.feedback_code(),
                what: "pavement total life",
                value: total,
            });
        }
        Ok(100.0 * self.pavement_age / total)
    }

    /// Heavy-vehicle risk `hcv^0.1 * pavementAchievedLife^0.5`.
    ///
    /// # Errors
    ///
    /// Propagates [`Segment::pavement_achieved_life`] failures.
    pub fn hcv_risk(&self) -> Result<f64, ModelError> {
        let achieved = self.pavement_achieved_life()?.max(0.0);
        Ok(self.heavy_vehicles_per_day().max(0.0).powf(0.1) * achieved.sqrt())
    }

    /// Surface age as a percentage of expected life, capped at 200.
    ///
    /// # Errors
    ///
    /// Returns an error when the expected surface life is not positive.
    pub fn surface_achieved_life_percent(&self) -> Result<f64, ModelError> {
        if self.surface_expected_life <= 0.0 {
            return Err(ModelError::NonPositiveLife {
                segment: self.feedback_code(),
                what: "expected surface life",
                value: self.surface_expected_life,
            });
        }
        Ok((100.0 * self.surface_age / self.surface_expected_life).min(MAX_SURFACE_LIFE_ACHIEVED))
    }

    #[must_use]
    pub fn surface_remaining_life(&self) -> f64 {
        self.surface_expected_life - self.surface_age
    }

    /// A first-coat chipseal due for its second coat.
    #[must_use]
    pub fn second_coat_needed(&self) -> bool {
        self.is_chipseal()
            && self.surface_function == SurfaceFunction::FirstCoat
            && self.next_surface_is(SurfaceClass::Chipseal)
            && self.surface_remaining_life() <= 1.0
    }

    #[must_use]
    pub fn surfacing_fault_percent(&self) -> f64 {
        percent_of_area(self.surfacing_faults_m2, self.area)
    }

    #[must_use]
    pub fn pavement_fault_percent(&self) -> f64 {
        percent_of_area(self.pavement_faults_m2, self.area)
    }

    /// Covariates for the distress probability formulas.
    ///
    /// # Errors
    ///
    /// Propagates [`Segment::hcv_risk`] failures.
    pub fn occurrence_inputs(&self) -> Result<OccurrenceInputs, ModelError> {
        let flag = |on: bool| if on { 1.0 } else { 0.0 };
        Ok(OccurrenceInputs {
            chipseal: flag(self.is_chipseal()),
            urban: flag(self.is_urban()),
            hcv_risk: self.hcv_risk()?,
            width: self.width(),
            scabbing: self.distresses.value(DistressKind::Scabbing),
            lt_cracks: self.distresses.value(DistressKind::LongTransCracks),
            mesh_cracks: self.distresses.value(DistressKind::MeshCracks),
            shoving: self.distresses.value(DistressKind::Shoving),
        })
    }

    #[must_use]
    pub const fn surface_function(&self) -> &SurfaceFunction {
        &self.surface_function
    }

    /// Function before the most recent [`Segment::set_surface_function`] call.
    #[must_use]
    pub const fn previous_surface_function(&self) -> Option<&SurfaceFunction> {
        self.previous_surface_function.as_ref()
    }

    /// Replace the surface function, remembering and returning the old one.
    pub fn set_surface_function(&mut self, function: SurfaceFunction) -> SurfaceFunction {
        let previous = std::mem::replace(&mut self.surface_function, function);
        self.previous_surface_function = Some(previous.clone());
        previous
    }

    /// Surface age before the most recent [`Segment::advance_surface_age`] call.
    #[must_use]
    pub const fn surface_age_before_reset(&self) -> Option<f64> {
        self.surface_age_before_reset
    }

    /// Replace the surface age, remembering and returning the old one.
    pub fn advance_surface_age(&mut self, age: f64) -> f64 {
        let previous = std::mem::replace(&mut self.surface_age, age);
        self.surface_age_before_reset = Some(previous);
        previous
    }

    #[must_use]
    pub const fn treatment_count(&self) -> u32 {
        self.treatment_count
    }

    #[must_use]
    pub const fn is_treated(&self) -> bool {
        self.treatment_count > 0
    }

    /// Count a treatment. Fault areas are repaired as part of any treatment.
    pub fn record_treatment(&mut self) {
        self.treatment_count = self.treatment_count.saturating_add(1);
        self.clear_faults();
    }

    /// Restore a persisted treatment count, clearing faults if any treatment happened.
    pub fn restore_treatment_count(&mut self, count: u32) {
        self.treatment_count = count;
        if count > 0 {
            self.clear_faults();
        }
    }

    const fn clear_faults(&mut self) {
        self.surfacing_faults_m2 = 0.0;
        self.pavement_faults_m2 = 0.0;
    }
}

fn percent_of_area(m2: f64, area: f64) -> f64 {
    if area > 0.0 { 100.0 * m2 / area } else { 0.0 }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_segment() -> Segment {
        let mut segment = Segment {
            element_index: 7,
            name: "Main St 0-250".to_string(),
            length: 250.0,
            area: 1750.0,
            urban_rural: "R".to_string(),
            road_class: "L".to_string(),
            surface_class: SurfaceClass::Chipseal,
            next_surface: "cs".to_string(),
            adt: 1200.0,
            heavy_percent: 10.0,
            pavement_age: 30.0,
            pavement_remaining_life: 20.0,
            surface_age: 8.0,
            surface_expected_life: 12.0,
            surface_material: "g3".to_string(),
            surface_layers: 2,
            ..Segment::default()
        };
        segment.set_surface_function(SurfaceFunction::Reseal);
        segment
    }

    #[test]
    fn derived_identity_and_types() {
        let s = sample_segment();
        assert_eq!(s.feedback_code(), "elem_index: 0007 - Main St 0-250");
        assert_eq!(s.road_type(), "rl");
        assert_eq!(s.surface_road_type(), "cs_rl");
        assert!((s.width() - 7.0).abs() < 1e-12);
        assert!(!s.is_urban());
    }

    #[test]
    fn life_percentages() {
        let mut s = sample_segment();
        assert!((s.pavement_achieved_life().unwrap() - 60.0).abs() < 1e-12);
        assert!((s.surface_achieved_life_percent().unwrap() - 200.0 / 3.0).abs() < 1e-9);
        s.surface_age = 40.0;
        assert!((s.surface_achieved_life_percent().unwrap() - 200.0).abs() < 1e-12);
        assert!((s.surface_remaining_life() + 28.0).abs() < 1e-12);
    }

    #[test]
    fn non_positive_life_is_a_configuration_error() {
        let mut s = sample_segment();
        s.pavement_age = 0.0;
        s.pavement_remaining_life = 0.0;
        assert!(matches!(
            s.pavement_achieved_life(),
            Err(ModelError::NonPositiveLife { .. })
        ));
        s.surface_expected_life = 0.0;
        assert!(s.surface_achieved_life_percent().is_err());
    }

    #[test]
    fn hcv_risk_combines_traffic_and_age() {
        let s = sample_segment();
        let expected = 120_f64.powf(0.1) * 60_f64.sqrt();
        assert!((s.hcv_risk().unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn second_coat_needs_first_coat_chipseal_near_end_of_life() {
        let mut s = sample_segment();
        s.set_surface_function(SurfaceFunction::FirstCoat);
        s.surface_age = 11.5;
        assert!(s.second_coat_needed());
        s.next_surface = "ac".to_string();
        assert!(!s.second_coat_needed());
    }

    #[test]
    fn surface_function_transitions() {
        assert_eq!(SurfaceFunction::Preseal.after_resurfacing(), SurfaceFunction::Holding);
        assert_eq!(SurfaceFunction::FirstCoat.after_resurfacing(), SurfaceFunction::SecondCoat);
        assert_eq!(SurfaceFunction::SecondCoat.after_resurfacing(), SurfaceFunction::Reseal);
        assert_eq!(SurfaceFunction::Holding.after_resurfacing(), SurfaceFunction::SecondCoat);
        assert_eq!(SurfaceFunction::from("1a"), SurfaceFunction::Preseal);
        assert_eq!(SurfaceFunction::from("X").as_str(), "X");
    }

    #[test]
    fn setters_remember_previous_values() {
        let mut s = sample_segment();
        let old = s.set_surface_function(SurfaceFunction::Preseal);
        assert_eq!(old, SurfaceFunction::Reseal);
        assert_eq!(s.previous_surface_function(), Some(&SurfaceFunction::Reseal));
        let old_age = s.advance_surface_age(0.0);
        assert!((old_age - 8.0).abs() < 1e-12);
        assert_eq!(s.surface_age_before_reset(), Some(8.0));
    }

    #[test]
    fn recording_treatment_clears_faults() {
        let mut s = sample_segment();
        s.surfacing_faults_m2 = 35.0;
        s.pavement_faults_m2 = 17.5;
        assert!((s.surfacing_fault_percent() - 2.0).abs() < 1e-12);
        s.record_treatment();
        assert_eq!(s.treatment_count(), 1);
        assert!(s.is_treated());
        assert!(s.surfacing_fault_percent().abs() < f64::EPSILON);
        assert!(s.pavement_fault_percent().abs() < f64::EPSILON);
    }

    #[test]
    fn surface_class_parses_codes() {
        assert_eq!("CS".parse::<SurfaceClass>().unwrap(), SurfaceClass::Chipseal);
        assert_eq!("blocks".parse::<SurfaceClass>().unwrap(), SurfaceClass::Blocks);
        assert!("gravel".parse::<SurfaceClass>().is_err());
    }
}
