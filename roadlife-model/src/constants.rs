//! Fixed model constants and lookup-set names.

/// Days per year used for every age calculation.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Surface age never drops below this after initialisation.
pub const MIN_SURFACE_AGE: f64 = 0.1;

/// Calibration tolerance used when fitting curves to surveyed distress.
pub const CALIBRATION_TOLERANCE: f64 = 0.5;

/// Achieved-life percentages are capped here.
pub const MAX_SURFACE_LIFE_ACHIEVED: f64 = 200.0;

/// Score attached to forced treatments so they outrank optional ones.
pub const FORCED_TREATMENT_SCORE: f64 = 102.0;

/// Placeholder for "no previous treatment" when periods since are unknown.
pub const NO_PREVIOUS_TREATMENT_PERIODS: i32 = 999;

/// Bounds on the initial rut increment estimate (mm/year).
pub const RUT_INCREMENT_RANGE: (f64, f64) = (0.05, 1.5);

/// Bounds on the initial roughness increment estimate (NAASRA counts/year).
pub const NAASRA_INCREMENT_RANGE: (f64, f64) = (0.2, 1.5);

/// Distribution and central tendency used to resample rut increments after treatment.
pub const RUT_INCREMENT_DISTRIBUTION: &str = "a";
pub const RUT_INCREMENT_CENTRAL: f64 = 0.1;

/// Distribution and central tendency used to resample roughness increments after treatment.
pub const NAASRA_INCREMENT_DISTRIBUTION: &str = "a";
pub const NAASRA_INCREMENT_CENTRAL: f64 = 0.9;

/// Name of the routine maintenance treatment; it does not count as a "real" treatment.
pub const ROUTINE_MAINTENANCE: &str = "RMaint";

// Lookup-set names.
pub const SET_GENERAL: &str = "general";
pub const SET_CANDIDATE_SELECTION: &str = "candidate_selection";
pub const SET_DISTRESS: &str = "distress";
pub const SET_MAINT_PRED: &str = "maint_pred";
pub const SET_SUITABILITY: &str = "treatment_suitability_scores";
pub const SET_SETTLING_IN: &str = "settling_in_values";
pub const SET_ROAD_CLASS: &str = "road_class";
pub const SET_BCA_WEIGHTING: &str = "bca_weighting";
pub const SET_PAVEMENT_LIFE: &str = "pavement_expected_life";
pub const SET_TREAT_SURF_MATERIALS: &str = "treat_surf_materials";
pub const SET_TREAT_SURF_CLASS: &str = "treat_surf_class";
pub const SET_SURF_THICKNESS_NEW: &str = "surf_thickness_new";
pub const SET_SURF_THICKNESS_ADD: &str = "surf_thickness_add";
pub const SET_SURF_LIFE_EXP: &str = "surf_life_exp";
pub const SET_PRESEAL_EFFECTIVE: &str = "preseal_effective";
