use super::ModelContext;
use crate::constants::{
    SET_PAVEMENT_LIFE, SET_SURF_LIFE_EXP, SET_SURF_THICKNESS_ADD, SET_SURF_THICKNESS_NEW,
    SET_TREAT_SURF_CLASS, SET_TREAT_SURF_MATERIALS,
};
use crate::distress::DistressKind;
use crate::error::ModelError;
use crate::indices::compute_indices;
use crate::roughness::{IncrementSampler, RoughnessMeasure};
use crate::segment::{Segment, SurfaceFunction};

/// How a treatment changes the pavement and surface, decided by its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreatmentKind {
    /// Pavement renewal; the pavement age restarts.
    Rehab,
    /// Temporary repairs ahead of a follow-up seal; the surface keeps ageing.
    Preseal,
    Resurfacing,
}

impl TreatmentKind {
    #[must_use]
    pub fn classify(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        if name.starts_with("rehab") {
            Self::Rehab
        } else if name.starts_with("preseal") || name == "hmaint_ac" || name == "ac_hmaint" {
            Self::Preseal
        } else {
            Self::Resurfacing
        }
    }

    /// Surface function after a treatment of this kind named `name`.
    #[must_use]
    pub fn next_surface_function(self, name: &str, current: &SurfaceFunction) -> SurfaceFunction {
        let name = name.to_ascii_lowercase();
        match self {
            Self::Preseal => SurfaceFunction::Preseal,
            Self::Rehab if name.starts_with("rehab_ac") => SurfaceFunction::SecondCoat,
            Self::Rehab if name.starts_with("rehab_cs") => SurfaceFunction::FirstCoat,
            _ => current.after_resurfacing(),
        }
    }
}

/// Apply a treatment to the segment. `None` leaves it untouched.
///
/// # Errors
///
/// Returns an error for an uncatalogued treatment, a missing lookup (the
/// expected surface life in particular), or a failed life calculation.
pub fn reset<S>(
    ctx: &ModelContext,
    segment: &mut Segment,
    period: i32,
    treatment: Option<&str>,
    sampler: &S,
) -> Result<(), ModelError>
where
    S: IncrementSampler + ?Sized,
{
    let Some(requested) = treatment else {
        return Ok(());
    };
    let lookups = ctx.lookups();
    let treatment = ctx.catalog().get(requested)?;
    let name = treatment.name.as_str();
    let category = treatment.category.as_str();
    let kind = TreatmentKind::classify(name);

    segment.adt *= 1.0 + segment.growth_percent / 100.0;
    if kind == TreatmentKind::Rehab {
        segment.pavement_age = 0.0;
        segment.pavement_remaining_life =
            lookups.number_value(SET_PAVEMENT_LIFE, &segment.road_type())?;
    } else {
        segment.pavement_age += 1.0;
        segment.pavement_remaining_life -= 1.0;
    }

    segment.surface_material = lookups
        .text_value(SET_TREAT_SURF_MATERIALS, name)?
        .trim()
        .to_lowercase();
    segment.surface_class = lookups.text_value(SET_TREAT_SURF_CLASS, name)?.parse()?;

    if kind == TreatmentKind::Rehab {
        segment.surface_thickness =
            lookups.number_value(SET_SURF_THICKNESS_NEW, &segment.surface_material)?;
        segment.surface_layers = 1;
    } else {
        segment.surface_thickness +=
            lookups.number_value(SET_SURF_THICKNESS_ADD, &segment.surface_material)?;
        if segment.is_chipseal() {
            segment.surface_layers += 1;
        }
    }

    let function = kind.next_surface_function(name, segment.surface_function());
    segment.set_surface_function(function);
    segment.surface_expected_life = expected_surface_life(ctx, segment)?;

    let next_age = if kind == TreatmentKind::Preseal {
        segment.surface_age + 1.0
    } else {
        0.0
    };
    let previous_age = segment.advance_surface_age(next_age);

    for distress in DistressKind::ALL {
        let model = ctx.distress_model(distress);
        let before = *segment.distresses.get(distress);
        segment.distresses.get_mut(distress).value = model.value_after_reset();
        let params = model.resetted_setup(segment, before.value, category, before.params)?;
        segment.distresses.get_mut(distress).params = params;
    }

    let is_rehab = kind == TreatmentKind::Rehab;
    segment.rut = RoughnessMeasure::Rut.value_after_treatment(segment, is_rehab, lookups)?;
    segment.rut_increment = RoughnessMeasure::Rut.increment_after_treatment(segment, sampler)?;
    segment.naasra = RoughnessMeasure::Naasra.value_after_treatment(segment, is_rehab, lookups)?;
    segment.naasra_increment =
        RoughnessMeasure::Naasra.increment_after_treatment(segment, sampler)?;

    segment.record_treatment();
    segment.indices = compute_indices(segment, lookups, ctx.constants())?;
    log::debug!(
        "{}: {name} applied in period {period} (surface age {previous_age:.2} -> {:.2})",
        segment.feedback_code(),
        segment.surface_age
    );
    Ok(())
}

/// Expected life of the surface just laid.
///
/// Blocks, concrete and other surfaces keep their value. Pre-seal repairs
/// take the life of a reseal. A missing material/road-class entry falls back
/// to the surface-class default.
fn expected_surface_life(ctx: &ModelContext, segment: &Segment) -> Result<f64, ModelError> {
    if !segment.is_chipseal_or_asphalt() {
        return Ok(segment.surface_expected_life);
    }
    let lookups = ctx.lookups();
    let function = match segment.surface_function() {
        SurfaceFunction::Preseal => SurfaceFunction::Reseal.as_str().to_lowercase(),
        other => other.as_str().to_lowercase(),
    };
    let key = format!(
        "{function}_{}_{}",
        segment.surface_material, segment.road_class
    )
    .to_lowercase();
    if lookups.contains(SET_SURF_LIFE_EXP, &key) {
        return lookups.number_value(SET_SURF_LIFE_EXP, &key);
    }
    let fallback = format!("{function}_{}", segment.surface_class.as_str());
    if lookups.contains(SET_SURF_LIFE_EXP, &fallback) {
        log::warn!(
            "{}: no expected surface life for '{key}', using '{fallback}'",
            segment.feedback_code()
        );
        return lookups.number_value(SET_SURF_LIFE_EXP, &fallback);
    }
    Err(ModelError::missing_lookup(SET_SURF_LIFE_EXP, &key))
}
