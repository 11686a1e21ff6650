//! Segment lifecycle: initialise once, then increment or reset every period.
//!
//! Each operation is a function of the shared read-only [`ModelContext`] and
//! the segment being advanced. Nothing is cached between calls; all history
//! travels in the segment's parameter map.

pub mod increment;
pub mod initialise;
pub mod reset;

pub use increment::increment;
pub use initialise::initialise;
pub use reset::{TreatmentKind, reset};

use crate::config::ModelConstants;
use crate::distress::{DistressKind, DistressModel};
use crate::error::ModelError;
use crate::lookups::LookupTables;
use crate::treatments::TreatmentCatalog;

/// Lookups, catalogue, settings and distress models shared by every segment.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelContext {
    lookups: LookupTables,
    catalog: TreatmentCatalog,
    constants: ModelConstants,
    distress: Vec<DistressModel>,
}

impl ModelContext {
    /// Read settings and build one distress model per kind.
    ///
    /// # Errors
    ///
    /// Returns an error when a setting or curve limit is missing or invalid.
    pub fn new(lookups: LookupTables, catalog: TreatmentCatalog) -> Result<Self, ModelError> {
        let constants = ModelConstants::from_lookups(&lookups)?;
        let distress = DistressKind::ALL
            .into_iter()
            .map(|kind| DistressModel::from_lookups(kind, &lookups))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            lookups,
            catalog,
            constants,
            distress,
        })
    }

    /// Context over the lookups and catalogue embedded in the crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded lookups are incomplete.
    pub fn with_defaults() -> Result<Self, ModelError> {
        Self::new(
            LookupTables::default_tables().clone(),
            TreatmentCatalog::default_catalog().clone(),
        )
    }

    #[must_use]
    pub const fn lookups(&self) -> &LookupTables {
        &self.lookups
    }

    #[must_use]
    pub const fn catalog(&self) -> &TreatmentCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn constants(&self) -> &ModelConstants {
        &self.constants
    }

    #[must_use]
    pub fn distress_model(&self, kind: DistressKind) -> &DistressModel {
        &self.distress[kind.index()]
    }
}
