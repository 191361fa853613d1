//! Per-image annotation state.

use serde::{Deserialize, Serialize};

use crate::model::{DamageEntry, VehicleType};

/// Everything the annotator has selected for the current image.
///
/// `no_damage` and a non-empty `damages` list are mutually exclusive; the
/// rule engine in [`crate::rules`] maintains this.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationState {
    /// Selected vehicle type
    #[serde(default)]
    pub vehicle_type: Option<VehicleType>,
    /// Open body section
    #[serde(default)]
    pub section: Option<String>,
    /// Part whose damage list is expanded
    #[serde(default)]
    pub expanded_part: Option<String>,
    /// Logged damages, in selection order
    #[serde(default)]
    pub damages: Vec<DamageEntry>,
    /// The image shows no damage
    #[serde(default)]
    pub no_damage: bool,
}

impl AnnotationState {
    /// Create an empty annotation.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when nothing worth keeping has been selected.
    pub fn is_empty(&self) -> bool {
        self.vehicle_type.is_none() && self.damages.is_empty() && !self.no_damage
    }

    /// Damages logged on one part.
    pub fn damages_for<'a>(&'a self, part: &'a str) -> impl Iterator<Item = &'a DamageEntry> {
        self.damages.iter().filter(move |entry| entry.part == part)
    }
}
