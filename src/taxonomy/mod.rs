//! Part and damage taxonomy.
//!
//! The taxonomy maps each vehicle type to its body sections, each section to
//! groups of parts, and each part to the damage kinds that can be logged on it.
//! It is read-only once loaded: either the built-in table or a JSON file
//! supplied at start-up.

mod data;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{DamageKind, VehicleType};

/// A named group of parts within a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartGroup {
    /// Group name (e.g. `front_bodywork`)
    pub name: String,
    /// Part names in display order
    pub parts: Vec<String>,
}

/// A body section of a vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Section name (e.g. `front`)
    pub name: String,
    /// Part groups in display order
    pub groups: Vec<PartGroup>,
}

impl Section {
    /// All parts of this section, flattened across groups.
    pub fn parts(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flat_map(|group| group.parts.iter().map(String::as_str))
    }

    /// Check if the section lists `part`.
    pub fn contains_part(&self, part: &str) -> bool {
        self.parts().any(|p| p == part)
    }
}

/// Section layout of one vehicle type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleLayout {
    /// Vehicle type this layout describes
    pub vehicle: VehicleType,
    /// Sections in display order
    pub sections: Vec<Section>,
}

/// The full lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    /// One layout per vehicle type
    pub vehicles: Vec<VehicleLayout>,
    /// Allowed damage kinds per part
    pub part_damages: BTreeMap<String, Vec<DamageKind>>,
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Taxonomy {
    /// The built-in bike and scooter taxonomy.
    pub fn builtin() -> Self {
        let vehicles = VehicleType::all()
            .iter()
            .map(|&vehicle| VehicleLayout {
                vehicle,
                sections: data::layout(vehicle)
                    .iter()
                    .map(|(section, groups)| Section {
                        name: section.to_string(),
                        groups: groups
                            .iter()
                            .map(|(group, parts)| PartGroup {
                                name: group.to_string(),
                                parts: parts.iter().map(|p| p.to_string()).collect(),
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        let part_damages = data::PART_DAMAGES
            .iter()
            .map(|(part, damages)| (part.to_string(), damages.to_vec()))
            .collect();

        Self {
            vehicles,
            part_damages,
        }
    }

    /// Parse a taxonomy from JSON and check it for structural errors.
    pub fn from_json(json: &str) -> Result<Self, TaxonomyError> {
        let taxonomy: Self = serde_json::from_str(json)?;
        taxonomy.validate()?;
        Ok(taxonomy)
    }

    /// Load a taxonomy from a JSON file (native only).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: &std::path::Path) -> Result<Self, TaxonomyError> {
        let json = std::fs::read_to_string(path)?;
        let taxonomy = Self::from_json(&json)?;
        log::info!(
            "Loaded taxonomy from {:?}: {} parts",
            path,
            taxonomy.part_damages.len()
        );
        Ok(taxonomy)
    }

    /// Check that every vehicle type has exactly one layout.
    ///
    /// Parts listed in a layout but missing from the damage table are not an
    /// error; they are reported by [`parts_without_damages`](Self::parts_without_damages).
    pub fn validate(&self) -> Result<(), TaxonomyError> {
        for vehicle in VehicleType::all() {
            let count = self
                .vehicles
                .iter()
                .filter(|layout| layout.vehicle == *vehicle)
                .count();
            match count {
                0 => return Err(TaxonomyError::MissingVehicle(*vehicle)),
                1 => {}
                _ => return Err(TaxonomyError::DuplicateVehicle(*vehicle)),
            }
        }
        Ok(())
    }

    /// Parts that appear in a layout but have no allowed damage kinds.
    /// Such parts can be browsed but nothing can be logged on them.
    pub fn parts_without_damages(&self) -> Vec<(VehicleType, &str)> {
        let mut missing = Vec::new();
        for layout in &self.vehicles {
            for part in layout.sections.iter().flat_map(Section::parts) {
                if self.allowed_damages(part).is_empty() {
                    missing.push((layout.vehicle, part));
                }
            }
        }
        missing
    }

    /// Layout for a vehicle type.
    pub fn layout(&self, vehicle: VehicleType) -> Option<&VehicleLayout> {
        self.vehicles.iter().find(|layout| layout.vehicle == vehicle)
    }

    /// Section names for a vehicle type, in display order.
    pub fn sections(&self, vehicle: VehicleType) -> Vec<&str> {
        self.layout(vehicle)
            .map(|layout| layout.sections.iter().map(|s| s.name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Look up one section of a vehicle.
    pub fn section(&self, vehicle: VehicleType, name: &str) -> Option<&Section> {
        self.layout(vehicle)?
            .sections
            .iter()
            .find(|section| section.name == name)
    }

    /// Parts of a section, flattened across groups.
    pub fn parts_by_section(&self, vehicle: VehicleType, section: &str) -> Vec<&str> {
        self.section(vehicle, section)
            .map(|s| s.parts().collect())
            .unwrap_or_default()
    }

    /// Check if any section of the vehicle lists `part`.
    pub fn has_part(&self, vehicle: VehicleType, part: &str) -> bool {
        self.layout(vehicle)
            .is_some_and(|layout| layout.sections.iter().any(|s| s.contains_part(part)))
    }

    /// Damage kinds allowed on a part. Empty for unknown parts.
    pub fn allowed_damages(&self, part: &str) -> &[DamageKind] {
        self.part_damages
            .get(part)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Check if `damage` may be logged on `part`.
    pub fn is_allowed(&self, part: &str, damage: DamageKind) -> bool {
        self.allowed_damages(part).contains(&damage)
    }
}

/// Errors that can occur when loading a taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum TaxonomyError {
    /// JSON parsing error
    #[error("Failed to parse taxonomy: {0}")]
    Parse(#[from] serde_json::Error),

    /// I/O error when reading the taxonomy file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A vehicle type has no layout
    #[error("Taxonomy has no layout for vehicle type '{0}'")]
    MissingVehicle(VehicleType),

    /// A vehicle type has more than one layout
    #[error("Taxonomy has more than one layout for vehicle type '{0}'")]
    DuplicateVehicle(VehicleType),
}
