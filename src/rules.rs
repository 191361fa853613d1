//! Damage selection rule engine.
//!
//! Pure transitions over [`AnnotationState`]. Each function takes the current
//! state and returns the next one; callers decide when to persist.
//!
//! Toggle rules, applied in order:
//! 1. Implicit-major kinds always get severity `major`.
//! 2. Toggling an identical `(part, damage, severity)` entry removes it.
//! 3. An exclusive (total-loss) kind clears every other entry on the part.
//! 4. A manual-severity kind replaces the same damage at the other severity.
//! 5. A non-exclusive kind clears exclusive entries on the part.
//! 6. The entry is inserted and the no-damage flag cleared.

use crate::model::{DamageEntry, DamageKind, Severity, VehicleType};
use crate::state::AnnotationState;
use crate::taxonomy::Taxonomy;

/// Reasons a toggle request is rejected. The state is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToggleError {
    /// No vehicle type selected yet
    #[error("Select a vehicle type first")]
    NoVehicle,

    /// The part is not part of the selected vehicle
    #[error("Part '{part}' does not exist on a {vehicle}")]
    UnknownPart { part: String, vehicle: VehicleType },

    /// The damage kind is not allowed on the part
    #[error("Damage '{damage}' cannot be logged on '{part}'")]
    DamageNotAllowed { part: String, damage: DamageKind },

    /// Manual-severity kinds need an explicit severity
    #[error("Damage '{0}' needs a severity")]
    MissingSeverity(DamageKind),

    /// The section is not part of the selected vehicle
    #[error("Section '{section}' does not exist on a {vehicle}")]
    UnknownSection { section: String, vehicle: VehicleType },
}

/// Reasons an annotation cannot be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Vehicle type not selected
    #[error("Incomplete annotation: select a vehicle type")]
    MissingVehicle,

    /// No damages logged and no-damage not set
    #[error("Incomplete annotation: log a damage or mark the image as undamaged")]
    NoDamageSelected,
}

/// The parts of an annotation that go to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidAnnotation {
    /// Selected vehicle type
    pub vehicle_type: VehicleType,
    /// Logged damages; empty when the image was marked undamaged
    pub damages: Vec<DamageEntry>,
}

/// Effective severity after applying the implicit-major rule.
pub fn effective_severity(
    damage: DamageKind,
    severity: Option<Severity>,
) -> Result<Severity, ToggleError> {
    if damage.is_implicit_major() {
        return Ok(Severity::Major);
    }
    severity.ok_or(ToggleError::MissingSeverity(damage))
}

/// Select or deselect a damage on a part.
pub fn apply_toggle(
    state: &AnnotationState,
    taxonomy: &Taxonomy,
    part: &str,
    damage: DamageKind,
    severity: Option<Severity>,
) -> Result<AnnotationState, ToggleError> {
    let vehicle = state.vehicle_type.ok_or(ToggleError::NoVehicle)?;
    if !taxonomy.has_part(vehicle, part) {
        return Err(ToggleError::UnknownPart {
            part: part.to_string(),
            vehicle,
        });
    }
    if !taxonomy.is_allowed(part, damage) {
        return Err(ToggleError::DamageNotAllowed {
            part: part.to_string(),
            damage,
        });
    }
    let severity = effective_severity(damage, severity)?;

    let mut next = state.clone();

    if let Some(index) = next
        .damages
        .iter()
        .position(|entry| entry.matches(part, damage, severity))
    {
        next.damages.remove(index);
        return Ok(next);
    }

    if damage.is_exclusive() {
        next.damages.retain(|entry| entry.part != part);
    } else {
        next.damages
            .retain(|entry| !(entry.part == part && entry.damage.is_exclusive()));
    }

    if damage.requires_manual_severity() {
        next.damages
            .retain(|entry| !(entry.part == part && entry.damage == damage));
    }

    next.damages.push(DamageEntry::new(part, damage, severity));
    next.no_damage = false;
    Ok(next)
}

/// Flip the no-damage flag.
///
/// Setting it clears damages, the open section and the expanded part.
/// Clearing it restores nothing.
pub fn toggle_no_damage(state: &AnnotationState) -> AnnotationState {
    let mut next = state.clone();
    next.no_damage = !state.no_damage;
    if next.no_damage {
        next.damages.clear();
        next.section = None;
        next.expanded_part = None;
    }
    next
}

/// Choose the vehicle type. Always starts the annotation over.
pub fn select_vehicle(_state: &AnnotationState, vehicle: VehicleType) -> AnnotationState {
    AnnotationState {
        vehicle_type: Some(vehicle),
        ..AnnotationState::default()
    }
}

/// Open a body section, collapsing any expanded part.
pub fn select_section(
    state: &AnnotationState,
    taxonomy: &Taxonomy,
    section: &str,
) -> Result<AnnotationState, ToggleError> {
    let vehicle = state.vehicle_type.ok_or(ToggleError::NoVehicle)?;
    if taxonomy.section(vehicle, section).is_none() {
        return Err(ToggleError::UnknownSection {
            section: section.to_string(),
            vehicle,
        });
    }
    Ok(AnnotationState {
        section: Some(section.to_string()),
        expanded_part: None,
        ..state.clone()
    })
}

/// Expand a part of the open section, or collapse it if already expanded.
///
/// Parts are hidden while the image is marked undamaged, so this is a no-op then.
pub fn toggle_part(
    state: &AnnotationState,
    taxonomy: &Taxonomy,
    part: &str,
) -> Result<AnnotationState, ToggleError> {
    let vehicle = state.vehicle_type.ok_or(ToggleError::NoVehicle)?;
    if state.no_damage {
        return Ok(state.clone());
    }
    let in_section = state
        .section
        .as_deref()
        .and_then(|section| taxonomy.section(vehicle, section))
        .is_some_and(|section| section.contains_part(part));
    if !in_section {
        return Err(ToggleError::UnknownPart {
            part: part.to_string(),
            vehicle,
        });
    }

    let mut next = state.clone();
    next.expanded_part = if state.expanded_part.as_deref() == Some(part) {
        None
    } else {
        Some(part.to_string())
    };
    Ok(next)
}

/// Check that an annotation is complete enough to submit.
pub fn validate_for_submit(state: &AnnotationState) -> Result<ValidAnnotation, ValidationError> {
    let vehicle_type = state.vehicle_type.ok_or(ValidationError::MissingVehicle)?;
    if !state.no_damage && state.damages.is_empty() {
        return Err(ValidationError::NoDamageSelected);
    }
    Ok(ValidAnnotation {
        vehicle_type,
        damages: if state.no_damage {
            Vec::new()
        } else {
            state.damages.clone()
        },
    })
}
