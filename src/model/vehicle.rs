//! Vehicle types that can be annotated.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::damage::ParseNameError;

/// Vehicle type shown in the photograph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Bike,
    Scooter,
}

impl VehicleType {
    /// Get all vehicle types in display order.
    pub fn all() -> &'static [VehicleType] {
        &[VehicleType::Bike, VehicleType::Scooter]
    }

    /// Wire name of this vehicle type.
    pub fn name(&self) -> &'static str {
        match self {
            VehicleType::Bike => "bike",
            VehicleType::Scooter => "scooter",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VehicleType {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bike" => Ok(VehicleType::Bike),
            "scooter" => Ok(VehicleType::Scooter),
            _ => Err(ParseNameError {
                what: "vehicle type",
                value: s.to_string(),
            }),
        }
    }
}
