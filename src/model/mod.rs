//! Data models for the damage labeler.

mod damage;
mod image;
mod vehicle;

pub use damage::{DamageEntry, DamageKind, ParseNameError, Severity};
pub use image::{ImageId, ImageRecord, SessionId};
pub use vehicle::VehicleType;
