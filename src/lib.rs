//! Damage Labeler - vehicle damage annotation core
//!
//! Annotators claim batches of photos from a shared backend, log which parts
//! of a bike or scooter are damaged and how badly, and submit the result.
//! The crate holds the rule engine, the image queue, the session timers and
//! local persistence; hosts drive it through [`Labeler::update`].

mod app;
pub mod config;
pub mod constants;
pub mod gateway;
mod message;
pub mod model;
pub mod rules;
pub mod state;
pub mod storage;
pub mod taxonomy;

#[cfg(not(target_arch = "wasm32"))]
pub mod native;

#[cfg(test)]
mod tests;

pub use app::{Labeler, Phase};
pub use config::{AppConfig, ConfigError, LogLevel};
pub use gateway::{GatewayError, MemoryGateway, RemoteCall, RemoteGateway, Submission};
pub use message::{Effect, Message};
pub use model::{DamageEntry, DamageKind, ImageId, ImageRecord, SessionId, Severity, VehicleType};
pub use state::AnnotationState;
pub use storage::{MemoryStorage, StateStore, Storage, StorageError};
pub use taxonomy::Taxonomy;

// WASM entry point
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;
