//! Browser bindings.
//!
//! The page owns the network: it runs each `call` effect against the backend
//! and dispatches the completion message back. Storage effects are handled
//! here against localStorage and never reach JavaScript.

use serde::Serialize;
use wasm_bindgen::prelude::*;
use web_time::Instant;

use crate::app::{Labeler, Phase};
use crate::config::AppConfig;
use crate::message::{Effect, Message};
use crate::model::{DamageEntry, DamageKind, ImageRecord, VehicleType};
use crate::storage::{LocalStorage, StateStore};
use crate::taxonomy::Taxonomy;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();

    let level = AppConfig::load_from_local_storage()
        .unwrap_or_default()
        .preferences
        .log_level
        .to_level_filter()
        .to_level()
        .unwrap_or(log::Level::Error);
    if let Err(e) = console_log::init_with_level(level) {
        web_sys::console::log_1(&format!("Logger init failed: {}", e).into());
    }
    log::info!("Damage labeler WASM module loaded");
}

/// Everything the page needs to draw the current screen.
#[derive(Serialize)]
struct View<'a> {
    phase: Phase,
    image: Option<&'a ImageRecord>,
    image_name: Option<&'a str>,
    /// Claimed images after the current one; the page preloads these
    upcoming: &'a [ImageRecord],
    position: usize,
    queued: usize,
    vehicle_type: Option<VehicleType>,
    sections: Vec<&'a str>,
    section: Option<&'a str>,
    parts: Vec<&'a str>,
    expanded_part: Option<&'a str>,
    allowed_damages: &'a [DamageKind],
    damages: &'a [DamageEntry],
    no_damage: bool,
    saving: bool,
}

/// Labeler handle exported to JavaScript. Messages and effects cross the
/// boundary as JSON.
#[wasm_bindgen]
pub struct WebLabeler {
    labeler: Labeler,
    store: StateStore<LocalStorage>,
}

#[wasm_bindgen]
impl WebLabeler {
    /// Create a labeler using the stored config and localStorage.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WebLabeler, JsError> {
        let config = AppConfig::load_from_local_storage().unwrap_or_default();
        let store = StateStore::new(LocalStorage::open()?);
        Ok(Self {
            labeler: Labeler::new(Taxonomy::builtin(), config),
            store,
        })
    }

    /// Restore stored state or start a new session. Returns effects as JSON.
    pub fn start(&mut self) -> Result<String, JsError> {
        let restored = self.store.load().unwrap_or_else(|e| {
            log::warn!("Ignoring stored state: {}", e);
            None
        });
        let effects = self.labeler.start(restored, Instant::now());
        self.finish(effects)
    }

    /// Handle a JSON message. Returns the effects the page must carry out.
    pub fn dispatch(&mut self, message_json: &str) -> Result<String, JsError> {
        let message: Message = serde_json::from_str(message_json)?;
        let effects = self.labeler.update(message, Instant::now());
        self.finish(effects)
    }

    /// Current screen state as JSON.
    pub fn view(&self) -> Result<String, JsError> {
        let labeler = &self.labeler;
        let annotation = labeler.annotation();
        let taxonomy = labeler.taxonomy();
        let vehicle = annotation.vehicle_type;

        let view = View {
            phase: labeler.phase(),
            image: labeler.current_image(),
            image_name: labeler.current_image().map(ImageRecord::file_name),
            upcoming: labeler.queue().upcoming(),
            position: labeler.queue().cursor(),
            queued: labeler.queue().len(),
            vehicle_type: vehicle,
            sections: vehicle.map(|v| taxonomy.sections(v)).unwrap_or_default(),
            section: annotation.section.as_deref(),
            parts: match (vehicle, annotation.section.as_deref()) {
                (Some(v), Some(section)) => taxonomy.parts_by_section(v, section),
                _ => Vec::new(),
            },
            expanded_part: annotation.expanded_part.as_deref(),
            allowed_damages: annotation
                .expanded_part
                .as_deref()
                .map(|part| taxonomy.allowed_damages(part))
                .unwrap_or_default(),
            damages: &annotation.damages,
            no_damage: annotation.no_damage,
            saving: labeler.is_saving(),
        };
        Ok(serde_json::to_string(&view)?)
    }

    fn finish(&mut self, effects: Vec<Effect>) -> Result<String, JsError> {
        let mut outward = Vec::with_capacity(effects.len());
        for effect in effects {
            match effect {
                Effect::Persist => {
                    if let Err(e) = self.store.save(&self.labeler.snapshot(Instant::now())) {
                        log::warn!("Failed to persist state: {}", e);
                    }
                }
                Effect::DiscardStorage => {
                    if let Err(e) = self.store.discard() {
                        log::warn!("Failed to discard state: {}", e);
                    }
                }
                other => outward.push(other),
            }
        }
        Ok(serde_json::to_string(&outward)?)
    }
}
