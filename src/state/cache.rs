//! Local cache of per-image annotations for back/forward navigation.
//!
//! The backend is the system of record; this cache only keeps in-progress or
//! already-submitted selections so moving between queued images loses nothing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::AnnotationState;
use crate::model::ImageId;

/// Map from image id to the last annotation state seen for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationCache {
    entries: BTreeMap<ImageId, AnnotationState>,
}

impl AnnotationCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached state for an image, if any.
    pub fn get(&self, image_id: &ImageId) -> Option<&AnnotationState> {
        self.entries.get(image_id)
    }

    /// Store a snapshot for an image. Empty states remove the entry instead.
    pub fn save(&mut self, image_id: ImageId, state: AnnotationState) {
        if state.is_empty() {
            self.entries.remove(&image_id);
        } else {
            self.entries.insert(image_id, state);
        }
    }

    /// Number of cached images.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
