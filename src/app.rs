//! The labeler: annotation state machine for one annotator.
//!
//! `Labeler::update` takes a [`Message`] and the current instant and returns
//! [`Effect`]s. It never performs I/O itself:
//! - remote calls go out as [`Effect::Call`] and come back as completion messages
//! - durable state is written by the host when it sees [`Effect::Persist`]
//! - timers are polled through [`Message::Tick`]

use serde::Serialize;
use web_time::Instant;

use crate::config::AppConfig;
use crate::gateway::{RemoteCall, Submission};
use crate::message::{Effect, Message};
use crate::model::{DamageKind, ImageId, ImageRecord, SessionId, Severity, VehicleType};
use crate::rules;
use crate::state::{
    AnnotationCache, AnnotationState, ClaimOutcome, ImageQueue, Session, SessionTiming,
};
use crate::storage::{PersistedQueue, Restored, Snapshot};
use crate::taxonomy::Taxonomy;

/// What the annotator should be looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Waiting for the first images of a session
    Loading,
    /// An image is ready to annotate
    Annotating,
    /// No image available and no claim in flight; a refresh can retry
    Waiting,
    /// The backend has no unlabeled images left
    AllDone,
    /// The session expired through inactivity; any input starts a new one
    Expired,
}

/// Annotation state machine.
pub struct Labeler {
    taxonomy: Taxonomy,
    config: AppConfig,
    timing: SessionTiming,
    session: Option<Session>,
    queue: ImageQueue,
    cache: AnnotationCache,
    annotation: AnnotationState,
    /// Submission awaiting its completion, with the state that was sent
    pending_submit: Option<(ImageId, AnnotationState)>,
    dirty: bool,
}

impl Labeler {
    /// Create a labeler with no session. Call [`start`](Self::start) next.
    pub fn new(taxonomy: Taxonomy, config: AppConfig) -> Self {
        Self {
            timing: SessionTiming::from(&config.session),
            queue: ImageQueue::new(config.queue),
            taxonomy,
            config,
            session: None,
            cache: AnnotationCache::new(),
            annotation: AnnotationState::new(),
            pending_submit: None,
            dirty: false,
        }
    }

    /// Begin work, resuming stored state when its session is still alive.
    pub fn start(&mut self, restored: Option<Restored>, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();

        match restored {
            Some(Restored {
                queue,
                session: (session_id, idle_for),
            }) if idle_for < self.timing.inactivity_timeout => {
                self.resume(queue, session_id, idle_for, now, &mut effects);
            }
            Some(_) => {
                log::info!("Stored session expired; starting over");
                effects.push(Effect::DiscardStorage);
                self.begin_session(now, &mut effects);
            }
            None => self.begin_session(now, &mut effects),
        }

        self.flush(&mut effects);
        effects
    }

    /// Handle one message.
    pub fn update(&mut self, message: Message, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();

        if message.is_user_input() {
            self.note_activity(now, &mut effects);
        }

        match message {
            Message::SelectVehicle(vehicle) => self.select_vehicle(vehicle),
            Message::SelectSection(section) => self.select_section(&section),
            Message::TogglePart(part) => self.toggle_part(&part),
            Message::ToggleDamage {
                part,
                damage,
                severity,
            } => self.toggle_damage(&part, damage, severity),
            Message::ToggleNoDamage => self.toggle_no_damage(),
            Message::Submit => self.submit(&mut effects),
            Message::Skip => self.skip(&mut effects),
            Message::Previous => self.previous(),
            Message::Next => self.next(&mut effects),
            Message::Refresh => self.refresh(&mut effects),
            Message::UserActivity => {}
            Message::Tick => self.tick(now, &mut effects),
            Message::ImagesClaimed { session_id, result } => {
                self.images_claimed(session_id, result)
            }
            Message::AnnotationSubmitted { image_id, result } => {
                self.annotation_submitted(image_id, result, &mut effects)
            }
            Message::ImageReleased { image_id, result } => match result {
                Ok(()) => log::debug!("Released image {}", image_id),
                Err(e) => log::warn!("Failed to release image {}: {}", image_id, e),
            },
            Message::HeartbeatSent(result) => match result {
                Ok(()) => log::debug!("Heartbeat sent"),
                Err(e) => log::warn!("Heartbeat failed: {}", e),
            },
        }

        self.flush(&mut effects);
        effects
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current phase.
    pub fn phase(&self) -> Phase {
        if self.session.is_none() {
            Phase::Expired
        } else if self.queue.current().is_some() {
            Phase::Annotating
        } else if self.queue.claim_in_flight() {
            Phase::Loading
        } else if self.queue.is_exhausted() {
            Phase::AllDone
        } else {
            Phase::Waiting
        }
    }

    /// Image under the cursor.
    pub fn current_image(&self) -> Option<&ImageRecord> {
        self.queue.current()
    }

    /// Annotation of the current image.
    pub fn annotation(&self) -> &AnnotationState {
        &self.annotation
    }

    /// The image queue.
    pub fn queue(&self) -> &ImageQueue {
        &self.queue
    }

    /// Cached annotations of other images.
    pub fn cache(&self) -> &AnnotationCache {
        &self.cache
    }

    /// Active session id.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(Session::id)
    }

    /// The taxonomy in use.
    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Check if a submission is awaiting its completion.
    pub fn is_saving(&self) -> bool {
        self.pending_submit.is_some()
    }

    /// State to write to durable storage. The in-progress annotation of the
    /// current image is folded into the cache so a reload keeps it.
    pub fn snapshot(&self, now: Instant) -> Snapshot {
        let mut annotation_cache = self.cache.clone();
        if let Some(image) = self.queue.current() {
            annotation_cache.save(image.id.clone(), self.annotation.clone());
        }
        Snapshot {
            queue: PersistedQueue {
                version: crate::constants::STATE_VERSION,
                images: self.queue.images().to_vec(),
                current_index: self.queue.cursor(),
                annotation_cache,
            },
            session: self
                .session
                .as_ref()
                .map(|session| (session.id(), session.idle_for(now))),
        }
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    fn begin_session(&mut self, now: Instant, effects: &mut Vec<Effect>) {
        let session = Session::start(self.timing, now);
        let session_id = session.id();
        self.session = Some(session);
        self.queue.clear();
        self.cache.clear();
        self.annotation = AnnotationState::new();
        self.pending_submit = None;
        if let Some(batch_size) = self.queue.begin_initial_claim(session_id) {
            effects.push(Effect::Call(RemoteCall::ClaimImages {
                session_id,
                batch_size,
            }));
        }
        self.dirty = true;
    }

    /// Drop the session and everything claimed under it.
    fn expire(&mut self, effects: &mut Vec<Effect>) {
        if let Some(session) = self.session.take() {
            log::info!("Session {} expired after inactivity", session.id());
        }
        self.queue.clear();
        self.cache.clear();
        self.annotation = AnnotationState::new();
        self.pending_submit = None;
        effects.push(Effect::DiscardStorage);
    }

    fn resume(
        &mut self,
        stored: PersistedQueue,
        session_id: SessionId,
        idle_for: std::time::Duration,
        now: Instant,
        effects: &mut Vec<Effect>,
    ) {
        log::info!(
            "Resuming session {} with {} queued images",
            session_id,
            stored.images.len()
        );
        self.session = Some(Session::resume(session_id, self.timing, now, idle_for));
        self.queue = ImageQueue::restore(self.config.queue, stored.images, stored.current_index);
        self.cache = stored.annotation_cache;
        self.load_current_annotation();
        self.request_refill(effects);
        self.dirty = true;
    }

    fn note_activity(&mut self, now: Instant, effects: &mut Vec<Effect>) {
        // Ticks may stall, so input can be the first to see an expired session.
        if self.session.as_ref().is_some_and(|s| s.is_expired(now)) {
            self.expire(effects);
        }
        match self.session.as_mut() {
            Some(session) => session.touch(now),
            None => {
                log::info!("Activity after expiry; starting a new session");
                self.begin_session(now, effects);
            }
        }
    }

    fn tick(&mut self, now: Instant, effects: &mut Vec<Effect>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        if session.is_expired(now) {
            self.expire(effects);
            return;
        }

        if session.heartbeat_due(now) {
            effects.push(Effect::Call(RemoteCall::Heartbeat {
                session_id: session.id(),
            }));
        }
    }

    fn flush(&mut self, effects: &mut Vec<Effect>) {
        if std::mem::take(&mut self.dirty) && self.session.is_some() {
            effects.push(Effect::Persist);
        }
    }

    // ========================================================================
    // Annotation editing
    // ========================================================================

    fn editable(&self) -> bool {
        if self.queue.current().is_none() {
            log::debug!("Ignored edit: no current image");
            return false;
        }
        true
    }

    fn select_vehicle(&mut self, vehicle: VehicleType) {
        if !self.editable() {
            return;
        }
        self.annotation = rules::select_vehicle(&self.annotation, vehicle);
        self.dirty = true;
    }

    fn select_section(&mut self, section: &str) {
        if !self.editable() {
            return;
        }
        match rules::select_section(&self.annotation, &self.taxonomy, section) {
            Ok(next) => {
                self.annotation = next;
                self.dirty = true;
            }
            Err(e) => log::debug!("Ignored section selection: {}", e),
        }
    }

    fn toggle_part(&mut self, part: &str) {
        if !self.editable() {
            return;
        }
        match rules::toggle_part(&self.annotation, &self.taxonomy, part) {
            Ok(next) => {
                self.annotation = next;
                self.dirty = true;
            }
            Err(e) => log::debug!("Ignored part toggle: {}", e),
        }
    }

    fn toggle_damage(&mut self, part: &str, damage: DamageKind, severity: Option<Severity>) {
        if !self.editable() {
            return;
        }
        match rules::apply_toggle(&self.annotation, &self.taxonomy, part, damage, severity) {
            Ok(next) => {
                self.annotation = next;
                self.dirty = true;
            }
            Err(e) => log::debug!("Ignored damage toggle: {}", e),
        }
    }

    fn toggle_no_damage(&mut self) {
        if !self.editable() {
            return;
        }
        self.annotation = rules::toggle_no_damage(&self.annotation);
        self.dirty = true;
    }

    // ========================================================================
    // Submit, skip and navigation
    // ========================================================================

    fn submit(&mut self, effects: &mut Vec<Effect>) {
        if self.pending_submit.is_some() {
            log::debug!("Ignored submit: another submission is in flight");
            return;
        }
        let (Some(image), Some(session_id)) = (self.queue.current(), self.session_id()) else {
            return;
        };

        let valid = match rules::validate_for_submit(&self.annotation) {
            Ok(valid) => valid,
            Err(e) => {
                effects.push(Effect::Alert(e.to_string()));
                return;
            }
        };

        let image_id = image.id.clone();
        self.pending_submit = Some((image_id.clone(), self.annotation.clone()));
        effects.push(Effect::Call(RemoteCall::SubmitAnnotation(Submission {
            image_id,
            vehicle_type: valid.vehicle_type,
            damages: valid.damages,
            session_id,
        })));
    }

    fn annotation_submitted(
        &mut self,
        image_id: ImageId,
        result: Result<(), String>,
        effects: &mut Vec<Effect>,
    ) {
        let submitted = match self.pending_submit.take() {
            Some((pending_id, state)) if pending_id == image_id => state,
            other => {
                log::warn!("Unexpected submit completion for image {}", image_id);
                self.pending_submit = other;
                return;
            }
        };

        if let Err(e) = result {
            log::error!("Failed to submit annotation for {}: {}", image_id, e);
            effects.push(Effect::Alert(format!("Failed to save annotation: {}", e)));
            return;
        }

        log::info!("Submitted annotation for image {}", image_id);
        self.cache.save(image_id.clone(), submitted);
        self.dirty = true;

        let still_current = self
            .queue
            .current()
            .is_some_and(|image| image.id == image_id);
        if still_current {
            self.annotation = AnnotationState::new();
            self.move_past_current(effects);
        }
    }

    fn skip(&mut self, effects: &mut Vec<Effect>) {
        let Some(image) = self.queue.current() else {
            return;
        };
        let image_id = image.id.clone();
        if self
            .pending_submit
            .as_ref()
            .is_some_and(|(pending_id, _)| *pending_id == image_id)
        {
            log::debug!("Ignored skip: image {} is being submitted", image_id);
            return;
        }

        let state = std::mem::take(&mut self.annotation);
        self.cache.save(image_id.clone(), state);
        effects.push(Effect::Call(RemoteCall::ReleaseImage { image_id }));
        self.move_past_current(effects);
        self.dirty = true;
    }

    fn previous(&mut self) {
        self.stash_current_annotation();
        if self.queue.retreat() {
            self.load_current_annotation();
            self.dirty = true;
        }
    }

    fn next(&mut self, effects: &mut Vec<Effect>) {
        self.stash_current_annotation();
        if self.queue.step_forward() {
            self.load_current_annotation();
            self.request_refill(effects);
            self.dirty = true;
        }
    }

    fn refresh(&mut self, effects: &mut Vec<Effect>) {
        if self.queue.current().is_some() {
            return;
        }
        let Some(session_id) = self.session_id() else {
            return;
        };
        if let Some(batch_size) = self.queue.begin_initial_claim(session_id) {
            effects.push(Effect::Call(RemoteCall::ClaimImages {
                session_id,
                batch_size,
            }));
        }
    }

    fn images_claimed(
        &mut self,
        session_id: SessionId,
        result: Result<Vec<ImageRecord>, String>,
    ) {
        let had_current = self.queue.current().is_some();
        let outcome = match result {
            Ok(records) => self.queue.complete_claim(session_id, Some(records)),
            Err(e) => {
                log::error!("Claim failed: {}", e);
                self.queue.complete_claim(session_id, None)
            }
        };

        match outcome {
            ClaimOutcome::Added(count) => log::info!("Queued {} new images", count),
            ClaimOutcome::PoolEmpty => log::info!("No unlabeled images left to claim"),
            ClaimOutcome::AllDuplicates => log::debug!("Claim returned only queued images"),
            ClaimOutcome::Failed => {}
        }

        if !had_current && self.queue.current().is_some() {
            self.load_current_annotation();
        }
        self.dirty = true;
    }

    /// Advance after a submit or skip, then refill if the queue is low.
    fn move_past_current(&mut self, effects: &mut Vec<Effect>) {
        self.queue.advance();
        self.load_current_annotation();
        self.request_refill(effects);
    }

    fn request_refill(&mut self, effects: &mut Vec<Effect>) {
        let Some(session_id) = self.session_id() else {
            return;
        };
        if let Some(batch_size) = self.queue.refill_if_low(session_id) {
            log::debug!(
                "Refilling: {} images remaining, claiming {}",
                self.queue.remaining(),
                batch_size
            );
            effects.push(Effect::Call(RemoteCall::ClaimImages {
                session_id,
                batch_size,
            }));
        }
    }

    fn stash_current_annotation(&mut self) {
        if let Some(image) = self.queue.current() {
            self.cache.save(image.id.clone(), self.annotation.clone());
        }
    }

    fn load_current_annotation(&mut self) {
        self.annotation = self
            .queue
            .current()
            .and_then(|image| self.cache.get(&image.id))
            .cloned()
            .unwrap_or_default();
    }
}
