//! End-to-end labeler flows against the in-memory gateway and storage.

use std::collections::VecDeque;
use std::time::Duration;

use web_time::Instant;

use crate::app::{Labeler, Phase};
use crate::config::AppConfig;
use crate::gateway::{self, MemoryGateway, RemoteCall};
use crate::message::{Effect, Message};
use crate::model::{DamageEntry, DamageKind, ImageId, ImageRecord, SessionId, Severity, VehicleType};
use crate::storage::{MemoryStorage, PersistedQueue, Restored, StateStore};
use crate::taxonomy::Taxonomy;

fn records(ids: &[&str]) -> Vec<ImageRecord> {
    ids.iter()
        .map(|id| ImageRecord::new(*id, format!("https://img/{id}.jpg")))
        .collect()
}

fn pool(n: usize) -> Vec<ImageRecord> {
    (0..n)
        .map(|i| ImageRecord::new(format!("img-{i}"), format!("https://img/{i}.jpg")))
        .collect()
}

/// Completion of a claim made by the labeler's current session.
fn claimed(labeler: &Labeler, ids: &[&str]) -> Message {
    Message::ImagesClaimed {
        session_id: labeler.session_id().expect("active session"),
        result: Ok(records(ids)),
    }
}

fn claims(effects: &[Effect]) -> Vec<usize> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Call(RemoteCall::ClaimImages { batch_size, .. }) => Some(*batch_size),
            _ => None,
        })
        .collect()
}

fn current_id(labeler: &Labeler) -> Option<&str> {
    labeler.current_image().map(|image| image.id.as_str())
}

/// Runs every effect immediately: calls go to the gateway and their
/// completions are fed back in order.
struct Harness {
    labeler: Labeler,
    gateway: MemoryGateway,
    store: StateStore<MemoryStorage>,
    now: Instant,
    alerts: Vec<String>,
    calls: Vec<RemoteCall>,
}

impl Harness {
    fn new(gateway: MemoryGateway) -> Self {
        let mut harness = Self {
            labeler: Labeler::new(Taxonomy::builtin(), AppConfig::default()),
            gateway,
            store: StateStore::new(MemoryStorage::new()),
            now: Instant::now(),
            alerts: Vec::new(),
            calls: Vec::new(),
        };
        let effects = harness.labeler.start(None, harness.now);
        harness.run(effects);
        harness
    }

    fn with_pool(n: usize) -> Self {
        Self::new(MemoryGateway::new(pool(n)))
    }

    fn send(&mut self, message: Message) {
        let effects = self.labeler.update(message, self.now);
        self.run(effects);
    }

    fn wait(&mut self, secs: u64) {
        self.now += Duration::from_secs(secs);
        self.send(Message::Tick);
    }

    fn run(&mut self, effects: Vec<Effect>) {
        let mut pending: VecDeque<Effect> = effects.into();
        while let Some(effect) = pending.pop_front() {
            match effect {
                Effect::Call(call) => {
                    self.calls.push(call.clone());
                    let completion = gateway::execute(&mut self.gateway, call);
                    pending.extend(self.labeler.update(completion, self.now));
                }
                Effect::Alert(text) => self.alerts.push(text),
                Effect::Persist => self.store.save(&self.labeler.snapshot(self.now)).unwrap(),
                Effect::DiscardStorage => self.store.discard().unwrap(),
            }
        }
    }

    fn annotate_seat_torn(&mut self) {
        self.send(Message::SelectVehicle(VehicleType::Scooter));
        self.send(Message::SelectSection("center".to_string()));
        self.send(Message::TogglePart("seat".to_string()));
        self.send(Message::ToggleDamage {
            part: "seat".to_string(),
            damage: DamageKind::Torn,
            severity: None,
        });
    }

    fn mark_undamaged(&mut self) {
        self.send(Message::SelectVehicle(VehicleType::Bike));
        self.send(Message::ToggleNoDamage);
    }

    fn claim_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, RemoteCall::ClaimImages { .. }))
            .count()
    }
}

// ============================================================================
// Start-up and submit
// ============================================================================

#[test]
fn test_start_claims_initial_batch() {
    let h = Harness::with_pool(10);
    assert!(matches!(
        h.calls[0],
        RemoteCall::ClaimImages { batch_size: 5, .. }
    ));
    assert_eq!(h.labeler.queue().len(), 5);
    assert_eq!(h.gateway.pool_len(), 5);
    assert_eq!(h.labeler.phase(), Phase::Annotating);
    assert_eq!(current_id(&h.labeler), Some("img-0"));
}

#[test]
fn test_submit_sends_annotation_and_advances() {
    let mut h = Harness::with_pool(10);
    h.annotate_seat_torn();
    assert_eq!(h.labeler.annotation().expanded_part.as_deref(), Some("seat"));

    h.send(Message::Submit);

    let submissions = h.gateway.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].image_id.as_str(), "img-0");
    assert_eq!(submissions[0].vehicle_type, VehicleType::Scooter);
    assert_eq!(
        submissions[0].damages,
        vec![DamageEntry::new("seat", DamageKind::Torn, Severity::Major)]
    );
    assert_eq!(Some(submissions[0].session_id), h.labeler.session_id());

    assert_eq!(current_id(&h.labeler), Some("img-1"));
    assert!(h.labeler.annotation().is_empty());
    assert!(!h.labeler.is_saving());
    assert!(h.labeler.cache().get(&ImageId::new("img-0")).is_some());
}

#[test]
fn test_no_damage_submits_empty_damages() {
    let mut h = Harness::with_pool(10);
    h.mark_undamaged();
    h.send(Message::Submit);
    assert_eq!(h.gateway.submissions().len(), 1);
    assert!(h.gateway.submissions()[0].damages.is_empty());
    assert_eq!(h.gateway.submissions()[0].vehicle_type, VehicleType::Bike);
}

#[test]
fn test_incomplete_submit_alerts_without_call() {
    let mut h = Harness::with_pool(10);
    h.send(Message::Submit);
    assert_eq!(h.alerts.len(), 1);
    assert!(h.alerts[0].starts_with("Incomplete annotation"));

    h.send(Message::SelectVehicle(VehicleType::Bike));
    h.send(Message::Submit);
    assert_eq!(h.alerts.len(), 2);
    assert!(h.alerts[1].starts_with("Incomplete annotation"));

    assert!(h.gateway.submissions().is_empty());
    assert_eq!(current_id(&h.labeler), Some("img-0"));
    assert_eq!(h.labeler.annotation().vehicle_type, Some(VehicleType::Bike));
}

#[test]
fn test_submit_failure_keeps_state_for_retry() {
    let mut h = Harness::with_pool(10);
    h.annotate_seat_torn();
    h.gateway.fail_submits(true);
    h.send(Message::Submit);

    assert_eq!(h.alerts.len(), 1);
    assert!(h.alerts[0].starts_with("Failed to save annotation"));
    assert_eq!(current_id(&h.labeler), Some("img-0"));
    assert_eq!(h.labeler.annotation().damages.len(), 1);
    assert!(!h.labeler.is_saving());

    h.gateway.fail_submits(false);
    h.send(Message::Submit);
    assert_eq!(h.gateway.submissions().len(), 1);
    assert_eq!(current_id(&h.labeler), Some("img-1"));
}

#[test]
fn test_second_submit_suppressed_while_saving() {
    let mut labeler = Labeler::new(Taxonomy::builtin(), AppConfig::default());
    let now = Instant::now();
    labeler.start(None, now);
    labeler.update(claimed(&labeler, &["a", "b"]), now);
    labeler.update(Message::SelectVehicle(VehicleType::Bike), now);
    labeler.update(Message::ToggleNoDamage, now);

    let first = labeler.update(Message::Submit, now);
    assert!(first
        .iter()
        .any(|e| matches!(e, Effect::Call(RemoteCall::SubmitAnnotation(_)))));
    assert!(labeler.is_saving());

    let second = labeler.update(Message::Submit, now);
    assert!(!second.iter().any(|e| matches!(e, Effect::Call(_))));

    let skip = labeler.update(Message::Skip, now);
    assert!(skip.iter().all(|e| !matches!(e, Effect::Call(_))));
    assert_eq!(current_id(&labeler), Some("a"));
}

// ============================================================================
// Skip and navigation
// ============================================================================

#[test]
fn test_skip_releases_and_caches() {
    let mut h = Harness::with_pool(10);
    h.send(Message::SelectVehicle(VehicleType::Bike));
    h.send(Message::Skip);

    let skipped = ImageId::new("img-0");
    assert!(h
        .calls
        .iter()
        .any(|call| *call == RemoteCall::ReleaseImage { image_id: skipped.clone() }));
    assert!(!h.gateway.is_assigned(&skipped));
    assert_eq!(h.gateway.pool_len(), 6);
    assert_eq!(current_id(&h.labeler), Some("img-1"));
    assert_eq!(
        h.labeler.cache().get(&skipped).and_then(|s| s.vehicle_type),
        Some(VehicleType::Bike)
    );
}

#[test]
fn test_release_failure_is_not_surfaced() {
    let mut h = Harness::with_pool(10);
    h.gateway.fail_releases(true);
    h.send(Message::Skip);
    assert!(h.alerts.is_empty());
    assert_eq!(current_id(&h.labeler), Some("img-1"));
}

#[test]
fn test_previous_and_next_restore_annotations() {
    let mut h = Harness::with_pool(10);
    h.annotate_seat_torn();

    h.send(Message::Next);
    assert_eq!(current_id(&h.labeler), Some("img-1"));
    assert!(h.labeler.annotation().is_empty());
    h.send(Message::SelectVehicle(VehicleType::Bike));

    h.send(Message::Previous);
    assert_eq!(current_id(&h.labeler), Some("img-0"));
    assert_eq!(h.labeler.annotation().vehicle_type, Some(VehicleType::Scooter));
    assert_eq!(h.labeler.annotation().damages.len(), 1);

    h.send(Message::Previous);
    assert_eq!(current_id(&h.labeler), Some("img-0"));

    h.send(Message::Next);
    assert_eq!(h.labeler.annotation().vehicle_type, Some(VehicleType::Bike));
}

#[test]
fn test_next_stops_at_last_queued_image() {
    let mut h = Harness::with_pool(2);
    h.send(Message::Next);
    h.send(Message::Next);
    assert_eq!(current_id(&h.labeler), Some("img-1"));
}

// ============================================================================
// Refill and claims
// ============================================================================

#[test]
fn test_refill_triggered_exactly_once() {
    let mut labeler = Labeler::new(Taxonomy::builtin(), AppConfig::default());
    let now = Instant::now();
    assert_eq!(claims(&labeler.start(None, now)), vec![5]);
    labeler.update(
        claimed(&labeler, &["a", "b", "c", "d", "e"]),
        now,
    );

    assert!(claims(&labeler.update(Message::Skip, now)).is_empty());
    assert!(claims(&labeler.update(Message::Skip, now)).is_empty());
    assert_eq!(claims(&labeler.update(Message::Skip, now)), vec![3]);
    assert_eq!(labeler.queue().remaining(), 2);

    // Refill still in flight: further low-water marks are suppressed.
    assert!(claims(&labeler.update(Message::Skip, now)).is_empty());
    assert!(claims(&labeler.update(Message::Next, now)).is_empty());
    assert_eq!(labeler.queue().remaining(), 1);

    labeler.update(claimed(&labeler, &["f", "g", "h"]), now);
    assert_eq!(labeler.queue().len(), 8);
    assert!(!labeler.queue().claim_in_flight());
}

#[test]
fn test_out_of_order_claim_is_merged_and_deduped() {
    let mut labeler = Labeler::new(Taxonomy::builtin(), AppConfig::default());
    let now = Instant::now();
    labeler.start(None, now);
    labeler.update(claimed(&labeler, &["a", "b", "c"]), now);

    // Remaining drops to 2 right away, so the first skip starts a refill.
    assert_eq!(claims(&labeler.update(Message::Skip, now)), vec![3]);
    labeler.update(Message::Skip, now);
    labeler.update(Message::Previous, now);
    assert_eq!(current_id(&labeler), Some("b"));

    labeler.update(claimed(&labeler, &["c", "d", "b", "e"]), now);
    let ids: Vec<_> = labeler.queue().images().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
    assert_eq!(current_id(&labeler), Some("b"));
}

#[test]
fn test_claim_failure_then_refresh() {
    let mut gateway = MemoryGateway::new(pool(10));
    gateway.fail_claims(true);
    let mut h = Harness::new(gateway);

    assert_eq!(h.labeler.phase(), Phase::Waiting);
    assert!(h.labeler.queue().is_empty());
    assert!(h.alerts.is_empty());

    h.send(Message::SelectVehicle(VehicleType::Bike));
    assert!(h.labeler.annotation().vehicle_type.is_none());

    h.gateway.fail_claims(false);
    h.send(Message::Refresh);
    assert_eq!(h.labeler.phase(), Phase::Annotating);
    assert_eq!(h.labeler.queue().len(), 5);
}

#[test]
fn test_all_done_after_pool_runs_dry() {
    let mut h = Harness::with_pool(2);
    assert_eq!(h.labeler.queue().len(), 2);

    h.mark_undamaged();
    h.send(Message::Submit);
    assert_eq!(h.labeler.phase(), Phase::Annotating);

    h.mark_undamaged();
    h.send(Message::Submit);
    assert_eq!(h.gateway.submissions().len(), 2);
    assert_eq!(h.labeler.phase(), Phase::AllDone);
    assert!(h.labeler.current_image().is_none());

    h.send(Message::Refresh);
    assert_eq!(h.labeler.phase(), Phase::AllDone);
}

#[test]
fn test_refresh_ignored_while_annotating() {
    let mut h = Harness::with_pool(10);
    let before = h.claim_count();
    h.send(Message::Refresh);
    assert_eq!(h.claim_count(), before);
}

// ============================================================================
// Session timers
// ============================================================================

#[test]
fn test_heartbeat_every_interval() {
    let mut h = Harness::with_pool(3);
    h.wait(60);
    assert_eq!(h.gateway.heartbeats(), 0);
    h.wait(60);
    assert_eq!(h.gateway.heartbeats(), 1);
    h.wait(30);
    assert_eq!(h.gateway.heartbeats(), 1);
    h.wait(90);
    assert_eq!(h.gateway.heartbeats(), 2);
}

#[test]
fn test_inactivity_expires_session() {
    let mut h = Harness::with_pool(10);
    h.annotate_seat_torn();
    let old_session = h.labeler.session_id();
    assert!(h.store.load().unwrap().is_some());

    h.wait(300);
    h.send(Message::UserActivity);
    h.wait(599);
    assert_eq!(h.labeler.phase(), Phase::Annotating);

    h.wait(1);
    assert_eq!(h.labeler.phase(), Phase::Expired);
    assert!(h.labeler.session_id().is_none());
    assert!(h.labeler.queue().is_empty());
    assert!(h.labeler.cache().is_empty());
    assert!(h.store.load().unwrap().is_none());

    h.send(Message::UserActivity);
    assert!(h.labeler.session_id().is_some());
    assert_ne!(h.labeler.session_id(), old_session);
    assert_eq!(h.labeler.phase(), Phase::Annotating);
    assert!(h.labeler.annotation().is_empty());
}

#[test]
fn test_late_claim_after_expiry_is_merged() {
    let mut labeler = Labeler::new(Taxonomy::builtin(), AppConfig::default());
    let now = Instant::now();
    labeler.start(None, now);
    let expired = claimed(&labeler, &["late"]);
    labeler.update(Message::Tick, now + Duration::from_secs(600));
    assert_eq!(labeler.phase(), Phase::Expired);

    labeler.update(expired, now);
    assert_eq!(labeler.queue().len(), 1);
}

#[test]
fn test_input_after_timeout_without_tick_starts_new_session() {
    let mut h = Harness::with_pool(10);
    h.annotate_seat_torn();
    let old_session = h.labeler.session_id();
    let claimed_before = h.claim_count();

    h.now += Duration::from_secs(900);
    h.send(Message::UserActivity);

    assert!(h.labeler.session_id().is_some());
    assert_ne!(h.labeler.session_id(), old_session);
    assert!(h.labeler.annotation().is_empty());
    assert!(h.labeler.cache().is_empty());
    assert_eq!(h.claim_count(), claimed_before + 1);
    assert_eq!(current_id(&h.labeler), Some("img-5"));

    let stored = h.store.load().unwrap().unwrap();
    assert_eq!(Some(stored.session.0), h.labeler.session_id());
    assert!(stored.queue.annotation_cache.is_empty());
}

#[test]
fn test_stale_claim_does_not_unblock_new_session_claim() {
    let mut labeler = Labeler::new(Taxonomy::builtin(), AppConfig::default());
    let now = Instant::now();
    labeler.start(None, now);
    let stale = claimed(&labeler, &["late"]);

    let later = now + Duration::from_secs(900);
    let effects = labeler.update(Message::UserActivity, later);
    assert!(effects.contains(&Effect::DiscardStorage));
    assert_eq!(claims(&effects), vec![5]);

    labeler.update(stale, later);
    assert_eq!(current_id(&labeler), Some("late"));
    assert!(labeler.queue().claim_in_flight());
    assert!(claims(&labeler.update(Message::Skip, later)).is_empty());

    labeler.update(claimed(&labeler, &["a", "b"]), later);
    assert!(!labeler.queue().claim_in_flight());
    assert_eq!(current_id(&labeler), Some("a"));
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_every_change_persists() {
    let mut labeler = Labeler::new(Taxonomy::builtin(), AppConfig::default());
    let now = Instant::now();
    assert!(labeler.start(None, now).contains(&Effect::Persist));
    labeler.update(claimed(&labeler, &["a"]), now);

    let effects = labeler.update(Message::SelectVehicle(VehicleType::Bike), now);
    assert!(effects.contains(&Effect::Persist));

    let snapshot = labeler.snapshot(now);
    assert_eq!(snapshot.queue.images, records(&["a"]));
    assert_eq!(
        snapshot
            .queue
            .annotation_cache
            .get(&ImageId::new("a"))
            .and_then(|s| s.vehicle_type),
        Some(VehicleType::Bike)
    );

    let effects = labeler.update(Message::UserActivity, now);
    assert!(!effects.contains(&Effect::Persist));
}

#[test]
fn test_reload_resumes_without_claiming() {
    let mut h = Harness::with_pool(10);
    h.send(Message::Skip);
    h.annotate_seat_torn();
    let session = h.labeler.session_id();
    let claimed_before = h.claim_count();

    let restored = StateStore::new(h.store.storage().clone()).load().unwrap();
    let mut labeler = Labeler::new(Taxonomy::builtin(), AppConfig::default());
    let effects = labeler.start(restored, h.now);

    assert!(claims(&effects).is_empty());
    assert!(!effects.contains(&Effect::DiscardStorage));
    assert_eq!(claimed_before, 1);
    assert_eq!(labeler.session_id(), session);
    assert_eq!(current_id(&labeler), Some("img-1"));
    assert_eq!(labeler.queue().len(), 5);
    assert_eq!(labeler.annotation().damages.len(), 1);
    assert_eq!(labeler.phase(), Phase::Annotating);
}

#[test]
fn test_stale_stored_session_is_discarded() {
    let restored = Restored {
        queue: PersistedQueue {
            version: 1,
            images: records(&["a", "b"]),
            current_index: 1,
            ..Default::default()
        },
        session: (SessionId::generate(), Duration::from_secs(700)),
    };
    let stale_id = restored.session.0;

    let mut labeler = Labeler::new(Taxonomy::builtin(), AppConfig::default());
    let effects = labeler.start(Some(restored), Instant::now());

    assert!(effects.contains(&Effect::DiscardStorage));
    assert_eq!(claims(&effects), vec![5]);
    assert_ne!(labeler.session_id(), Some(stale_id));
    assert!(labeler.queue().is_empty());
    assert_eq!(labeler.phase(), Phase::Loading);
}

#[test]
fn test_resumed_short_queue_refills() {
    let restored = Restored {
        queue: PersistedQueue {
            version: 1,
            images: records(&["a", "b", "c"]),
            current_index: 1,
            ..Default::default()
        },
        session: (SessionId::generate(), Duration::from_secs(10)),
    };
    let mut labeler = Labeler::new(Taxonomy::builtin(), AppConfig::default());
    let effects = labeler.start(Some(restored), Instant::now());
    assert_eq!(claims(&effects), vec![3]);
    assert_eq!(current_id(&labeler), Some("b"));
}
