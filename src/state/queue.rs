//! Queue of claimed images with a cursor and a refill policy.
//!
//! Claims complete asynchronously and may race with navigation, so incoming
//! batches are always merged by id rather than appended blindly. At most one
//! claim is in flight; further refill requests are dropped until it completes.
//! The in-flight claim is tagged with its session, so a straggler from an
//! expired session cannot clear the flag of the claim that replaced it.

use std::collections::HashSet;

use crate::config::QueueConfig;
use crate::model::{ImageId, ImageRecord, SessionId};

/// Result of folding a claim completion into the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// New records were appended
    Added(usize),
    /// The backend had nothing left to hand out
    PoolEmpty,
    /// Everything returned was already queued
    AllDuplicates,
    /// The claim failed; the queue is unchanged
    Failed,
}

/// Ordered, deduplicated list of claimed images.
#[derive(Debug, Clone)]
pub struct ImageQueue {
    images: Vec<ImageRecord>,
    cursor: usize,
    claim_in_flight: Option<SessionId>,
    pool_empty: bool,
    policy: QueueConfig,
}

impl ImageQueue {
    /// Create an empty queue.
    pub fn new(policy: QueueConfig) -> Self {
        Self {
            images: Vec::new(),
            cursor: 0,
            claim_in_flight: None,
            pool_empty: false,
            policy,
        }
    }

    /// Rebuild a queue from persisted records. Duplicates are dropped and the
    /// cursor is clamped to the queue length.
    pub fn restore(policy: QueueConfig, images: Vec<ImageRecord>, cursor: usize) -> Self {
        let mut queue = Self::new(policy);
        queue.merge(images);
        queue.cursor = cursor.min(queue.images.len());
        queue
    }

    /// The record under the cursor.
    pub fn current(&self) -> Option<&ImageRecord> {
        self.images.get(self.cursor)
    }

    /// All queued records, in claim order.
    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    /// Records queued after the current one, for prefetching.
    pub fn upcoming(&self) -> &[ImageRecord] {
        let start = (self.cursor + 1).min(self.images.len());
        &self.images[start..]
    }

    /// Cursor position. Equal to `len()` while waiting for a refill.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of queued records.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Check if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Unconsumed records: the current one and everything after it.
    pub fn remaining(&self) -> usize {
        self.images.len().saturating_sub(self.cursor)
    }

    /// Check if a claim is outstanding.
    pub fn claim_in_flight(&self) -> bool {
        self.claim_in_flight.is_some()
    }

    /// No current image, nothing in flight and the backend has run dry.
    pub fn is_exhausted(&self) -> bool {
        self.current().is_none() && !self.claim_in_flight() && self.pool_empty
    }

    /// Append records whose ids are not queued yet. Returns how many were added.
    pub fn merge(&mut self, records: Vec<ImageRecord>) -> usize {
        let mut seen: HashSet<ImageId> = self.images.iter().map(|i| i.id.clone()).collect();
        let before = self.images.len();
        for record in records {
            if seen.insert(record.id.clone()) {
                self.images.push(record);
            }
        }
        self.images.len() - before
    }

    /// Mark a claim of `batch_size` for `session` as started. Returns `None`
    /// if one is already in flight.
    pub fn begin_claim(&mut self, session: SessionId, batch_size: usize) -> Option<usize> {
        if self.claim_in_flight.is_some() {
            log::debug!("Claim suppressed: another claim is in flight");
            return None;
        }
        self.claim_in_flight = Some(session);
        Some(batch_size)
    }

    /// Start the initial load.
    pub fn begin_initial_claim(&mut self, session: SessionId) -> Option<usize> {
        self.begin_claim(session, self.policy.initial_batch)
    }

    /// Start a refill if the remaining count is at or below the threshold.
    pub fn refill_if_low(&mut self, session: SessionId) -> Option<usize> {
        if self.remaining() > self.policy.refill_threshold {
            return None;
        }
        self.begin_claim(session, self.policy.refill_batch)
    }

    /// Fold a claim completion made for `session` into the queue. `None`
    /// means the claim failed. Records merge whichever session asked for them.
    pub fn complete_claim(
        &mut self,
        session: SessionId,
        records: Option<Vec<ImageRecord>>,
    ) -> ClaimOutcome {
        if self.claim_in_flight == Some(session) {
            self.claim_in_flight = None;
        } else {
            log::debug!("Claim completion for session {} is not the one in flight", session);
        }
        let Some(records) = records else {
            return ClaimOutcome::Failed;
        };
        if records.is_empty() {
            self.pool_empty = true;
            return ClaimOutcome::PoolEmpty;
        }
        self.pool_empty = false;
        match self.merge(records) {
            0 => ClaimOutcome::AllDuplicates,
            added => ClaimOutcome::Added(added),
        }
    }

    /// Move past the current record after it was submitted or skipped.
    /// The cursor may land on `len()`, meaning "waiting for more".
    pub fn advance(&mut self) -> bool {
        if self.cursor < self.images.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Navigate forward to an already queued record.
    pub fn step_forward(&mut self) -> bool {
        if self.cursor + 1 < self.images.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Navigate back one record, stopping at the first.
    pub fn retreat(&mut self) -> bool {
        if self.cursor > 0 {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    /// Drop all records and reset the cursor.
    pub fn clear(&mut self) {
        self.images.clear();
        self.cursor = 0;
        self.claim_in_flight = None;
        self.pool_empty = false;
    }
}
