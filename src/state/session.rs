//! Labeling session identity and its two timers.
//!
//! The heartbeat is a fixed-interval repeating timer that runs regardless of
//! user input. Inactivity expiry is a single debounced timer rearmed by every
//! qualifying input event. Both are polled with an explicit `now` so the host
//! decides how often to tick.
//!
//! Idle time carried over from storage is kept as a duration. An `Instant`
//! cannot be moved back past its clock's origin, which in the browser is
//! page load.

use std::time::Duration;
use web_time::Instant;

use crate::config::SessionConfig;
use crate::model::SessionId;

/// Timer settings for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    /// Interval between heartbeats
    pub heartbeat_interval: Duration,
    /// Idle time after which the session is discarded
    pub inactivity_timeout: Duration,
}

impl From<&SessionConfig> for SessionTiming {
    fn from(config: &SessionConfig) -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(config.heartbeat_interval_secs),
            inactivity_timeout: Duration::from_secs(config.inactivity_timeout_secs),
        }
    }
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

/// An active labeling session.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    timing: SessionTiming,
    /// Instant of the last input, or of the resume if none came since
    last_seen: Instant,
    /// Idle time already accumulated at `last_seen`
    idle_before: Duration,
    next_heartbeat: Instant,
}

impl Session {
    /// Start a new session with a fresh id.
    pub fn start(timing: SessionTiming, now: Instant) -> Self {
        let session = Self::resume(SessionId::generate(), timing, now, Duration::ZERO);
        log::info!("Started session {}", session.id);
        session
    }

    /// Resume a stored session that has been idle for `idle_for`.
    pub fn resume(id: SessionId, timing: SessionTiming, now: Instant, idle_for: Duration) -> Self {
        Self {
            id,
            timing,
            last_seen: now,
            idle_before: idle_for,
            next_heartbeat: now + timing.heartbeat_interval,
        }
    }

    /// Session identifier sent to the backend.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Rearm the inactivity timer.
    pub fn touch(&mut self, now: Instant) {
        self.last_seen = self.last_seen.max(now);
        self.idle_before = Duration::ZERO;
    }

    /// Time since the last qualifying input.
    pub fn idle_for(&self, now: Instant) -> Duration {
        self.idle_before + now.saturating_duration_since(self.last_seen)
    }

    /// Check if the inactivity timer has fired.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.idle_for(now) >= self.timing.inactivity_timeout
    }

    /// Returns true once per heartbeat interval and schedules the next beat.
    pub fn heartbeat_due(&mut self, now: Instant) -> bool {
        if now < self.next_heartbeat {
            return false;
        }
        self.next_heartbeat = now + self.timing.heartbeat_interval;
        true
    }
}
