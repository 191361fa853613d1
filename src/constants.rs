//! Global constants for the damage labeler

/// Images claimed when a session starts
pub const DEFAULT_INITIAL_BATCH: usize = 5;

/// Images claimed by a background refill
pub const DEFAULT_REFILL_BATCH: usize = 3;

/// Refill once this many unconsumed images (or fewer) remain
pub const DEFAULT_REFILL_THRESHOLD: usize = 2;

/// Seconds between heartbeats
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 2 * 60;

/// Seconds without input before the session is discarded
pub const DEFAULT_INACTIVITY_TIMEOUT_SECS: u64 = 10 * 60;

/// Storage key of the persisted queue, cursor and annotation cache
pub const QUEUE_STORAGE_KEY: &str = "damage-labeler-state";

/// Storage key of the persisted session record
pub const SESSION_STORAGE_KEY: &str = "damage-labeler-session";

/// Version of the persisted queue format
pub const STATE_VERSION: u32 = 1;
