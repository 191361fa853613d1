//! Durable local storage for the queue, cursor, annotation cache and session.
//!
//! Storage is a small key/value capability so the labeler itself never does
//! I/O. Native builds keep one JSON file per key under the platform data
//! directory; web builds use localStorage.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use web_time::{SystemTime, UNIX_EPOCH};

use crate::constants::{QUEUE_STORAGE_KEY, SESSION_STORAGE_KEY, STATE_VERSION};
use crate::model::{ImageRecord, SessionId};
use crate::state::AnnotationCache;

/// Errors from a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error on the native file backend
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored JSON could not be read or written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Browser storage is missing or refused the operation
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Stored data was written by a newer version
    #[error("Stored state version {found} is newer than supported version {supported}")]
    VersionTooNew { found: u32, supported: u32 },
}

/// Minimal key/value storage.
pub trait Storage {
    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    /// Write a value, replacing any previous one.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Delete a value. Deleting a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-memory storage, used by tests and when no durable backend is available.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: HashMap<String, String>,
}

impl MemoryStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.values.remove(key);
        Ok(())
    }
}

/// One JSON file per key in a directory (native only).
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileStorage {
    /// Store files under `dir`, created on first write.
    pub fn new(dir: impl Into<std::path::PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Platform data directory for the labeler, if one exists.
    pub fn default_dir() -> Option<std::path::PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join("damage-labeler"))
    }

    fn path(&self, key: &str) -> std::path::PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir)?;
        // Readers must never see a partially written file.
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, self.path(key))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Browser localStorage (WASM only).
#[cfg(target_arch = "wasm32")]
pub struct LocalStorage {
    storage: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    /// Open the window's localStorage.
    pub fn open() -> Result<Self, StorageError> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("No window object available".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| StorageError::Unavailable(format!("localStorage access error: {:?}", e)))?
            .ok_or_else(|| StorageError::Unavailable("localStorage not available".to_string()))?;
        Ok(Self { storage })
    }
}

#[cfg(target_arch = "wasm32")]
impl Storage for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage
            .get_item(key)
            .map_err(|e| StorageError::Unavailable(format!("Failed to read {key}: {:?}", e)))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| StorageError::Unavailable(format!("Failed to save {key}: {:?}", e)))
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.storage
            .remove_item(key)
            .map_err(|e| StorageError::Unavailable(format!("Failed to remove {key}: {:?}", e)))
    }
}

/// Persisted queue blob: claimed images, cursor and annotation cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedQueue {
    /// Format version
    #[serde(default)]
    pub version: u32,
    /// Claimed images in queue order
    #[serde(default)]
    pub images: Vec<ImageRecord>,
    /// Cursor into `images`
    #[serde(default)]
    pub current_index: usize,
    /// Per-image annotation snapshots
    #[serde(default)]
    pub annotation_cache: AnnotationCache,
}

/// Persisted session record. Activity is stored as wall-clock time so idle
/// time survives a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session identifier
    pub session_id: SessionId,
    /// Last qualifying input, milliseconds since the Unix epoch
    pub last_activity_ms: u64,
}

/// What the labeler hands to the store after a state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Queue blob
    pub queue: PersistedQueue,
    /// Active session and how long it has been idle
    pub session: Option<(SessionId, Duration)>,
}

/// What the store hands back at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restored {
    /// Queue blob
    pub queue: PersistedQueue,
    /// Stored session and how long ago its last activity was
    pub session: (SessionId, Duration),
}

/// Reads and writes labeler state through a [`Storage`] backend.
pub struct StateStore<S: Storage> {
    storage: S,
}

impl<S: Storage> StateStore<S> {
    /// Wrap a storage backend.
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Borrow the backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Write the queue blob and session record.
    pub fn save(&mut self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let queue = PersistedQueue {
            version: STATE_VERSION,
            ..snapshot.queue.clone()
        };
        self.storage
            .set(QUEUE_STORAGE_KEY, &serde_json::to_string(&queue)?)?;

        match snapshot.session {
            Some((session_id, idle_for)) => {
                let record = SessionRecord {
                    session_id,
                    last_activity_ms: unix_millis().saturating_sub(idle_for.as_millis() as u64),
                };
                self.storage
                    .set(SESSION_STORAGE_KEY, &serde_json::to_string(&record)?)?;
            }
            None => self.storage.remove(SESSION_STORAGE_KEY)?,
        }
        log::trace!(
            "Persisted {} images, cursor {}",
            queue.images.len(),
            queue.current_index
        );
        Ok(())
    }

    /// Read stored state. Returns `None` when no session was stored; a queue
    /// without a session is meaningless and is ignored.
    pub fn load(&self) -> Result<Option<Restored>, StorageError> {
        let Some(session_json) = self.storage.get(SESSION_STORAGE_KEY)? else {
            return Ok(None);
        };
        let record: SessionRecord = serde_json::from_str(&session_json)?;
        let idle_ms = unix_millis().saturating_sub(record.last_activity_ms);

        let queue = match self.storage.get(QUEUE_STORAGE_KEY)? {
            Some(json) => serde_json::from_str::<PersistedQueue>(&json)?,
            None => PersistedQueue::default(),
        };
        if queue.version > STATE_VERSION {
            return Err(StorageError::VersionTooNew {
                found: queue.version,
                supported: STATE_VERSION,
            });
        }

        Ok(Some(Restored {
            queue,
            session: (record.session_id, Duration::from_millis(idle_ms)),
        }))
    }

    /// Delete both entries.
    pub fn discard(&mut self) -> Result<(), StorageError> {
        self.storage.remove(QUEUE_STORAGE_KEY)?;
        self.storage.remove(SESSION_STORAGE_KEY)?;
        log::debug!("Discarded stored labeler state");
        Ok(())
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
