//! Key-value persistence adapters for the price snapshot and the cached identity.
//!
//! The store never talks to a backend directly: it serializes its snapshot to a
//! string and hands it to a [`SnapshotStorage`]. Swapping disk for memory (or a
//! remote KV) does not touch store logic.

pub mod file;

pub use file::FileStorage;

use crate::error::StorageError;
use crate::shared::UserId;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Key under which the app caches the signed-in user.
pub const USER_KEY: &str = "user";

/// String-keyed blob storage.
pub trait SnapshotStorage: Send + Sync {
    /// `Ok(None)` when nothing was ever saved under `key`.
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process storage; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// Source of the locally cached user id sent in the connect handshake.
pub trait IdentityProvider: Send + Sync {
    fn cached_user_id(&self) -> Result<Option<UserId>, StorageError>;
}

impl IdentityProvider for UserId {
    fn cached_user_id(&self) -> Result<Option<UserId>, StorageError> {
        Ok(Some(*self))
    }
}

/// Shape of the cached user blob; only the id matters here.
#[derive(Deserialize)]
struct CachedUser {
    id: UserId,
}

/// Reads the cached user blob (`{"id": 42, ...}`) from a [`SnapshotStorage`].
#[derive(Clone)]
pub struct StoredIdentity {
    storage: Arc<dyn SnapshotStorage>,
    key: String,
}

impl StoredIdentity {
    pub fn new(storage: Arc<dyn SnapshotStorage>) -> Self {
        Self::with_key(storage, USER_KEY)
    }

    pub fn with_key(storage: Arc<dyn SnapshotStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }
}

impl IdentityProvider for StoredIdentity {
    fn cached_user_id(&self) -> Result<Option<UserId>, StorageError> {
        match self.storage.load(&self.key)? {
            Some(raw) => {
                let user: CachedUser = serde_json::from_str(&raw)?;
                Ok(Some(user.id))
            }
            None => Ok(None),
        }
    }
}
