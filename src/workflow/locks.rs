// src/workflow/locks.rs
//! Per-script mutual exclusion for mutating workflow operations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Held for the duration of one operation on a script.
pub type ScriptGuard = OwnedMutexGuard<()>;

#[derive(Default)]
pub struct ScriptLocks {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl ScriptLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` while another operation holds the script.
    pub fn try_acquire(&self, script_id: Uuid) -> Option<ScriptGuard> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        // Entries nobody holds a guard for are only referenced by the map.
        locks.retain(|id, lock| *id == script_id || Arc::strong_count(lock) > 1);

        let lock = locks
            .entry(script_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        lock.try_lock_owned().ok()
    }

    pub fn is_locked(&self, script_id: Uuid) -> bool {
        let locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .get(&script_id)
            .map_or(false, |lock| lock.try_lock().is_err())
    }

    pub fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}
