//! In-process assignment store

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{AssignmentStore, StoreError};
use crate::model::{AssignmentItem, ItemKey};

/// Store backed by a map, with optional scripted failures.
///
/// Failures are keyed by the 1-based number of the upsert attempt, so
/// `fail_on_attempt(2, ..)` rejects exactly the second write it receives.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<ItemKey, AssignmentItem>>,
    failures: HashMap<usize, StoreError>,
    attempts: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on_attempt(mut self, attempt: usize, error: StoreError) -> Self {
        self.failures.insert(attempt, error);
        self
    }

    /// Number of upserts received, failed ones included
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Snapshot of the stored items in key order
    pub fn items(&self) -> Vec<AssignmentItem> {
        self.lock().values().cloned().collect()
    }

    pub fn get(&self, key: &ItemKey) -> Option<AssignmentItem> {
        self.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<ItemKey, AssignmentItem>> {
        // A panic while holding the lock cannot leave the map half-written.
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AssignmentStore for MemoryStore {
    async fn upsert(&self, item: &AssignmentItem) -> Result<(), StoreError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(error) = self.failures.get(&attempt) {
            return Err(error.clone());
        }

        self.lock().insert(item.key(), item.clone());
        Ok(())
    }
}
