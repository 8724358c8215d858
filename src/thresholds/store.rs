/*!
 * Threshold persistence.
 *
 * `ThresholdStore` is the storage seam for threshold records and the
 * feedback audit trail. `update` must be atomic per key: two concurrent
 * updates to the same key are applied one after the other, never lost.
 * The SQLite implementation lives in `crate::database`.
 */

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use super::feedback::FeedbackRecord;
use super::{ThresholdKey, ThresholdSet};
use crate::errors::PersistenceError;

/// Keyed storage for threshold sets
pub trait ThresholdStore: Send + Sync + Debug {
    /// Read the record for a key, if one was ever written
    fn load(&self, key: &ThresholdKey) -> Result<Option<ThresholdSet>, PersistenceError>;

    /// Read-modify-write one record.
    ///
    /// The current record (or `seed` when there is none) is handed to
    /// `apply` while the key is held; the result is stored and returned.
    fn update(
        &self,
        key: &ThresholdKey,
        seed: ThresholdSet,
        apply: &mut dyn FnMut(&mut ThresholdSet),
    ) -> Result<ThresholdSet, PersistenceError>;

    /// Append one event to the feedback audit trail
    fn record_feedback(&self, record: &FeedbackRecord) -> Result<(), PersistenceError>;

    /// Every stored record
    fn list(&self) -> Result<Vec<(ThresholdKey, ThresholdSet)>, PersistenceError>;
}

type Cell = Arc<Mutex<Option<ThresholdSet>>>;

/// Process-local store with one lock per key
#[derive(Debug, Default)]
pub struct InMemoryThresholdStore {
    records: RwLock<HashMap<ThresholdKey, Cell>>,
    feedback: Mutex<Vec<FeedbackRecord>>,
}

impl InMemoryThresholdStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a record
    pub fn put(&self, key: ThresholdKey, set: ThresholdSet) {
        *self.cell(&key).lock() = Some(set);
    }

    /// Audit trail in insertion order
    pub fn feedback_events(&self) -> Vec<FeedbackRecord> {
        self.feedback.lock().clone()
    }

    fn cell(&self, key: &ThresholdKey) -> Cell {
        if let Some(cell) = self.records.read().get(key) {
            return Arc::clone(cell);
        }
        let mut records = self.records.write();
        Arc::clone(records.entry(key.clone()).or_default())
    }
}

impl ThresholdStore for InMemoryThresholdStore {
    fn load(&self, key: &ThresholdKey) -> Result<Option<ThresholdSet>, PersistenceError> {
        let records = self.records.read();
        Ok(records.get(key).and_then(|cell| *cell.lock()))
    }

    fn update(
        &self,
        key: &ThresholdKey,
        seed: ThresholdSet,
        apply: &mut dyn FnMut(&mut ThresholdSet),
    ) -> Result<ThresholdSet, PersistenceError> {
        let cell = self.cell(key);
        let mut guard = cell.lock();
        let mut current = guard.unwrap_or(seed);
        apply(&mut current);
        *guard = Some(current);
        Ok(current)
    }

    fn record_feedback(&self, record: &FeedbackRecord) -> Result<(), PersistenceError> {
        self.feedback.lock().push(record.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<(ThresholdKey, ThresholdSet)>, PersistenceError> {
        let records = self.records.read();
        let mut listed: Vec<_> = records
            .iter()
            .filter_map(|(key, cell)| cell.lock().map(|set| (key.clone(), set)))
            .collect();
        listed.sort_by_key(|(key, _)| key.storage_key());
        Ok(listed)
    }
}
