//! Ordered, de-duplicated wave collection.
//!
//! The ledger is unique by `WaveKey` and kept newest-first. Every mutation ends with a stable sort
//! so ties keep arrival order: snapshot order first, then push order.

use super::record::{WaveKey, WaveRecord};

use itertools::Itertools;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct WaveLedger {
    records: Vec<WaveRecord>,
    keys: HashSet<WaveKey>,
}

impl WaveLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole ledger with `snapshot`. Later duplicates of a key are dropped.
    pub(crate) fn replace(&mut self, snapshot: Vec<WaveRecord>) {
        self.records = snapshot.into_iter().unique_by(WaveRecord::key).collect();
        self.keys = self.records.iter().map(WaveRecord::key).collect();
        self.restore_order();
    }

    /// Insert `record` unless a record with the same key is present. Returns whether it was added.
    pub(crate) fn insert_if_absent(&mut self, record: WaveRecord) -> bool {
        if !self.keys.insert(record.key()) {
            return false;
        }
        self.records.push(record);
        self.restore_order();
        true
    }

    pub fn contains(&self, key: &WaveKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records, newest first.
    pub fn records(&self) -> &[WaveRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &WaveRecord> {
        self.records.iter()
    }

    fn restore_order(&mut self) {
        // sort_by is stable
        self.records.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
    }
}
