//! Repeating style records: a property set applied to every Nth row or
//! column starting at a given index.

use crate::style::property::CellProperty;
use crate::style::store::PropertyStore;

/// One repeating record: `(start, interval)` plus its property store.
///
/// Matches index `i` iff `i >= start` and `(i - start) % interval == 0`.
#[derive(Debug)]
pub struct RepeatingStyle {
    start: usize,
    interval: usize,
    store: PropertyStore<CellProperty>,
}

impl RepeatingStyle {
    /// Create an empty record. An interval of 0 is treated as 1.
    pub fn new(start: usize, interval: usize) -> Self {
        Self {
            start,
            interval: interval.max(1),
            store: PropertyStore::new(),
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn interval(&self) -> usize {
        self.interval
    }

    /// `true` when `index` falls on this record's pattern.
    pub fn matches(&self, index: usize) -> bool {
        index >= self.start && (index - self.start) % self.interval == 0
    }

    pub fn store(&self) -> &PropertyStore<CellProperty> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut PropertyStore<CellProperty> {
        &mut self.store
    }
}
