//! Atomic value storage for metrics.
//!
//! Each metric owns one [`ValueStore`]: a map from resolved [`TagSet`] to an
//! atomic cell. Reads share the map lock, cell creation takes it exclusively,
//! and the cells themselves are updated lock-free, so writers touching
//! different tag sets only contend on first touch.
//!
//! We always require a 64-bit atomic regardless of whether the standard
//! library exposes one for the target architecture, hence the fallback to
//! `portable-atomic` on 32-bit targets.

use std::sync::atomic::Ordering;
use std::sync::{PoisonError, RwLock};

#[cfg(target_pointer_width = "32")]
use portable_atomic::AtomicU64;
#[cfg(not(target_pointer_width = "32"))]
use std::sync::atomic::AtomicU64;

use hashbrown::HashMap;

use crate::tags::TagSet;

/// Monotonically increasing integer cell.
#[derive(Debug, Default)]
pub(crate) struct CounterCell(AtomicU64);

impl CounterCell {
    /// Adds `value` to the cell, returning the new total.
    pub(crate) fn increment(&self, value: u64) -> u64 {
        self.0.fetch_add(value, Ordering::Release).wrapping_add(value)
    }

    /// Current total.
    pub(crate) fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }
}

/// Floating-point cell, stored as raw bits.
#[derive(Debug, Default)]
pub(crate) struct SampleCell(AtomicU64);

impl SampleCell {
    /// Replaces the cell value.
    pub(crate) fn set(&self, value: f64) {
        let _ = self.0.swap(value.to_bits(), Ordering::AcqRel);
    }

    /// Adds `value` to the cell, returning the new value.
    pub(crate) fn add(&self, value: f64) -> f64 {
        let mut curr = self.0.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(curr) + value).to_bits();
            match self.0.compare_exchange_weak(curr, next, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => return f64::from_bits(next),
                Err(actual) => curr = actual,
            }
        }
    }

    /// Current value.
    pub(crate) fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }
}

/// Per-metric map of resolved tag sets to atomic cells.
pub(crate) struct ValueStore<C> {
    cells: RwLock<HashMap<TagSet, C>>,
}

impl<C: Default> ValueStore<C> {
    pub(crate) fn new() -> Self {
        ValueStore { cells: RwLock::new(HashMap::new()) }
    }

    /// Runs `op` against the cell for `tags`, creating the cell first if it
    /// does not exist yet.
    pub(crate) fn get_or_create<O, V>(&self, tags: &TagSet, op: O) -> V
    where
        O: FnOnce(&C) -> V,
    {
        // Try the read path first; most writes hit an existing cell.
        let cells_read = self.cells.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(cell) = cells_read.get(tags) {
            op(cell)
        } else {
            drop(cells_read);
            let mut cells_write = self.cells.write().unwrap_or_else(PoisonError::into_inner);
            let cell = cells_write.entry(tags.clone()).or_default();
            op(cell)
        }
    }

    /// Runs `op` against the cell for `tags` if one exists.
    pub(crate) fn get<O, V>(&self, tags: &TagSet, op: O) -> Option<V>
    where
        O: FnOnce(&C) -> V,
    {
        let cells_read = self.cells.read().unwrap_or_else(PoisonError::into_inner);
        cells_read.get(tags).map(|cell| op(cell))
    }
}

#[cfg(test)]
mod tests {
    use super::{CounterCell, SampleCell, ValueStore};
    use crate::tags::TagSet;

    #[test]
    fn counter_cell_accumulates() {
        let cell = CounterCell::default();
        assert_eq!(cell.increment(10), 10);
        assert_eq!(cell.increment(5), 15);
        assert_eq!(cell.get(), 15);
    }

    #[test]
    fn sample_cell_set_and_add() {
        let cell = SampleCell::default();
        assert_eq!(cell.get(), 0.0);
        cell.set(4.5);
        assert_eq!(cell.get(), 4.5);
        assert_eq!(cell.add(0.5), 5.0);
        assert_eq!(cell.add(-6.0), -1.0);
        assert_eq!(cell.get(), -1.0);
    }

    #[test]
    fn store_reuses_cells_per_tag_set() {
        let store: ValueStore<CounterCell> = ValueStore::new();
        let tags = TagSet::from([("queue", "default")]);
        let other = TagSet::from([("queue", "mailers")]);

        assert_eq!(store.get_or_create(&tags, |c| c.increment(1)), 1);
        assert_eq!(store.get_or_create(&tags, |c| c.increment(1)), 2);
        assert_eq!(store.get_or_create(&other, |c| c.increment(1)), 1);

        assert_eq!(store.get(&tags, |c| c.get()), Some(2));
        assert_eq!(store.get(&TagSet::new(), |c| c.get()), None);
    }
}
