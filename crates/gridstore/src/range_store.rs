//! Rectangle-keyed multi-value index.
//!
//! ## Layout
//!
//! * `ranges`: `CellRange -> [V]`, ordered by `(top-left, bottom-right)` with
//!   insertion order kept inside each sequence.
//! * `by_value`: `V -> {CellRange}`, the reverse index.
//!
//! A range with no values is never kept, and every `(range, value)` pair is
//! present in both maps or in neither. Keys are stored with their anchors
//! cleared, so `$A$1:$B$2` and `A1:B2` share one entry.
//!
//! Stabbing queries scan ranges in key order and stop at the first range
//! whose top row lies below the queried cell; no R-tree is needed at spreadsheet
//! working-set sizes.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::Hash;
use std::ops::Bound;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use gridstore_common::{CellRange, CellReference, StoreError};

use crate::config::StoreConfig;
use crate::store::{Identified, Store, inclusive_bounds, page};
use crate::watchers::{WatcherHandle, Watchers};

type Values<V> = SmallVec<[V; 2]>;

/// One range with the values stored under it, in insertion order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeEntry<V> {
    pub range: CellRange,
    pub values: Vec<V>,
}

impl<V> Identified for RangeEntry<V> {
    type Id = CellRange;

    fn id(&self) -> CellRange {
        self.range
    }
}

fn entry<V: Clone>((range, values): (&CellRange, &Values<V>)) -> RangeEntry<V> {
    RangeEntry {
        range: *range,
        values: values.to_vec(),
    }
}

pub struct RangeStore<V> {
    ranges: BTreeMap<CellRange, Values<V>>,
    by_value: FxHashMap<V, BTreeSet<CellRange>>,
    added: Watchers<(CellRange, V)>,
    removed: Watchers<(CellRange, V)>,
    saved: Watchers<RangeEntry<V>>,
    deleted: Watchers<CellRange>,
    max_window: Option<usize>,
}

impl<V> Default for RangeStore<V>
where
    V: Clone + Eq + Hash + 'static,
{
    fn default() -> Self {
        Self::new(&StoreConfig::default())
    }
}

impl<V> RangeStore<V>
where
    V: Clone + Eq + Hash + 'static,
{
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            ranges: BTreeMap::new(),
            by_value: FxHashMap::default(),
            added: Watchers::new(),
            removed: Watchers::new(),
            saved: Watchers::new(),
            deleted: Watchers::new(),
            max_window: config.max_window,
        }
    }

    /// Add `value` to `range`. No-op if it is already there.
    pub fn add_value(&mut self, range: CellRange, value: V) {
        let range = range.normalize();
        let values = self.ranges.entry(range).or_default();
        if values.contains(&value) {
            return;
        }
        values.push(value.clone());
        self.by_value.entry(value.clone()).or_default().insert(range);

        #[cfg(feature = "tracing")]
        tracing::trace!(range = %range, "range value added");
        self.added.accept(&(range, value));
    }

    /// Values stored under exactly `range`, in insertion order.
    pub fn load(&self, range: &CellRange) -> Vec<V> {
        self.ranges
            .get(range)
            .map(|values| values.to_vec())
            .unwrap_or_default()
    }

    /// Remove one value; the range disappears with its last value.
    pub fn remove_value(&mut self, range: &CellRange, value: &V) {
        let Some(values) = self.ranges.get_mut(range) else {
            return;
        };
        let Some(pos) = values.iter().position(|v| v == value) else {
            return;
        };
        let value = values.remove(pos);
        let range = range.normalize();
        if values.is_empty() {
            self.ranges.remove(&range);
        }
        self.unindex(&range, &value);

        #[cfg(feature = "tracing")]
        tracing::trace!(range = %range, "range value removed");
        self.removed.accept(&(range, value));
    }

    /// Swap `old` for `new` as a remove followed by an add. No-op when `old`
    /// is not stored under `range`.
    pub fn replace_value(&mut self, range: &CellRange, new: V, old: &V) {
        if new == *old || !self.ranges.get(range).is_some_and(|values| values.contains(old)) {
            return;
        }
        self.remove_value(range, old);
        self.add_value(*range, new);
    }

    /// Every range whose rectangle contains `cell`.
    pub fn find_cell_ranges_including_cell(&self, cell: CellReference) -> Vec<CellRange> {
        self.stab(cell).map(|(range, _)| *range).collect()
    }

    /// Values of every range containing `cell`, range by range. A value held
    /// by two matching ranges appears twice.
    pub fn find_values_with_cell(&self, cell: CellReference) -> Vec<V> {
        self.stab(cell)
            .flat_map(|(_, values)| values.iter().cloned())
            .collect()
    }

    /// Values of every range overlapping `range`, deduplicated, in range order.
    pub fn find_values_intersecting(&self, range: &CellRange) -> Vec<V> {
        let mut out: Vec<V> = Vec::new();
        let overlapping = self
            .ranges
            .iter()
            .take_while(|(key, _)| key.begin().row() <= range.end().row())
            .filter(|(key, _)| key.intersects(range));
        for (_, values) in overlapping {
            for value in values {
                if !out.contains(value) {
                    out.push(value.clone());
                }
            }
        }
        out
    }

    /// Ranges currently holding `value`, in range order.
    pub fn find_cell_ranges_with_value(&self, value: &V) -> Vec<CellRange> {
        self.by_value
            .get(value)
            .map(|ranges| ranges.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Fired with `(range, value)` after a value is added.
    pub fn add_add_value_watcher<W>(&self, watcher: W) -> WatcherHandle
    where
        W: Fn(&(CellRange, V)) + 'static,
    {
        self.added.add_watcher(watcher)
    }

    /// Fired with `(range, value)` after a value is removed, including by `delete`.
    pub fn add_remove_value_watcher<W>(&self, watcher: W) -> WatcherHandle
    where
        W: Fn(&(CellRange, V)) + 'static,
    {
        self.removed.add_watcher(watcher)
    }

    fn stab(&self, cell: CellReference) -> impl Iterator<Item = (&CellRange, &Values<V>)> {
        self.ranges
            .iter()
            .take_while(move |(range, _)| range.begin().row() <= cell.row())
            .filter(move |(range, _)| range.contains(cell))
    }

    fn unindex(&mut self, range: &CellRange, value: &V) {
        if let Some(ranges) = self.by_value.get_mut(value) {
            ranges.remove(range);
            if ranges.is_empty() {
                self.by_value.remove(value);
            }
        }
    }
}

/// The index seen as a store of [`RangeEntry`] keyed by range.
///
/// `save` makes the stored values equal to the entry's: missing values are
/// removed, then new ones appended, each firing its value watcher. Values
/// already stored keep their position. An empty entry deletes the range.
impl<V> Store<RangeEntry<V>> for RangeStore<V>
where
    V: Clone + Eq + Hash + 'static,
{
    fn load(&self, range: &CellRange) -> Option<RangeEntry<V>> {
        self.ranges.get_key_value(range).map(entry)
    }

    fn save(&mut self, value: RangeEntry<V>) -> RangeEntry<V> {
        let range = value.range.normalize();
        for old in RangeStore::load(self, &range) {
            if !value.values.contains(&old) {
                self.remove_value(&range, &old);
            }
        }
        for new in value.values {
            self.add_value(range, new);
        }

        let saved = RangeEntry {
            range,
            values: RangeStore::load(self, &range),
        };
        self.saved.accept(&saved);
        saved
    }

    /// Drop `range` and all its values. Remove-value watchers fire per value,
    /// then the delete watchers once.
    fn delete(&mut self, range: &CellRange) {
        let Some((range, values)) = self.ranges.remove_entry(range) else {
            return;
        };
        for value in &values {
            self.unindex(&range, value);
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(range = %range, values = values.len(), "range deleted");
        for value in values {
            self.removed.accept(&(range, value));
        }
        self.deleted.accept(&range);
    }

    fn count(&self) -> usize {
        self.ranges.len()
    }

    fn ids(&self, offset: usize, count: usize) -> Result<Vec<CellRange>, StoreError> {
        page(self.ranges.keys().copied(), offset, count, self.max_window)
    }

    fn values(&self, offset: usize, count: usize) -> Result<Vec<RangeEntry<V>>, StoreError> {
        page(self.ranges.iter().map(entry), offset, count, self.max_window)
    }

    fn between(
        &self,
        from: Bound<&CellRange>,
        to: Bound<&CellRange>,
    ) -> Result<Vec<RangeEntry<V>>, StoreError> {
        let (from, to) = inclusive_bounds(from, to)?;
        if from > to {
            return Ok(Vec::new());
        }
        Ok(self
            .ranges
            .range((Bound::Included(from), Bound::Included(to)))
            .map(entry)
            .collect())
    }

    fn add_save_watcher<W>(&self, watcher: W) -> WatcherHandle
    where
        W: Fn(&RangeEntry<V>) + 'static,
    {
        self.saved.add_watcher(watcher)
    }

    fn add_delete_watcher<W>(&self, watcher: W) -> WatcherHandle
    where
        W: Fn(&CellRange) + 'static,
    {
        self.deleted.add_watcher(watcher)
    }
}

impl<V: fmt::Debug> fmt::Debug for RangeStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeStore")
            .field("ranges", &self.ranges)
            .finish()
    }
}
