use std::cmp::Ordering;
use std::fmt;
use std::ops::Bound;

use gridstore_common::{CellRange, CellReference, StoreError};

use crate::config::StoreConfig;
use crate::sorted_cells::{CellComparator, SortedCellList, TraversalPath};
use crate::store::{Identified, Store, inclusive_bounds, page};
use crate::watchers::{WatcherHandle, Watchers};

/// A stored cell: its address plus whatever the engine keeps for it.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell<V> {
    pub reference: CellReference,
    pub value: V,
}

impl<V> Cell<V> {
    pub fn new(reference: CellReference, value: V) -> Self {
        Self { reference, value }
    }
}

impl<V> Identified for Cell<V> {
    type Id = CellReference;

    fn id(&self) -> CellReference {
        self.reference
    }
}

/// [`Store`] of cells kept in traversal order.
///
/// Listing, `between` and [`CellStore::next_from`] all follow the configured
/// [`TraversalPath`]; saved cells keep the anchors they were saved with.
pub struct CellStore<V> {
    cells: SortedCellList<V>,
    save_watchers: Watchers<Cell<V>>,
    delete_watchers: Watchers<CellReference>,
    max_window: Option<usize>,
}

impl<V: Clone + 'static> Default for CellStore<V> {
    fn default() -> Self {
        Self::new(&StoreConfig::default())
    }
}

impl<V: Clone + 'static> CellStore<V> {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            cells: SortedCellList::new(config.traversal),
            save_watchers: Watchers::new(),
            delete_watchers: Watchers::new(),
            max_window: config.max_window,
        }
    }

    pub fn traversal(&self) -> TraversalPath {
        *self.cells.comparator()
    }

    /// The cell at `reference`, or the next stored cell along the traversal path.
    pub fn next_from(&self, reference: &CellReference) -> Option<Cell<V>> {
        self.cells
            .get_or_next(reference)
            .map(|(reference, value)| Cell::new(*reference, value.clone()))
    }

    /// Stored cells inside `range`, in traversal order.
    pub fn load_range(&self, range: &CellRange) -> Vec<Cell<V>> {
        self.cells
            .iter()
            .filter(|(reference, _)| range.contains(**reference))
            .map(|(reference, value)| Cell::new(*reference, value.clone()))
            .collect()
    }
}

impl<V: Clone + 'static> Store<Cell<V>> for CellStore<V> {
    fn load(&self, id: &CellReference) -> Option<Cell<V>> {
        self.cells
            .get_or_next(id)
            .filter(|(reference, _)| *reference == id)
            .map(|(reference, value)| Cell::new(*reference, value.clone()))
    }

    fn save(&mut self, cell: Cell<V>) -> Cell<V> {
        #[cfg(feature = "tracing")]
        tracing::trace!(cell = %cell.reference, "cell saved");
        self.cells.add_or_replace(cell.reference, cell.value.clone());
        self.save_watchers.accept(&cell);
        cell
    }

    fn delete(&mut self, id: &CellReference) {
        if self.cells.remove(id).is_some() {
            #[cfg(feature = "tracing")]
            tracing::trace!(cell = %id, "cell deleted");
            self.delete_watchers.accept(id);
        }
    }

    fn count(&self) -> usize {
        self.cells.len()
    }

    fn ids(&self, offset: usize, count: usize) -> Result<Vec<CellReference>, StoreError> {
        page(
            self.cells.iter().map(|(reference, _)| *reference),
            offset,
            count,
            self.max_window,
        )
    }

    fn values(&self, offset: usize, count: usize) -> Result<Vec<Cell<V>>, StoreError> {
        page(
            self.cells
                .iter()
                .map(|(reference, value)| Cell::new(*reference, value.clone())),
            offset,
            count,
            self.max_window,
        )
    }

    /// Cells from `from` through `to` along the traversal path.
    fn between(
        &self,
        from: Bound<&CellReference>,
        to: Bound<&CellReference>,
    ) -> Result<Vec<Cell<V>>, StoreError> {
        let (from, to) = inclusive_bounds(from, to)?;
        if self.cells.comparator().compare(from, to) == Ordering::Greater {
            return Ok(Vec::new());
        }
        Ok(self
            .cells
            .between(from, to)
            .map(|(reference, value)| Cell::new(*reference, value.clone()))
            .collect())
    }

    fn add_save_watcher<W>(&self, watcher: W) -> WatcherHandle
    where
        W: Fn(&Cell<V>) + 'static,
    {
        self.save_watchers.add_watcher(watcher)
    }

    fn add_delete_watcher<W>(&self, watcher: W) -> WatcherHandle
    where
        W: Fn(&CellReference) + 'static,
    {
        self.delete_watchers.add_watcher(watcher)
    }
}

impl<V: fmt::Debug> fmt::Debug for CellStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellStore")
            .field("cells", &self.cells)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(s: &str) -> CellReference {
        s.parse().unwrap()
    }

    fn store(path: TraversalPath) -> CellStore<&'static str> {
        let mut store = CellStore::new(&StoreConfig::default().with_traversal(path));
        for name in ["B2", "A1", "C1", "A3"] {
            store.save(Cell::new(cell(name), name));
        }
        store
    }

    fn names(cells: &[Cell<&'static str>]) -> Vec<&'static str> {
        cells.iter().map(|c| c.value).collect()
    }

    #[test]
    fn lists_in_traversal_order() {
        let lrtd = store(TraversalPath::LeftRightTopDown);
        assert_eq!(names(&lrtd.values(0, 10).unwrap()), ["A1", "C1", "B2", "A3"]);

        let rlbu = store(TraversalPath::RightLeftBottomUp);
        assert_eq!(rlbu.traversal(), TraversalPath::RightLeftBottomUp);
        assert_eq!(names(&rlbu.values(0, 10).unwrap()), ["A3", "B2", "C1", "A1"]);
        assert_eq!(rlbu.ids(1, 2).unwrap(), vec![cell("B2"), cell("C1")]);
    }

    #[test]
    fn save_keeps_anchor_and_replaces() {
        let mut store = store(TraversalPath::LeftRightTopDown);
        store.save(Cell::new(cell("$B$2"), "new"));
        assert_eq!(store.count(), 4);
        let loaded = store.load(&cell("B2")).unwrap();
        assert_eq!(loaded.value, "new");
        assert!(loaded.reference.is_absolute());
    }

    #[test]
    fn next_from_and_between() {
        let store = store(TraversalPath::LeftRightTopDown);
        assert_eq!(store.next_from(&cell("B1")).map(|c| c.value), Some("C1"));
        assert_eq!(store.next_from(&cell("A1")).map(|c| c.value), Some("A1"));
        assert_eq!(store.next_from(&cell("B3")), None);

        let got = store
            .between(Bound::Included(&cell("B1")), Bound::Included(&cell("B2")))
            .unwrap();
        assert_eq!(names(&got), ["C1", "B2"]);
        assert!(store
            .between(Bound::Included(&cell("B2")), Bound::Included(&cell("B1")))
            .unwrap()
            .is_empty());
        assert!(store
            .between(Bound::Included(&cell("B1")), Bound::Excluded(&cell("B2")))
            .is_err());
    }

    #[test]
    fn load_range_and_delete() {
        let mut store = store(TraversalPath::LeftRightTopDown);
        assert_eq!(names(&store.load_range(&"A1:B2".parse().unwrap())), ["A1", "B2"]);
        store.delete(&cell("A1"));
        store.delete(&cell("A1"));
        assert_eq!(store.count(), 3);
        assert!(store.load_or_fail(&cell("A1")).is_err());
    }
}
