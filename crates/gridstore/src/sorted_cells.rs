//! Cells kept sorted along a spreadsheet traversal path.
//!
//! Backed by a `Vec` and binary search: lookups are `O(log n)`, inserts and
//! removals shift the tail. The working set is a rendered viewport, not the
//! whole sheet.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use gridstore_common::{CellReference, StoreError};

/// Total order over cell positions.
pub trait CellComparator {
    fn compare(&self, a: &CellReference, b: &CellReference) -> Ordering;
}

/// The eight ways to walk a grid.
///
/// The name reads inner axis first: `LeftRightTopDown` walks each row left to
/// right, rows from the top down (row-major ascending).
/// `TopDownLeftRight` walks each column top to bottom, columns left to right.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TraversalPath {
    #[default]
    LeftRightTopDown,
    RightLeftTopDown,
    LeftRightBottomUp,
    RightLeftBottomUp,
    TopDownLeftRight,
    TopDownRightLeft,
    BottomUpLeftRight,
    BottomUpRightLeft,
}

impl TraversalPath {
    pub const ALL: [TraversalPath; 8] = [
        TraversalPath::LeftRightTopDown,
        TraversalPath::RightLeftTopDown,
        TraversalPath::LeftRightBottomUp,
        TraversalPath::RightLeftBottomUp,
        TraversalPath::TopDownLeftRight,
        TraversalPath::TopDownRightLeft,
        TraversalPath::BottomUpLeftRight,
        TraversalPath::BottomUpRightLeft,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            TraversalPath::LeftRightTopDown => "LRTD",
            TraversalPath::RightLeftTopDown => "RLTD",
            TraversalPath::LeftRightBottomUp => "LRBU",
            TraversalPath::RightLeftBottomUp => "RLBU",
            TraversalPath::TopDownLeftRight => "TDLR",
            TraversalPath::TopDownRightLeft => "TDRL",
            TraversalPath::BottomUpLeftRight => "BULR",
            TraversalPath::BottomUpRightLeft => "BURL",
        }
    }

    /// (rows outer?, columns ascending?, rows ascending?)
    const fn axes(self) -> (bool, bool, bool) {
        match self {
            TraversalPath::LeftRightTopDown => (true, true, true),
            TraversalPath::RightLeftTopDown => (true, false, true),
            TraversalPath::LeftRightBottomUp => (true, true, false),
            TraversalPath::RightLeftBottomUp => (true, false, false),
            TraversalPath::TopDownLeftRight => (false, true, true),
            TraversalPath::TopDownRightLeft => (false, false, true),
            TraversalPath::BottomUpLeftRight => (false, true, false),
            TraversalPath::BottomUpRightLeft => (false, false, false),
        }
    }
}

impl CellComparator for TraversalPath {
    fn compare(&self, a: &CellReference, b: &CellReference) -> Ordering {
        let (rows_outer, cols_asc, rows_asc) = self.axes();
        let directed = |ord: Ordering, asc: bool| if asc { ord } else { ord.reverse() };
        let by_row = directed(a.row().cmp(&b.row()), rows_asc);
        let by_col = directed(a.column().cmp(&b.column()), cols_asc);
        if rows_outer {
            by_row.then(by_col)
        } else {
            by_col.then(by_row)
        }
    }
}

impl fmt::Display for TraversalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TraversalPath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TraversalPath::ALL
            .into_iter()
            .find(|path| path.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| StoreError::invalid(format!("unknown traversal path {s:?}")))
    }
}

/// Sorted `(cell, value)` pairs with no duplicate cells.
#[derive(Clone, Debug)]
pub struct SortedCellList<V, C = TraversalPath> {
    cells: Vec<(CellReference, V)>,
    comparator: C,
}

impl<V> Default for SortedCellList<V, TraversalPath> {
    fn default() -> Self {
        Self::new(TraversalPath::default())
    }
}

impl<V, C: CellComparator> SortedCellList<V, C> {
    pub fn new(comparator: C) -> Self {
        Self {
            cells: Vec::new(),
            comparator,
        }
    }

    pub fn comparator(&self) -> &C {
        &self.comparator
    }

    fn search(&self, cell: &CellReference) -> Result<usize, usize> {
        self.cells
            .binary_search_by(|(candidate, _)| self.comparator.compare(candidate, cell))
    }

    /// Replace in place if `cell` is present, else insert at its sorted position.
    /// Returns the replaced value.
    pub fn add_or_replace(&mut self, cell: CellReference, value: V) -> Option<V> {
        match self.search(&cell) {
            Ok(idx) => {
                let (slot_cell, slot_value) = &mut self.cells[idx];
                *slot_cell = cell;
                Some(std::mem::replace(slot_value, value))
            }
            Err(idx) => {
                self.cells.insert(idx, (cell, value));
                None
            }
        }
    }

    pub fn get(&self, cell: &CellReference) -> Option<&V> {
        self.search(cell).ok().map(|idx| &self.cells[idx].1)
    }

    /// The exact match, or failing that the first entry after `cell` in sort order.
    pub fn get_or_next(&self, cell: &CellReference) -> Option<(&CellReference, &V)> {
        self.index_of_or_next(cell).and_then(|idx| self.offset(idx))
    }

    /// Position of the exact match or of the next entry; `None` when nothing
    /// remains past `cell`.
    pub fn index_of_or_next(&self, cell: &CellReference) -> Option<usize> {
        let idx = match self.search(cell) {
            Ok(idx) | Err(idx) => idx,
        };
        (idx < self.cells.len()).then_some(idx)
    }

    pub fn offset(&self, index: usize) -> Option<(&CellReference, &V)> {
        self.cells.get(index).map(|(cell, value)| (cell, value))
    }

    pub fn remove(&mut self, cell: &CellReference) -> Option<(CellReference, V)> {
        self.search(cell).ok().map(|idx| self.cells.remove(idx))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellReference, &V)> {
        self.cells.iter().map(|(cell, value)| (cell, value))
    }

    /// Entries from the first at or after `from` through the last at or before `to`.
    pub fn between<'a>(
        &'a self,
        from: &CellReference,
        to: &'a CellReference,
    ) -> impl Iterator<Item = (&'a CellReference, &'a V)> + 'a {
        let start = match self.search(from) {
            Ok(idx) | Err(idx) => idx,
        };
        self.cells[start..]
            .iter()
            .take_while(move |(cell, _)| self.comparator.compare(cell, to) != Ordering::Greater)
            .map(|(cell, value)| (cell, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(s: &str) -> CellReference {
        s.parse().unwrap()
    }

    fn names<V>(list: &SortedCellList<V>) -> Vec<String> {
        list.iter().map(|(c, _)| c.to_string()).collect()
    }

    fn grid() -> Vec<CellReference> {
        ["B2", "A1", "C1", "A3", "B1", "C3"].into_iter().map(cell).collect()
    }

    fn sorted_by(path: TraversalPath) -> Vec<String> {
        let mut list = SortedCellList::new(path);
        for c in grid() {
            list.add_or_replace(c, ());
        }
        names(&list)
    }

    #[test]
    fn all_eight_paths() {
        use TraversalPath::*;
        assert_eq!(sorted_by(LeftRightTopDown), ["A1", "B1", "C1", "B2", "A3", "C3"]);
        assert_eq!(sorted_by(RightLeftTopDown), ["C1", "B1", "A1", "B2", "C3", "A3"]);
        assert_eq!(sorted_by(LeftRightBottomUp), ["A3", "C3", "B2", "A1", "B1", "C1"]);
        assert_eq!(sorted_by(RightLeftBottomUp), ["C3", "A3", "B2", "C1", "B1", "A1"]);
        assert_eq!(sorted_by(TopDownLeftRight), ["A1", "A3", "B1", "B2", "C1", "C3"]);
        assert_eq!(sorted_by(TopDownRightLeft), ["C1", "C3", "B1", "B2", "A1", "A3"]);
        assert_eq!(sorted_by(BottomUpLeftRight), ["A3", "A1", "B2", "B1", "C3", "C1"]);
        assert_eq!(sorted_by(BottomUpRightLeft), ["C3", "C1", "B2", "B1", "A3", "A1"]);
    }

    #[test]
    fn traversal_path_parse() {
        assert_eq!("rlbu".parse::<TraversalPath>().unwrap(), TraversalPath::RightLeftBottomUp);
        for path in TraversalPath::ALL {
            assert_eq!(path.to_string().parse::<TraversalPath>().unwrap(), path);
        }
        assert!("XXXX".parse::<TraversalPath>().is_err());
    }

    #[test]
    fn replace_keeps_position_and_no_duplicates() {
        let mut list = SortedCellList::default();
        assert_eq!(list.add_or_replace(cell("A1"), 1), None);
        assert_eq!(list.add_or_replace(cell("B2"), 2), None);
        assert_eq!(list.add_or_replace(cell("$A$1"), 10), Some(1));
        assert_eq!(list.len(), 2);
        assert_eq!(list.offset(0), Some((&cell("A1"), &10)));
        assert!(list.offset(0).unwrap().0.is_absolute());
    }

    #[test]
    fn get_or_next() {
        let mut list = SortedCellList::default();
        for (c, v) in [("A1", 1), ("B2", 2), ("C3", 3)] {
            list.add_or_replace(cell(c), v);
        }
        assert_eq!(list.get(&cell("B2")), Some(&2));
        assert_eq!(list.get(&cell("B1")), None);

        assert_eq!(list.get_or_next(&cell("B1")), Some((&cell("B2"), &2)));
        assert_eq!(list.get_or_next(&cell("C3")), Some((&cell("C3"), &3)));
        assert_eq!(list.get_or_next(&cell("D3")), None);

        assert_eq!(list.index_of_or_next(&cell("A1")), Some(0));
        assert_eq!(list.index_of_or_next(&cell("A2")), Some(1));
        assert_eq!(list.index_of_or_next(&cell("A4")), None);
        assert_eq!(list.offset(3), None);
    }

    #[test]
    fn remove_is_noop_when_absent() {
        let mut list = SortedCellList::default();
        list.add_or_replace(cell("A1"), 1);
        assert_eq!(list.remove(&cell("B1")), None);
        assert_eq!(list.remove(&cell("$A$1")).map(|(_, v)| v), Some(1));
        assert!(list.is_empty());
    }

    #[test]
    fn between_is_inclusive() {
        let mut list = SortedCellList::default();
        for c in grid() {
            list.add_or_replace(c, ());
        }
        let got: Vec<String> = list
            .between(&cell("B1"), &cell("B2"))
            .map(|(c, _)| c.to_string())
            .collect();
        assert_eq!(got, ["B1", "C1", "B2"]);
        assert_eq!(list.between(&cell("C3"), &cell("A1")).count(), 0);
    }
}
