use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::coord::CellReference;
use crate::error::StoreError;

/// Inclusive rectangle of cells.
///
/// The corners are always stored canonically: `begin` is the top-left and
/// `end` the bottom-right corner, whatever order they were supplied in.
/// Equality, hashing and ordering inherit the kind-insensitivity of
/// [`CellReference`] and order by `(begin, end)`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "RawCellRange"))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRange {
    begin: CellReference,
    end: CellReference,
}

/// Wire shape of [`CellRange`]; corners are re-canonicalised on the way in.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawCellRange {
    begin: CellReference,
    end: CellReference,
}

#[cfg(feature = "serde")]
impl From<RawCellRange> for CellRange {
    fn from(raw: RawCellRange) -> Self {
        CellRange::new(raw.begin, raw.end)
    }
}

impl CellRange {
    pub fn new(a: CellReference, b: CellReference) -> Self {
        let (left, right) = if a.column() <= b.column() { (a, b) } else { (b, a) };
        let (top, bottom) = if a.row() <= b.row() { (a, b) } else { (b, a) };
        Self {
            begin: CellReference::with_kinds(
                left.column(),
                top.row(),
                left.column_kind(),
                top.row_kind(),
            ),
            end: CellReference::with_kinds(
                right.column(),
                bottom.row(),
                right.column_kind(),
                bottom.row_kind(),
            ),
        }
    }

    #[inline]
    pub const fn begin(&self) -> CellReference {
        self.begin
    }

    #[inline]
    pub const fn end(&self) -> CellReference {
        self.end
    }

    pub fn width(&self) -> u32 {
        self.end.column() - self.begin.column() + 1
    }

    pub fn height(&self) -> u32 {
        self.end.row() - self.begin.row() + 1
    }

    /// Number of cells covered.
    pub fn count(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    pub fn is_single_cell(&self) -> bool {
        self.begin == self.end
    }

    /// Both corners with their anchors cleared.
    pub fn normalize(&self) -> Self {
        Self {
            begin: self.begin.normalize(),
            end: self.end.normalize(),
        }
    }

    pub fn contains(&self, cell: CellReference) -> bool {
        (self.begin.column()..=self.end.column()).contains(&cell.column())
            && (self.begin.row()..=self.end.row()).contains(&cell.row())
    }

    pub fn contains_range(&self, other: &CellRange) -> bool {
        self.contains(other.begin) && self.contains(other.end)
    }

    pub fn intersects(&self, other: &CellRange) -> bool {
        self.begin.column() <= other.end.column()
            && other.begin.column() <= self.end.column()
            && self.begin.row() <= other.end.row()
            && other.begin.row() <= self.end.row()
    }

    /// Every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellReference> + '_ {
        let (c0, c1) = (self.begin.column(), self.end.column());
        (self.begin.row()..=self.end.row())
            .flat_map(move |row| (c0..=c1).map(move |col| CellReference::new(col, row)))
    }
}

impl From<CellReference> for CellRange {
    fn from(cell: CellReference) -> Self {
        Self::new(cell, cell)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.begin, self.end)
    }
}

impl FromStr for CellRange {
    type Err = StoreError;

    /// Accepts `A1:B2` (corners in any order) or a lone `A1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((a, b)) => Ok(Self::new(a.trim().parse()?, b.trim().parse()?)),
            None => Ok(Self::from(s.trim().parse::<CellReference>()?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReferenceKind;

    fn cell(s: &str) -> CellReference {
        s.parse().unwrap()
    }

    #[test]
    fn corners_are_canonical() {
        let range = CellRange::new(cell("C1"), cell("A3"));
        assert_eq!(range.begin(), cell("A1"));
        assert_eq!(range.end(), cell("C3"));
        assert_eq!(range.width(), 3);
        assert_eq!(range.height(), 3);
        assert_eq!(range.to_string(), "A1:C3");
    }

    #[test]
    fn corner_kinds_follow_their_axis() {
        let range = CellRange::new(cell("$C1"), cell("A$3"));
        assert_eq!(range.begin().column_kind(), ReferenceKind::Relative);
        assert_eq!(range.begin().row_kind(), ReferenceKind::Relative);
        assert_eq!(range.end().column_kind(), ReferenceKind::Absolute);
        assert_eq!(range.end().row_kind(), ReferenceKind::Absolute);
        assert_eq!(range.to_string(), "A1:$C$3");
    }

    #[test]
    fn equality_ignores_kinds() {
        let a: CellRange = "A1:B2".parse().unwrap();
        let b: CellRange = "$A$1:$B$2".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn containment_and_intersection() {
        let range: CellRange = "B2:D4".parse().unwrap();
        assert!(range.contains(cell("B2")));
        assert!(range.contains(cell("D4")));
        assert!(range.contains(cell("C3")));
        assert!(!range.contains(cell("A1")));
        assert!(!range.contains(cell("E4")));

        assert!(range.contains_range(&"C3:D4".parse().unwrap()));
        assert!(!range.contains_range(&"C3:E4".parse().unwrap()));
        assert!(range.intersects(&"D4:F9".parse().unwrap()));
        assert!(!range.intersects(&"E1:F9".parse().unwrap()));
    }

    #[test]
    fn cells_are_row_major() {
        let range: CellRange = "A1:B2".parse().unwrap();
        let cells: Vec<String> = range.cells().map(|c| c.to_string()).collect();
        assert_eq!(cells, vec!["A1", "B1", "A2", "B2"]);
        assert_eq!(range.count(), 4);
    }

    #[test]
    fn single_cell_parse() {
        let range: CellRange = "C7".parse().unwrap();
        assert!(range.is_single_cell());
        assert!("A1:".parse::<CellRange>().is_err());
    }
}
