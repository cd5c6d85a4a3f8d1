//! Cell addresses shared by every index in the workspace.
//!
//! A [`CellReference`] is a zero-based (column, row) position plus one
//! [`ReferenceKind`] per axis, mirroring the `A1` / `$A1` / `A$1` / `$A$1`
//! anchoring modes. The kinds are metadata only: equality, hashing and
//! ordering look at the position alone, so `$A$1` and `A1` land on the same
//! index key everywhere.

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

const ROW_BITS: u32 = 20;
const COL_BITS: u32 = 14;

/// Largest zero-based row index (1,048,576 rows).
pub const ROW_MAX: u32 = (1 << ROW_BITS) - 1;
/// Largest zero-based column index (16,384 columns, `XFD`).
pub const COL_MAX: u32 = (1 << COL_BITS) - 1;

/// Whether one axis of a reference is anchored (`$`) or relative.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum ReferenceKind {
    Absolute,
    #[default]
    Relative,
}

impl ReferenceKind {
    #[inline]
    pub const fn is_absolute(self) -> bool {
        matches!(self, ReferenceKind::Absolute)
    }

    #[inline]
    const fn prefix(self) -> &'static str {
        match self {
            ReferenceKind::Absolute => "$",
            ReferenceKind::Relative => "",
        }
    }
}

/// A single cell address.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawCellReference"))]
#[derive(Copy, Clone, Debug)]
pub struct CellReference {
    column: u32,
    row: u32,
    column_kind: ReferenceKind,
    row_kind: ReferenceKind,
}

/// Wire shape of [`CellReference`]; checked against the sheet limits on the way in.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawCellReference {
    column: u32,
    row: u32,
    column_kind: ReferenceKind,
    row_kind: ReferenceKind,
}

#[cfg(feature = "serde")]
impl TryFrom<RawCellReference> for CellReference {
    type Error = StoreError;

    fn try_from(raw: RawCellReference) -> Result<Self, Self::Error> {
        let cell = CellReference::try_new(raw.column, raw.row)?;
        Ok(CellReference::with_kinds(
            cell.column,
            cell.row,
            raw.column_kind,
            raw.row_kind,
        ))
    }
}

impl CellReference {
    /// Construct a relative reference, panicking if values exceed the sheet limits.
    pub fn new(column: u32, row: u32) -> Self {
        Self::with_kinds(column, row, ReferenceKind::Relative, ReferenceKind::Relative)
    }

    /// Construct a fully anchored (`$A$1`) reference.
    pub fn absolute(column: u32, row: u32) -> Self {
        Self::with_kinds(column, row, ReferenceKind::Absolute, ReferenceKind::Absolute)
    }

    pub fn with_kinds(
        column: u32,
        row: u32,
        column_kind: ReferenceKind,
        row_kind: ReferenceKind,
    ) -> Self {
        assert!(column <= COL_MAX, "Col {column} exceeds 14 bits");
        assert!(row <= ROW_MAX, "Row {row} exceeds 20 bits");
        Self {
            column,
            row,
            column_kind,
            row_kind,
        }
    }

    /// Fallible constructor that reports overflow rather than panicking.
    pub fn try_new(column: u32, row: u32) -> Result<Self, StoreError> {
        if column > COL_MAX {
            return Err(StoreError::InvalidArgument(format!(
                "column {column} exceeds {COL_MAX}"
            )));
        }
        if row > ROW_MAX {
            return Err(StoreError::InvalidArgument(format!(
                "row {row} exceeds {ROW_MAX}"
            )));
        }
        Ok(Self::new(column, row))
    }

    #[inline]
    pub const fn column(self) -> u32 {
        self.column
    }

    #[inline]
    pub const fn row(self) -> u32 {
        self.row
    }

    #[inline]
    pub const fn column_kind(self) -> ReferenceKind {
        self.column_kind
    }

    #[inline]
    pub const fn row_kind(self) -> ReferenceKind {
        self.row_kind
    }

    #[inline]
    pub const fn is_absolute(self) -> bool {
        self.column_kind.is_absolute() && self.row_kind.is_absolute()
    }

    /// Returns a copy with both axes relative. Index keys are stored in this form.
    #[inline]
    pub const fn normalize(self) -> Self {
        Self {
            column: self.column,
            row: self.row,
            column_kind: ReferenceKind::Relative,
            row_kind: ReferenceKind::Relative,
        }
    }

    /// Returns a copy with both axes anchored.
    #[inline]
    pub const fn to_absolute(self) -> Self {
        Self {
            column: self.column,
            row: self.row,
            column_kind: ReferenceKind::Absolute,
            row_kind: ReferenceKind::Absolute,
        }
    }

    /// Returns a copy with every anchor flipped. Handy for kind-insensitivity checks.
    pub const fn flip_kinds(self) -> Self {
        const fn flip(kind: ReferenceKind) -> ReferenceKind {
            match kind {
                ReferenceKind::Absolute => ReferenceKind::Relative,
                ReferenceKind::Relative => ReferenceKind::Absolute,
            }
        }
        Self {
            column: self.column,
            row: self.row,
            column_kind: flip(self.column_kind),
            row_kind: flip(self.row_kind),
        }
    }

    /// Move by signed deltas, keeping the anchors. Returns `None` when the result leaves the sheet.
    pub fn offset(self, dcol: i64, drow: i64) -> Option<Self> {
        let column = i64::from(self.column) + dcol;
        let row = i64::from(self.row) + drow;
        if !(0..=i64::from(COL_MAX)).contains(&column) || !(0..=i64::from(ROW_MAX)).contains(&row)
        {
            return None;
        }
        Some(Self::with_kinds(
            column as u32,
            row as u32,
            self.column_kind,
            self.row_kind,
        ))
    }

    pub fn col_to_letters(col: u32) -> String {
        column_to_letters(col)
    }

    pub fn letters_to_col(s: &str) -> Option<u32> {
        letters_to_column_index(s)
    }
}

impl PartialEq for CellReference {
    fn eq(&self, other: &Self) -> bool {
        self.column == other.column && self.row == other.row
    }
}

impl Eq for CellReference {}

impl Hash for CellReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.column.hash(state);
        self.row.hash(state);
    }
}

impl Ord for CellReference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.row
            .cmp(&other.row)
            .then_with(|| self.column.cmp(&other.column))
    }
}

impl PartialOrd for CellReference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CellReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}",
            self.column_kind.prefix(),
            column_to_letters(self.column),
            self.row_kind.prefix(),
            self.row + 1
        )
    }
}

impl FromStr for CellReference {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_a1(s).ok_or_else(|| StoreError::InvalidArgument(format!("invalid cell reference {s:?}")))
    }
}

impl TryFrom<&str> for CellReference {
    type Error = StoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

fn parse_a1(s: &str) -> Option<CellReference> {
    let bytes = s.as_bytes();
    let mut i = 0;

    let column_kind = if bytes.first() == Some(&b'$') {
        i += 1;
        ReferenceKind::Absolute
    } else {
        ReferenceKind::Relative
    };
    let letters_start = i;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    if i == letters_start {
        return None;
    }
    let letters = s[letters_start..i].to_ascii_uppercase();

    let row_kind = if bytes.get(i) == Some(&b'$') {
        i += 1;
        ReferenceKind::Absolute
    } else {
        ReferenceKind::Relative
    };
    let digits = &s[i..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let row: u32 = digits.parse().ok()?;
    if row == 0 || row - 1 > ROW_MAX {
        return None;
    }
    let column = letters_to_column_index(&letters)?;
    if column > COL_MAX {
        return None;
    }
    Some(CellReference::with_kinds(column, row - 1, column_kind, row_kind))
}

fn column_to_letters(mut col: u32) -> String {
    let mut buf = Vec::new();
    loop {
        let rem = (col % 26) as u8;
        buf.push(char::from(b'A' + rem));
        col /= 26;
        if col == 0 {
            break;
        }
        col -= 1;
    }
    buf.iter().rev().collect()
}

fn letters_to_column_index(s: &str) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for (idx, ch) in s.bytes().enumerate() {
        if !ch.is_ascii_uppercase() {
            return None;
        }
        let val = (ch - b'A') as u32;
        col = col.checked_mul(26)?;
        col = col.checked_add(val)?;
        if idx != s.len() - 1 {
            col = col.checked_add(1)?;
        }
    }
    Some(col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn parse_and_display() {
        let a1: CellReference = "A1".parse().unwrap();
        assert_eq!((a1.column(), a1.row()), (0, 0));
        assert_eq!(a1.to_string(), "A1");

        let abs: CellReference = "$AB$6".parse().unwrap();
        assert_eq!((abs.column(), abs.row()), (27, 5));
        assert!(abs.is_absolute());
        assert_eq!(abs.to_string(), "$AB$6");

        let mixed: CellReference = "c$3".parse().unwrap();
        assert_eq!(mixed.to_string(), "C$3");
        assert_eq!(mixed.column_kind(), ReferenceKind::Relative);
        assert_eq!(mixed.row_kind(), ReferenceKind::Absolute);
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in ["", "A", "1", "A0", "1A", "A1B", "$", "A$", "XFE1", "A1048577"] {
            assert!(bad.parse::<CellReference>().is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn kind_is_not_identity() {
        let rel = CellReference::new(2, 3);
        let abs = rel.to_absolute();
        assert_eq!(rel, abs);
        assert_eq!(rel.cmp(&abs), Ordering::Equal);

        let mut set = HashSet::new();
        set.insert(rel);
        assert!(set.contains(&abs));
        assert!(!set.insert(abs.flip_kinds()));
    }

    #[test]
    fn ordering_is_row_major() {
        let b1 = CellReference::new(1, 0);
        let a2 = CellReference::new(0, 1);
        assert!(b1 < a2);
    }

    #[test]
    fn offset_stays_on_sheet() {
        let a1 = CellReference::absolute(0, 0);
        assert_eq!(a1.offset(1, 1), Some(CellReference::new(1, 1)));
        assert!(a1.offset(1, 1).unwrap().is_absolute());
        assert_eq!(a1.offset(-1, 0), None);
        assert_eq!(CellReference::new(COL_MAX, 0).offset(1, 0), None);
    }

    #[test]
    fn try_new_bounds() {
        assert!(CellReference::try_new(COL_MAX, ROW_MAX).is_ok());
        assert!(CellReference::try_new(COL_MAX + 1, 0).is_err());
        assert!(CellReference::try_new(0, ROW_MAX + 1).is_err());
    }

    #[test]
    fn column_letter_roundtrip() {
        let letters = CellReference::col_to_letters(27);
        assert_eq!(letters, "AB");
        assert_eq!(CellReference::letters_to_col(&letters), Some(27));
        assert_eq!(CellReference::col_to_letters(COL_MAX), "XFD");
        assert!(CellReference::letters_to_col("a1").is_none());
    }
}
