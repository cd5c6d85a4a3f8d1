//! Label names and the things a label can point at.

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::coord::CellReference;
use crate::error::StoreError;
use crate::range::CellRange;

const MAX_LABEL_LEN: usize = 255;

/// A validated label name.
///
/// Comparison, hashing and ordering are ASCII case-insensitive; the original
/// spelling is kept for display.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
#[derive(Clone, Debug)]
pub struct LabelName(String);

impl LabelName {
    pub fn new(name: impl Into<String>) -> Result<Self, StoreError> {
        let name = name.into();
        validate(&name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(name: &str) -> Result<(), StoreError> {
    let invalid = |why: &str| StoreError::InvalidArgument(format!("invalid label {name:?}: {why}"));

    let mut chars = name.chars();
    match chars.next() {
        None => return Err(invalid("empty")),
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        Some(_) => return Err(invalid("must start with a letter or '_'")),
    }
    if name.len() > MAX_LABEL_LEN {
        return Err(invalid("too long"));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
        return Err(invalid("only letters, digits, '_' and '.' are allowed"));
    }
    if name.parse::<CellReference>().is_ok() {
        return Err(invalid("looks like a cell reference"));
    }
    Ok(())
}

impl PartialEq for LabelName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for LabelName {}

impl Hash for LabelName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
        state.write_u8(0xff);
    }
}

impl Ord for LabelName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .bytes()
            .map(|b| b.to_ascii_lowercase())
            .cmp(other.0.bytes().map(|b| b.to_ascii_lowercase()))
    }
}

impl PartialOrd for LabelName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for LabelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LabelName {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LabelName {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LabelName> for String {
    fn from(value: LabelName) -> Self {
        value.0
    }
}

/// A concrete, label-free location: what a label chain finally resolves to.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellOrRange {
    Cell(CellReference),
    Range(CellRange),
}

impl CellOrRange {
    /// The rectangle covered; a single cell becomes a 1x1 range.
    pub fn to_range(&self) -> CellRange {
        match self {
            CellOrRange::Cell(cell) => CellRange::from(*cell),
            CellOrRange::Range(range) => *range,
        }
    }

    pub fn contains(&self, cell: CellReference) -> bool {
        match self {
            CellOrRange::Cell(c) => *c == cell,
            CellOrRange::Range(range) => range.contains(cell),
        }
    }
}

impl From<CellReference> for CellOrRange {
    fn from(cell: CellReference) -> Self {
        CellOrRange::Cell(cell)
    }
}

impl From<CellRange> for CellOrRange {
    fn from(range: CellRange) -> Self {
        CellOrRange::Range(range)
    }
}

impl fmt::Display for CellOrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellOrRange::Cell(cell) => cell.fmt(f),
            CellOrRange::Range(range) => range.fmt(f),
        }
    }
}

/// What a label maps to: a cell, a range, or another label.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LabelTarget {
    Cell(CellReference),
    Range(CellRange),
    Label(LabelName),
}

impl LabelTarget {
    /// The concrete location, or `None` if this is another label.
    pub fn cell_or_range(&self) -> Option<CellOrRange> {
        match self {
            LabelTarget::Cell(cell) => Some(CellOrRange::Cell(*cell)),
            LabelTarget::Range(range) => Some(CellOrRange::Range(*range)),
            LabelTarget::Label(_) => None,
        }
    }
}

impl From<CellReference> for LabelTarget {
    fn from(cell: CellReference) -> Self {
        LabelTarget::Cell(cell)
    }
}

impl From<CellRange> for LabelTarget {
    fn from(range: CellRange) -> Self {
        LabelTarget::Range(range)
    }
}

impl From<LabelName> for LabelTarget {
    fn from(label: LabelName) -> Self {
        LabelTarget::Label(label)
    }
}

impl From<CellOrRange> for LabelTarget {
    fn from(value: CellOrRange) -> Self {
        match value {
            CellOrRange::Cell(cell) => LabelTarget::Cell(cell),
            CellOrRange::Range(range) => LabelTarget::Range(range),
        }
    }
}

impl fmt::Display for LabelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelTarget::Cell(cell) => cell.fmt(f),
            LabelTarget::Range(range) => range.fmt(f),
            LabelTarget::Label(label) => label.fmt(f),
        }
    }
}

impl FromStr for LabelTarget {
    type Err = StoreError;

    /// Ranges (`A1:B2`) first, then cells, then labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(':') {
            return Ok(LabelTarget::Range(s.parse()?));
        }
        if let Ok(cell) = s.parse::<CellReference>() {
            return Ok(LabelTarget::Cell(cell));
        }
        Ok(LabelTarget::Label(s.parse()?))
    }
}
