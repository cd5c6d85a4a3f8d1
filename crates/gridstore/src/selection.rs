//! What a reference query is about, and what it asks.
//!
//! A query is one [`Selection`] crossed with one [`ReferenceVerb`]; the pair is
//! dispatched in [`SheetStores::query`](crate::stores::SheetStores::query).

use std::fmt;
use std::str::FromStr;

use gridstore_common::{
    COL_MAX, CellOrRange, CellRange, CellReference, LabelName, LabelTarget, ROW_MAX, StoreError,
};

/// The part of the sheet a query is about.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Selection {
    Cell(CellReference),
    /// Whole column, zero-based.
    Column(u32),
    /// Whole row, zero-based.
    Row(u32),
    Range(CellRange),
    Label(LabelName),
}

impl Selection {
    /// The rectangle this selection covers, or `None` for a label.
    pub fn cell_or_range(&self) -> Result<Option<CellOrRange>, StoreError> {
        Ok(Some(match self {
            Selection::Cell(cell) => CellOrRange::Cell(*cell),
            Selection::Range(range) => CellOrRange::Range(*range),
            Selection::Column(column) => CellOrRange::Range(CellRange::new(
                CellReference::try_new(*column, 0)?,
                CellReference::try_new(*column, ROW_MAX)?,
            )),
            Selection::Row(row) => CellOrRange::Range(CellRange::new(
                CellReference::try_new(0, *row)?,
                CellReference::try_new(COL_MAX, *row)?,
            )),
            Selection::Label(_) => return Ok(None),
        }))
    }
}

impl From<CellReference> for Selection {
    fn from(cell: CellReference) -> Self {
        Selection::Cell(cell)
    }
}

impl From<CellRange> for Selection {
    fn from(range: CellRange) -> Self {
        Selection::Range(range)
    }
}

impl From<LabelName> for Selection {
    fn from(label: LabelName) -> Self {
        Selection::Label(label)
    }
}

impl From<CellOrRange> for Selection {
    fn from(value: CellOrRange) -> Self {
        match value {
            CellOrRange::Cell(cell) => Selection::Cell(cell),
            CellOrRange::Range(range) => Selection::Range(range),
        }
    }
}

impl From<LabelTarget> for Selection {
    fn from(target: LabelTarget) -> Self {
        match target {
            LabelTarget::Cell(cell) => Selection::Cell(cell),
            LabelTarget::Range(range) => Selection::Range(range),
            LabelTarget::Label(label) => Selection::Label(label),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Cell(cell) => write!(f, "{cell}"),
            Selection::Column(column) => {
                let letters = CellReference::col_to_letters(*column);
                write!(f, "{letters}:{letters}")
            }
            Selection::Row(row) => write!(f, "{0}:{0}", u64::from(*row) + 1),
            Selection::Range(range) => write!(f, "{range}"),
            Selection::Label(label) => write!(f, "{label}"),
        }
    }
}

/// Accepts `C:C` (column), `3:3` (row), then anything a [`LabelTarget`] accepts.
impl FromStr for Selection {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((left, right)) = s.split_once(':')
            && left.eq_ignore_ascii_case(right)
        {
            if !left.is_empty() && left.bytes().all(|b| b.is_ascii_alphabetic()) {
                let column = CellReference::letters_to_col(&left.to_ascii_uppercase())
                    .filter(|column| *column <= COL_MAX)
                    .ok_or_else(|| StoreError::invalid(format!("invalid column {s:?}")))?;
                return Ok(Selection::Column(column));
            }
            if !left.is_empty() && left.bytes().all(|b| b.is_ascii_digit()) {
                let row = left
                    .parse::<u32>()
                    .ok()
                    .and_then(|row| row.checked_sub(1))
                    .filter(|row| *row <= ROW_MAX)
                    .ok_or_else(|| StoreError::invalid(format!("invalid row {s:?}")))?;
                return Ok(Selection::Row(row));
            }
        }
        s.parse::<LabelTarget>().map(Selection::from)
    }
}

/// The question asked about a selection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ReferenceVerb {
    /// Cells whose formulas read the selection.
    Referrers,
    /// Cells read by formulas inside the selection.
    References,
    /// Labels whose cell lies in the selection or whose range overlaps it.
    Labels,
}

impl ReferenceVerb {
    pub const ALL: [ReferenceVerb; 3] = [
        ReferenceVerb::Referrers,
        ReferenceVerb::References,
        ReferenceVerb::Labels,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ReferenceVerb::Referrers => "referrers",
            ReferenceVerb::References => "references",
            ReferenceVerb::Labels => "labels",
        }
    }
}

impl fmt::Display for ReferenceVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceVerb {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReferenceVerb::ALL
            .into_iter()
            .find(|verb| verb.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| StoreError::invalid(format!("unknown reference verb {s:?}")))
    }
}

/// One page of answers to a query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryResult {
    Cells(Vec<CellReference>),
    Labels(Vec<LabelName>),
}

impl QueryResult {
    pub fn len(&self) -> usize {
        match self {
            QueryResult::Cells(cells) => cells.len(),
            QueryResult::Labels(labels) => labels.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cells(&self) -> Option<&[CellReference]> {
        match self {
            QueryResult::Cells(cells) => Some(cells),
            QueryResult::Labels(_) => None,
        }
    }

    pub fn labels(&self) -> Option<&[LabelName]> {
        match self {
            QueryResult::Labels(labels) => Some(labels),
            QueryResult::Cells(_) => None,
        }
    }
}
