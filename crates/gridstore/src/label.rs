//! Label dictionary and chain-following resolution.
//!
//! Labels are stored flat (`label -> target`); following `label -> label ->
//! ... -> cell/range` happens at read time in [`LabelResolver`].

use std::collections::HashMap;
use std::hash::BuildHasher;

use rustc_hash::FxHashSet;

use gridstore_common::{CellOrRange, LabelName, LabelTarget, StoreError};

use crate::store::{Identified, TreeMapStore};

/// One entry of the label dictionary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelMapping {
    pub label: LabelName,
    pub target: LabelTarget,
}

impl LabelMapping {
    pub fn new(label: LabelName, target: impl Into<LabelTarget>) -> Self {
        Self {
            label,
            target: target.into(),
        }
    }
}

impl Identified for LabelMapping {
    type Id = LabelName;

    fn id(&self) -> LabelName {
        self.label.clone()
    }
}

pub type LabelStore = TreeMapStore<LabelMapping>;

/// Read access to a label dictionary.
pub trait LabelLookup {
    fn lookup(&self, label: &LabelName) -> Option<LabelTarget>;
}

impl LabelLookup for TreeMapStore<LabelMapping> {
    fn lookup(&self, label: &LabelName) -> Option<LabelTarget> {
        self.get(label).map(|mapping| mapping.target.clone())
    }
}

impl<S: BuildHasher> LabelLookup for HashMap<LabelName, LabelTarget, S> {
    fn lookup(&self, label: &LabelName) -> Option<LabelTarget> {
        self.get(label).cloned()
    }
}

impl TreeMapStore<LabelMapping> {
    /// Labels whose own target covers `selection`. Chains are not followed.
    pub fn find_labels_with_reference(&self, selection: &CellOrRange) -> Vec<LabelMapping> {
        let wanted = selection.to_range();
        self.iter()
            .filter(|mapping| {
                mapping
                    .target
                    .cell_or_range()
                    .is_some_and(|target| target.to_range().contains_range(&wanted))
            })
            .cloned()
            .collect()
    }
}

/// Follows label chains over a [`LabelLookup`].
///
/// Resolution is read-only. An undefined label anywhere in a chain yields
/// `Ok(None)`; revisiting a label yields [`StoreError::CycleDetected`] whose
/// path lists every label visited followed by the repeated one.
pub struct LabelResolver<'a, L: ?Sized> {
    labels: &'a L,
}

impl<'a, L: LabelLookup + ?Sized> LabelResolver<'a, L> {
    pub fn new(labels: &'a L) -> Self {
        Self { labels }
    }

    pub fn resolve_label(&self, label: &LabelName) -> Result<Option<CellOrRange>, StoreError> {
        let mut visited: Vec<LabelName> = Vec::new();
        let mut seen: FxHashSet<LabelName> = FxHashSet::default();
        let mut current = label.clone();

        loop {
            if !seen.insert(current.clone()) {
                visited.push(current);
                #[cfg(feature = "tracing")]
                tracing::debug!(start = %label, depth = visited.len(), "label cycle detected");
                return Err(StoreError::CycleDetected { path: visited });
            }
            let next = self.labels.lookup(&current);
            visited.push(current);

            match next {
                None => return Ok(None),
                Some(LabelTarget::Label(next)) => current = next,
                Some(LabelTarget::Cell(cell)) => return Ok(Some(CellOrRange::Cell(cell))),
                Some(LabelTarget::Range(range)) => return Ok(Some(CellOrRange::Range(range))),
            }
        }
    }

    /// Concrete cells and ranges come straight back; labels are resolved.
    pub fn cell_reference_or_range(
        &self,
        target: &LabelTarget,
    ) -> Result<Option<CellOrRange>, StoreError> {
        match target {
            LabelTarget::Cell(cell) => Ok(Some(CellOrRange::Cell(*cell))),
            LabelTarget::Range(range) => Ok(Some(CellOrRange::Range(*range))),
            LabelTarget::Label(label) => self.resolve_label(label),
        }
    }
}
