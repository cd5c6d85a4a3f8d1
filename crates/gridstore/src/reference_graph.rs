//! Bidirectional owner → cell reference graph.
//!
//! Two adjacency maps are kept in lock-step:
//!
//! ```text
//! outgoing: owner -> {target}      what the owner's formula reads
//! incoming: target -> {owner}      who reads the target
//! ```
//!
//! `target ∈ outgoing[owner] ⟺ owner ∈ incoming[target]` holds after every
//! public call: all edge changes go through the private `link` / `unlink`
//! pair, which touch both maps together. Neither
//! map keeps empty sets, so an owner without edges is absent from `ids()` and
//! `count()`.
//!
//! Owners and targets are stored with their anchors cleared; `$A$1` and `A1`
//! are one node. Self-edges are allowed.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Bound;

use gridstore_common::{CellOrRange, CellReference, LabelName, StoreError};

use crate::config::StoreConfig;
use crate::store::{Identified, Store, inclusive_bounds, page};
use crate::watchers::{WatcherHandle, Watchers};

/// Anything that can own outgoing references: cells, labels.
pub trait ReferenceOwner: Clone + Ord + fmt::Debug + 'static {
    /// The form the owner is stored and reported under.
    fn normalized(&self) -> Self;
}

impl ReferenceOwner for CellReference {
    fn normalized(&self) -> Self {
        self.normalize()
    }
}

impl ReferenceOwner for LabelName {
    fn normalized(&self) -> Self {
        self.clone()
    }
}

/// One directed edge: `owner` reads `target`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferenceEdge<O> {
    pub owner: O,
    pub target: CellReference,
}

/// An owner together with its full outgoing set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct References<O> {
    pub owner: O,
    pub targets: BTreeSet<CellReference>,
}

impl<O: ReferenceOwner> Identified for References<O> {
    type Id = O;

    fn id(&self) -> O {
        self.owner.clone()
    }
}

pub struct ReferenceGraphStore<O> {
    outgoing: BTreeMap<O, BTreeSet<CellReference>>,
    incoming: BTreeMap<CellReference, BTreeSet<O>>,
    add_watchers: Watchers<ReferenceEdge<O>>,
    remove_watchers: Watchers<ReferenceEdge<O>>,
    save_watchers: Watchers<References<O>>,
    delete_watchers: Watchers<O>,
    max_window: Option<usize>,
}

/// Cell → cell dependencies.
pub type CellReferencesStore = ReferenceGraphStore<CellReference>;

/// Label → cell dependencies.
pub type LabelReferencesStore = ReferenceGraphStore<LabelName>;

impl<O: ReferenceOwner> Default for ReferenceGraphStore<O> {
    fn default() -> Self {
        Self::new(&StoreConfig::default())
    }
}

impl<O: ReferenceOwner> ReferenceGraphStore<O> {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            outgoing: BTreeMap::new(),
            incoming: BTreeMap::new(),
            add_watchers: Watchers::new(),
            remove_watchers: Watchers::new(),
            save_watchers: Watchers::new(),
            delete_watchers: Watchers::new(),
            max_window: config.max_window,
        }
    }

    // ---- edge primitives: the only code that touches both maps --------------------------------

    fn link(&mut self, owner: &O, target: CellReference) -> bool {
        let target = target.normalize();
        if !self.outgoing.entry(owner.clone()).or_default().insert(target) {
            return false;
        }
        self.incoming.entry(target).or_default().insert(owner.clone());
        true
    }

    fn unlink(&mut self, owner: &O, target: &CellReference) -> bool {
        let Some(targets) = self.outgoing.get_mut(owner) else {
            return false;
        };
        if !targets.remove(target) {
            return false;
        }
        if targets.is_empty() {
            self.outgoing.remove(owner);
        }
        if let Some(owners) = self.incoming.get_mut(target) {
            owners.remove(owner);
            if owners.is_empty() {
                self.incoming.remove(target);
            }
        }
        true
    }

    fn edge(owner: &O, target: CellReference) -> ReferenceEdge<O> {
        ReferenceEdge {
            owner: owner.clone(),
            target,
        }
    }

    // ---- mutation ------------------------------------------------------------------------------

    /// Replace `owner`'s outgoing set with `targets`.
    ///
    /// Applied as a diff: remove-watchers fire once per dropped target, then
    /// add-watchers once per new target, each in ascending target order.
    /// Targets present before and after fire nothing. Watchers run after
    /// both maps reflect the new set.
    pub fn save_references<I>(&mut self, owner: O, targets: I)
    where
        I: IntoIterator<Item = CellReference>,
    {
        let owner = owner.normalized();
        let new: BTreeSet<CellReference> = targets.into_iter().map(|t| t.normalize()).collect();
        let old = self.outgoing.get(&owner).cloned().unwrap_or_default();

        let removed: Vec<CellReference> = old.difference(&new).copied().collect();
        let added: Vec<CellReference> = new.difference(&old).copied().collect();

        for target in &removed {
            self.unlink(&owner, target);
        }
        for target in &added {
            self.link(&owner, *target);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            owner = ?owner,
            added = added.len(),
            removed = removed.len(),
            "references saved"
        );

        for target in removed {
            self.remove_watchers.accept(&Self::edge(&owner, target));
        }
        for target in added {
            self.add_watchers.accept(&Self::edge(&owner, target));
        }
    }

    /// Add one edge. Existing edges are left alone and fire nothing.
    pub fn add_reference(&mut self, owner: O, target: CellReference) {
        let owner = owner.normalized();
        if self.link(&owner, target) {
            #[cfg(feature = "tracing")]
            tracing::trace!(owner = ?owner, target = %target, "reference added");
            self.add_watchers.accept(&Self::edge(&owner, target.normalize()));
        }
    }

    /// Remove one edge. Removing the last edge removes the owner.
    pub fn remove_reference(&mut self, owner: &O, target: &CellReference) {
        let owner = owner.normalized();
        if self.unlink(&owner, target) {
            #[cfg(feature = "tracing")]
            tracing::trace!(owner = ?owner, target = %target, "reference removed");
            self.remove_watchers.accept(&Self::edge(&owner, target.normalize()));
        }
    }

    // ---- queries -------------------------------------------------------------------------------

    /// Snapshot of what `owner` reads; empty when unknown.
    pub fn load(&self, owner: &O) -> BTreeSet<CellReference> {
        self.outgoing.get(owner).cloned().unwrap_or_default()
    }

    /// Snapshot of who reads `target`; empty when nobody does.
    pub fn load_referred(&self, target: &CellReference) -> BTreeSet<O> {
        self.incoming.get(target).cloned().unwrap_or_default()
    }

    pub fn contains(&self, owner: &O, target: &CellReference) -> bool {
        self.outgoing
            .get(owner)
            .is_some_and(|targets| targets.contains(target))
    }

    /// Owners reading any cell of `selection`, deduplicated and in owner order.
    pub(crate) fn owners_reading(&self, selection: &CellOrRange) -> BTreeSet<O> {
        match selection {
            CellOrRange::Cell(cell) => self.load_referred(cell),
            CellOrRange::Range(range) => {
                let range = range.normalize();
                self.incoming
                    .range(range.begin()..=range.end())
                    .filter(|(target, _)| range.contains(**target))
                    .flat_map(|(_, owners)| owners.iter().cloned())
                    .collect()
            }
        }
    }

    /// One page of [`Self::owners_reading`].
    pub fn find_owners_with_cell_or_range(
        &self,
        selection: &CellOrRange,
        offset: usize,
        count: usize,
    ) -> Result<Vec<O>, StoreError> {
        page(
            self.owners_reading(selection).into_iter(),
            offset,
            count,
            self.max_window,
        )
    }

    // ---- watchers ------------------------------------------------------------------------------

    pub fn add_add_reference_watcher<W>(&self, watcher: W) -> WatcherHandle
    where
        W: Fn(&ReferenceEdge<O>) + 'static,
    {
        self.add_watchers.add_watcher(watcher)
    }

    pub fn add_remove_reference_watcher<W>(&self, watcher: W) -> WatcherHandle
    where
        W: Fn(&ReferenceEdge<O>) + 'static,
    {
        self.remove_watchers.add_watcher(watcher)
    }
}

fn references<O: Clone>((owner, targets): (&O, &BTreeSet<CellReference>)) -> References<O> {
    References {
        owner: owner.clone(),
        targets: targets.clone(),
    }
}

/// The graph seen as a store of outgoing sets keyed by owner.
///
/// `save` goes through [`ReferenceGraphStore::save_references`], so the edge
/// watchers see the diff before the save watchers see the whole set. Saving
/// an empty set removes the owner and still fires the save watchers.
/// [`Store::load`] reports an unknown owner as `None`, unlike the inherent
/// [`ReferenceGraphStore::load`].
impl<O: ReferenceOwner> Store<References<O>> for ReferenceGraphStore<O> {
    fn load(&self, owner: &O) -> Option<References<O>> {
        self.outgoing.get_key_value(owner).map(references)
    }

    fn save(&mut self, value: References<O>) -> References<O> {
        let owner = value.owner.normalized();
        self.save_references(owner.clone(), value.targets);
        let saved = References {
            targets: ReferenceGraphStore::load(self, &owner),
            owner,
        };
        self.save_watchers.accept(&saved);
        saved
    }

    /// Remove `owner` and every edge it owns. Fires the delete watchers only.
    fn delete(&mut self, owner: &O) {
        let Some((owner, targets)) = self
            .outgoing
            .get_key_value(owner)
            .map(|(owner, targets)| (owner.clone(), targets.clone()))
        else {
            return;
        };
        for target in &targets {
            self.unlink(&owner, target);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(owner = ?owner, edges = targets.len(), "owner deleted");
        self.delete_watchers.accept(&owner);
    }

    fn count(&self) -> usize {
        self.outgoing.len()
    }

    fn ids(&self, offset: usize, count: usize) -> Result<Vec<O>, StoreError> {
        page(self.outgoing.keys().cloned(), offset, count, self.max_window)
    }

    fn values(&self, offset: usize, count: usize) -> Result<Vec<References<O>>, StoreError> {
        page(self.outgoing.iter().map(references), offset, count, self.max_window)
    }

    fn between(&self, from: Bound<&O>, to: Bound<&O>) -> Result<Vec<References<O>>, StoreError> {
        let (from, to) = inclusive_bounds(from, to)?;
        if from > to {
            return Ok(Vec::new());
        }
        Ok(self
            .outgoing
            .range((Bound::Included(from), Bound::Included(to)))
            .map(references)
            .collect())
    }

    fn add_save_watcher<W>(&self, watcher: W) -> WatcherHandle
    where
        W: Fn(&References<O>) + 'static,
    {
        self.save_watchers.add_watcher(watcher)
    }

    fn add_delete_watcher<W>(&self, watcher: W) -> WatcherHandle
    where
        W: Fn(&O) + 'static,
    {
        self.delete_watchers.add_watcher(watcher)
    }
}

impl ReferenceGraphStore<CellReference> {
    /// Cells whose formulas read `cell`.
    pub fn find_cells_with_reference(&self, cell: &CellReference) -> BTreeSet<CellReference> {
        self.load_referred(cell)
    }

    /// Cells read by the formula in `cell`.
    pub fn find_references_with_cell(&self, cell: &CellReference) -> BTreeSet<CellReference> {
        self.load(cell)
    }

    /// Cells whose formulas read anything inside `selection`, paginated.
    pub fn find_cells_with_cell_or_range(
        &self,
        selection: &CellOrRange,
        offset: usize,
        count: usize,
    ) -> Result<Vec<CellReference>, StoreError> {
        self.find_owners_with_cell_or_range(selection, offset, count)
    }

    /// Everything read by formulas living inside `selection`, paginated.
    pub fn find_references_with_cell_or_range(
        &self,
        selection: &CellOrRange,
        offset: usize,
        count: usize,
    ) -> Result<Vec<CellReference>, StoreError> {
        page(
            self.references_read_by(selection).into_iter(),
            offset,
            count,
            self.max_window,
        )
    }

    pub(crate) fn references_read_by(&self, selection: &CellOrRange) -> BTreeSet<CellReference> {
        match selection {
            CellOrRange::Cell(cell) => self.load(cell),
            CellOrRange::Range(range) => {
                let range = range.normalize();
                self.outgoing
                    .range(range.begin()..=range.end())
                    .filter(|(owner, _)| range.contains(**owner))
                    .flat_map(|(_, targets)| targets.iter().copied())
                    .collect()
            }
        }
    }
}

impl ReferenceGraphStore<LabelName> {
    /// Labels pointing at anything inside `selection`, paginated.
    pub fn find_labels_with_cell_or_range(
        &self,
        selection: &CellOrRange,
        offset: usize,
        count: usize,
    ) -> Result<Vec<LabelName>, StoreError> {
        self.find_owners_with_cell_or_range(selection, offset, count)
    }
}

impl<O: fmt::Debug> fmt::Debug for ReferenceGraphStore<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceGraphStore")
            .field("outgoing", &self.outgoing)
            .finish()
    }
}
