//! All per-sheet stores behind one owner.
//!
//! [`SheetStores`] keeps the label dictionary, the label graph and the
//! label-range index consistent with each other, answers
//! [`Selection`] × [`ReferenceVerb`] queries, and hands out grouped watcher
//! registrations that tear down together.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use gridstore_common::{CellOrRange, CellReference, LabelName, LabelTarget, StoreError};

use crate::cell_store::{Cell, CellStore};
use crate::config::StoreConfig;
use crate::label::{LabelMapping, LabelResolver, LabelStore};
use crate::range_store::RangeStore;
use crate::reference_graph::{CellReferencesStore, LabelReferencesStore, ReferenceEdge};
use crate::remove_watchers::{RemoveWatchersError, remove_handles};
use crate::selection::{QueryResult, ReferenceVerb, Selection};
use crate::store::{Store, check_window, page};
use crate::watchers::WatcherHandle;

/// Callbacks for graph changes on either reference graph. Every method
/// defaults to doing nothing.
pub trait ReferenceListener {
    fn cell_reference_added(&self, _edge: &ReferenceEdge<CellReference>) {}
    fn cell_reference_removed(&self, _edge: &ReferenceEdge<CellReference>) {}
    fn cell_deleted(&self, _owner: &CellReference) {}
    fn label_reference_added(&self, _edge: &ReferenceEdge<LabelName>) {}
    fn label_reference_removed(&self, _edge: &ReferenceEdge<LabelName>) {}
    fn label_deleted(&self, _label: &LabelName) {}
}

/// Registrations made by one [`SheetStores::watch`] call.
#[must_use = "dropping the group leaves its watchers registered"]
#[derive(Debug)]
pub struct WatcherGroup {
    handles: Vec<WatcherHandle>,
}

impl WatcherGroup {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Unregister everything, continuing past failures.
    pub fn remove(self) -> Result<(), RemoveWatchersError<StoreError>> {
        remove_handles(self.handles.into_iter().map(Some))
    }
}

pub struct SheetStores<V> {
    cells: CellStore<V>,
    labels: LabelStore,
    cell_references: CellReferencesStore,
    label_references: LabelReferencesStore,
    label_ranges: RangeStore<LabelName>,
    max_window: Option<usize>,
}

impl<V: Clone + 'static> Default for SheetStores<V> {
    fn default() -> Self {
        Self::new(&StoreConfig::default())
    }
}

impl<V: Clone + 'static> SheetStores<V> {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            cells: CellStore::new(config),
            labels: LabelStore::new(config),
            cell_references: CellReferencesStore::new(config),
            label_references: LabelReferencesStore::new(config),
            label_ranges: RangeStore::new(config),
            max_window: config.max_window,
        }
    }

    /// Read-only like every accessor here: writes go through the `save_*` and
    /// `delete_*` methods so cells, graphs and label indexes stay in step.
    pub fn cells(&self) -> &CellStore<V> {
        &self.cells
    }

    pub fn labels(&self) -> &LabelStore {
        &self.labels
    }

    pub fn cell_references(&self) -> &CellReferencesStore {
        &self.cell_references
    }

    pub fn label_references(&self) -> &LabelReferencesStore {
        &self.label_references
    }

    pub fn label_ranges(&self) -> &RangeStore<LabelName> {
        &self.label_ranges
    }

    /// Save a cell together with the full set of cells its formula reads.
    pub fn save_cell<I>(&mut self, cell: Cell<V>, references: I) -> Cell<V>
    where
        I: IntoIterator<Item = CellReference>,
    {
        self.cell_references.save_references(cell.reference, references);
        self.cells.save(cell)
    }

    /// Drop a cell and its outgoing references.
    pub fn delete_cell(&mut self, reference: &CellReference) {
        self.cell_references.delete(reference);
        self.cells.delete(reference);
    }

    /// Upsert a label. A cell target becomes a label-graph edge; a range target
    /// goes into the label-range index. A label target is kept only in the
    /// dictionary.
    pub fn save_label(&mut self, mapping: LabelMapping) -> LabelMapping {
        let label = mapping.label.clone();
        let cell_targets: Vec<CellReference> = match &mapping.target {
            LabelTarget::Cell(cell) => vec![*cell],
            LabelTarget::Range(_) | LabelTarget::Label(_) => Vec::new(),
        };
        self.label_references
            .save_references(label.clone(), cell_targets);

        let wanted = match &mapping.target {
            LabelTarget::Range(range) => Some(range.normalize()),
            LabelTarget::Cell(_) | LabelTarget::Label(_) => None,
        };
        for range in self.label_ranges.find_cell_ranges_with_value(&label) {
            if Some(range) != wanted {
                self.label_ranges.remove_value(&range, &label);
            }
        }
        if let Some(range) = wanted {
            self.label_ranges.add_value(range, label.clone());
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(label = %label, points_to = %mapping.target, "label saved");
        self.labels.save(mapping)
    }

    pub fn delete_label(&mut self, label: &LabelName) {
        self.label_references.delete(label);
        for range in self.label_ranges.find_cell_ranges_with_value(label) {
            self.label_ranges.remove_value(&range, label);
        }
        self.labels.delete(label);
    }

    /// The cells a selection stands for. Labels are followed to their final
    /// target; an undefined label resolves to `None`.
    pub fn resolve(&self, selection: &Selection) -> Result<Option<CellOrRange>, StoreError> {
        match selection {
            Selection::Label(label) => LabelResolver::new(&self.labels).resolve_label(label),
            Selection::Cell(_) | Selection::Column(_) | Selection::Row(_) | Selection::Range(_) => {
                selection.cell_or_range()
            }
        }
    }

    /// One page of answers to `verb` asked about `selection`.
    ///
    /// A label selection that resolves to nothing yields an empty page; a
    /// label cycle is an error.
    pub fn query(
        &self,
        selection: &Selection,
        verb: ReferenceVerb,
        offset: usize,
        count: usize,
    ) -> Result<QueryResult, StoreError> {
        check_window(offset, count, self.max_window)?;
        let target = self.resolve(selection)?;

        #[cfg(feature = "tracing")]
        tracing::trace!(selection = %selection, verb = %verb, resolved = target.is_some(), "query");

        let Some(target) = target else {
            return Ok(match verb {
                ReferenceVerb::Labels => QueryResult::Labels(Vec::new()),
                ReferenceVerb::Referrers | ReferenceVerb::References => {
                    QueryResult::Cells(Vec::new())
                }
            });
        };

        Ok(match verb {
            ReferenceVerb::Referrers => QueryResult::Cells(
                self.cell_references
                    .find_cells_with_cell_or_range(&target, offset, count)?,
            ),
            ReferenceVerb::References => QueryResult::Cells(
                self.cell_references
                    .find_references_with_cell_or_range(&target, offset, count)?,
            ),
            ReferenceVerb::Labels => QueryResult::Labels(page(
                self.labels_overlapping(&target).into_iter(),
                offset,
                count,
                self.max_window,
            )?),
        })
    }

    /// Labels whose cell lies in `target` or whose range overlaps it.
    ///
    /// Overlap, not containment: a label on `A1:A2` is returned for `A2:C2`.
    /// `LabelStore::find_labels_with_reference` asks the narrower question of
    /// which labels cover the whole selection.
    fn labels_overlapping(&self, target: &CellOrRange) -> BTreeSet<LabelName> {
        let mut labels = self.label_references.owners_reading(target);
        match target {
            CellOrRange::Cell(cell) => labels.extend(self.label_ranges.find_values_with_cell(*cell)),
            CellOrRange::Range(range) => {
                labels.extend(self.label_ranges.find_values_intersecting(range))
            }
        }
        labels
    }

    /// Route both reference graphs' events to `listener`.
    pub fn watch<L>(&self, listener: Rc<L>) -> WatcherGroup
    where
        L: ReferenceListener + 'static,
    {
        let mut handles = Vec::with_capacity(6);

        let l = Rc::clone(&listener);
        handles.push(
            self.cell_references
                .add_add_reference_watcher(move |edge| l.cell_reference_added(edge)),
        );
        let l = Rc::clone(&listener);
        handles.push(
            self.cell_references
                .add_remove_reference_watcher(move |edge| l.cell_reference_removed(edge)),
        );
        let l = Rc::clone(&listener);
        handles.push(
            self.cell_references
                .add_delete_watcher(move |owner| l.cell_deleted(owner)),
        );
        let l = Rc::clone(&listener);
        handles.push(
            self.label_references
                .add_add_reference_watcher(move |edge| l.label_reference_added(edge)),
        );
        let l = Rc::clone(&listener);
        handles.push(
            self.label_references
                .add_remove_reference_watcher(move |edge| l.label_reference_removed(edge)),
        );
        let l = listener;
        handles.push(
            self.label_references
                .add_delete_watcher(move |label| l.label_deleted(label)),
        );

        WatcherGroup { handles }
    }
}

impl<V: fmt::Debug> fmt::Debug for SheetStores<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetStores")
            .field("cells", &self.cells)
            .field("labels", &self.labels)
            .field("cell_references", &self.cell_references)
            .field("label_references", &self.label_references)
            .field("label_ranges", &self.label_ranges)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridstore_common::CellRange;
    use std::cell::RefCell;

    fn cell(s: &str) -> CellReference {
        s.parse().unwrap()
    }

    fn label(s: &str) -> LabelName {
        LabelName::new(s).unwrap()
    }

    fn sel(s: &str) -> Selection {
        s.parse().unwrap()
    }

    fn sheet() -> SheetStores<f64> {
        let mut stores = SheetStores::default();
        stores.save_cell(Cell::new(cell("A1"), 1.0), []);
        stores.save_cell(Cell::new(cell("A2"), 2.0), []);
        stores.save_cell(Cell::new(cell("B1"), 3.0), [cell("A1"), cell("A2")]);
        stores.save_cell(Cell::new(cell("C1"), 4.0), [cell("B1")]);
        stores.save_label(LabelMapping::new(label("Inputs"), "A1:A2".parse::<CellRange>().unwrap()));
        stores.save_label(LabelMapping::new(label("Total"), cell("C1")));
        stores.save_label(LabelMapping::new(label("Result"), label("Total")));
        stores
    }

    #[test]
    fn referrers_and_references() {
        let stores = sheet();
        assert_eq!(
            stores.query(&sel("A1"), ReferenceVerb::Referrers, 0, 10).unwrap(),
            QueryResult::Cells(vec![cell("B1")])
        );
        assert_eq!(
            stores.query(&sel("B1"), ReferenceVerb::References, 0, 10).unwrap(),
            QueryResult::Cells(vec![cell("A1"), cell("A2")])
        );
        assert_eq!(
            stores.query(&sel("A:A"), ReferenceVerb::Referrers, 0, 10).unwrap(),
            QueryResult::Cells(vec![cell("B1")])
        );
        assert_eq!(
            stores.query(&sel("1:1"), ReferenceVerb::References, 0, 10).unwrap(),
            QueryResult::Cells(vec![cell("A1"), cell("B1"), cell("A2")])
        );
    }

    #[test]
    fn labels_are_resolved_before_dispatch() {
        let stores = sheet();
        assert_eq!(
            stores.query(&sel("Result"), ReferenceVerb::References, 0, 10).unwrap(),
            QueryResult::Cells(vec![cell("B1")])
        );
        assert_eq!(
            stores.query(&sel("Inputs"), ReferenceVerb::Referrers, 0, 10).unwrap(),
            QueryResult::Cells(vec![cell("B1")])
        );
        assert_eq!(
            stores.query(&sel("Missing"), ReferenceVerb::Labels, 0, 10).unwrap(),
            QueryResult::Labels(Vec::new())
        );
    }

    #[test]
    fn labels_verb_covers_cell_and_range_labels() {
        let stores = sheet();
        assert_eq!(
            stores.query(&sel("A2"), ReferenceVerb::Labels, 0, 10).unwrap(),
            QueryResult::Labels(vec![label("Inputs")])
        );
        assert_eq!(
            stores.query(&sel("A1:C1"), ReferenceVerb::Labels, 0, 10).unwrap(),
            QueryResult::Labels(vec![label("Inputs"), label("Total")])
        );
        assert_eq!(
            stores.query(&sel("A1:C1"), ReferenceVerb::Labels, 1, 10).unwrap(),
            QueryResult::Labels(vec![label("Total")])
        );
    }

    #[test]
    fn labels_verb_is_overlap_not_containment() {
        let stores = sheet();
        let row = CellOrRange::Range("A1:C1".parse().unwrap());
        let covering: Vec<LabelName> = stores
            .labels()
            .find_labels_with_reference(&row)
            .into_iter()
            .map(|mapping| mapping.label)
            .collect();
        assert!(covering.is_empty());

        let QueryResult::Labels(overlapping) =
            stores.query(&sel("A1:C1"), ReferenceVerb::Labels, 0, 10).unwrap()
        else {
            panic!("labels verb returns labels");
        };
        assert!(overlapping.contains(&label("Inputs")));

        let inside = CellOrRange::Cell(cell("A2"));
        let covering: Vec<LabelName> = stores
            .labels()
            .find_labels_with_reference(&inside)
            .into_iter()
            .map(|mapping| mapping.label)
            .collect();
        assert_eq!(covering, vec![label("Inputs")]);
    }

    #[test]
    fn cyclic_label_query_fails() {
        let mut stores = sheet();
        stores.save_label(LabelMapping::new(label("Loop"), label("Loop")));
        let err = stores
            .query(&sel("Loop"), ReferenceVerb::Referrers, 0, 10)
            .unwrap_err();
        assert!(matches!(err, StoreError::CycleDetected { .. }));
    }

    #[test]
    fn window_is_checked_even_without_a_target() {
        let stores: SheetStores<f64> = SheetStores::new(&StoreConfig::default().with_max_window(5));
        assert!(stores.query(&sel("Missing"), ReferenceVerb::Referrers, 0, 6).is_err());
    }

    #[test]
    fn relabeling_keeps_indexes_in_step() {
        let mut stores = sheet();
        stores.save_label(LabelMapping::new(label("Total"), "D1:D4".parse::<CellRange>().unwrap()));
        assert!(stores.label_references().load(&label("Total")).is_empty());
        assert_eq!(
            stores.label_ranges().find_cell_ranges_with_value(&label("Total")),
            vec!["D1:D4".parse().unwrap()]
        );

        stores.save_label(LabelMapping::new(label("Total"), cell("E1")));
        assert!(stores.label_ranges().find_cell_ranges_with_value(&label("Total")).is_empty());
        assert_eq!(
            stores.label_references().load_referred(&cell("E1")).into_iter().collect::<Vec<_>>(),
            vec![label("Total")]
        );

        stores.delete_label(&label("total"));
        assert_eq!(stores.label_references().count(), 0);
        assert!(stores.labels().load(&label("Total")).is_none());
    }

    #[test]
    fn delete_cell_drops_its_edges() {
        let mut stores = sheet();
        stores.delete_cell(&cell("B1"));
        assert!(stores.cells().load(&cell("B1")).is_none());
        assert!(stores.cell_references().load_referred(&cell("A1")).is_empty());
        assert_eq!(stores.cell_references().count(), 1);
    }

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<String>>,
    }

    impl ReferenceListener for Recorder {
        fn cell_reference_added(&self, edge: &ReferenceEdge<CellReference>) {
            self.events.borrow_mut().push(format!("+{}>{}", edge.owner, edge.target));
        }

        fn cell_deleted(&self, owner: &CellReference) {
            self.events.borrow_mut().push(format!("x{owner}"));
        }

        fn label_reference_added(&self, edge: &ReferenceEdge<LabelName>) {
            self.events.borrow_mut().push(format!("+{}>{}", edge.owner, edge.target));
        }
    }

    #[test]
    fn watch_groups_registrations() {
        let mut stores: SheetStores<f64> = SheetStores::default();
        let recorder = Rc::new(Recorder::default());
        let group = stores.watch(Rc::clone(&recorder));
        assert_eq!(group.len(), 6);

        stores.save_cell(Cell::new(cell("B1"), 0.0), [cell("A1")]);
        stores.save_label(LabelMapping::new(label("Out"), cell("B1")));
        stores.delete_cell(&cell("B1"));
        assert_eq!(*recorder.events.borrow(), vec!["+B1>A1", "+Out>B1", "xB1"]);

        group.remove().unwrap();
        stores.save_cell(Cell::new(cell("B2"), 0.0), [cell("A1")]);
        assert_eq!(recorder.events.borrow().len(), 3);
    }

    #[test]
    fn group_removal_after_drop_aggregates() {
        let stores: SheetStores<f64> = SheetStores::default();
        let group = stores.watch(Rc::new(Recorder::default()));
        drop(stores);
        let err = group.remove().unwrap_err();
        assert_eq!(err.primary, StoreError::WatcherDetached);
        assert_eq!(err.suppressed.len(), 5);
    }
}
