pub mod cell_store;
pub mod config;
pub mod label;
pub mod range_store;
pub mod reference_graph;
pub mod remove_watchers;
pub mod selection;
pub mod sorted_cells;
pub mod store;
pub mod stores;
pub mod watchers;

pub use cell_store::{Cell, CellStore};
pub use config::StoreConfig;
pub use label::{LabelLookup, LabelMapping, LabelResolver, LabelStore};
pub use range_store::{RangeEntry, RangeStore};
pub use reference_graph::{
    CellReferencesStore, LabelReferencesStore, ReferenceEdge, ReferenceGraphStore, ReferenceOwner,
    References,
};
pub use remove_watchers::{RemoveWatchersError, remove_handles, remove_watchers};
pub use selection::{QueryResult, ReferenceVerb, Selection};
pub use sorted_cells::{CellComparator, SortedCellList, TraversalPath};
pub use store::{Identified, Store, TreeMapStore};
pub use stores::{ReferenceListener, SheetStores, WatcherGroup};
pub use watchers::{WatcherHandle, Watchers};

pub use gridstore_common;
pub use gridstore_common::{
    CellOrRange, CellRange, CellReference, LabelName, LabelTarget, ReferenceKind, StoreError,
};
