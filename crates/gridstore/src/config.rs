use crate::sorted_cells::TraversalPath;

/// Configuration shared by the stores in this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Order used by cell stores for storage, listing and `next` lookups.
    pub traversal: TraversalPath,
    /// Upper bound on `count` in paginated listings. `None` means unbounded.
    pub max_window: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            traversal: TraversalPath::LeftRightTopDown,
            max_window: None,
        }
    }
}

impl StoreConfig {
    pub fn with_traversal(mut self, traversal: TraversalPath) -> Self {
        self.traversal = traversal;
        self
    }

    pub fn with_max_window(mut self, max_window: usize) -> Self {
        self.max_window = Some(max_window);
        self
    }
}
