//! The generic keyed store contract and its BTreeMap-backed implementation.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;

use gridstore_common::StoreError;

use crate::config::StoreConfig;
use crate::watchers::{WatcherHandle, Watchers};

/// A value that carries its own key.
pub trait Identified {
    type Id: Clone + Ord + fmt::Debug + 'static;

    fn id(&self) -> Self::Id;
}

/// Keyed storage with paginated listing and save/delete notifications.
///
/// `load` returning `None` is normal; only [`Store::load_or_fail`] turns a
/// missing id into [`StoreError::NotFound`]. Deleting an unknown id is a
/// no-op.
pub trait Store<V: Identified> {
    fn load(&self, id: &V::Id) -> Option<V>;

    fn load_or_fail(&self, id: &V::Id) -> Result<V, StoreError> {
        self.load(id)
            .ok_or_else(|| StoreError::not_found(format!("{id:?}")))
    }

    /// Upsert keyed by `value.id()`.
    fn save(&mut self, value: V) -> V;

    fn delete(&mut self, id: &V::Id);

    fn count(&self) -> usize;

    fn ids(&self, offset: usize, count: usize) -> Result<Vec<V::Id>, StoreError>;

    fn values(&self, offset: usize, count: usize) -> Result<Vec<V>, StoreError>;

    /// Values whose ids fall in `[from, to]`. Both bounds must be `Included`.
    fn between(&self, from: Bound<&V::Id>, to: Bound<&V::Id>) -> Result<Vec<V>, StoreError>;

    fn add_save_watcher<W>(&self, watcher: W) -> WatcherHandle
    where
        W: Fn(&V) + 'static;

    fn add_delete_watcher<W>(&self, watcher: W) -> WatcherHandle
    where
        W: Fn(&V::Id) + 'static;
}

/// Validate an `(offset, count)` listing window.
pub(crate) fn check_window(
    offset: usize,
    count: usize,
    max_window: Option<usize>,
) -> Result<(), StoreError> {
    if offset.checked_add(count).is_none() {
        return Err(StoreError::invalid(format!(
            "window offset {offset} + count {count} overflows"
        )));
    }
    if let Some(max) = max_window
        && count > max
    {
        return Err(StoreError::invalid(format!(
            "count {count} exceeds maximum window {max}"
        )));
    }
    Ok(())
}

/// Take one page out of an ordered iterator after validating the window.
pub(crate) fn page<I>(
    iter: I,
    offset: usize,
    count: usize,
    max_window: Option<usize>,
) -> Result<Vec<I::Item>, StoreError>
where
    I: Iterator,
{
    check_window(offset, count, max_window)?;
    Ok(iter.skip(offset).take(count).collect())
}

/// Unwrap a pair of range bounds, rejecting anything but inclusive ones.
pub(crate) fn inclusive_bounds<'a, K>(
    from: Bound<&'a K>,
    to: Bound<&'a K>,
) -> Result<(&'a K, &'a K), StoreError> {
    match (from, to) {
        (Bound::Included(from), Bound::Included(to)) => Ok((from, to)),
        _ => Err(StoreError::invalid("range bounds must both be inclusive")),
    }
}

/// In-memory [`Store`] ordered by id.
pub struct TreeMapStore<V: Identified> {
    entries: BTreeMap<V::Id, V>,
    save_watchers: Watchers<V>,
    delete_watchers: Watchers<V::Id>,
    max_window: Option<usize>,
}

impl<V> Default for TreeMapStore<V>
where
    V: Identified + Clone + 'static,
{
    fn default() -> Self {
        Self::new(&StoreConfig::default())
    }
}

impl<V> TreeMapStore<V>
where
    V: Identified + Clone + 'static,
{
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            entries: BTreeMap::new(),
            save_watchers: Watchers::new(),
            delete_watchers: Watchers::new(),
            max_window: config.max_window,
        }
    }

    /// Borrowing iterator in id order.
    pub fn iter(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    pub(crate) fn get(&self, id: &V::Id) -> Option<&V> {
        self.entries.get(id)
    }
}

impl<V> Store<V> for TreeMapStore<V>
where
    V: Identified + Clone + 'static,
{
    fn load(&self, id: &V::Id) -> Option<V> {
        self.entries.get(id).cloned()
    }

    fn save(&mut self, value: V) -> V {
        #[cfg(feature = "tracing")]
        tracing::trace!(id = ?value.id(), "save");
        self.entries.insert(value.id(), value.clone());
        self.save_watchers.accept(&value);
        value
    }

    fn delete(&mut self, id: &V::Id) {
        if self.entries.remove(id).is_some() {
            #[cfg(feature = "tracing")]
            tracing::trace!(id = ?id, "delete");
            self.delete_watchers.accept(id);
        }
    }

    fn count(&self) -> usize {
        self.entries.len()
    }

    fn ids(&self, offset: usize, count: usize) -> Result<Vec<V::Id>, StoreError> {
        page(self.entries.keys().cloned(), offset, count, self.max_window)
    }

    fn values(&self, offset: usize, count: usize) -> Result<Vec<V>, StoreError> {
        page(self.entries.values().cloned(), offset, count, self.max_window)
    }

    fn between(&self, from: Bound<&V::Id>, to: Bound<&V::Id>) -> Result<Vec<V>, StoreError> {
        let (from, to) = inclusive_bounds(from, to)?;
        if from > to {
            return Ok(Vec::new());
        }
        Ok(self
            .entries
            .range((Bound::Included(from), Bound::Included(to)))
            .map(|(_, v)| v.clone())
            .collect())
    }

    fn add_save_watcher<W>(&self, watcher: W) -> WatcherHandle
    where
        W: Fn(&V) + 'static,
    {
        self.save_watchers.add_watcher(watcher)
    }

    fn add_delete_watcher<W>(&self, watcher: W) -> WatcherHandle
    where
        W: Fn(&V::Id) + 'static,
    {
        self.delete_watchers.add_watcher(watcher)
    }
}

impl<V> fmt::Debug for TreeMapStore<V>
where
    V: Identified + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeMapStore")
            .field("entries", &self.entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Debug, PartialEq)]
    struct Item {
        id: u32,
        name: &'static str,
    }

    impl Identified for Item {
        type Id = u32;

        fn id(&self) -> u32 {
            self.id
        }
    }

    fn item(id: u32, name: &'static str) -> Item {
        Item { id, name }
    }

    fn store_with(ids: &[u32]) -> TreeMapStore<Item> {
        let mut store = TreeMapStore::default();
        for &id in ids {
            store.save(item(id, "x"));
        }
        store
    }

    #[test]
    fn save_is_upsert() {
        let mut store = TreeMapStore::default();
        store.save(item(1, "a"));
        store.save(item(1, "b"));
        assert_eq!(store.count(), 1);
        assert_eq!(store.load(&1), Some(item(1, "b")));
        assert_eq!(store.get(&1).map(|i| i.name), Some("b"));
    }

    #[test]
    fn load_or_fail_reports_not_found() {
        let store = store_with(&[1]);
        assert!(store.load_or_fail(&1).is_ok());
        assert_eq!(
            store.load_or_fail(&2),
            Err(StoreError::NotFound("2".to_string()))
        );
    }

    #[test]
    fn ids_and_values_paginate_in_order() {
        let store = store_with(&[5, 1, 3, 4, 2]);
        assert_eq!(store.ids(0, 10).unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(store.ids(1, 2).unwrap(), vec![2, 3]);
        assert_eq!(store.ids(10, 2).unwrap(), Vec::<u32>::new());
        assert_eq!(store.ids(0, 0).unwrap(), Vec::<u32>::new());
        let values: Vec<u32> = store.values(3, 5).unwrap().iter().map(|i| i.id).collect();
        assert_eq!(values, vec![4, 5]);
    }

    #[test]
    fn window_overflow_and_max_window_are_invalid() {
        let mut store = TreeMapStore::new(&StoreConfig::default().with_max_window(2));
        store.save(item(1, "a"));
        assert!(matches!(
            store.ids(usize::MAX, 1),
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(matches!(store.ids(0, 3), Err(StoreError::InvalidArgument(_))));
        assert!(store.ids(0, 2).is_ok());
    }

    #[test]
    fn between_requires_inclusive_bounds() {
        let store = store_with(&[1, 2, 3, 4]);
        let ids = |v: Vec<Item>| v.iter().map(|i| i.id).collect::<Vec<_>>();
        assert_eq!(
            ids(store.between(Bound::Included(&2), Bound::Included(&3)).unwrap()),
            vec![2, 3]
        );
        assert!(store.between(Bound::Included(&3), Bound::Included(&2)).unwrap().is_empty());
        assert!(store.between(Bound::Excluded(&2), Bound::Included(&3)).is_err());
        assert!(store.between(Bound::Included(&2), Bound::Unbounded).is_err());
    }

    #[test]
    fn watchers_fire_on_effective_changes_only() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut store = TreeMapStore::default();

        let l = Rc::clone(&log);
        let _save = store.add_save_watcher(move |i: &Item| l.borrow_mut().push(format!("save {}", i.id)));
        let l = Rc::clone(&log);
        let delete = store.add_delete_watcher(move |id: &u32| l.borrow_mut().push(format!("delete {id}")));

        store.save(item(1, "a"));
        store.delete(&1);
        store.delete(&1);
        delete.remove().unwrap();
        store.save(item(2, "b"));
        store.delete(&2);

        assert_eq!(*log.borrow(), vec!["save 1", "delete 1", "save 2"]);
    }
}
