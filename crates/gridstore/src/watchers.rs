//! Per-instance observer registries.
//!
//! Every store owns its [`Watchers`] as plain fields; there is no process-wide
//! registry. Dispatch is synchronous and runs on the caller's thread inside
//! the mutation that triggered it.
//!
//! `accept` snapshots the registration list before invoking anything, so a
//! watcher may add or remove registrations (including itself) while it runs.
//! A registration removed mid-dispatch still sees the event being dispatched.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use gridstore_common::StoreError;

type Callback<T> = Rc<dyn Fn(&T)>;

struct Registry<T> {
    next_id: u64,
    entries: Vec<(u64, Callback<T>)>,
}

impl<T> Registry<T> {
    fn remove(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        before != self.entries.len()
    }
}

/// Ordered list of callbacks interested in values of type `T`.
pub struct Watchers<T> {
    registry: Rc<RefCell<Registry<T>>>,
}

impl<T: 'static> Default for Watchers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Watchers<T> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register `watcher`. Registering the same callback twice yields two
    /// independent registrations, each with its own handle.
    pub fn add_watcher<W>(&self, watcher: W) -> WatcherHandle
    where
        W: Fn(&T) + 'static,
    {
        let callback: Callback<T> = Rc::new(watcher);
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.entries.push((id, callback));
            id
        };

        let weak: Weak<RefCell<Registry<T>>> = Rc::downgrade(&self.registry);
        WatcherHandle {
            remover: Box::new(move || {
                let registry = weak.upgrade().ok_or(StoreError::WatcherDetached)?;
                registry.borrow_mut().remove(id);
                Ok(())
            }),
        }
    }

    /// Invoke every registered watcher, in registration order, with `value`.
    pub fn accept(&self, value: &T) {
        let snapshot: Vec<Callback<T>> = self
            .registry
            .borrow()
            .entries
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        for callback in snapshot {
            callback(value);
        }
    }

    pub fn len(&self) -> usize {
        self.registry.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> fmt::Debug for Watchers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watchers")
            .field("registered", &self.registry.borrow().entries.len())
            .finish()
    }
}

/// Unregisters exactly one watcher registration when [`remove`](Self::remove)d.
///
/// Dropping a handle without calling `remove` leaves the watcher registered
/// for the lifetime of the owning store.
#[must_use = "dropping the handle leaves the watcher registered"]
pub struct WatcherHandle {
    remover: Box<dyn FnOnce() -> Result<(), StoreError>>,
}

impl WatcherHandle {
    /// Fails with [`StoreError::WatcherDetached`] if the owning store is gone.
    pub fn remove(self) -> Result<(), StoreError> {
        (self.remover)()
    }
}

impl fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WatcherHandle")
    }
}
