//! Best-effort teardown of several watcher registrations at once.

use thiserror::Error;

use crate::watchers::WatcherHandle;
use gridstore_common::StoreError;

/// The first cleanup failure, with every later failure attached in order.
#[derive(Debug, Error)]
#[error("{primary}")]
pub struct RemoveWatchersError<E> {
    pub primary: E,
    pub suppressed: Vec<E>,
}

impl<E> RemoveWatchersError<E> {
    fn new(primary: E) -> Self {
        Self {
            primary,
            suppressed: Vec::new(),
        }
    }
}

/// Run every cleanup action, skipping `None`s.
///
/// A failing action never stops the remaining ones. The first failure is
/// returned as the primary error and each later failure is pushed onto its
/// `suppressed` list.
pub fn remove_watchers<I, F, E>(removals: I) -> Result<(), RemoveWatchersError<E>>
where
    I: IntoIterator<Item = Option<F>>,
    F: FnOnce() -> Result<(), E>,
{
    let mut failure: Option<RemoveWatchersError<E>> = None;

    for removal in removals.into_iter().flatten() {
        if let Err(err) = removal() {
            match failure.as_mut() {
                Some(first) => first.suppressed.push(err),
                None => failure = Some(RemoveWatchersError::new(err)),
            }
        }
    }

    match failure {
        Some(err) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                suppressed = err.suppressed.len(),
                "watcher teardown finished with failures"
            );
            Err(err)
        }
        None => Ok(()),
    }
}

/// [`remove_watchers`] over handles.
pub fn remove_handles<I>(handles: I) -> Result<(), RemoveWatchersError<StoreError>>
where
    I: IntoIterator<Item = Option<WatcherHandle>>,
{
    remove_watchers(
        handles
            .into_iter()
            .map(|handle| handle.map(|h| move || h.remove())),
    )
}
