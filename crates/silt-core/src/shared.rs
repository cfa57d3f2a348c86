//! Shared handle for replicas with concurrent callers.
//!
//! [`LwwSet`] is deliberately unsynchronized. `add`/`remove`/`merge` each
//! touch both logs, so a concurrent reader must never observe one log
//! updated and the other stale. [`SharedLwwSet`] guards the whole set
//! behind one reader-writer lock: every operation takes the lock exactly
//! once, making each operation atomic from any other caller's view.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::clock::Timestamp;
use crate::id::Identify;
use crate::merge::Merge;
use crate::set::{LwwSet, RemoveError};
use crate::snapshot::Snapshot;

/// A cloneable, thread-safe handle to one replica's set.
///
/// Clones share the same underlying state (e.g. a request handler and a
/// background sync task holding the same replica).
#[derive(Debug)]
pub struct SharedLwwSet<T> {
    inner: Arc<RwLock<LwwSet<T>>>,
}

impl<T> Clone for SharedLwwSet<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SharedLwwSet<T> {
    /// Create a handle around an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::from_set(LwwSet::new())
    }

    /// Wrap an existing set.
    #[must_use]
    pub fn from_set(set: LwwSet<T>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(set)),
        }
    }

    // A panicking writer cannot leave a half-applied operation behind
    // (each log refresh is a single map insert), so a poisoned lock is
    // recovered rather than propagated.
    fn read(&self) -> RwLockReadGuard<'_, LwwSet<T>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LwwSet<T>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of current members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether no element is currently a member.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl<T: Identify> SharedLwwSet<T> {
    /// Record an add observation. See [`LwwSet::add`].
    pub fn add(&self, element: T, timestamp: Timestamp) {
        self.write().add(element, timestamp);
    }

    /// Record a remove observation. See [`LwwSet::remove`].
    ///
    /// # Errors
    ///
    /// [`RemoveError::NotAMember`] when the element is not currently a
    /// member on this replica.
    pub fn remove(&self, element: &T, timestamp: Timestamp) -> Result<(), RemoveError>
    where
        T: Clone,
    {
        self.write().remove(element, timestamp)
    }

    /// Whether the element is currently a member.
    #[must_use]
    pub fn contains(&self, element: &T) -> bool {
        self.read().contains(element)
    }
}

impl<T: Clone> SharedLwwSet<T> {
    /// Every current member, collected under the read lock.
    ///
    /// Owned values: a lazy iterator cannot carry the lock out of the
    /// call without blocking writers indefinitely.
    #[must_use]
    pub fn elements(&self) -> Vec<T> {
        self.read().elements().cloned().collect()
    }

    /// Merge another replica's state into this one, atomically.
    pub fn merge(&self, other: &LwwSet<T>) {
        self.write().merge(other);
    }
}

impl<T: Identify + Clone> SharedLwwSet<T> {
    /// Flatten the current state into the wire form.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<T> {
        self.read().snapshot()
    }

    /// Ingest and merge a received snapshot in one atomic step.
    pub fn merge_snapshot(&self, snapshot: Snapshot<T>) {
        self.merge(&LwwSet::from_snapshot(snapshot));
    }
}

impl<T> Default for SharedLwwSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
