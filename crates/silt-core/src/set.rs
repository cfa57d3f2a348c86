//! Last-Write-Wins element set.
//!
//! An [`LwwSet`] is two logs keyed by [`ElementId`]: an add-log and a
//! remove-log, each holding the latest-observed [`LogEntry`] per id. Logs
//! only grow or refresh to a newer timestamp; they never shrink. Membership
//! is derived, never stored:
//!
//! > an id is a member iff its add-log entry exists and its remove-log
//! > entry (if any) does not carry a strictly greater timestamp.
//!
//! # Conflict Resolution
//!
//! Everywhere two timestamps meet (log refresh, merge, membership) the
//! comparison is the full lexicographic `(wall_us, replica, seq)` order on
//! [`Timestamp`]. Element values are never compared; elements need no
//! ordering at all. On an exact add/remove timestamp tie the add wins, and
//! every replica applies that bias identically.
//!
//! # Merge
//!
//! `merge` takes the per-id maximum of each log independently. Set union of
//! per-key maxima is commutative, associative, and idempotent, so replicas
//! that exchange state in any order, any number of times, converge.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::{debug, instrument};

use crate::clock::Timestamp;
use crate::id::{ElementId, Identify};
use crate::merge::Merge;

// ---------------------------------------------------------------------------
// LogEntry
// ---------------------------------------------------------------------------

/// The latest observation of an element in one of the two logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry<T> {
    /// The element as last observed.
    pub element: T,
    /// When it was observed, with the deterministic secondary key.
    pub timestamp: Timestamp,
}

/// Refresh `log[id]` iff the incoming timestamp wins the full comparator.
///
/// Absent entries lose unconditionally; an equal timestamp is the same
/// stamping and stays put. This single discipline backs local mutation,
/// merge, and snapshot ingestion, so the monotonic-log invariant cannot
/// diverge between those paths.
pub(crate) fn refresh<T>(
    log: &mut HashMap<ElementId, LogEntry<T>>,
    id: ElementId,
    element: T,
    timestamp: Timestamp,
) {
    match log.entry(id) {
        Entry::Occupied(mut slot) => {
            if slot.get().timestamp < timestamp {
                slot.insert(LogEntry { element, timestamp });
            }
        }
        Entry::Vacant(slot) => {
            slot.insert(LogEntry { element, timestamp });
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from [`LwwSet::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RemoveError {
    /// The element is not currently a member on this replica, so there is
    /// nothing to tombstone. A failed remove mutates nothing.
    #[error("element {id} is not a member of this replica's set")]
    NotAMember {
        /// Identity of the element the caller tried to remove.
        id: ElementId,
    },
}

// ---------------------------------------------------------------------------
// LwwSet
// ---------------------------------------------------------------------------

/// A Last-Write-Wins element set replica.
///
/// Plain value type: no interior locking, no threads, no async points. A
/// replica with concurrent callers wraps it in
/// [`SharedLwwSet`](crate::shared::SharedLwwSet) so both logs are always
/// observed atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LwwSet<T> {
    pub(crate) adds: HashMap<ElementId, LogEntry<T>>,
    pub(crate) removes: HashMap<ElementId, LogEntry<T>>,
}

impl<T> LwwSet<T> {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            adds: HashMap::new(),
            removes: HashMap::new(),
        }
    }

    /// Latest add-log observation for an id, if any.
    #[must_use]
    pub fn add_entry(&self, id: &ElementId) -> Option<&LogEntry<T>> {
        self.adds.get(id)
    }

    /// Latest remove-log observation for an id, if any.
    #[must_use]
    pub fn remove_entry(&self, id: &ElementId) -> Option<&LogEntry<T>> {
        self.removes.get(id)
    }

    /// Whether the add-log entry for `id` survives the remove-log.
    ///
    /// The one place the membership rule lives: remove wins only with a
    /// strictly greater timestamp, so exact ties stay add-biased.
    fn survives(&self, id: &ElementId, add: &LogEntry<T>) -> bool {
        self.removes
            .get(id)
            .is_none_or(|removed| removed.timestamp <= add.timestamp)
    }

    /// Whether the id is currently a member.
    #[must_use]
    pub fn member(&self, id: &ElementId) -> bool {
        self.adds
            .get(id)
            .is_some_and(|add| self.survives(id, add))
    }

    /// Every current member, lazily.
    ///
    /// Iterates the add-log and filters by the membership rule. Order is
    /// unspecified but stable while the set is not mutated. O(n) in the
    /// distinct ids ever added; no side effects.
    pub fn elements(&self) -> impl Iterator<Item = &T> {
        self.adds
            .iter()
            .filter(|&(id, add)| self.survives(id, add))
            .map(|(_, add)| &add.element)
    }

    /// Number of current members. O(n): membership is derived, not stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements().count()
    }

    /// Whether no element is currently a member.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements().next().is_none()
    }
}

impl<T: Identify> LwwSet<T> {
    /// Record an add observation. Always succeeds.
    ///
    /// Refreshes the add-log entry iff `timestamp` wins the full comparator
    /// against the existing entry; otherwise this is a no-op.
    pub fn add(&mut self, element: T, timestamp: Timestamp) {
        let id = element.element_id();
        refresh(&mut self.adds, id, element, timestamp);
    }

    /// Record a remove observation (a tombstone).
    ///
    /// Guarded local API: tombstoning an element this replica never saw as
    /// a member is rejected, so no standing tombstone without provenance
    /// can appear locally. The guard does not weaken the merge algebra:
    /// merge only ever takes per-key maxima, so tombstones recorded by
    /// other replicas still merge in regardless.
    ///
    /// # Errors
    ///
    /// [`RemoveError::NotAMember`] when `contains(element)` is false; both
    /// logs are left untouched.
    pub fn remove(&mut self, element: &T, timestamp: Timestamp) -> Result<(), RemoveError>
    where
        T: Clone,
    {
        let id = element.element_id();
        if !self.member(&id) {
            debug!(%id, "remove rejected: not a member");
            return Err(RemoveError::NotAMember { id });
        }
        refresh(&mut self.removes, id, element.clone(), timestamp);
        Ok(())
    }

    /// Whether the element is currently a member.
    #[must_use]
    pub fn contains(&self, element: &T) -> bool {
        self.member(&element.element_id())
    }
}

impl<T> Default for LwwSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Merge (semilattice join)
// ---------------------------------------------------------------------------

/// Per-id maximum over each log independently. Only `(timestamp,
/// secondary key)` pairs are ever compared, never elements, so `T`
/// needs no ordering. Total: no failure path, by construction.
impl<T: Clone> Merge for LwwSet<T> {
    #[instrument(skip(self, other))]
    fn merge(&mut self, other: &Self) {
        for (id, add) in &other.adds {
            refresh(&mut self.adds, *id, add.element.clone(), add.timestamp);
        }
        for (id, removed) in &other.removes {
            refresh(&mut self.removes, *id, removed.element.clone(), removed.timestamp);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
