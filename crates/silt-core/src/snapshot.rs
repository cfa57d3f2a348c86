//! Replica state snapshots: the serialization contract for transports.
//!
//! A snapshot is exactly the pair of logs, each flattened to a sequence of
//! `(id, element, timestamp)` entries ordered by id bytes so the same state
//! always serializes to the same bytes. The transport layer (out of scope
//! here) moves snapshots between replicas and feeds received ones to
//! [`LwwSet::merge`] via [`LwwSet::from_snapshot`]; duplicate or reordered
//! delivery is harmless because merge is idempotent and commutative.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::clock::Timestamp;
use crate::id::{ElementId, Identify};
use crate::set::{LogEntry, LwwSet, refresh};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One flattened log entry on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry<T> {
    /// Element identity, carried for transports that index or dedup
    /// without knowing `T`. Ingestion recomputes identity from the
    /// element itself; the identity function stays authoritative.
    pub id: ElementId,
    /// The element as last observed.
    pub element: T,
    /// The observation's timestamp.
    pub timestamp: Timestamp,
}

/// A serialized replica state: both logs, ordered by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot<T> {
    /// Flattened add-log.
    pub adds: Vec<SnapshotEntry<T>>,
    /// Flattened remove-log.
    pub removes: Vec<SnapshotEntry<T>>,
}

fn flatten<T: Clone>(
    log: &std::collections::HashMap<ElementId, LogEntry<T>>,
) -> Vec<SnapshotEntry<T>> {
    let mut entries: Vec<SnapshotEntry<T>> = log
        .iter()
        .map(|(id, entry)| SnapshotEntry {
            id: *id,
            element: entry.element.clone(),
            timestamp: entry.timestamp,
        })
        .collect();
    entries.sort_unstable_by(|a, b| a.id.cmp(&b.id));
    entries
}

impl<T: Identify + Clone> LwwSet<T> {
    /// Flatten this replica's state into the wire form.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<T> {
        Snapshot {
            adds: flatten(&self.adds),
            removes: flatten(&self.removes),
        }
    }

    /// Rebuild a set from a received snapshot.
    ///
    /// Total over any input: identities are recomputed from the elements,
    /// and duplicate ids collapse to the per-id timestamp maximum, so a
    /// malformed or adversarial snapshot cannot make ingestion fail;
    /// this sits on the reconciliation path and must never throw.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot<T>) -> Self {
        let mut set = Self::new();
        trace!(
            adds = snapshot.adds.len(),
            removes = snapshot.removes.len(),
            "ingesting snapshot"
        );
        for entry in snapshot.adds {
            let id = entry.element.element_id();
            refresh(&mut set.adds, id, entry.element, entry.timestamp);
        }
        for entry in snapshot.removes {
            let id = entry.element.element_id();
            refresh(&mut set.removes, id, entry.element, entry.timestamp);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ReplicaId;
    use crate::merge::Merge;

    fn ts(wall_us: i64, replica: u64, seq: u64) -> Timestamp {
        Timestamp::new(wall_us, ReplicaId::new(replica), seq)
    }

    fn sample_set() -> LwwSet<String> {
        let mut set = LwwSet::new();
        set.add("cat".to_string(), ts(100, 1, 0));
        set.add("dog".to_string(), ts(110, 1, 1));
        set.remove(&"dog".to_string(), ts(120, 1, 2)).expect("member");
        set
    }

    #[test]
    fn snapshot_entries_are_ordered_by_id() {
        let snap = sample_set().snapshot();
        assert_eq!(snap.adds.len(), 2);
        assert!(snap.adds[0].id < snap.adds[1].id);
    }

    #[test]
    fn snapshot_is_deterministic() {
        let set = sample_set();
        assert_eq!(set.snapshot(), set.snapshot());
    }

    #[test]
    fn round_trip_preserves_state() {
        let set = sample_set();
        let back = LwwSet::from_snapshot(set.snapshot());
        assert_eq!(back, set);
    }

    #[test]
    fn serde_round_trip_through_transport() {
        // What a transport actually does: serialize here, deserialize
        // there, merge into the remote replica.
        let set = sample_set();
        let wire = serde_json::to_string(&set.snapshot()).expect("serialize");
        let received: Snapshot<String> = serde_json::from_str(&wire).expect("deserialize");

        let mut remote = LwwSet::new();
        remote.add("emu".to_string(), ts(90, 2, 0));
        remote.merge(&LwwSet::from_snapshot(received));

        assert!(remote.contains(&"cat".to_string()));
        assert!(!remote.contains(&"dog".to_string()));
        assert!(remote.contains(&"emu".to_string()));
    }

    #[test]
    fn duplicate_ids_collapse_to_newest() {
        let entry = |wall: i64, seq: u64| SnapshotEntry {
            id: "cat".element_id(),
            element: "cat".to_string(),
            timestamp: ts(wall, 1, seq),
        };
        let snap = Snapshot {
            adds: vec![entry(100, 0), entry(300, 1), entry(200, 2)],
            removes: vec![],
        };

        let set = LwwSet::from_snapshot(snap);
        let add = set.add_entry(&"cat".element_id()).expect("present");
        assert_eq!(add.timestamp, ts(300, 1, 1));
    }

    #[test]
    fn carried_id_is_not_trusted() {
        // A corrupt snapshot claims "cat"'s entry under "dog"'s id; the
        // recomputed identity wins and membership stays coherent.
        let snap = Snapshot {
            adds: vec![SnapshotEntry {
                id: "dog".element_id(),
                element: "cat".to_string(),
                timestamp: ts(100, 1, 0),
            }],
            removes: vec![],
        };

        let set = LwwSet::from_snapshot(snap);
        assert!(set.contains(&"cat".to_string()));
        assert!(!set.contains(&"dog".to_string()));
    }

    #[test]
    fn remove_only_snapshot_ingests_cleanly() {
        // A remote tombstone for an element this replica never added:
        // ingestion takes it as-is, and a later add with an older
        // timestamp stays shadowed.
        let snap = Snapshot {
            adds: vec![],
            removes: vec![SnapshotEntry {
                id: "cat".element_id(),
                element: "cat".to_string(),
                timestamp: ts(500, 2, 0),
            }],
        };

        let mut set = LwwSet::from_snapshot(snap);
        assert!(!set.contains(&"cat".to_string()));

        set.add("cat".to_string(), ts(400, 1, 0));
        assert!(!set.contains(&"cat".to_string()));

        set.add("cat".to_string(), ts(600, 1, 1));
        assert!(set.contains(&"cat".to_string()));
    }

    #[test]
    fn merging_same_snapshot_twice_is_idempotent() {
        let snap = sample_set().snapshot();

        let mut replica = LwwSet::new();
        replica.merge(&LwwSet::from_snapshot(snap.clone()));
        let once = replica.clone();
        replica.merge(&LwwSet::from_snapshot(snap));
        assert_eq!(replica, once);
    }
}
