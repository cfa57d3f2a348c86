//! silt-core: a Last-Write-Wins element set CRDT.
//!
//! Replicas mutate a [`LwwSet`] locally and periodically exchange
//! [`Snapshot`]s; [`Merge`] reconciles any interleaving of exchanges to
//! the same logical set, without coordination. Conflicts resolve on
//! `(timestamp, secondary key)` alone, never on element values, and exact
//! add/remove ties keep the element (add-biased).
//!
//! ```
//! use silt_core::{Clock, LwwSet, ManualClock, Merge, ReplicaId};
//!
//! let mut clock_a = ManualClock::new(ReplicaId::new(1), 100);
//! let mut clock_b = ManualClock::new(ReplicaId::new(2), 50);
//!
//! let mut a = LwwSet::new();
//! a.add("cat".to_string(), clock_a.now());
//!
//! let mut b = LwwSet::new();
//! b.add("dog".to_string(), clock_b.now());
//!
//! a.merge(&b);
//! assert!(a.contains(&"cat".to_string()));
//! assert!(a.contains(&"dog".to_string()));
//! ```
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums per module; `merge` and snapshot
//!   ingestion are total and cannot fail.
//! - **Logging**: `tracing` macros; no subscriber is installed here.
//! - **Thread safety**: [`LwwSet`] is a plain value type; wrap concurrent
//!   replicas in [`SharedLwwSet`].

pub mod clock;
pub mod id;
pub mod merge;
pub mod set;
pub mod shared;
pub mod snapshot;

pub use clock::{Clock, ManualClock, ReplicaId, Timestamp, WallClock};
pub use id::{ElementId, Identify, IdentityError, ParseIdError};
pub use merge::Merge;
pub use set::{LogEntry, LwwSet, RemoveError};
pub use shared::SharedLwwSet;
pub use snapshot::{Snapshot, SnapshotEntry};
