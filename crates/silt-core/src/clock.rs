//! Timestamps and the injected clock collaborator.
//!
//! Wall-clock readings can collide across replicas, so every [`Timestamp`]
//! carries a globally unique secondary key: the issuing replica's id plus a
//! monotonic per-clock sequence number. All timestamp comparisons in this
//! crate use the lexicographic `(wall_us, replica, seq)` order (the derived
//! [`Ord`] below), so every replica resolves ties identically.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ReplicaId
// ---------------------------------------------------------------------------

/// Identifier of an independently-mutating replica.
///
/// Uniqueness across the deployment is the host application's problem;
/// this crate only requires that two distinct replicas never share an id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct ReplicaId(u64);

impl ReplicaId {
    /// Wrap a raw replica number.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw replica number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

/// A totally ordered mutation timestamp.
///
/// Field order matters: the derived `Ord` compares `wall_us` first, then
/// `replica`, then `seq`. `(replica, seq)` is the deterministic secondary
/// tie-break key, globally unique as long as each replica stamps through
/// one clock at a time, so two timestamps are equal only when they came
/// from the very same stamping.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Timestamp {
    /// Wall-clock microseconds since the Unix epoch.
    pub wall_us: i64,
    /// The replica that issued this timestamp.
    pub replica: ReplicaId,
    /// Per-clock monotonic sequence number.
    pub seq: u64,
}

impl Timestamp {
    /// Assemble a timestamp from its parts.
    #[must_use]
    pub const fn new(wall_us: i64, replica: ReplicaId, seq: u64) -> Self {
        Self {
            wall_us,
            replica,
            seq,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us/{}#{}", self.wall_us, self.replica, self.seq)
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of fresh timestamps; one per replica.
///
/// Callers stamp every mutation with `now()` at call time. The sequence
/// number restarts at zero when a clock is recreated (e.g. across process
/// restarts); wall time moving forward keeps later stampings later, which
/// is all the set requires.
pub trait Clock {
    /// Issue a fresh timestamp. Every stamping from one clock instance is
    /// distinct: the sequence number bumps even when wall time does not.
    fn now(&mut self) -> Timestamp;
}

/// Production clock: wall time from [`chrono::Utc`] plus a monotonic
/// sequence number.
///
/// Wall regressions (NTP step-backs) are clamped to the last reading
/// issued, so stampings from one instance strictly increase. Across
/// process restarts the clamp resets; wall time moving forward again is
/// what keeps later stampings later.
#[derive(Debug, Clone)]
pub struct WallClock {
    replica: ReplicaId,
    last_wall_us: i64,
    seq: u64,
}

impl WallClock {
    /// Create a wall clock stamping on behalf of `replica`.
    #[must_use]
    pub const fn new(replica: ReplicaId) -> Self {
        Self {
            replica,
            last_wall_us: i64::MIN,
            seq: 0,
        }
    }
}

impl Clock for WallClock {
    fn now(&mut self) -> Timestamp {
        self.last_wall_us = Utc::now().timestamp_micros().max(self.last_wall_us);
        let ts = Timestamp::new(self.last_wall_us, self.replica, self.seq);
        self.seq += 1;
        ts
    }
}

/// Deterministic clock for tests and simulations.
///
/// Wall time advances only when told to; the sequence number still bumps on
/// every stamping, so repeated `now()` calls at a frozen wall time remain
/// distinct and ordered.
#[derive(Debug, Clone)]
pub struct ManualClock {
    replica: ReplicaId,
    wall_us: i64,
    seq: u64,
}

impl ManualClock {
    /// Create a manual clock for `replica` starting at `wall_us`.
    #[must_use]
    pub const fn new(replica: ReplicaId, wall_us: i64) -> Self {
        Self {
            replica,
            wall_us,
            seq: 0,
        }
    }

    /// Jump the wall time to an absolute reading.
    pub const fn set_wall(&mut self, wall_us: i64) {
        self.wall_us = wall_us;
    }

    /// Advance the wall time by `delta_us`.
    pub const fn advance(&mut self, delta_us: i64) {
        self.wall_us += delta_us;
    }
}

impl Clock for ManualClock {
    fn now(&mut self) -> Timestamp {
        let ts = Timestamp::new(self.wall_us, self.replica, self.seq);
        self.seq += 1;
        ts
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
