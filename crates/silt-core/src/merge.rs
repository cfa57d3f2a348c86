use crate::clock::Timestamp;

/// Semilattice join: combine `other` into `self`.
///
/// Implementations must be commutative, associative, and idempotent, and
/// must not mutate `other`.
pub trait Merge {
    fn merge(&mut self, other: &Self);
}

impl Merge for Timestamp {
    fn merge(&mut self, other: &Self) {
        if *other > *self {
            *self = *other;
        }
    }
}
