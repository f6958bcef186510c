//! In-process reconciliation guard.
//!
//! At most one reconciliation per provider reference runs at a time inside
//! a process. The guard is an optimization only; the unique reference
//! constraint of the store is authoritative across processes.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Tracks references whose reconciliation is in flight.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationGuard {
    in_flight: Arc<DashMap<String, ()>>,
}

impl ReconciliationGuard {
    /// Creates an empty guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `reference`. Returns `None` if it is already claimed.
    ///
    /// The claim is released when the returned permit is dropped.
    #[must_use]
    pub fn try_acquire(&self, reference: &str) -> Option<ReconciliationPermit> {
        match self.in_flight.entry(reference.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(ReconciliationPermit {
                    in_flight: Arc::clone(&self.in_flight),
                    reference: reference.to_string(),
                })
            }
        }
    }

    /// Returns true if `reference` is claimed.
    #[must_use]
    pub fn is_in_flight(&self, reference: &str) -> bool {
        self.in_flight.contains_key(reference)
    }

    /// Number of references currently claimed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    /// Returns true if nothing is claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}

/// Claim on a reference, released on drop.
#[derive(Debug)]
pub struct ReconciliationPermit {
    in_flight: Arc<DashMap<String, ()>>,
    reference: String,
}

impl ReconciliationPermit {
    /// The claimed reference.
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }
}

impl Drop for ReconciliationPermit {
    fn drop(&mut self) {
        self.in_flight.remove(&self.reference);
    }
}
