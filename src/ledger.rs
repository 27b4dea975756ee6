//! Reference counts of live routes per backend service.
//!
//! A count is the number of switching-policy chains currently routing to a
//! service. Provisioning increments, teardown decrements, and a service is
//! deleted from the appliance only when its count reaches zero.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

/// Service name → live reference count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceLedger {
    counts: HashMap<String, u32>,
}

impl ReferenceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more live route to `service`. Returns the new count.
    pub fn increment(&mut self, service: &str) -> u32 {
        let count = self.counts.entry(service.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Drop one live route to `service`. Returns the remaining count.
    ///
    /// The entry is removed once it reaches zero. An untracked service is
    /// reported as zero: nothing known still routes to it.
    pub fn decrement(&mut self, service: &str) -> u32 {
        let Some(count) = self.counts.get_mut(service) else {
            return 0;
        };
        *count = count.saturating_sub(1);
        let remaining = *count;
        if remaining == 0 {
            self.counts.remove(service);
        }
        remaining
    }

    /// Current count; zero when untracked.
    pub fn count(&self, service: &str) -> u32 {
        self.counts.get(service).copied().unwrap_or(0)
    }

    pub fn contains(&self, service: &str) -> bool {
        self.counts.contains_key(service)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Entries sorted by service name.
    pub fn entries(&self) -> Vec<(String, u32)> {
        let mut entries: Vec<(String, u32)> = self
            .counts
            .iter()
            .map(|(name, count)| (name.clone(), *count))
            .collect();
        entries.sort();
        entries
    }
}

/// A ledger shared between threads.
///
/// Every provision or decommission is a read-modify-write over counts, so
/// the lock must be held for the whole operation, not per step.
#[derive(Debug, Clone, Default)]
pub struct SharedLedger {
    inner: Arc<Mutex<ReferenceLedger>>,
}

impl SharedLedger {
    pub fn new(ledger: ReferenceLedger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    /// Lock the ledger for the duration of one operation.
    pub fn lock(&self) -> MutexGuard<'_, ReferenceLedger> {
        self.inner.lock()
    }

    pub fn snapshot(&self) -> ReferenceLedger {
        self.inner.lock().clone()
    }
}
