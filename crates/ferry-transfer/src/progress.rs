//! Per-resource counters and the progress snapshots built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::resources::ResourceKind;

/// Running totals for one resource kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    /// Items the source announced.
    pub total: u64,
    /// Items transferred.
    pub current: u64,
    /// Items that failed.
    pub failed: u64,
    /// Items deliberately not transferred.
    pub skipped: u64,
}

/// Immutable point-in-time view of a kind's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Resource kind.
    pub resource: ResourceKind,
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// See [`Counters::total`].
    pub total: u64,
    /// See [`Counters::current`].
    pub current: u64,
    /// See [`Counters::failed`].
    pub failed: u64,
    /// See [`Counters::skipped`].
    pub skipped: u64,
}

impl Progress {
    /// Snapshot of `counters` for `resource`, taken now.
    #[must_use]
    pub fn snapshot(resource: ResourceKind, counters: &Counters) -> Self {
        Self {
            resource,
            timestamp: Utc::now(),
            total: counters.total,
            current: counters.current,
            failed: counters.failed,
            skipped: counters.skipped,
        }
    }

    /// Items that reached a final state.
    #[must_use]
    pub const fn processed(&self) -> u64 {
        self.current + self.failed + self.skipped
    }
}

/// Counters keyed by resource kind, created on first access.
#[derive(Debug, Clone, Default)]
pub struct CounterRegistry {
    counters: BTreeMap<ResourceKind, Counters>,
}

impl CounterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutable counters for `kind`, seeded to zero on first access.
    pub fn entry(&mut self, kind: ResourceKind) -> &mut Counters {
        self.counters.entry(kind).or_default()
    }

    /// Copy of the counters for `kind` (zero if never touched).
    #[must_use]
    pub fn get(&self, kind: ResourceKind) -> Counters {
        self.counters.get(&kind).copied().unwrap_or_default()
    }

    /// Progress snapshot for `kind`.
    #[must_use]
    pub fn snapshot(&self, kind: ResourceKind) -> Progress {
        Progress::snapshot(kind, &self.get(kind))
    }

    /// Snapshots of every kind touched so far.
    #[must_use]
    pub fn snapshots(&self) -> Vec<Progress> {
        self.counters
            .iter()
            .map(|(kind, counters)| Progress::snapshot(*kind, counters))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_created_lazily_at_zero() {
        let mut registry = CounterRegistry::new();
        assert!(registry.snapshots().is_empty());

        let users = registry.entry(ResourceKind::Users);
        assert_eq!(*users, Counters::default());
        users.total = 3;
        users.current += 1;

        assert_eq!(registry.get(ResourceKind::Users).total, 3);
        assert_eq!(registry.get(ResourceKind::Users).current, 1);
        assert_eq!(registry.snapshots().len(), 1);
    }

    #[test]
    fn test_get_does_not_create_entry() {
        let registry = CounterRegistry::new();
        assert_eq!(registry.get(ResourceKind::Files), Counters::default());
        assert!(registry.snapshots().is_empty());
    }

    #[test]
    fn test_processed_sums_final_states() {
        let counters = Counters {
            total: 4,
            current: 2,
            failed: 1,
            skipped: 1,
        };
        let progress = Progress::snapshot(ResourceKind::Documents, &counters);
        assert_eq!(progress.processed(), 4);
    }
}
