//! Per-client accepted/rejected counters.
//!
//! Additive instrumentation reported after each admission decision; not part
//! of the admission algorithm itself.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

/// Tracks accepted and rejected request counts per client key.
#[derive(Default)]
pub struct DecisionStats {
    clients: DashMap<String, ClientCounters>,
}

#[derive(Default)]
struct ClientCounters {
    accepted: AtomicU64,
    rejected: AtomicU64,
}

/// A point-in-time copy of one client's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientStats {
    pub client: String,
    pub accepted: u64,
    pub rejected: u64,
}

impl DecisionStats {
    /// Create an empty stats sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one decision for `client`.
    pub fn record(&self, client: &str, admitted: bool) {
        let counters = self.clients.entry(client.to_string()).or_default();
        if admitted {
            counters.accepted.fetch_add(1, Ordering::Relaxed);
        } else {
            counters.rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Snapshot all counters, sorted by client key.
    pub fn snapshot(&self) -> Vec<ClientStats> {
        let mut stats: Vec<ClientStats> = self
            .clients
            .iter()
            .map(|entry| ClientStats {
                client: entry.key().clone(),
                accepted: entry.accepted.load(Ordering::Relaxed),
                rejected: entry.rejected.load(Ordering::Relaxed),
            })
            .collect();
        stats.sort_by(|a, b| a.client.cmp(&b.client));
        stats
    }

    /// Clear all counters.
    ///
    /// This is primarily useful for testing.
    pub fn reset(&self) {
        self.clients.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts_outcomes_separately() {
        let stats = DecisionStats::new();

        stats.record("client-a", true);
        stats.record("client-a", true);
        stats.record("client-a", false);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].accepted, 2);
        assert_eq!(snapshot[0].rejected, 1);
    }

    #[test]
    fn test_snapshot_is_sorted_by_client() {
        let stats = DecisionStats::new();

        stats.record("zebra", true);
        stats.record("alpha", false);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot[0].client, "alpha");
        assert_eq!(snapshot[1].client, "zebra");
    }

    #[test]
    fn test_reset_clears_counters() {
        let stats = DecisionStats::new();

        stats.record("client-a", true);
        stats.reset();

        assert!(stats.snapshot().is_empty());
    }
}
