//! Search counters for observability

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::EndpointOutcome;

/// Counters for one dispatcher, shared by every worker using it
#[derive(Debug, Default)]
pub struct SearchMetrics {
    /// Searches started
    searches: AtomicU64,
    /// Searches that produced an envelope
    matches: AtomicU64,
    /// Searches that hit the deadline without a match
    timeouts: AtomicU64,
    /// Late matches dropped because another endpoint won
    discarded: AtomicU64,
    /// Endpoint requests that failed (transport, status, decode)
    endpoint_failures: AtomicU64,
}

impl SearchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_searches(&self) {
        self.searches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_matches(&self) {
        self.matches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_timeouts(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold one endpoint outcome into the counters
    pub fn record_outcome(&self, outcome: &EndpointOutcome) {
        match outcome {
            EndpointOutcome::Discarded => {
                self.discarded.fetch_add(1, Ordering::Relaxed);
            }
            EndpointOutcome::Failed(e) if !matches!(e.kind(), "cancelled" | "timeout") => {
                self.endpoint_failures.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            searches: self.searches.load(Ordering::Relaxed),
            matches: self.matches.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            endpoint_failures: self.endpoint_failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of search counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub searches: u64,
    pub matches: u64,
    pub timeouts: u64,
    pub discarded: u64,
    pub endpoint_failures: u64,
}
