//! Stop signal shared by the units of one search

use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Once-only "a match was found" flag plus the cancellation it broadcasts
///
/// `trigger` succeeds for exactly one caller no matter how many race for it.
/// `abort` cancels in-flight units without claiming a winner.
#[derive(Debug, Default)]
pub struct StopSignal {
    fired: AtomicBool,
    token: CancellationToken,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the match. Returns true for the single winning caller.
    pub fn trigger(&self) -> bool {
        let won = self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.token.cancel();
        }
        won
    }

    /// Whether a match has been claimed
    pub fn is_triggered(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Cancel outstanding work (deadline or teardown)
    pub fn abort(&self) {
        self.token.cancel();
    }

    /// Whether units should stop, for any reason
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the search is stopped
    pub fn stopped(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}
