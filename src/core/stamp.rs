//! Timestamps for self-expiring state
//!
//! Timers compare the stamp they were scheduled with against the current
//! one before deleting anything. The sequence number keeps two writes in the
//! same instant distinguishable.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::Instant;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Stamp {
    pub at: Instant,
    seq: u64,
}

impl Stamp {
    pub fn now() -> Self {
        Self {
            at: Instant::now(),
            seq: SEQUENCE.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_stamps_in_same_instant_differ() {
        let a = Stamp::now();
        let b = Stamp::now();
        assert_eq!(a.at, b.at);
        assert_ne!(a, b);
    }
}
