//! Round session counters

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct SessionMetrics {
    start_time: Instant,
    rounds_submitted: Arc<AtomicU64>,
    rounds_resolved: Arc<AtomicU64>,
    rounds_errored: Arc<AtomicU64>,
    events_dropped: Arc<AtomicU64>,
    frames_rejected: Arc<AtomicU64>,
    verification_failures: Arc<AtomicU64>,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub rounds_submitted: u64,
    pub rounds_resolved: u64,
    pub rounds_errored: u64,
    pub events_dropped: u64,
    pub frames_rejected: u64,
    pub verification_failures: u64,
    pub uptime_secs: u64,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            rounds_submitted: Arc::new(AtomicU64::new(0)),
            rounds_resolved: Arc::new(AtomicU64::new(0)),
            rounds_errored: Arc::new(AtomicU64::new(0)),
            events_dropped: Arc::new(AtomicU64::new(0)),
            frames_rejected: Arc::new(AtomicU64::new(0)),
            verification_failures: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_submitted(&self) {
        self.rounds_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resolved(&self) {
        self.rounds_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_errored(&self) {
        self.rounds_errored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_frame(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_verification_failure(&self) {
        self.verification_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rounds_submitted: self.rounds_submitted.load(Ordering::Relaxed),
            rounds_resolved: self.rounds_resolved.load(Ordering::Relaxed),
            rounds_errored: self.rounds_errored.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            verification_failures: self.verification_failures.load(Ordering::Relaxed),
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_counters() {
        let metrics = SessionMetrics::new();
        let handle = metrics.clone();

        metrics.record_submitted();
        handle.record_dropped();
        handle.record_dropped();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.rounds_submitted, 1);
        assert_eq!(snapshot.events_dropped, 2);
        assert_eq!(snapshot.rounds_resolved, 0);
    }
}
