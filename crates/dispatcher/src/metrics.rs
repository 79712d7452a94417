//! Dispatch metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use observability::{RunningStats, StatsSummary};

/// Counters across every relay
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Relays completed (fan-out attempted)
    relays: AtomicU64,
    /// Relays abandoned because the snapshot failed
    aborted: AtomicU64,
    /// Successful deliveries
    delivered: AtomicU64,
    /// Failed deliveries
    failed: AtomicU64,
    /// Owner notices that went through
    owners_notified: AtomicU64,
    /// Owner notices that failed at some stage
    notify_failures: AtomicU64,
    /// Fan-out wall time (ms)
    fanout_ms: Mutex<RunningStats>,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_relay(&self, duration_ms: f64) {
        self.relays.fetch_add(1, Ordering::Relaxed);
        self.fanout_ms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration_ms);
    }

    pub fn record_aborted(&self) {
        self.aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery(&self, success: bool) {
        let counter = if success { &self.delivered } else { &self.failed };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notification(&self, success: bool) {
        let counter = if success {
            &self.owners_notified
        } else {
            &self.notify_failures
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> DispatchMetricsSnapshot {
        DispatchMetricsSnapshot {
            relays: self.relays.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            owners_notified: self.owners_notified.load(Ordering::Relaxed),
            notify_failures: self.notify_failures.load(Ordering::Relaxed),
            fanout_ms: StatsSummary::from(
                &*self.fanout_ms.lock().unwrap_or_else(PoisonError::into_inner),
            ),
        }
    }
}

/// Snapshot of dispatch metrics (for reporting)
#[derive(Debug, Clone, Default)]
pub struct DispatchMetricsSnapshot {
    pub relays: u64,
    pub aborted: u64,
    pub delivered: u64,
    pub failed: u64,
    pub owners_notified: u64,
    pub notify_failures: u64,
    pub fanout_ms: StatsSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let metrics = DispatchMetrics::new();
        metrics.record_relay(4.0);
        metrics.record_relay(6.0);
        metrics.record_delivery(true);
        metrics.record_delivery(false);
        metrics.record_notification(false);
        metrics.record_aborted();

        let snap = metrics.snapshot();
        assert_eq!(snap.relays, 2);
        assert_eq!(snap.delivered, 1);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.owners_notified, 0);
        assert_eq!(snap.notify_failures, 1);
        assert_eq!(snap.aborted, 1);
        assert_eq!(snap.fanout_ms.count, 2);
        assert!((snap.fanout_ms.mean - 5.0).abs() < 1e-9);
    }
}
