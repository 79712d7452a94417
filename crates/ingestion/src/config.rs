//! Listener configuration and metrics

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Listener configuration
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Pause between a failed session and the next subscribe
    pub backoff: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(30),
        }
    }
}

impl ListenerConfig {
    pub fn new(backoff: Duration) -> Self {
        Self { backoff }
    }

    pub fn from_secs(backoff_secs: u64) -> Self {
        Self::new(Duration::from_secs(backoff_secs))
    }
}

/// Listener metrics
#[derive(Debug, Default)]
pub struct ListenerMetrics {
    /// Items read off the stream
    pub items_received: AtomicU64,

    /// Items rejected by the acceptance filter
    pub items_filtered: AtomicU64,

    /// Items handed to the dispatcher
    pub items_relayed: AtomicU64,

    /// Subscriptions established
    pub sessions: AtomicU64,

    /// Subscribe failures, stream errors and stream ends
    pub reconnects: AtomicU64,
}

impl ListenerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.items_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_filtered(&self) {
        self.items_filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_relayed(&self) {
        self.items_relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session(&self) {
        self.sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> ListenerMetricsSnapshot {
        ListenerMetricsSnapshot {
            items_received: self.items_received.load(Ordering::Relaxed),
            items_filtered: self.items_filtered.load(Ordering::Relaxed),
            items_relayed: self.items_relayed.load(Ordering::Relaxed),
            sessions: self.sessions.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerMetricsSnapshot {
    pub items_received: u64,
    pub items_filtered: u64,
    pub items_relayed: u64,
    pub sessions: u64,
    pub reconnects: u64,
}
