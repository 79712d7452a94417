//! Relay statistics printed at shutdown.

use std::time::Duration;

use dispatcher::DispatchMetricsSnapshot;
use ingestion::ListenerMetricsSnapshot;

/// Statistics from a relay run
#[derive(Debug, Clone, Default)]
pub struct RelayStats {
    /// Store backend in use
    pub backend: &'static str,

    /// Total duration of the run
    pub duration: Duration,

    /// Upstream listener counters
    pub listener: ListenerMetricsSnapshot,

    /// Fan-out counters
    pub dispatch: DispatchMetricsSnapshot,
}

impl RelayStats {
    /// Share of attempted deliveries that failed, as a percentage
    pub fn failure_rate(&self) -> f64 {
        let total = self.dispatch.delivered + self.dispatch.failed;
        if total > 0 {
            (self.dispatch.failed as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Relay Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Store backend: {}", self.backend);
        println!("   ├─ Stream sessions: {}", self.listener.sessions);
        println!("   └─ Reconnects: {}", self.listener.reconnects);

        println!("\n📥 Upstream");
        println!("   ├─ Items received: {}", self.listener.items_received);
        println!("   ├─ Items filtered: {}", self.listener.items_filtered);
        println!("   └─ Items relayed: {}", self.listener.items_relayed);

        println!("\n📤 Fan-out");
        println!("   ├─ Relays: {}", self.dispatch.relays);
        println!("   ├─ Aborted (store unreadable): {}", self.dispatch.aborted);
        println!("   ├─ Delivered: {}", self.dispatch.delivered);
        println!(
            "   ├─ Failed: {} ({:.2}%)",
            self.dispatch.failed,
            self.failure_rate()
        );
        println!("   ├─ Owners notified: {}", self.dispatch.owners_notified);
        println!("   ├─ Notification failures: {}", self.dispatch.notify_failures);
        println!("   └─ Fan-out time (ms): {}", self.dispatch.fanout_ms);

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_rate() {
        let mut stats = RelayStats::default();
        assert_eq!(stats.failure_rate(), 0.0);

        stats.dispatch.delivered = 3;
        stats.dispatch.failed = 1;
        assert!((stats.failure_rate() - 25.0).abs() < 1e-10);
    }
}
