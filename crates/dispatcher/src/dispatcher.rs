//! FanoutDispatcher - concurrent delivery of one item to every destination

use std::sync::Arc;
use std::time::Instant;

use contracts::{
    destinations_of, split_message, ChatSession, Destination, DestinationStore, PlatformError,
    RelayHandler, RelayReport, StreamItem, MAX_MESSAGE_CHARS,
};
use futures::future::join_all;
use tracing::{error, info, instrument, warn};

use crate::error::DeliveryError;
use crate::metrics::DispatchMetrics;
use crate::notify::notify_owner;

/// Result of one destination's attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Delivered,
    Failed { owner_notified: bool },
}

/// Posts accepted items to every configured channel
///
/// Each relay takes a fresh store snapshot, so destinations changed by admin
/// commands apply from the next item on.
pub struct FanoutDispatcher<S, C> {
    store: Arc<S>,
    session: Arc<C>,
    metrics: Arc<DispatchMetrics>,
}

impl<S, C> FanoutDispatcher<S, C>
where
    S: DestinationStore + Sync,
    C: ChatSession + Sync,
{
    pub fn new(store: Arc<S>, session: Arc<C>) -> Self {
        Self {
            store,
            session,
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Deliver `item` to every destination and wait for all attempts
    ///
    /// Failed deliveries notify the guild owner before this returns. A store
    /// snapshot failure abandons the item.
    #[instrument(name = "dispatcher_relay", skip(self, item), fields(id = ?item.id))]
    pub async fn relay(&self, item: &StreamItem) -> RelayReport {
        let started = Instant::now();

        let snapshot = match self.store.list_destinations().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "destination snapshot failed, item dropped");
                self.metrics.record_aborted();
                observability::record_relay_aborted();
                return RelayReport::aborted();
            }
        };

        let destinations = destinations_of(&snapshot);
        let text = item.display_text();
        let outcomes = join_all(destinations.iter().map(|d| self.deliver(d, text))).await;

        let mut report = RelayReport {
            destinations: destinations.len(),
            ..RelayReport::default()
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Delivered => report.delivered += 1,
                Outcome::Failed { owner_notified } => {
                    report.failed += 1;
                    if owner_notified {
                        report.owners_notified += 1;
                    }
                }
            }
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.metrics.record_relay(elapsed_ms);
        observability::record_item_relayed(report.destinations, elapsed_ms);
        info!(
            destinations = report.destinations,
            delivered = report.delivered,
            failed = report.failed,
            elapsed_ms,
            "fan-out complete"
        );
        report
    }

    async fn deliver(&self, destination: &Destination, text: &str) -> Outcome {
        let result = self.send_pieces(&destination.channel_id, text).await;
        self.metrics.record_delivery(result.is_ok());
        observability::record_delivery(result.is_ok());

        let Err(source) = result else {
            return Outcome::Delivered;
        };

        let failure = DeliveryError::new(&destination.guild_id, &destination.channel_id, source);
        warn!(
            guild = %destination.guild_id,
            channel = %destination.channel_id,
            error = %failure.source,
            "delivery failed, notifying owner"
        );

        let owner_notified = match notify_owner(self.session.as_ref(), &failure).await {
            Ok(()) => {
                observability::record_owner_notification("delivered");
                true
            }
            Err(e) => {
                warn!(guild = %destination.guild_id, stage = e.stage(), error = %e, "owner notification failed");
                observability::record_owner_notification(e.stage());
                false
            }
        };
        self.metrics.record_notification(owner_notified);
        Outcome::Failed { owner_notified }
    }

    /// Send `text` in order as messages within the platform length limit;
    /// stops at the first failed piece
    async fn send_pieces(&self, channel_id: &str, text: &str) -> Result<(), PlatformError> {
        for piece in split_message(text, MAX_MESSAGE_CHARS) {
            self.session.send_message(channel_id, piece).await?;
        }
        Ok(())
    }
}

impl<S, C> RelayHandler for FanoutDispatcher<S, C>
where
    S: DestinationStore + Sync,
    C: ChatSession + Sync,
{
    async fn relay(&self, item: &StreamItem) -> RelayReport {
        FanoutDispatcher::relay(self, item).await
    }
}
