//! RelayHandler trait - Listener -> Dispatcher hand-off

use std::future::Future;
use std::sync::Arc;

use crate::StreamItem;

/// Receiver of accepted stream items
///
/// The returned future must only resolve once every configured destination
/// has been attempted for `item`; the Listener relies on this to keep items
/// in order.
pub trait RelayHandler: Send + Sync {
    fn relay(&self, item: &StreamItem) -> impl Future<Output = RelayReport> + Send;
}

impl<H: RelayHandler> RelayHandler for Arc<H> {
    fn relay(&self, item: &StreamItem) -> impl Future<Output = RelayReport> + Send {
        (**self).relay(item)
    }
}

/// Outcome of one item's fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    /// Destinations in the snapshot
    pub destinations: usize,

    /// Successful deliveries
    pub delivered: usize,

    /// Failed deliveries
    pub failed: usize,

    /// Owner notifications that reached the owner
    pub owners_notified: usize,

    /// Store snapshot failed; nothing was attempted
    pub aborted: bool,
}

impl RelayReport {
    /// Report for a relay abandoned before any delivery
    pub fn aborted() -> Self {
        Self {
            aborted: true,
            ..Self::default()
        }
    }

    /// Every destination was attempted
    pub fn is_complete(&self) -> bool {
        !self.aborted && self.delivered + self.failed == self.destinations
    }
}
