//! Upstream Listener main loop

use std::sync::Arc;

use contracts::{ItemStream, RelayHandler, StreamError, StreamEvent, StreamItem, StreamSource};
use tracing::{debug, info, instrument, warn};

use crate::clock::{Clock, TokioClock};
use crate::config::{ListenerConfig, ListenerMetrics};
use crate::filter::{evaluate, FilterDecision};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Disconnected,
    Connecting,
    Streaming,
}

/// How one subscription cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Subscription could not be established
    SubscribeFailed(StreamError),
    /// Error read off the open stream
    StreamFailed(StreamError),
    /// Upstream closed the stream
    StreamEnded,
}

impl SessionEnd {
    fn reason(&self) -> &'static str {
        match self {
            Self::SubscribeFailed(_) => "subscribe_failed",
            Self::StreamFailed(_) => "stream_error",
            Self::StreamEnded => "stream_ended",
        }
    }
}

/// Upstream Listener
///
/// Owns the subscription and hands accepted items to `H` one at a time.
/// The next event is not read until `H::relay` has returned.
pub struct UpstreamListener<Src, H, C = TokioClock> {
    source: Src,
    handler: H,
    clock: C,
    config: ListenerConfig,
    state: ListenerState,
    metrics: Arc<ListenerMetrics>,
}

impl<Src, H> UpstreamListener<Src, H, TokioClock>
where
    Src: StreamSource,
    H: RelayHandler,
{
    pub fn new(source: Src, handler: H, config: ListenerConfig) -> Self {
        Self::with_clock(source, handler, TokioClock, config)
    }
}

impl<Src, H, C> UpstreamListener<Src, H, C>
where
    Src: StreamSource,
    H: RelayHandler,
    C: Clock,
{
    pub fn with_clock(source: Src, handler: H, clock: C, config: ListenerConfig) -> Self {
        Self {
            source,
            handler,
            clock,
            config,
            state: ListenerState::Disconnected,
            metrics: Arc::new(ListenerMetrics::new()),
        }
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    pub fn metrics(&self) -> Arc<ListenerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Reconnect loop; only returns when the surrounding task is dropped
    #[instrument(name = "listener_run", skip(self), fields(source = %self.source.name()))]
    pub async fn run(&mut self) {
        info!(backoff = ?self.config.backoff, "listener started");
        loop {
            let end = self.run_session().await;
            debug!(reason = end.reason(), "session cycle complete");
        }
    }

    /// One full cycle: subscribe, stream until failure, tear down, back off
    pub async fn run_session(&mut self) -> SessionEnd {
        self.state = ListenerState::Connecting;
        let end = match self.source.subscribe().await {
            Ok(mut stream) => {
                self.state = ListenerState::Streaming;
                self.metrics.record_session();
                info!(source = %self.source.name(), "subscription established");

                let end = self.consume(&mut stream).await;
                stream.stop();
                end
            }
            Err(e) => SessionEnd::SubscribeFailed(e),
        };
        self.state = ListenerState::Disconnected;

        match &end {
            SessionEnd::SubscribeFailed(e) => warn!(error = %e, "subscribe failed"),
            SessionEnd::StreamFailed(e) => warn!(error = %e, "stream error, tearing down"),
            SessionEnd::StreamEnded => warn!("stream ended, tearing down"),
        }
        self.metrics.record_reconnect();
        observability::record_stream_reconnect(end.reason());

        info!(backoff = ?self.config.backoff, "waiting before re-subscribing");
        self.clock.sleep(self.config.backoff).await;
        end
    }

    async fn consume(&self, stream: &mut Src::Stream) -> SessionEnd {
        while let Some(event) = stream.next_event().await {
            match event {
                StreamEvent::Item(item) => self.handle_item(&item).await,
                StreamEvent::Error(e) => return SessionEnd::StreamFailed(e),
            }
        }
        SessionEnd::StreamEnded
    }

    async fn handle_item(&self, item: &StreamItem) {
        self.metrics.record_received();
        observability::record_item_received(self.source.name());

        match evaluate(item) {
            FilterDecision::Reject(reason) => {
                self.metrics.record_filtered();
                observability::record_item_filtered(reason.as_str());
                debug!(id = ?item.id, reason = reason.as_str(), "item filtered");
            }
            FilterDecision::Accept => {
                let started = self.clock.now();
                let report = self.handler.relay(item).await;
                self.metrics.record_relayed();
                info!(
                    id = ?item.id,
                    destinations = report.destinations,
                    delivered = report.delivered,
                    failed = report.failed,
                    aborted = report.aborted,
                    elapsed = ?(self.clock.now() - started),
                    "item relayed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use contracts::RelayReport;
    use platform::ScriptedStreamSource;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records relayed items; each relay takes `delay` to finish
    #[derive(Default)]
    struct RecordingHandler {
        items: Mutex<Vec<String>>,
        in_flight: Mutex<usize>,
        overlapped: Mutex<bool>,
        delay: Duration,
    }

    impl RelayHandler for RecordingHandler {
        async fn relay(&self, item: &StreamItem) -> RelayReport {
            {
                let mut n = self.in_flight.lock().unwrap();
                if *n > 0 {
                    *self.overlapped.lock().unwrap() = true;
                }
                *n += 1;
            }
            tokio::time::sleep(self.delay).await;
            self.items.lock().unwrap().push(item.text.clone());
            *self.in_flight.lock().unwrap() -= 1;
            RelayReport::default()
        }
    }

    fn item(text: &str) -> StreamEvent {
        StreamEvent::Item(StreamItem::original(text))
    }

    fn listener(
        source: ScriptedStreamSource,
        handler: Arc<RecordingHandler>,
    ) -> UpstreamListener<ScriptedStreamSource, Arc<RecordingHandler>, Arc<ManualClock>> {
        UpstreamListener::with_clock(
            source,
            handler,
            Arc::new(ManualClock::new()),
            ListenerConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_items_relayed_in_order_without_overlap() {
        let source = ScriptedStreamSource::new().then_events([item("1"), item("2"), item("3")]);
        let handler = Arc::new(RecordingHandler {
            delay: Duration::from_millis(5),
            ..Default::default()
        });
        let mut listener = listener(source, Arc::clone(&handler));

        let end = listener.run_session().await;

        assert_eq!(end, SessionEnd::StreamEnded);
        assert_eq!(*handler.items.lock().unwrap(), vec!["1", "2", "3"]);
        assert!(!*handler.overlapped.lock().unwrap());
        assert_eq!(listener.state(), ListenerState::Disconnected);
    }

    #[tokio::test]
    async fn test_filtered_items_never_relayed() {
        let reshare = StreamEvent::Item(StreamItem {
            is_reshare: true,
            ..StreamItem::original("RT")
        });
        let quote = StreamEvent::Item(StreamItem {
            is_quote: true,
            ..StreamItem::original("quote")
        });
        let reply = StreamEvent::Item(StreamItem {
            in_reply_to_user: Some("42".into()),
            ..StreamItem::original("reply")
        });
        let source =
            ScriptedStreamSource::new().then_events([reshare, item("keep"), quote, reply]);
        let handler = Arc::new(RecordingHandler::default());
        let mut listener = listener(source, Arc::clone(&handler));

        listener.run_session().await;

        assert_eq!(*handler.items.lock().unwrap(), vec!["keep"]);
        let snap = listener.metrics().snapshot();
        assert_eq!(snap.items_received, 4);
        assert_eq!(snap.items_filtered, 3);
        assert_eq!(snap.items_relayed, 1);
    }

    #[tokio::test]
    async fn test_stream_error_tears_down_and_backs_off() {
        let source = ScriptedStreamSource::new()
            .then_events([
                item("before"),
                StreamEvent::Error(StreamError::upstream("stall")),
                item("never read"),
            ])
            .then_events([item("after")]);
        let handler = Arc::new(RecordingHandler::default());
        let clock = Arc::new(ManualClock::new());
        let mut listener = UpstreamListener::with_clock(
            source,
            Arc::clone(&handler),
            Arc::clone(&clock),
            ListenerConfig::from_secs(30),
        );

        let first = listener.run_session().await;
        assert_eq!(
            first,
            SessionEnd::StreamFailed(StreamError::upstream("stall"))
        );
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(30)]);

        listener.run_session().await;
        assert_eq!(*handler.items.lock().unwrap(), vec!["before", "after"]);
        assert_eq!(clock.sleeps().len(), 2);
        assert_eq!(listener.source.subscriptions(), 2);
        assert_eq!(listener.source.stops(), 2);
    }

    #[tokio::test]
    async fn test_subscribe_failure_backs_off() {
        let source = ScriptedStreamSource::new()
            .then_fail(StreamError::connect("refused"))
            .then_fail(StreamError::connect("refused"));
        let clock = Arc::new(ManualClock::new());
        let mut listener = UpstreamListener::with_clock(
            source,
            Arc::new(RecordingHandler::default()),
            Arc::clone(&clock),
            ListenerConfig::from_secs(7),
        );

        for _ in 0..2 {
            let end = listener.run_session().await;
            assert!(matches!(end, SessionEnd::SubscribeFailed(_)));
        }
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(7); 2]);
        assert_eq!(listener.metrics().snapshot().sessions, 0);
        assert_eq!(listener.metrics().snapshot().reconnects, 2);
    }

    #[tokio::test]
    async fn test_run_keeps_reconnecting() {
        let source = ScriptedStreamSource::new()
            .then_fail(StreamError::connect("refused"))
            .then_events([item("a")])
            .then_fail(StreamError::connect("refused"))
            .then_events([item("b")]);
        let handler = Arc::new(RecordingHandler::default());
        let mut listener = listener(source, Arc::clone(&handler));

        // the exhausted script leaves the last subscription open forever
        let _ = tokio::time::timeout(Duration::from_millis(200), listener.run()).await;

        assert_eq!(*handler.items.lock().unwrap(), vec!["a", "b"]);
        assert_eq!(listener.state(), ListenerState::Streaming);
        assert_eq!(listener.source.subscriptions(), 5);
    }
}
