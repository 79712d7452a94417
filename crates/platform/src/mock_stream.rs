//! Scripted stream source
//!
//! Each `subscribe` call consumes the next script entry: either a failed
//! subscription or a stream yielding fixed events and then ending. Once the
//! script is exhausted, subscriptions succeed and stay open without events.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use contracts::{ItemStream, StreamError, StreamEvent, StreamSource};

#[derive(Debug)]
enum Script {
    Events(Vec<StreamEvent>),
    Fail(StreamError),
}

/// Deterministic `StreamSource` for tests
#[derive(Debug, Default)]
pub struct ScriptedStreamSource {
    scripts: Mutex<VecDeque<Script>>,
    subscriptions: AtomicUsize,
    stops: Arc<AtomicUsize>,
}

impl ScriptedStreamSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next subscription yields `events`, then ends
    pub fn then_events(self, events: impl IntoIterator<Item = StreamEvent>) -> Self {
        self.push(Script::Events(events.into_iter().collect()));
        self
    }

    /// Next subscription attempt fails
    pub fn then_fail(self, error: StreamError) -> Self {
        self.push(Script::Fail(error));
        self
    }

    /// Subscription attempts so far, failed ones included
    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    /// Streams torn down via `stop`
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    fn push(&self, script: Script) {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(script);
    }

    fn pop(&self) -> Option<Script> {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }
}

impl StreamSource for ScriptedStreamSource {
    type Stream = ScriptedStream;

    fn name(&self) -> &str {
        "scripted"
    }

    async fn subscribe(&self) -> Result<ScriptedStream, StreamError> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        let stops = Arc::clone(&self.stops);
        match self.pop() {
            Some(Script::Fail(error)) => Err(error),
            Some(Script::Events(events)) => Ok(ScriptedStream {
                events: events.into(),
                hold_open: false,
                stopped: false,
                stops,
            }),
            None => Ok(ScriptedStream {
                events: VecDeque::new(),
                hold_open: true,
                stopped: false,
                stops,
            }),
        }
    }
}

/// Subscription handed out by `ScriptedStreamSource`
#[derive(Debug)]
pub struct ScriptedStream {
    events: VecDeque<StreamEvent>,
    hold_open: bool,
    stopped: bool,
    stops: Arc<AtomicUsize>,
}

impl ItemStream for ScriptedStream {
    async fn next_event(&mut self) -> Option<StreamEvent> {
        if self.stopped {
            return None;
        }
        if let Some(event) = self.events.pop_front() {
            return Some(event);
        }
        if self.hold_open {
            std::future::pending::<()>().await;
        }
        None
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }
}
