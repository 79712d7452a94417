//! # Ingestion
//!
//! Upstream Listener: keeps a filtered subscription open, reconnecting after
//! every failure, and hands accepted items to a `RelayHandler`.
//!
//! ```ignore
//! use ingestion::{ListenerConfig, UpstreamListener};
//!
//! let mut listener = UpstreamListener::new(source, dispatcher, ListenerConfig::from_secs(30));
//! listener.run().await;
//! ```
//!
//! `ManualClock` makes the backoff observable in tests without waiting.

mod clock;
mod config;
mod filter;
mod listener;

pub use clock::{Clock, ManualClock, TokioClock};
pub use config::{ListenerConfig, ListenerMetrics, ListenerMetricsSnapshot};
pub use filter::{evaluate, FilterDecision, RejectReason};
pub use listener::{ListenerState, SessionEnd, UpstreamListener};
