//! StreamSource trait - upstream social stream abstraction
//!
//! A source hands out subscriptions; a subscription yields items or in-band
//! errors until it ends. Reconnecting is the Listener's job, not the source's.

use std::future::Future;

use crate::StreamError;

/// One upstream post
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamItem {
    /// Upstream post id (diagnostics only)
    pub id: Option<String>,

    /// Short text representation
    pub text: String,

    /// Extended text representation, when the upstream provides one
    pub full_text: Option<String>,

    /// Verbatim re-publication of another post
    pub is_reshare: bool,

    /// Quote of another post
    pub is_quote: bool,

    /// Account the post replies to
    pub in_reply_to_user: Option<String>,
}

impl StreamItem {
    /// Plain original post
    pub fn original(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Text to display: the longer of the two representations
    pub fn display_text(&self) -> &str {
        match &self.full_text {
            Some(full) if full.chars().count() > self.text.chars().count() => full,
            _ => &self.text,
        }
    }

    /// Post replies to some account
    pub fn is_reply(&self) -> bool {
        self.in_reply_to_user.is_some()
    }
}

/// Event read off a subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Item(StreamItem),
    Error(StreamError),
}

/// Upstream stream source
pub trait StreamSource: Send + Sync {
    /// Subscription type
    type Stream: ItemStream;

    /// Source name (used for logging)
    fn name(&self) -> &str;

    /// Establish a new filtered subscription
    fn subscribe(&self) -> impl Future<Output = Result<Self::Stream, StreamError>> + Send;
}

/// Live subscription
pub trait ItemStream: Send {
    /// Next event, `None` once the subscription has ended
    fn next_event(&mut self) -> impl Future<Output = Option<StreamEvent>> + Send;

    /// Tear down the subscription
    fn stop(&mut self);
}
