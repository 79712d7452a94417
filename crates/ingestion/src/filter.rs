//! Acceptance filter
//!
//! Only original, non-reply posts are relayed.

use contracts::StreamItem;

/// Why an item was not relayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Reshare,
    Quote,
    Reply,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reshare => "reshare",
            Self::Quote => "quote",
            Self::Reply => "reply",
        }
    }
}

/// Filter verdict for one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Accept,
    Reject(RejectReason),
}

impl FilterDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Classify an item
pub fn evaluate(item: &StreamItem) -> FilterDecision {
    if item.is_reshare {
        FilterDecision::Reject(RejectReason::Reshare)
    } else if item.is_quote {
        FilterDecision::Reject(RejectReason::Quote)
    } else if item.is_reply() {
        FilterDecision::Reject(RejectReason::Reply)
    } else {
        FilterDecision::Accept
    }
}
