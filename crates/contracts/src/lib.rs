//! # Contracts
//!
//! Frozen interface contracts shared by every relay crate: data types, the
//! store / chat / stream traits, and the error taxonomy.
//! Business crates depend on this crate only, never on each other's internals.
//!
//! ## Ordering Model
//! - Items are relayed one at a time; an item's fan-out completes before the
//!   next item is read from the upstream stream
//! - No sequence numbers or timestamps are used as ordering tokens

mod blueprint;
mod destination;
mod error;
mod message;
mod relay;
mod session;
mod store;
mod stream;

pub use blueprint::*;
pub use destination::*;
pub use error::*;
pub use message::InboundMessage;
pub use relay::{RelayHandler, RelayReport};
pub use session::*;
pub use store::{DestinationStore, LocalDestinationStore};
pub use stream::*;
