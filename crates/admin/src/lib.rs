//! # Admin
//!
//! `!kb` chat commands. `set-kirb-post`, `remove-kirb-post` and
//! `check-kirb-post` require the ADMINISTRATOR permission in the invoking
//! guild; `help` does not.

mod command;
mod handler;
mod help;
mod permission;

pub use command::{parse, parse_channel_ref, AdminCommand};
pub use handler::{
    AdminHandler, Reply, REPLY_DENIED, REPLY_NOT_CONFIGURED, REPLY_REMOVED, REPLY_SET,
    REPLY_UNKNOWN,
};
pub use help::help_embed;
pub use permission::{authorize, Authorization};
