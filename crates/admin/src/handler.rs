//! AdminHandler - chat commands that read and mutate the destination store

use std::sync::Arc;

use contracts::{ChatConfig, ChatSession, DestinationStore, Embed, InboundMessage};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::command::{parse, AdminCommand};
use crate::help::help_embed;
use crate::permission::{authorize, Authorization};

pub const REPLY_SET: &str = "Let the kirb posting commence!";
pub const REPLY_REMOVED: &str = "No more kirb posting :c";
pub const REPLY_NOT_CONFIGURED: &str = "No kirb posting on this server :c";
pub const REPLY_DENIED: &str = "You don't have permission for that!";
pub const REPLY_UNKNOWN: &str = "I dunno what you're tellin me to do";

/// Reply to a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Embed(Embed),
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// Command handler
pub struct AdminHandler<S, C> {
    store: Arc<S>,
    session: Arc<C>,
    prefix: String,
    embed_color: u32,
}

impl<S, C> AdminHandler<S, C>
where
    S: DestinationStore + Sync,
    C: ChatSession + Sync,
{
    pub fn new(store: Arc<S>, session: Arc<C>, chat: &ChatConfig) -> Self {
        Self {
            store,
            session,
            prefix: chat.command_prefix.clone(),
            embed_color: chat.embed_color,
        }
    }

    /// Consume inbound messages until the sender side closes
    pub async fn run(&self, mut rx: mpsc::Receiver<InboundMessage>) {
        info!(prefix = %self.prefix, "admin handler started");
        while let Some(message) = rx.recv().await {
            self.handle_message(&message).await;
        }
        info!("admin handler stopped");
    }

    /// Handle one message; returns the reply sent, or None if it was not a command
    #[instrument(
        name = "admin_handle_message",
        skip(self, message),
        fields(guild = ?message.guild_id, author = %message.author_id)
    )]
    pub async fn handle_message(&self, message: &InboundMessage) -> Option<Reply> {
        if message.author_is_bot {
            return None;
        }
        let command = parse(&self.prefix, &message.content)?;
        debug!(command = command.name(), "command received");

        let reply = if command.requires_admin() {
            let auth = authorize(
                self.session.as_ref(),
                message.guild_id.as_deref(),
                &message.author_id,
            )
            .await;
            match (auth, message.guild_id.as_deref()) {
                (Authorization::Granted, Some(guild_id)) => {
                    self.guarded(&command, guild_id, &message.channel_id).await
                }
                _ => {
                    observability::record_admin_command(command.name(), "denied");
                    Reply::text(REPLY_DENIED)
                }
            }
        } else {
            let reply = match &command {
                AdminCommand::Help => self.help(),
                _ => Reply::text(REPLY_UNKNOWN),
            };
            observability::record_admin_command(command.name(), "ok");
            reply
        };

        self.send_reply(&message.channel_id, &reply).await;
        Some(reply)
    }

    async fn guarded(&self, command: &AdminCommand, guild_id: &str, channel_id: &str) -> Reply {
        match command {
            AdminCommand::Set { channel: None } => self.set(guild_id, channel_id).await,
            AdminCommand::Set {
                channel: Some(target),
            } => {
                if self.channel_in_guild(target, guild_id).await {
                    self.set(guild_id, target).await
                } else {
                    invalid_channel(&format!("<#{target}>"))
                }
            }
            AdminCommand::SetInvalidChannel { argument } => invalid_channel(argument),
            AdminCommand::Remove => self.remove(guild_id).await,
            AdminCommand::Check => self.check(guild_id).await,
            AdminCommand::Help | AdminCommand::Unknown { .. } => Reply::text(REPLY_UNKNOWN),
        }
    }

    /// Named channel exists and belongs to `guild_id`
    async fn channel_in_guild(&self, channel_id: &str, guild_id: &str) -> bool {
        match self.session.channel_guild(channel_id).await {
            Ok(owner) => owner.as_deref() == Some(guild_id),
            Err(e) => {
                debug!(channel = %channel_id, error = %e, "channel lookup failed");
                false
            }
        }
    }

    /// Point the guild's relay at `channel_id`
    pub async fn set(&self, guild_id: &str, channel_id: &str) -> Reply {
        match self.store.set_destination(guild_id, channel_id).await {
            Ok(()) => {
                info!(guild = %guild_id, channel = %channel_id, "destination set");
                observability::record_admin_command("set", "ok");
                Reply::text(REPLY_SET)
            }
            Err(e) => {
                warn!(guild = %guild_id, error = %e, "failed to set destination");
                observability::record_admin_command("set", "error");
                Reply::Text(format!("Failed to set kirb posting channel: {e}"))
            }
        }
    }

    /// Stop relaying to the guild; confirms even if nothing was set
    pub async fn remove(&self, guild_id: &str) -> Reply {
        match self.store.remove_destination(guild_id).await {
            Ok(()) => {
                info!(guild = %guild_id, "destination removed");
                observability::record_admin_command("remove", "ok");
            }
            Err(e) => {
                warn!(guild = %guild_id, error = %e, "failed to remove destination");
                observability::record_admin_command("remove", "error");
            }
        }
        Reply::text(REPLY_REMOVED)
    }

    /// Report the configured channel
    pub async fn check(&self, guild_id: &str) -> Reply {
        match self.store.list_destinations().await {
            Ok(snapshot) => {
                observability::record_admin_command("check", "ok");
                match snapshot.get(guild_id) {
                    Some(channel) => {
                        Reply::Text(format!("Kirb posting set to happen in <#{channel}>"))
                    }
                    None => Reply::text(REPLY_NOT_CONFIGURED),
                }
            }
            Err(e) => {
                warn!(guild = %guild_id, error = %e, "failed to read destinations");
                observability::record_admin_command("check", "error");
                Reply::Text(format!("Failed to check kirb posting: {e}"))
            }
        }
    }

    pub fn help(&self) -> Reply {
        Reply::Embed(help_embed(self.embed_color))
    }

    async fn send_reply(&self, channel_id: &str, reply: &Reply) {
        let result = match reply {
            Reply::Text(text) => self.session.send_message(channel_id, text).await,
            Reply::Embed(embed) => self.session.send_embed(channel_id, embed).await,
        };
        if let Err(e) = result {
            warn!(channel = %channel_id, error = %e, "failed to send reply");
        }
    }
}

fn invalid_channel(argument: &str) -> Reply {
    observability::record_admin_command("set", "invalid");
    Reply::Text(format!("I don't know which channel \"{argument}\" is"))
}
