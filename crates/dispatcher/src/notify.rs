//! Owner notification for failed deliveries

use contracts::ChatSession;
use tracing::{debug, instrument};

use crate::error::{DeliveryError, NotificationError};

/// Text sent to a guild owner after a failed delivery
pub fn owner_notice(channel_id: &str, detail: &str) -> String {
    format!(
        "Hey there! It looks like I failed to kirb post in <#{channel_id}>. \
         Please make sure I have permission to post there. \
         If I do have permission, maybe message my owner so they can see what's up. \
         (This may be useful to them: \"{detail}\")"
    )
}

/// Tell the owner of the failing destination's guild
///
/// Single attempt per stage, no retries.
#[instrument(
    name = "dispatcher_notify_owner",
    skip(session, failure),
    fields(guild = %failure.guild_id, channel = %failure.channel_id)
)]
pub async fn notify_owner<C>(session: &C, failure: &DeliveryError) -> Result<(), NotificationError>
where
    C: ChatSession + Sync,
{
    let owner_id = session
        .guild_owner(&failure.guild_id)
        .await
        .map_err(|source| NotificationError::OwnerLookup {
            guild_id: failure.guild_id.clone(),
            source,
        })?;

    let private = session
        .open_private_channel(&owner_id)
        .await
        .map_err(|source| NotificationError::PrivateChannel {
            owner_id: owner_id.clone(),
            source,
        })?;

    let text = owner_notice(&failure.channel_id, &failure.source.to_string());
    session
        .send_message(&private, &text)
        .await
        .map_err(|source| NotificationError::Send {
            owner_id: owner_id.clone(),
            source,
        })?;

    debug!(owner = %owner_id, "owner notified");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::PlatformError;
    use platform::MockChatSession;

    fn failure() -> DeliveryError {
        DeliveryError::new("G1", "C1", PlatformError::http("/channels/C1/messages", 403, "Missing Access"))
    }

    #[test]
    fn test_notice_text() {
        let text = owner_notice("C1", "boom");
        assert!(text.starts_with("Hey there!"));
        assert!(text.contains("<#C1>"));
        assert!(text.contains("\"boom\""));
    }

    #[tokio::test]
    async fn test_notify_owner_sends_dm() {
        let session = MockChatSession::new().with_owner("G1", "O1");
        notify_owner(&session, &failure()).await.unwrap();

        let sent = session.messages_to("dm-O1");
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Missing Access"));
    }

    #[tokio::test]
    async fn test_notify_owner_stages() {
        let unknown_guild = MockChatSession::new();
        let err = notify_owner(&unknown_guild, &failure()).await.unwrap_err();
        assert_eq!(err.stage(), "owner_lookup");

        let no_dm = MockChatSession::new()
            .with_owner("G1", "O1")
            .with_unreachable_user("O1");
        let err = notify_owner(&no_dm, &failure()).await.unwrap_err();
        assert_eq!(err.stage(), "private_channel");

        let dm_fails = MockChatSession::new()
            .with_owner("G1", "O1")
            .with_failing_channel("dm-O1");
        let err = notify_owner(&dm_fails, &failure()).await.unwrap_err();
        assert_eq!(err.stage(), "send");
    }
}
