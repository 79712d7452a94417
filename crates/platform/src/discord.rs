//! DiscordSession - REST implementation of `ChatSession`

use std::time::Duration;

use contracts::{ChannelId, ChatSession, Embed, PlatformError, Role, UserId};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct GuildBody {
    owner_id: String,
}

#[derive(Debug, Deserialize)]
struct ChannelBody {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ChannelGuildBody {
    #[serde(default)]
    guild_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MemberBody {
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RoleBody {
    id: String,
    /// Discord encodes the bit set as a decimal string
    permissions: String,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    id: String,
}

/// Bot session against the Discord REST API
#[derive(Debug, Clone)]
pub struct DiscordSession {
    client: Client,
    api_base: String,
    token: String,
}

impl DiscordSession {
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Id of the bot user; fails when the token is rejected
    #[instrument(name = "discord_current_user", skip(self))]
    pub async fn current_user(&self) -> Result<UserId, PlatformError> {
        let user: UserBody = self.get_json("/users/@me").await?;
        Ok(user.id)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("Authorization", format!("Bot {}", self.token))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, PlatformError> {
        let resp = self
            .authorized(self.client.get(self.url(path)))
            .send()
            .await
            .map_err(|e| PlatformError::transport(path, e))?;
        let resp = check_status(path, resp).await?;
        resp.json::<T>()
            .await
            .map_err(|e| PlatformError::decode(path, e))
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<Response, PlatformError> {
        let resp = self
            .authorized(self.client.post(self.url(path)))
            .json(body)
            .send()
            .await
            .map_err(|e| PlatformError::transport(path, e))?;
        check_status(path, resp).await
    }
}

async fn check_status(endpoint: &str, resp: Response) -> Result<Response, PlatformError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(PlatformError::http(endpoint, status.as_u16(), body))
}

fn parse_roles(endpoint: &str, roles: Vec<RoleBody>) -> Result<Vec<Role>, PlatformError> {
    roles
        .into_iter()
        .map(|r| {
            r.permissions
                .parse::<u64>()
                .map(|bits| Role::new(r.id, bits))
                .map_err(|e| PlatformError::decode(endpoint, e))
        })
        .collect()
}

impl ChatSession for DiscordSession {
    #[instrument(name = "discord_send_message", skip(self, text), fields(len = text.len()))]
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), PlatformError> {
        let path = format!("/channels/{channel_id}/messages");
        self.post(&path, &json!({ "content": text })).await?;
        debug!(channel = %channel_id, "message sent");
        Ok(())
    }

    #[instrument(name = "discord_send_embed", skip(self, embed), fields(title = %embed.title))]
    async fn send_embed(&self, channel_id: &str, embed: &Embed) -> Result<(), PlatformError> {
        let path = format!("/channels/{channel_id}/messages");
        self.post(&path, &json!({ "embeds": [embed] })).await?;
        Ok(())
    }

    #[instrument(name = "discord_guild_owner", skip(self))]
    async fn guild_owner(&self, guild_id: &str) -> Result<UserId, PlatformError> {
        let guild: GuildBody = self.get_json(&format!("/guilds/{guild_id}")).await?;
        Ok(guild.owner_id)
    }

    #[instrument(name = "discord_open_private_channel", skip(self))]
    async fn open_private_channel(&self, user_id: &str) -> Result<ChannelId, PlatformError> {
        let path = "/users/@me/channels";
        let resp = self.post(path, &json!({ "recipient_id": user_id })).await?;
        let channel: ChannelBody = resp
            .json()
            .await
            .map_err(|e| PlatformError::decode(path, e))?;
        Ok(channel.id)
    }

    #[instrument(name = "discord_member_roles", skip(self))]
    async fn member_roles(
        &self,
        guild_id: &str,
        member_id: &str,
    ) -> Result<Vec<String>, PlatformError> {
        let member: MemberBody = self
            .get_json(&format!("/guilds/{guild_id}/members/{member_id}"))
            .await?;
        Ok(member.roles)
    }

    #[instrument(name = "discord_guild_roles", skip(self))]
    async fn guild_roles(&self, guild_id: &str) -> Result<Vec<Role>, PlatformError> {
        let path = format!("/guilds/{guild_id}/roles");
        let roles: Vec<RoleBody> = self.get_json(&path).await?;
        parse_roles(&path, roles)
    }

    #[instrument(name = "discord_channel_guild", skip(self))]
    async fn channel_guild(&self, channel_id: &str) -> Result<Option<String>, PlatformError> {
        let channel: ChannelGuildBody = self.get_json(&format!("/channels/{channel_id}")).await?;
        Ok(channel.guild_id)
    }
}
