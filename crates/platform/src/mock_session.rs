//! Mock 聊天会话
//!
//! 用于单元测试和端到端测试的 `ChatSession` 实现，支持注入失败场景：
//! 指定频道发送失败、未知 guild、无法私信的用户，以及发送延迟。

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::{ChannelId, ChatSession, Embed, PlatformError, Role, UserId};
use tracing::instrument;

/// 一条已发送的纯文本消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub channel_id: ChannelId,
    pub text: String,
}

#[derive(Debug, Default)]
struct MockState {
    messages: Vec<SentMessage>,
    embeds: Vec<(ChannelId, Embed)>,
    failing_channels: HashSet<ChannelId>,
    unreachable_users: HashSet<UserId>,
    owners: HashMap<String, UserId>,
    member_roles: HashMap<(String, UserId), Vec<String>>,
    guild_roles: HashMap<String, Vec<Role>>,
    channel_guilds: HashMap<ChannelId, String>,
}

/// Mock 聊天会话
#[derive(Debug, Default)]
pub struct MockChatSession {
    state: Mutex<MockState>,
    /// 每次发送前的延迟（用于并发测试）
    send_delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// 私信频道 id 规则：`dm-<user>`
    pub fn private_channel_of(user_id: &str) -> ChannelId {
        format!("dm-{user_id}")
    }

    /// 发往该频道的消息全部失败
    pub fn with_failing_channel(self, channel_id: impl Into<ChannelId>) -> Self {
        self.state().failing_channels.insert(channel_id.into());
        self
    }

    /// 无法为该用户打开私信频道
    pub fn with_unreachable_user(self, user_id: impl Into<UserId>) -> Self {
        self.state().unreachable_users.insert(user_id.into());
        self
    }

    /// 注册 guild 及其 owner
    pub fn with_owner(self, guild_id: impl Into<String>, owner_id: impl Into<UserId>) -> Self {
        self.state().owners.insert(guild_id.into(), owner_id.into());
        self
    }

    /// 设置成员持有的角色
    pub fn with_member_roles(
        self,
        guild_id: impl Into<String>,
        member_id: impl Into<UserId>,
        roles: &[&str],
    ) -> Self {
        self.state().member_roles.insert(
            (guild_id.into(), member_id.into()),
            roles.iter().map(|r| r.to_string()).collect(),
        );
        self
    }

    /// 设置 guild 的全部角色
    pub fn with_guild_roles(self, guild_id: impl Into<String>, roles: Vec<Role>) -> Self {
        self.state().guild_roles.insert(guild_id.into(), roles);
        self
    }

    /// 登记频道所属的 guild
    pub fn with_channel(self, guild_id: impl Into<String>, channel_id: impl Into<ChannelId>) -> Self {
        self.state()
            .channel_guilds
            .insert(channel_id.into(), guild_id.into());
        self
    }

    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = Some(delay);
        self
    }

    /// 所有成功发送的纯文本消息（按完成顺序）
    pub fn messages(&self) -> Vec<SentMessage> {
        self.state().messages.clone()
    }

    /// 某频道收到的文本
    pub fn messages_to(&self, channel_id: &str) -> Vec<String> {
        self.state()
            .messages
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .map(|m| m.text.clone())
            .collect()
    }

    /// 所有成功发送的 embed
    pub fn embeds(&self) -> Vec<(ChannelId, Embed)> {
        self.state().embeds.clone()
    }

    /// 同时进行中的发送数峰值
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn simulate_send(&self, channel_id: &str) -> Result<(), PlatformError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.send_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.state().failing_channels.contains(channel_id) {
            return Err(PlatformError::http(
                format!("/channels/{channel_id}/messages"),
                403,
                "Missing Permissions",
            ));
        }
        Ok(())
    }
}

impl ChatSession for MockChatSession {
    #[instrument(name = "mock_send_message", skip(self, text))]
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), PlatformError> {
        self.simulate_send(channel_id).await?;
        self.state().messages.push(SentMessage {
            channel_id: channel_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_embed(&self, channel_id: &str, embed: &Embed) -> Result<(), PlatformError> {
        self.simulate_send(channel_id).await?;
        self.state()
            .embeds
            .push((channel_id.to_string(), embed.clone()));
        Ok(())
    }

    async fn guild_owner(&self, guild_id: &str) -> Result<UserId, PlatformError> {
        self.state()
            .owners
            .get(guild_id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found("guild", guild_id))
    }

    async fn open_private_channel(&self, user_id: &str) -> Result<ChannelId, PlatformError> {
        if self.state().unreachable_users.contains(user_id) {
            return Err(PlatformError::http("/users/@me/channels", 400, "Cannot send messages to this user"));
        }
        Ok(Self::private_channel_of(user_id))
    }

    async fn member_roles(
        &self,
        guild_id: &str,
        member_id: &str,
    ) -> Result<Vec<String>, PlatformError> {
        self.state()
            .member_roles
            .get(&(guild_id.to_string(), member_id.to_string()))
            .cloned()
            .ok_or_else(|| PlatformError::not_found("member", member_id))
    }

    async fn guild_roles(&self, guild_id: &str) -> Result<Vec<Role>, PlatformError> {
        self.state()
            .guild_roles
            .get(guild_id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found("guild", guild_id))
    }

    async fn channel_guild(&self, channel_id: &str) -> Result<Option<String>, PlatformError> {
        if channel_id.starts_with("dm-") {
            return Ok(None);
        }
        self.state()
            .channel_guilds
            .get(channel_id)
            .cloned()
            .map(Some)
            .ok_or_else(|| PlatformError::not_found("channel", channel_id))
    }
}
