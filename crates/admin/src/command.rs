//! 命令解析
//!
//! 格式：`<prefix> <subcommand> [args]`，只有前缀时视为 `help`。

use contracts::ChannelId;

/// 解析后的管理命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    /// 设置目的地频道；`channel` 为空时使用当前频道
    Set { channel: Option<ChannelId> },
    /// `set` 的参数不是频道
    SetInvalidChannel { argument: String },
    Remove,
    Check,
    Help,
    Unknown { name: String },
}

impl AdminCommand {
    /// 指标与日志中使用的名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Set { .. } | Self::SetInvalidChannel { .. } => "set",
            Self::Remove => "remove",
            Self::Check => "check",
            Self::Help => "help",
            Self::Unknown { .. } => "unknown",
        }
    }

    /// 是否需要管理员权限
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Self::Set { .. } | Self::SetInvalidChannel { .. } | Self::Remove | Self::Check
        )
    }
}

/// 解析消息内容；不是命令时返回 None
pub fn parse(prefix: &str, content: &str) -> Option<AdminCommand> {
    let mut fields = content.split_whitespace();
    if fields.next()? != prefix {
        return None;
    }

    let command = match fields.next() {
        None | Some("help") => AdminCommand::Help,
        Some("set-kirb-post") => match fields.next() {
            None => AdminCommand::Set { channel: None },
            Some(arg) => match parse_channel_ref(arg) {
                Some(channel) => AdminCommand::Set {
                    channel: Some(channel),
                },
                None => AdminCommand::SetInvalidChannel {
                    argument: arg.to_string(),
                },
            },
        },
        Some("remove-kirb-post") => AdminCommand::Remove,
        Some("check-kirb-post") => AdminCommand::Check,
        Some(other) => AdminCommand::Unknown {
            name: other.to_string(),
        },
    };
    Some(command)
}

/// 频道引用：`<#id>` 或纯数字 id
pub fn parse_channel_ref(arg: &str) -> Option<ChannelId> {
    let id = arg
        .strip_prefix("<#")
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(arg);
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        Some(id.to_string())
    } else {
        None
    }
}
