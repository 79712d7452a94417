//! RelayBlueprint - Config Loader output
//!
//! Describes the full relay configuration: upstream account, store backend,
//! chat platform settings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Upstream stream settings
    pub upstream: UpstreamConfig,

    /// Destination store backend
    #[serde(default)]
    pub store: StoreConfig,

    /// Chat platform settings
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Upstream stream settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Followed account id
    pub account_id: String,

    /// Pause before re-subscribing after a stream failure (seconds)
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,

    /// Silence on the stream longer than this counts as a disconnect (seconds)
    #[serde(default = "default_stall_timeout_secs")]
    pub stall_timeout_secs: u64,

    /// Stream API base url
    #[serde(default = "default_upstream_api")]
    pub api_base: String,
}

fn default_backoff_secs() -> u64 {
    30
}

fn default_stall_timeout_secs() -> u64 {
    90
}

fn default_upstream_api() -> String {
    "https://api.twitter.com".to_string()
}

/// Store backend selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Process-local map, lost on exit
    Memory,

    /// Embedded key-value file
    Embedded {
        #[serde(default = "default_embedded_path")]
        path: PathBuf,
    },

    /// Relational table `kirby_channels`
    Relational {
        url: String,
        #[serde(default = "default_max_connections")]
        max_connections: u32,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Embedded {
            path: default_embedded_path(),
        }
    }
}

impl StoreConfig {
    /// Backend name as used in logs
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Embedded { .. } => "embedded",
            Self::Relational { .. } => "relational",
        }
    }
}

fn default_embedded_path() -> PathBuf {
    PathBuf::from("/data/kirb.db")
}

fn default_max_connections() -> u32 {
    5
}

/// Chat platform settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// REST API base url
    #[serde(default = "default_chat_api")]
    pub api_base: String,

    /// Prefix that marks a message as a command
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Embed accent colour
    #[serde(default = "default_embed_color")]
    pub embed_color: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_base: default_chat_api(),
            command_prefix: default_command_prefix(),
            embed_color: default_embed_color(),
        }
    }
}

fn default_chat_api() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_command_prefix() -> String {
    "!kb".to_string()
}

fn default_embed_color() -> u32 {
    0xffa6c9
}
