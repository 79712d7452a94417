//! # Platform
//!
//! Concrete adapters for the two external services:
//! - `DiscordSession`: chat REST calls behind `ChatSession`
//! - `DiscordGateway`: WebSocket receive loop feeding the admin handler
//! - `TwitterStreamSource`: filtered stream behind `StreamSource`
//!
//! Mock implementations (`MockChatSession`, `ScriptedStreamSource`) share the
//! same traits and are used by unit and end-to-end tests.

mod discord;
mod gateway;
mod mock_session;
mod mock_stream;
mod twitter;

pub use discord::DiscordSession;
pub use gateway::{parse_message_create, DiscordGateway, GATEWAY_INTENTS};
pub use mock_session::{MockChatSession, SentMessage};
pub use mock_stream::{ScriptedStream, ScriptedStreamSource};
pub use twitter::{parse_stream_line, TwitterStream, TwitterStreamSource};
