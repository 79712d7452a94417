//! Discord Gateway receive loop
//!
//! Protocol flow per connection:
//! 1. `GET /gateway/bot` for the WebSocket url
//! 2. read Hello (op 10) → heartbeat interval
//! 3. send Identify (op 2)
//! 4. heartbeat (op 1) on the interval while reading dispatches
//!
//! Only `MESSAGE_CREATE` dispatches are forwarded. Any connection failure
//! ends the connection; the loop reconnects after `reconnect_delay`.

use std::time::Duration;

use contracts::{InboundMessage, PlatformError};
use futures::{SinkExt, StreamExt};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

/// GUILDS (1) | GUILD_MESSAGES (512) | MESSAGE_CONTENT (32768)
pub const GATEWAY_INTENTS: u64 = 1 | 512 | 32768;

const DEFAULT_HEARTBEAT_MS: u64 = 41_250;
const ENDPOINT: &str = "gateway";

/// Gateway opcodes used here
mod op {
    pub const DISPATCH: u64 = 0;
    pub const HEARTBEAT: u64 = 1;
    pub const IDENTIFY: u64 = 2;
    pub const RECONNECT: u64 = 7;
    pub const INVALID_SESSION: u64 = 9;
    pub const HELLO: u64 = 10;
}

/// Why one gateway connection ended
#[derive(Debug)]
enum ConnectionEnd {
    /// Receiver dropped; stop for good
    ReceiverClosed,
    /// Server asked for a reconnect or the socket closed
    Reconnect(String),
}

/// WebSocket client feeding chat messages into a channel
#[derive(Debug, Clone)]
pub struct DiscordGateway {
    client: Client,
    api_base: String,
    token: String,
    reconnect_delay: Duration,
}

impl DiscordGateway {
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            reconnect_delay: Duration::from_secs(5),
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Run the receive loop on a background task
    ///
    /// The task ends once `tx`'s receiver is dropped.
    pub fn spawn(self, tx: mpsc::Sender<InboundMessage>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(tx).await })
    }

    /// Receive loop: connect, read until the connection ends, reconnect
    pub async fn run(&self, tx: mpsc::Sender<InboundMessage>) {
        loop {
            match self.connect_once(&tx).await {
                Ok(ConnectionEnd::ReceiverClosed) => {
                    info!("gateway receiver closed, stopping");
                    return;
                }
                Ok(ConnectionEnd::Reconnect(reason)) => {
                    info!(reason = %reason, "gateway connection ended");
                }
                Err(e) => {
                    warn!(error = %e, "gateway connection failed");
                }
            }
            if tx.is_closed() {
                return;
            }
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn gateway_url(&self) -> Result<String, PlatformError> {
        let endpoint = "/gateway/bot";
        let resp = self
            .client
            .get(format!("{}{}", self.api_base, endpoint))
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await
            .map_err(|e| PlatformError::transport(endpoint, e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PlatformError::http(endpoint, status.as_u16(), body));
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| PlatformError::decode(endpoint, e))?;
        let url = body["url"]
            .as_str()
            .ok_or_else(|| PlatformError::decode(endpoint, "missing 'url'"))?;
        Ok(format!("{url}/?v=10&encoding=json"))
    }

    async fn connect_once(
        &self,
        tx: &mpsc::Sender<InboundMessage>,
    ) -> Result<ConnectionEnd, PlatformError> {
        let url = self.gateway_url().await?;
        info!(url = %url, "connecting to gateway");

        let (ws, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| PlatformError::transport(ENDPOINT, e))?;
        let (mut write, mut read) = ws.split();

        let heartbeat_ms = match read.next().await {
            Some(Ok(msg)) => {
                let payload: Value = msg
                    .to_text()
                    .ok()
                    .and_then(|t| serde_json::from_str(t).ok())
                    .unwrap_or_default();
                if payload["op"].as_u64() == Some(op::HELLO) {
                    payload["d"]["heartbeat_interval"]
                        .as_u64()
                        .unwrap_or(DEFAULT_HEARTBEAT_MS)
                } else {
                    warn!(op = ?payload["op"].as_u64(), "expected Hello");
                    DEFAULT_HEARTBEAT_MS
                }
            }
            Some(Err(e)) => return Err(PlatformError::transport(ENDPOINT, e)),
            None => return Ok(ConnectionEnd::Reconnect("closed before Hello".into())),
        };
        debug!(heartbeat_ms, "gateway hello");

        let identify = json!({
            "op": op::IDENTIFY,
            "d": {
                "token": self.token,
                "intents": GATEWAY_INTENTS,
                "properties": { "os": "linux", "browser": "kirb-relay", "device": "kirb-relay" }
            }
        });
        write
            .send(WsMessage::Text(identify.to_string().into()))
            .await
            .map_err(|e| PlatformError::transport(ENDPOINT, e))?;

        let period = Duration::from_millis(heartbeat_ms);
        let mut heartbeat = interval_at(Instant::now() + period, period);
        let mut sequence: Option<u64> = None;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    let beat = json!({ "op": op::HEARTBEAT, "d": sequence });
                    write
                        .send(WsMessage::Text(beat.to_string().into()))
                        .await
                        .map_err(|e| PlatformError::transport(ENDPOINT, e))?;
                }
                frame = read.next() => {
                    let msg = match frame {
                        Some(Ok(msg)) => msg,
                        Some(Err(e)) => return Err(PlatformError::transport(ENDPOINT, e)),
                        None => return Ok(ConnectionEnd::Reconnect("socket closed".into())),
                    };
                    if msg.is_close() {
                        return Ok(ConnectionEnd::Reconnect("close frame".into()));
                    }
                    let Ok(text) = msg.to_text() else { continue };
                    let Ok(payload) = serde_json::from_str::<Value>(text) else { continue };

                    if let Some(s) = payload["s"].as_u64() {
                        sequence = Some(s);
                    }

                    match payload["op"].as_u64() {
                        Some(op::DISPATCH) => {
                            if let Some(message) = parse_message_create(&payload) {
                                if tx.send(message).await.is_err() {
                                    return Ok(ConnectionEnd::ReceiverClosed);
                                }
                            }
                        }
                        Some(op::HEARTBEAT) => {
                            let beat = json!({ "op": op::HEARTBEAT, "d": sequence });
                            write
                                .send(WsMessage::Text(beat.to_string().into()))
                                .await
                                .map_err(|e| PlatformError::transport(ENDPOINT, e))?;
                        }
                        Some(op::RECONNECT) => {
                            return Ok(ConnectionEnd::Reconnect("server requested reconnect".into()));
                        }
                        Some(op::INVALID_SESSION) => {
                            return Ok(ConnectionEnd::Reconnect("invalid session".into()));
                        }
                        _ => {}
                    }
                }
            }
        }
    }
}

/// Map a `MESSAGE_CREATE` dispatch payload to an `InboundMessage`
///
/// Returns `None` for other events and for payloads missing ids.
pub fn parse_message_create(payload: &Value) -> Option<InboundMessage> {
    if payload["t"].as_str() != Some("MESSAGE_CREATE") {
        return None;
    }
    let data = &payload["d"];
    Some(InboundMessage {
        guild_id: data["guild_id"].as_str().map(str::to_string),
        channel_id: data["channel_id"].as_str()?.to_string(),
        author_id: data["author"]["id"].as_str()?.to_string(),
        author_is_bot: data["author"]["bot"].as_bool().unwrap_or(false),
        content: data["content"].as_str().unwrap_or_default().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_create() {
        let payload = json!({
            "op": 0,
            "t": "MESSAGE_CREATE",
            "s": 3,
            "d": {
                "id": "m1",
                "guild_id": "G1",
                "channel_id": "C1",
                "content": "!kb help",
                "author": { "id": "U1", "username": "dee" }
            }
        });
        let msg = parse_message_create(&payload).unwrap();
        assert_eq!(msg, InboundMessage::in_guild("G1", "C1", "U1", "!kb help"));
    }

    #[test]
    fn test_parse_private_and_bot_messages() {
        let payload = json!({
            "t": "MESSAGE_CREATE",
            "d": {
                "channel_id": "D1",
                "content": "hi",
                "author": { "id": "B1", "bot": true }
            }
        });
        let msg = parse_message_create(&payload).unwrap();
        assert!(msg.guild_id.is_none());
        assert!(msg.author_is_bot);
    }

    #[test]
    fn test_other_dispatches_ignored() {
        let payload = json!({ "t": "GUILD_CREATE", "d": { "id": "G1" } });
        assert!(parse_message_create(&payload).is_none());

        let missing_author = json!({ "t": "MESSAGE_CREATE", "d": { "channel_id": "C1" } });
        assert!(parse_message_create(&missing_author).is_none());
    }

    #[test]
    fn test_intents_include_message_content() {
        assert_eq!(GATEWAY_INTENTS & 32768, 32768);
        assert_eq!(GATEWAY_INTENTS & 512, 512);
    }

    #[tokio::test]
    async fn test_run_stops_when_receiver_dropped() {
        let gateway =
            DiscordGateway::new("t", "http://127.0.0.1:1").with_reconnect_delay(Duration::ZERO);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        tokio::time::timeout(Duration::from_secs(5), gateway.run(tx))
            .await
            .unwrap();
    }
}
