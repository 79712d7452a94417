//! TwitterStreamSource - v2 filtered stream
//!
//! `subscribe` makes sure a `from:<account>` rule exists, then opens the
//! long-lived stream. The body is newline-delimited JSON; blank lines are
//! keep-alives, sent every 20 seconds. A body silent for longer than the idle
//! timeout is treated as a dead connection.

use std::time::Duration;

use bytes::{Buf, BytesMut};
use contracts::{ItemStream, StreamError, StreamEvent, StreamItem, StreamSource};
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

const SOURCE_NAME: &str = "twitter";
const RULE_TAG: &str = "kirb-relay";
const TWEET_FIELDS: &str = "referenced_tweets,in_reply_to_user_id,note_tweet";

/// Silence after which the stream counts as stalled
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Longest line accepted without a newline
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Deserialize)]
struct RulesBody {
    #[serde(default)]
    data: Vec<RuleBody>,
}

#[derive(Debug, Deserialize)]
struct RuleBody {
    value: String,
}

#[derive(Debug, Deserialize)]
struct StreamLine {
    data: Option<TweetBody>,
    #[serde(default)]
    errors: Vec<ProblemBody>,
}

#[derive(Debug, Deserialize)]
struct TweetBody {
    id: Option<String>,
    #[serde(default)]
    text: String,
    in_reply_to_user_id: Option<String>,
    #[serde(default)]
    referenced_tweets: Vec<ReferenceBody>,
    note_tweet: Option<NoteBody>,
}

#[derive(Debug, Deserialize)]
struct ReferenceBody {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct NoteBody {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ProblemBody {
    title: Option<String>,
    detail: Option<String>,
}

impl ProblemBody {
    fn describe(&self) -> String {
        match (&self.title, &self.detail) {
            (Some(t), Some(d)) => format!("{t}: {d}"),
            (Some(t), None) => t.clone(),
            (None, Some(d)) => d.clone(),
            (None, None) => "unknown upstream error".to_string(),
        }
    }
}

impl From<TweetBody> for StreamItem {
    fn from(tweet: TweetBody) -> Self {
        let has_ref = |kind: &str| tweet.referenced_tweets.iter().any(|r| r.kind == kind);
        let is_reshare = has_ref("retweeted");
        let is_quote = has_ref("quoted");
        let in_reply_to_user = tweet.in_reply_to_user_id.clone().or_else(|| {
            // replied_to without a user id still counts as a reply
            has_ref("replied_to").then(String::new)
        });
        StreamItem {
            id: tweet.id,
            text: tweet.text,
            full_text: tweet.note_tweet.map(|n| n.text),
            is_reshare,
            is_quote,
            in_reply_to_user,
        }
    }
}

/// Decode one non-empty stream line
pub fn parse_stream_line(line: &str) -> StreamEvent {
    let parsed: StreamLine = match serde_json::from_str(line) {
        Ok(parsed) => parsed,
        Err(e) => return StreamEvent::Error(StreamError::protocol(e)),
    };
    match parsed.data {
        Some(tweet) => StreamEvent::Item(tweet.into()),
        None if !parsed.errors.is_empty() => {
            let message = parsed
                .errors
                .iter()
                .map(ProblemBody::describe)
                .collect::<Vec<_>>()
                .join("; ");
            StreamEvent::Error(StreamError::upstream(message))
        }
        None => StreamEvent::Error(StreamError::protocol("line carries neither data nor errors")),
    }
}

/// Filtered stream source following one account
#[derive(Debug, Clone)]
pub struct TwitterStreamSource {
    client: Client,
    api_base: String,
    bearer_token: String,
    account_id: String,
    idle_timeout: Duration,
}

impl TwitterStreamSource {
    pub fn new(
        bearer_token: impl Into<String>,
        api_base: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bearer_token: bearer_token.into(),
            account_id: account_id.into(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    fn rule_value(&self) -> String {
        format!("from:{}", self.account_id)
    }

    async fn ensure_rule(&self) -> Result<(), StreamError> {
        let url = format!("{}/2/tweets/search/stream/rules", self.api_base);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(StreamError::connect)?;
        if !resp.status().is_success() {
            return Err(StreamError::connect(format!(
                "listing stream rules returned {}",
                resp.status()
            )));
        }
        let rules: RulesBody = resp.json().await.map_err(StreamError::connect)?;

        let wanted = self.rule_value();
        if rules.data.iter().any(|r| r.value == wanted) {
            debug!(rule = %wanted, "stream rule present");
            return Ok(());
        }

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.bearer_token)
            .json(&json!({ "add": [{ "value": wanted, "tag": RULE_TAG }] }))
            .send()
            .await
            .map_err(StreamError::connect)?;
        if !resp.status().is_success() {
            return Err(StreamError::connect(format!(
                "adding stream rule returned {}",
                resp.status()
            )));
        }
        info!(rule = %wanted, "stream rule added");
        Ok(())
    }
}

impl StreamSource for TwitterStreamSource {
    type Stream = TwitterStream;

    fn name(&self) -> &str {
        SOURCE_NAME
    }

    #[instrument(name = "twitter_subscribe", skip(self), fields(account = %self.account_id))]
    async fn subscribe(&self) -> Result<TwitterStream, StreamError> {
        self.ensure_rule().await?;

        let resp = self
            .client
            .get(format!("{}/2/tweets/search/stream", self.api_base))
            .query(&[("tweet.fields", TWEET_FIELDS)])
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(StreamError::connect)?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(StreamError::connect(format!("stream returned {status}: {body}")));
        }

        info!("filtered stream open");
        Ok(TwitterStream::new(
            resp.bytes_stream()
                .map(|chunk| chunk.map_err(|e| e.to_string()))
                .boxed(),
        )
        .with_idle_timeout(self.idle_timeout))
    }
}

/// Open filtered stream connection
pub struct TwitterStream {
    body: Option<BoxStream<'static, Result<bytes::Bytes, String>>>,
    buffer: BytesMut,
    idle_timeout: Duration,
}

impl TwitterStream {
    pub fn new(body: BoxStream<'static, Result<bytes::Bytes, String>>) -> Self {
        Self {
            body: Some(body),
            buffer: BytesMut::new(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    fn fail(&mut self, error: StreamError) -> Option<StreamEvent> {
        self.body = None;
        self.buffer.clear();
        Some(StreamEvent::Error(error))
    }

    fn take_line(&mut self) -> Option<String> {
        let pos = self.buffer.iter().position(|b| *b == b'\n')?;
        let line = self.buffer.split_to(pos);
        self.buffer.advance(1);
        Some(String::from_utf8_lossy(&line).trim().to_string())
    }
}

impl ItemStream for TwitterStream {
    async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            while let Some(line) = self.take_line() {
                if !line.is_empty() {
                    return Some(parse_stream_line(&line));
                }
            }

            if self.buffer.len() > MAX_LINE_BYTES {
                warn!(pending = self.buffer.len(), "stream line exceeds limit");
                return self.fail(StreamError::protocol(format!(
                    "line longer than {MAX_LINE_BYTES} bytes without newline"
                )));
            }

            let body = self.body.as_mut()?;
            match tokio::time::timeout(self.idle_timeout, body.next()).await {
                Err(_) => {
                    warn!(idle = ?self.idle_timeout, "stream silent, assuming dead connection");
                    return self.fail(StreamError::disconnected("stall"));
                }
                Ok(Some(Ok(chunk))) => self.buffer.extend_from_slice(&chunk),
                Ok(Some(Err(e))) => {
                    warn!(error = %e, "stream body read failed");
                    return self.fail(StreamError::disconnected(e));
                }
                Ok(None) => {
                    self.body = None;
                    return None;
                }
            }
        }
    }

    fn stop(&mut self) {
        self.body = None;
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn body_of(chunks: Vec<Result<&'static str, &'static str>>) -> TwitterStream {
        let items: Vec<Result<Bytes, String>> = chunks
            .into_iter()
            .map(|c| c.map(|s| Bytes::from_static(s.as_bytes())).map_err(str::to_string))
            .collect();
        TwitterStream::new(futures::stream::iter(items).boxed())
    }

    #[test]
    fn test_parse_original_tweet() {
        let line = r#"{"data":{"id":"1","text":"poyo"},"matching_rules":[{"id":"9"}]}"#;
        let StreamEvent::Item(item) = parse_stream_line(line) else {
            panic!("expected item");
        };
        assert_eq!(item.id.as_deref(), Some("1"));
        assert_eq!(item.text, "poyo");
        assert!(!item.is_reshare && !item.is_quote && !item.is_reply());
    }

    #[test]
    fn test_parse_reference_flags() {
        let retweet = r#"{"data":{"text":"RT x","referenced_tweets":[{"type":"retweeted","id":"2"}]}}"#;
        let quote = r#"{"data":{"text":"q","referenced_tweets":[{"type":"quoted","id":"2"}]}}"#;
        let reply = r#"{"data":{"text":"r","in_reply_to_user_id":"42"}}"#;
        let thread = r#"{"data":{"text":"t","referenced_tweets":[{"type":"replied_to","id":"2"}]}}"#;

        let item = |line| match parse_stream_line(line) {
            StreamEvent::Item(item) => item,
            other => panic!("unexpected {other:?}"),
        };
        assert!(item(retweet).is_reshare);
        assert!(item(quote).is_quote);
        assert_eq!(item(reply).in_reply_to_user.as_deref(), Some("42"));
        assert!(item(thread).is_reply());
    }

    #[test]
    fn test_parse_note_tweet_full_text() {
        let line = r#"{"data":{"text":"short…","note_tweet":{"text":"short but very long"}}}"#;
        let StreamEvent::Item(item) = parse_stream_line(line) else {
            panic!("expected item");
        };
        assert_eq!(item.display_text(), "short but very long");
    }

    #[test]
    fn test_parse_errors_payload() {
        let line = r#"{"errors":[{"title":"ConnectionException","detail":"too many connections"}]}"#;
        assert_eq!(
            parse_stream_line(line),
            StreamEvent::Error(StreamError::upstream(
                "ConnectionException: too many connections"
            ))
        );
        assert!(matches!(
            parse_stream_line("{not json"),
            StreamEvent::Error(StreamError::Protocol { .. })
        ));
        assert!(matches!(
            parse_stream_line("{}"),
            StreamEvent::Error(StreamError::Protocol { .. })
        ));
    }

    #[tokio::test]
    async fn test_stream_splits_lines_across_chunks() {
        let mut stream = body_of(vec![
            Ok("{\"data\":{\"text\":\"a\"}}\r\n\r\n{\"data\":"),
            Ok("{\"text\":\"b\"}}\n"),
        ]);
        let texts = [stream.next_event().await, stream.next_event().await];
        for (event, want) in texts.into_iter().zip(["a", "b"]) {
            match event {
                Some(StreamEvent::Item(item)) => assert_eq!(item.text, want),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert!(stream.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_stream_read_error_then_end() {
        let mut stream = body_of(vec![Err("connection reset")]);
        assert_eq!(
            stream.next_event().await,
            Some(StreamEvent::Error(StreamError::disconnected("connection reset")))
        );
        assert!(stream.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_stop_ends_stream() {
        let mut stream = body_of(vec![Ok("{\"data\":{\"text\":\"a\"}}\n")]);
        stream.stop();
        assert!(stream.next_event().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_body_reports_stall() {
        let mut stream = TwitterStream::new(futures::stream::pending().boxed());
        let event = tokio::time::timeout(Duration::from_secs(3600), stream.next_event())
            .await
            .unwrap();
        assert_eq!(
            event,
            Some(StreamEvent::Error(StreamError::disconnected("stall")))
        );
        assert!(stream.next_event().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_keep_alives_reset_idle_timer() {
        let beats = futures::stream::iter(0..4).then(|_| async {
            tokio::time::sleep(Duration::from_secs(20)).await;
            Ok::<_, String>(Bytes::from_static(b"\r\n"))
        });
        let line = futures::stream::iter([Ok(Bytes::from_static(b"{\"data\":{\"text\":\"a\"}}\n"))]);
        let mut stream = TwitterStream::new(beats.chain(line).boxed())
            .with_idle_timeout(Duration::from_secs(30));

        match stream.next_event().await {
            Some(StreamEvent::Item(item)) => assert_eq!(item.text, "a"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_oversized_line_is_protocol_error() {
        let chunk = Bytes::from(vec![b'x'; MAX_LINE_BYTES + 1]);
        let mut stream = TwitterStream::new(
            futures::stream::iter([Ok(chunk)])
                .chain(futures::stream::pending())
                .boxed(),
        );
        assert!(matches!(
            stream.next_event().await,
            Some(StreamEvent::Error(StreamError::Protocol { .. }))
        ));
        assert!(stream.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_subscribe_unreachable_is_connect_error() {
        let source = TwitterStreamSource::new("b", "http://127.0.0.1:1", "826639173557837824");
        assert_eq!(source.rule_value(), "from:826639173557837824");
        let err = match source.subscribe().await {
            Err(e) => e,
            Ok(_) => panic!("subscribe should fail"),
        };
        assert!(matches!(err, StreamError::Connect { .. }));
    }
}
