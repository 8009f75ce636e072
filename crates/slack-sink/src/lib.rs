//! Slack sink.
//!
//! Buffers committed events and, in `finish`, posts one `chat.postMessage`
//! per contiguous run of same-issue events. Each event becomes one message
//! attachment.

mod message;

use std::time::Duration;

use issue_sink::{Sink, SinkError};
use reqwest::Client;
use serde::Deserialize;
use sync_core::{group_by_issue, Event};

pub use message::{build_message, Attachment, Message};

pub const DEFAULT_API_BASE: &str = "https://slack.com/api";

#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub token: String,
    pub channel: String,
    /// Base URL of the issue tracker, used for issue links.
    pub jira_url: String,
    /// Display names whose comment bodies are not forwarded.
    pub muted_authors: Vec<String>,
    pub api_base: String,
    /// Bot name shown on posted messages.
    pub username: String,
    pub timeout: Duration,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            channel: "sandbox".to_string(),
            jira_url: "http://localhost".to_string(),
            muted_authors: Vec::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            username: "Jira changes bot".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct SlackSink {
    client: Client,
    config: SlackConfig,
    pending: Vec<Event>,
    committed: Vec<Event>,
}

#[derive(Debug, Deserialize)]
struct PostResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SlackSink {
    pub fn new(config: SlackConfig) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(SinkError::backend)?;
        Ok(Self {
            client,
            config,
            pending: Vec::new(),
            committed: Vec::new(),
        })
    }

    async fn post(&self, message: &Message) -> Result<(), SinkError> {
        let url = format!(
            "{}/chat.postMessage",
            self.config.api_base.trim_end_matches('/')
        );
        tracing::debug!("POST {url} ({} attachments)", message.attachments.len());

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(message)
            .send()
            .await
            .map_err(SinkError::backend)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                destination: "slack",
                message: format!("HTTP {status}: {body}"),
            });
        }

        let reply: PostResponse = response.json().await.map_err(SinkError::backend)?;
        if !reply.ok {
            return Err(SinkError::Rejected {
                destination: "slack",
                message: reply.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Sink for SlackSink {
    async fn begin(&mut self) -> Result<(), SinkError> {
        self.pending.clear();
        Ok(())
    }

    async fn record(&mut self, event: Event) -> Result<(), SinkError> {
        self.pending.push(event);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SinkError> {
        self.committed.append(&mut self.pending);
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        let groups = group_by_issue(std::mem::take(&mut self.committed));
        tracing::info!(
            "Posting {} messages to #{}",
            groups.len(),
            self.config.channel
        );
        for group in &groups {
            let message = build_message(group, &self.config);
            self.post(&message).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use sync_core::{CommentAdded, IssueRef};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(api_base: &str) -> SlackConfig {
        SlackConfig {
            token: "xoxb-test".to_string(),
            channel: "dev".to_string(),
            jira_url: "https://issues.example.org/jira".to_string(),
            api_base: api_base.to_string(),
            ..Default::default()
        }
    }

    fn comment(key: &str, min: u32) -> Event {
        Event::CommentAdded(CommentAdded {
            issue: IssueRef::new(key, "Flaky test"),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, min, 0).unwrap(),
            comment_id: min.to_string(),
            author_name: "Ann".to_string(),
            body: "ok".to_string(),
        })
    }

    async fn deliver(sink: &mut SlackSink, events: Vec<Event>) -> Result<(), SinkError> {
        sink.begin().await?;
        for event in events {
            sink.record(event).await?;
        }
        sink.commit().await?;
        sink.finish().await
    }

    #[tokio::test]
    async fn posts_one_message_per_group() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(header("authorization", "Bearer xoxb-test"))
            .and(body_partial_json(json!({"channel": "dev"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(3)
            .mount(&server)
            .await;

        let mut sink = SlackSink::new(config(&server.uri())).unwrap();
        deliver(
            &mut sink,
            vec![
                comment("A-1", 1),
                comment("A-1", 2),
                comment("B-1", 3),
                comment("A-1", 4),
            ],
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn message_links_issue() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(body_partial_json(json!({
                "text": "<https://issues.example.org/jira/browse/A-1|A-1> *Flaky test*"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let mut sink = SlackSink::new(config(&server.uri())).unwrap();
        deliver(&mut sink, vec![comment("A-1", 1)]).await.unwrap();
    }

    #[tokio::test]
    async fn not_ok_reply_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": false, "error": "channel_not_found"})),
            )
            .mount(&server)
            .await;

        let mut sink = SlackSink::new(config(&server.uri())).unwrap();
        let err = deliver(&mut sink, vec![comment("A-1", 1)]).await.unwrap_err();

        match err {
            SinkError::Rejected {
                destination,
                message,
            } => {
                assert_eq!(destination, "slack");
                assert_eq!(message, "channel_not_found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_error_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let mut sink = SlackSink::new(config(&server.uri())).unwrap();
        let err = deliver(&mut sink, vec![comment("A-1", 1)]).await.unwrap_err();
        assert!(matches!(err, SinkError::Rejected { .. }));
    }

    #[tokio::test]
    async fn nothing_posted_without_events() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(0)
            .mount(&server)
            .await;

        let mut sink = SlackSink::new(config(&server.uri())).unwrap();
        deliver(&mut sink, Vec::new()).await.unwrap();
    }
}
