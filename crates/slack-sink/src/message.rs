//! `chat.postMessage` payloads.

use serde::Serialize;
use sync_core::{Event, IssueGroup};

use crate::SlackConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub channel: String,
    pub text: String,
    pub username: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub author_name: String,
    pub title: String,
    pub text: String,
    /// Unix seconds.
    pub ts: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mrkdwn_in: Vec<&'static str>,
}

/// Build the message announcing one issue group.
pub fn build_message(group: &IssueGroup, config: &SlackConfig) -> Message {
    let text = format!(
        "<{}/browse/{key}|{key}> *{}*",
        config.jira_url.trim_end_matches('/'),
        group.summary,
        key = group.key,
    );
    Message {
        channel: config.channel.clone(),
        text,
        username: config.username.clone(),
        attachments: group
            .events
            .iter()
            .filter_map(|event| attachment(event, &config.muted_authors))
            .collect(),
    }
}

fn attachment(event: &Event, muted_authors: &[String]) -> Option<Attachment> {
    let ts = event.timestamp().timestamp();
    match event {
        Event::IssueCreated(created) => Some(Attachment {
            author_name: created.creator_name.clone(),
            title: "Issue is created".to_string(),
            text: created.description.clone(),
            ts,
            mrkdwn_in: Vec::new(),
        }),
        // Comment edits show up in the history too; the comment itself is posted separately.
        Event::FieldChanged(change) if change.field == "Comment" => None,
        Event::FieldChanged(change) => {
            let from = match change.from.as_deref() {
                Some(from) if !from.is_empty() => format!("{from} --> "),
                _ => String::new(),
            };
            Some(Attachment {
                author_name: change.author_name.clone(),
                title: format!("{} field is changed", change.field),
                text: format!("{from}{}", change.to.as_deref().unwrap_or_default()),
                ts,
                mrkdwn_in: vec!["text", "footer", "title"],
            })
        }
        Event::CommentAdded(comment) => {
            let text = if muted_authors.contains(&comment.author_name) {
                String::new()
            } else {
                comment.body.replace('\n', "\n\n")
            };
            Some(Attachment {
                author_name: comment.author_name.clone(),
                title: "Comment".to_string(),
                text,
                ts,
                mrkdwn_in: vec!["text", "footer", "title"],
            })
        }
    }
}
