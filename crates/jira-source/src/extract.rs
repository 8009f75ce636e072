//! Change extraction from issue records.

use chrono::{DateTime, Utc};
use sync_core::{CommentAdded, Event, FieldChanged, IssueCreated, IssueRef};

use crate::IssueRecord;

/// Derive the events of one issue that happened strictly after `watermark`.
///
/// Emission order is: creation, then history items in history order (items
/// keep their position within the history entry), then comments. An issue
/// whose creation and update timestamps are equal was never touched after
/// it was filed, so it yields `IssueCreated` when filed after `watermark`.
pub fn extract_events(record: &IssueRecord, watermark: DateTime<Utc>) -> Vec<Event> {
    let issue = IssueRef::new(&record.key, &record.summary);
    let mut events = Vec::new();

    if record.created == record.updated && record.created > watermark {
        events.push(Event::IssueCreated(IssueCreated {
            issue: issue.clone(),
            timestamp: record.created,
            creator_name: record.creator_name.clone(),
            description: record.description.clone(),
        }));
    }

    for history in record.histories.iter().filter(|h| h.created > watermark) {
        for (item_index, item) in history.items.iter().enumerate() {
            events.push(Event::FieldChanged(FieldChanged {
                issue: issue.clone(),
                timestamp: history.created,
                field: item.field.clone(),
                from: item.from.clone(),
                to: item.to.clone(),
                author_key: history.author_key.clone(),
                author_name: history.author_name.clone(),
                history_id: history.id,
                item_index,
            }));
        }
    }

    for comment in record.comments.iter().filter(|c| c.created > watermark) {
        events.push(Event::CommentAdded(CommentAdded {
            issue: issue.clone(),
            timestamp: comment.created,
            comment_id: comment.id.clone(),
            author_name: comment.author_name.clone(),
            body: comment.body.clone(),
        }));
    }

    events
}
