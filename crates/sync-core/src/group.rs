//! Ordering and grouping for presentation-oriented sinks.
//!
//! Buffering sinks render their events once, at the end of a run. They all
//! follow the same contract: sort by event timestamp (stable, so arrival
//! order breaks ties), then fold consecutive events of the same issue under
//! one header.

use crate::Event;

/// A contiguous run of events belonging to one issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueGroup {
    pub key: String,
    pub summary: String,
    pub events: Vec<Event>,
}

/// Sort events by timestamp ascending, keeping arrival order for equal timestamps.
pub fn sort_for_presentation(events: &mut [Event]) {
    // slice::sort_by_key is stable
    events.sort_by_key(|e| e.timestamp());
}

/// Sort `events` and split them into runs of consecutive same-issue events.
///
/// The same issue can appear in more than one group when another issue's
/// events fall between its own in time.
pub fn group_by_issue(mut events: Vec<Event>) -> Vec<IssueGroup> {
    sort_for_presentation(&mut events);

    let mut groups: Vec<IssueGroup> = Vec::new();
    for event in events {
        match groups.last_mut() {
            Some(group) if group.key == event.issue_key() => group.events.push(event),
            _ => groups.push(IssueGroup {
                key: event.issue_key().to_string(),
                summary: event.issue_summary().to_string(),
                events: vec![event],
            }),
        }
    }
    groups
}
