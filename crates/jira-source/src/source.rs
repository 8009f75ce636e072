//! Source trait definition.

use chrono::{DateTime, Utc};

use crate::{SearchPage, SourceError};

/// A paginated issue source queried by update time.
#[async_trait::async_trait]
pub trait IssueSource: Send {
    /// Fetch a page of issues updated strictly after `since`, restricted by
    /// `filter` and ordered ascending by update time, skipping the first
    /// `start_at` matches.
    async fn fetch_page(
        &mut self,
        since: DateTime<Utc>,
        start_at: u64,
        filter: &str,
    ) -> Result<SearchPage, SourceError>;
}

#[async_trait::async_trait]
impl<S: IssueSource + ?Sized> IssueSource for Box<S> {
    async fn fetch_page(
        &mut self,
        since: DateTime<Utc>,
        start_at: u64,
        filter: &str,
    ) -> Result<SearchPage, SourceError> {
        (**self).fetch_page(since, start_at, filter).await
    }
}
