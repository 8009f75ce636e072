//! Table definitions.

use tokio_postgres::Client;

/// Idempotent DDL for every table the sink and the watermark store use.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS issue_sync_watermark (
    fingerprint TEXT PRIMARY KEY,
    updated TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS issue (
    selector TEXT NOT NULL,
    key TEXT NOT NULL,
    value JSONB NOT NULL,
    updated TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (selector, key)
);

CREATE TABLE IF NOT EXISTS issue_change (
    selector TEXT NOT NULL,
    key TEXT NOT NULL,
    history_id BIGINT NOT NULL,
    item_index INTEGER NOT NULL,
    created TIMESTAMPTZ NOT NULL,
    field TEXT NOT NULL,
    from_string TEXT,
    to_string TEXT,
    author_key TEXT NOT NULL,
    author_name TEXT NOT NULL,
    PRIMARY KEY (selector, key, history_id, item_index)
);

CREATE TABLE IF NOT EXISTS issue_comment (
    selector TEXT NOT NULL,
    key TEXT NOT NULL,
    comment_id TEXT NOT NULL,
    created TIMESTAMPTZ NOT NULL,
    author_name TEXT NOT NULL,
    body TEXT NOT NULL,
    PRIMARY KEY (selector, key, comment_id)
);
"#;

pub async fn ensure_schema(client: &Client) -> Result<(), tokio_postgres::Error> {
    client.batch_execute(SCHEMA).await
}
