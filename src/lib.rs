//! issue-sync library
//!
//! Incrementally synchronizes issue-tracker activity (new issues, field
//! changes and comments) from a Jira instance into a destination sink.
//!
//! # Features
//!
//! - Watermark-based change detection: only activity after the last
//!   synchronized instant is fetched and emitted
//! - Per-page transactions: a failed commit aborts the run without moving the
//!   persisted watermark, so a rerun re-delivers the failed page
//! - Watermarks namespaced by a fingerprint of the filter, so runs with
//!   different filters never interfere
//! - Sinks: console, Slack and PostgreSQL
//!
//! # CLI Usage
//!
//! ```bash
//! # Print the last day of changes of a project
//! issue-sync --jira-url https://issues.apache.org/jira --jql "project = HDDS" console
//!
//! # Notify a Slack channel about everything since the previous run
//! issue-sync --jql "project = HDDS" slack --token xoxb-... --channel ozone
//!
//! # Mirror issues, changes and comments into PostgreSQL
//! issue-sync --jql "project = HDDS" todb --pg-host localhost --pg-user sync \
//!   --pg-password secret --pg-database jira
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

pub mod config;
mod error;
pub mod sync;

pub use error::SyncError;
pub use sync::{Since, SyncDriver, SyncOptions, SyncReport};

use issue_sync_jira_source::JiraClientConfig;

/// Source connection and run options shared by every destination.
#[derive(Parser, Clone, Debug)]
pub struct JiraOpts {
    /// Base URL of the Jira instance
    #[arg(
        long,
        alias = "jurl",
        default_value = "http://localhost",
        env = "JIRA_URL"
    )]
    pub jira_url: String,

    /// Jira username (requests are anonymous when unset)
    #[arg(long, alias = "jusername", env = "JIRA_USERNAME")]
    pub jira_username: Option<String>,

    /// Jira password
    #[arg(long, alias = "jpassword", env = "JIRA_PASSWORD")]
    pub jira_password: Option<String>,

    /// Custom JQL fragment to add to the query
    #[arg(long, default_value = "", env = "JIRA_JQL")]
    pub jql: String,

    /// Where to start: "last" (continue from the previous run) or Unix epoch seconds
    #[arg(long, default_value = "last")]
    pub since: String,

    /// Minimum interval between two Jira requests (e.g. "10s", "1m")
    #[arg(long, default_value = "10s", env = "JIRA_RATE_LIMIT")]
    pub rate_limit: String,

    /// Deadline for a single Jira request
    #[arg(long, default_value = "60s", env = "JIRA_REQUEST_TIMEOUT")]
    pub request_timeout: String,

    /// How far back to look when no watermark is known
    #[arg(long, default_value = "5d")]
    pub lookback: String,

    /// Directory holding per-filter watermark files [default: $HOME/.issue-sync]
    #[arg(long, env = "ISSUE_SYNC_STATE_DIR")]
    pub state_dir: Option<PathBuf>,
}

impl JiraOpts {
    pub fn client_config(&self) -> anyhow::Result<JiraClientConfig> {
        Ok(JiraClientConfig {
            base_url: self.jira_url.clone(),
            username: self.jira_username.clone(),
            password: self.jira_password.clone(),
            rate_limit: config::parse_duration(&self.rate_limit)
                .context("Invalid --rate-limit")?,
            timeout: config::parse_duration(&self.request_timeout)
                .context("Invalid --request-timeout")?,
        })
    }

    pub fn sync_options(&self) -> anyhow::Result<SyncOptions> {
        let lookback = config::parse_duration_to_secs(&self.lookback)
            .context("Invalid --lookback")?;
        Ok(SyncOptions {
            filter: self.jql.clone(),
            since: self.since.parse()?,
            lookback: chrono::Duration::seconds(lookback),
        })
    }

    /// The configured state directory, or `.issue-sync` under the home directory.
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".issue-sync")
        })
    }
}

/// Slack destination options.
#[derive(Parser, Clone, Debug)]
pub struct SlackOpts {
    /// Slack bot token
    #[arg(long, env = "SLACK_TOKEN")]
    pub token: String,

    /// Channel to post the changes to
    #[arg(long, default_value = "sandbox")]
    pub channel: String,

    /// Display name whose comment bodies are not forwarded (repeatable)
    #[arg(long = "mute-author", value_name = "NAME")]
    pub mute_authors: Vec<String>,
}

/// PostgreSQL destination options.
#[derive(Parser, Clone, Debug)]
pub struct PgOpts {
    /// PostgreSQL host
    #[arg(long, alias = "pgserver", default_value = "localhost", env = "PGHOST")]
    pub pg_host: String,

    /// PostgreSQL user
    #[arg(long, alias = "pgusername", default_value = "postgres", env = "PGUSER")]
    pub pg_user: String,

    /// PostgreSQL password
    #[arg(long, alias = "pgpassword", default_value = "", env = "PGPASSWORD")]
    pub pg_password: String,

    /// PostgreSQL database
    #[arg(long, alias = "pgdb", default_value = "jira", env = "PGDATABASE")]
    pub pg_database: String,
}

impl From<&PgOpts> for postgresql_sink::PgConfig {
    fn from(opts: &PgOpts) -> Self {
        Self {
            host: opts.pg_host.clone(),
            user: opts.pg_user.clone(),
            password: opts.pg_password.clone(),
            database: opts.pg_database.clone(),
        }
    }
}
