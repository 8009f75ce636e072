//! Command-line interface for issue-sync
//!
//! # Usage Examples
//!
//! ```bash
//! # Changes of the last 24 hours, printed to stdout
//! issue-sync --jira-url https://issues.apache.org/jira --jql "project = HDDS" console
//!
//! # Changes since an explicit instant (Unix seconds)
//! issue-sync --jql "project = HDDS" --since 1714557600 console
//!
//! # Post changes since the previous run to Slack
//! issue-sync --jql "project = HDDS" slack --token xoxb-... --channel ozone \
//!   --mute-author "Hadoop QA"
//!
//! # Mirror into PostgreSQL
//! issue-sync --jql "project = HDDS" todb --pg-host localhost --pg-user sync \
//!   --pg-password secret --pg-database jira
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG` (default `info`).

use anyhow::Context;
use checkpoint::{FilesystemStore, NullStore, WatermarkStore};
use clap::{Parser, Subcommand};
use console_sink::ConsoleSink;
use issue_sink::Sink;
use issue_sync::{JiraOpts, PgOpts, SlackOpts, SyncDriver};
use issue_sync_jira_source::JiraClient;
use postgresql_sink::{PgSink, PgWatermarkStore};
use slack_sink::{SlackConfig, SlackSink};
use sync_core::Fingerprint;
use tracing::info;

#[derive(Parser)]
#[command(name = "issue-sync")]
#[command(about = "Incrementally sync Jira changes to the console, Slack or PostgreSQL")]
#[command(long_about = None)]
struct Cli {
    #[command(flatten)]
    jira: JiraOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the latest changes to the console
    Console,

    /// Send the latest changes to Slack
    Slack {
        #[command(flatten)]
        opts: SlackOpts,
    },

    /// Save issues, changes and comments to PostgreSQL
    Todb {
        #[command(flatten)]
        opts: PgOpts,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let jira = cli.jira;

    match cli.command {
        Commands::Console => sync(&jira, ConsoleSink::stdout(), NullStore).await,
        Commands::Slack { opts } => {
            let sink = SlackSink::new(SlackConfig {
                token: opts.token,
                channel: opts.channel,
                jira_url: jira.jira_url.clone(),
                muted_authors: opts.mute_authors,
                ..Default::default()
            })?;
            let store = FilesystemStore::new(jira.state_dir());
            sync(&jira, sink, store).await
        }
        Commands::Todb { opts } => {
            let config = postgresql_sink::PgConfig::from(&opts);
            let client = postgresql_sink::connect(&config.connection_string())
                .await
                .with_context(|| {
                    format!("Failed to connect to PostgreSQL at {}", opts.pg_host)
                })?;
            postgresql_sink::ensure_schema(&client)
                .await
                .context("Failed to create the issue tables")?;

            let fingerprint = Fingerprint::of(&jira.jql);
            let sink = PgSink::new(client.clone(), &fingerprint);
            sync(&jira, sink, PgWatermarkStore::new(client)).await
        }
    }
}

async fn sync<K: Sink, W: WatermarkStore>(
    jira: &JiraOpts,
    sink: K,
    store: W,
) -> anyhow::Result<()> {
    let options = jira.sync_options()?;
    let source = JiraClient::new(jira.client_config()?)?;

    let mut driver = SyncDriver::new(source, sink, store, options);
    let report = driver.run().await.map_err(|e| {
        tracing::error!("Sync aborted ({} error)", e.category());
        e
    })?;

    info!(
        "Synced {} issues, {} events in {} pages; watermark {} (fingerprint {})",
        report.issues,
        report.events,
        report.pages,
        report.watermark.to_rfc3339(),
        report.fingerprint
    );
    Ok(())
}
