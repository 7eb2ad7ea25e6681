//! storypark-sync — mirror a child's Storypark timeline to local storage.
//!
//! Signs in through the web login form, walks the child's story listing page
//! by page, and writes each story's record plus its photos and videos into a
//! stable directory layout. Re-running over the same root only fetches what
//! is missing.

#![warn(clippy::all)]

mod cli;
mod config;
mod download;
pub mod retry;
mod shutdown;
mod storypark;
mod sync;
mod types;

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use config::Config;
use storypark::{CatalogWalker, Session, StoryparkClient};

/// Create the download root if it is missing. Runs before any network I/O.
async fn ensure_root_dir(root: &Path) -> anyhow::Result<()> {
    if !root.exists() {
        tracing::info!(path = %root.display(), "Download path does not exist, creating it");
        tokio::fs::create_dir_all(root)
            .await
            .with_context(|| format!("Failed to create download path {}", root.display()))?;
    }
    Ok(())
}

async fn run_list_stories(session: &Session, config: &Config) -> anyhow::Result<()> {
    let ids = CatalogWalker::new(session, &config.child_id, &config.retry)
        .collect_all()
        .await?;
    println!("Stories for child {} ({}):", config.child_id, ids.len());
    for id in &ids {
        println!("  {id}");
    }
    Ok(())
}

async fn run_sync(
    session: &Session,
    config: &Config,
    shutdown_token: &CancellationToken,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let options = sync::SyncOptions {
        retry: config.retry.clone(),
    };
    let summary = sync::sync_stories(
        session,
        session.media_client(),
        &config.child_id,
        &config.root_path,
        &options,
        shutdown_token,
    )
    .await?;
    summary.log(started.elapsed());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    let config = Config::from_cli(cli)?;
    tracing::debug!(?config, "Resolved configuration");
    tracing::info!(child_id = %config.child_id, "Starting storypark-sync");

    if !config.list_stories {
        ensure_root_dir(&config.root_path).await?;
    }
    let shutdown_token = shutdown::install_signal_handler()?;

    let client = StoryparkClient::new(&config.base_url, config.timeout)?;
    let session = client
        .login(&config.username, &config.password)
        .await
        .context("Login failed")?;
    tracing::info!("Logged in");

    let result = if config.list_stories {
        run_list_stories(&session, &config).await
    } else {
        run_sync(&session, &config, &shutdown_token).await
    };

    // Log out whether or not the sync succeeded.
    session.logout().await;
    result
}
