//! Sync orchestrator. Walks a child's story listing and mirrors every story
//! into `{root}/{created_at}.{id}[.{slug}]/`, one story and one media item at
//! a time.
//!
//! Listing and story-fetch failures end the run; media failures never do.
//! For each story the metadata file is written before any media is fetched.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use tokio::fs;
use tokio_util::sync::CancellationToken;

use crate::download::{self, paths, MediaOutcome};
use crate::retry::RetryConfig;
use crate::storypark::story::fetch_story;
use crate::storypark::{CatalogWalker, Story, StoryparkApi};
use crate::types::ChildId;

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub retry: RetryConfig,
}

/// Counts for the end-of-run report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub stories: usize,
    pub downloaded: usize,
    pub degraded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub interrupted: bool,
}

impl SyncSummary {
    fn record(&mut self, outcome: MediaOutcome) {
        match outcome {
            MediaOutcome::Skipped => self.skipped += 1,
            MediaOutcome::Done => self.downloaded += 1,
            MediaOutcome::DoneDegraded => self.degraded += 1,
            MediaOutcome::Failed => self.failed += 1,
        }
    }

    pub fn log(&self, elapsed: std::time::Duration) {
        tracing::info!("── Summary ──");
        if self.interrupted {
            tracing::info!("  Interrupted by shutdown request");
        }
        tracing::info!("  {} stories mirrored", self.stories);
        tracing::info!(
            "  {} downloaded ({} at reduced quality), {} already present, {} failed",
            self.downloaded + self.degraded,
            self.degraded,
            self.skipped,
            self.failed
        );
        tracing::info!("  elapsed: {}s", elapsed.as_secs());
        if self.failed > 0 {
            tracing::warn!(
                "{} media items could not be downloaded; re-run to try them again",
                self.failed
            );
        }
    }
}

/// Mirror every story of `child_id` into `output_root`.
///
/// Stops early (with `interrupted` set) once `shutdown` is cancelled, between
/// stories or media items. Errors from the listing or story endpoints, and
/// failures to create a story directory or write its metadata, are returned;
/// the caller is responsible for logging out either way.
pub async fn sync_stories(
    api: &dyn StoryparkApi,
    client: &Client,
    child_id: &ChildId,
    output_root: &Path,
    options: &SyncOptions,
    shutdown: &CancellationToken,
) -> Result<SyncSummary> {
    let started = Instant::now();
    let mut summary = SyncSummary::default();
    let mut walker = CatalogWalker::new(api, child_id, &options.retry);

    'pages: while let Some(story_ids) = walker.next_page().await? {
        for story_id in story_ids {
            if shutdown.is_cancelled() {
                summary.interrupted = true;
                break 'pages;
            }

            let story = fetch_story(api, &story_id, &options.retry)
                .await
                .with_context(|| format!("Failed to fetch story {story_id}"))?;
            mirror_story(client, &story, output_root, options, shutdown, &mut summary).await?;
            summary.stories += 1;
        }
    }

    tracing::debug!(
        pages = walker.pages_fetched(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Story listing finished"
    );
    Ok(summary)
}

/// Write one story's directory, metadata and media.
async fn mirror_story(
    client: &Client,
    story: &Story,
    output_root: &Path,
    options: &SyncOptions,
    shutdown: &CancellationToken,
    summary: &mut SyncSummary,
) -> Result<()> {
    let story_dir = output_root.join(paths::story_dir_name(story));
    if !story_dir.exists() {
        tracing::info!(path = %story_dir.display(), "Creating story directory");
        fs::create_dir_all(&story_dir)
            .await
            .with_context(|| format!("Failed to create {}", story_dir.display()))?;
    }

    let info_path = write_story_info(&story_dir, story).await?;
    tracing::info!(story_id = %story.id(), path = %info_path.display(), "Wrote story details");

    if story.media().is_empty() {
        tracing::info!(story_id = %story.id(), "Story contains no media items to download");
        return Ok(());
    }

    for item in story.media() {
        if shutdown.is_cancelled() {
            summary.interrupted = true;
            return Ok(());
        }
        let download_path = story_dir.join(paths::media_file_name(item));
        let outcome =
            download::fetch_media(client, item, &download_path, &options.retry).await;
        summary.record(outcome);
    }
    Ok(())
}

/// Serialize the raw story record to `info.json` in `story_dir`, replacing any
/// earlier copy. Four-space indentation; non-ASCII text is written as-is.
pub async fn write_story_info(story_dir: &Path, story: &Story) -> Result<PathBuf> {
    let mut json = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut json, formatter);
    story
        .record()
        .serialize(&mut serializer)
        .context("Failed to serialize story record")?;

    let info_path = story_dir.join(paths::INFO_FILE_NAME);
    fs::write(&info_path, json)
        .await
        .with_context(|| format!("Failed to write {}", info_path.display()))?;
    Ok(info_path)
}
