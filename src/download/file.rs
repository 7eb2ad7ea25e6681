use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, ClientBuilder};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

use super::error::DownloadError;
use crate::retry::{self, RetryConfig};

/// Size of the write buffer between the response stream and the file.
/// Bounds memory per download regardless of asset size.
pub const WRITE_BUFFER_SIZE: usize = 1024 * 1024;

/// Client settings for media transfers.
///
/// Only connecting and each individual read are bounded by `timeout`; the
/// transfer as a whole is not, so a large video that keeps streaming is never
/// cut off part way.
pub fn media_client_builder(timeout: Duration) -> ClientBuilder {
    Client::builder()
        .connect_timeout(timeout)
        .read_timeout(timeout)
}

/// Sibling path a download is streamed into before being renamed into place.
pub fn part_path(download_path: &Path) -> PathBuf {
    let mut name = download_path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".part");
    download_path.with_file_name(name)
}

/// Download `url` to `download_path` via a `.part` file.
///
/// The destination only appears once the whole body has been written, so a
/// crash or failed transfer never leaves a truncated file where the
/// exists-check would mistake it for a finished one. Transient failures are
/// retried with backoff; the `.part` file is removed when all attempts fail.
/// Returns the number of bytes written.
pub async fn download_file(
    client: &Client,
    url: &str,
    download_path: &Path,
    retry_config: &RetryConfig,
) -> Result<u64, DownloadError> {
    let part_path = part_path(download_path);

    let result = retry::retry_transient(retry_config, || async {
        // Each attempt starts from an empty file.
        let _ = fs::remove_file(&part_path).await;
        attempt_download(client, url, download_path, &part_path).await
    })
    .await;

    if result.is_err() {
        let _ = fs::remove_file(&part_path).await;
    }
    result
}

async fn attempt_download(
    client: &Client,
    url: &str,
    download_path: &Path,
    part_path: &Path,
) -> Result<u64, DownloadError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| DownloadError::from_reqwest(url, e, 0))?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    let content_length = response.content_length();

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(part_path)
        .await?;
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);

    let mut bytes_written: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            tracing::warn!(
                url,
                status = status.as_u16(),
                ?content_length,
                bytes_written,
                "Body stream error: {}",
                e
            );
            DownloadError::from_reqwest(url, e, bytes_written)
        })?;
        writer.write_all(&chunk).await?;
        bytes_written += chunk.len() as u64;
    }
    writer.flush().await?;
    drop(writer);

    fs::rename(part_path, download_path).await?;
    Ok(bytes_written)
}
