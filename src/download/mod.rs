//! Media download engine — per-item two-tier retrieval.
//!
//! Each media item is tried at original quality first; if the original is
//! refused or unreachable the resized rendition is fetched instead. Files that
//! already exist locally are never requested again, which is what makes a
//! re-run over a previous output root cheap.

pub mod error;
pub mod file;
pub mod paths;

use std::path::Path;

use reqwest::Client;

use crate::retry::RetryConfig;
use crate::storypark::MediaItem;

/// What happened to one media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaOutcome {
    /// The destination already existed; no request was made.
    Skipped,
    /// Downloaded from the original-quality URL.
    Done,
    /// The original failed; downloaded from the resized URL.
    DoneDegraded,
    /// Both URLs failed, or the file could not be written.
    Failed,
}

/// Fetch one media item to `download_path`, falling back to the resized URL.
///
/// Never returns an error: failures are logged and reported as
/// [`MediaOutcome::Failed`] so one bad asset cannot stop the sync.
pub async fn fetch_media(
    client: &Client,
    item: &MediaItem,
    download_path: &Path,
    retry_config: &RetryConfig,
) -> MediaOutcome {
    if download_path.exists() {
        tracing::warn!(path = %download_path.display(), "File already exists, skipping download");
        return MediaOutcome::Skipped;
    }

    tracing::info!(
        url = %item.original_url,
        path = %download_path.display(),
        "Downloading original"
    );
    let original_err =
        match file::download_file(client, &item.original_url, download_path, retry_config).await {
            Ok(bytes) => {
                tracing::debug!(bytes, path = %download_path.display(), "Download complete");
                return MediaOutcome::Done;
            }
            Err(e) => e,
        };

    if !original_err.allows_fallback() {
        tracing::error!(
            path = %download_path.display(),
            error = %original_err,
            "Could not save media item"
        );
        return MediaOutcome::Failed;
    }

    tracing::warn!(
        error = %original_err,
        resized_url = %item.resized_url,
        "Original-quality download failed, trying resized URL"
    );
    match file::download_file(client, &item.resized_url, download_path, retry_config).await {
        Ok(bytes) => {
            tracing::info!(bytes, path = %download_path.display(), "Saved resized media");
            MediaOutcome::DoneDegraded
        }
        Err(e) => {
            tracing::error!(
                path = %download_path.display(),
                error = %e,
                "Resized URL also failed, ignoring media item"
            );
            MediaOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn immediate() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            base_delay_secs: 0,
            max_delay_secs: 0,
        }
    }

    fn item(server: &MockServer) -> MediaItem {
        MediaItem {
            file_name: "IMG_0001".into(),
            content_type: "image/jpeg".into(),
            original_url: format!("{}/original/1", server.uri()),
            resized_url: format!("{}/resized/1", server.uri()),
        }
    }

    #[tokio::test]
    async fn test_original_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/original/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("full"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/resized/1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("IMG_0001.jpg");
        let outcome = fetch_media(&Client::new(), &item(&server), &dest, &immediate()).await;

        assert_eq!(outcome, MediaOutcome::Done);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "full");
    }

    #[tokio::test]
    async fn test_forbidden_original_falls_back_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/original/1"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/resized/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("small"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("IMG_0001.jpg");
        let outcome = fetch_media(&Client::new(), &item(&server), &dest, &immediate()).await;

        assert_eq!(outcome, MediaOutcome::DoneDegraded);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "small");
        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn test_both_urls_fail_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/original/1"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/resized/1"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("IMG_0001.jpg");
        let outcome = fetch_media(&Client::new(), &item(&server), &dest, &immediate()).await;

        assert_eq!(outcome, MediaOutcome::Failed);
        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_existing_file_skipped_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("IMG_0001.jpg");
        std::fs::write(&dest, "previous run").unwrap();
        let outcome = fetch_media(&Client::new(), &item(&server), &dest, &immediate()).await;

        assert_eq!(outcome, MediaOutcome::Skipped);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "previous run");
    }

    #[tokio::test]
    async fn test_unwritable_destination_does_not_fall_back() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/original/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("full"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/resized/1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing-dir").join("IMG_0001.jpg");
        let outcome = fetch_media(&Client::new(), &item(&server), &dest, &immediate()).await;
        assert_eq!(outcome, MediaOutcome::Failed);
    }

    #[tokio::test]
    async fn test_original_timeout_falls_back_to_resized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/original/1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("full")
                    .set_delay(Duration::from_secs(5)),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/resized/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("small"))
            .expect(1)
            .mount(&server)
            .await;

        let client = Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let no_retry = RetryConfig {
            max_retries: 0,
            ..immediate()
        };
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("IMG_0001.jpg");
        let outcome = fetch_media(&client, &item(&server), &dest, &no_retry).await;

        assert_eq!(outcome, MediaOutcome::DoneDegraded);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "small");
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_skip_is_logged_at_warn() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("IMG_0001.jpg");
        std::fs::write(&dest, "previous run").unwrap();
        let outcome = fetch_media(&Client::new(), &item(&server), &dest, &immediate()).await;
        assert_eq!(outcome, MediaOutcome::Skipped);

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"), "{output}");
        assert!(output.contains("File already exists, skipping download"));
    }
}
