use thiserror::Error;

/// Typed media download errors.
///
/// Two classifications hang off this type: `is_retryable()` drives the
/// per-URL backoff loop, and `allows_fallback()` decides whether a failed
/// original-quality download may be retried from the resized URL.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP error {status} downloading {url}")]
    HttpStatus { status: u16, url: String },

    #[error("timed out downloading {url} after {bytes_written} bytes")]
    Timeout { url: String, bytes_written: u64 },

    #[error("transfer of {url} failed after {bytes_written} bytes: {source}")]
    Http {
        url: String,
        bytes_written: u64,
        #[source]
        source: reqwest::Error,
    },

    #[error("disk error: {0}")]
    Disk(#[from] std::io::Error),
}

impl DownloadError {
    pub fn from_reqwest(url: &str, source: reqwest::Error, bytes_written: u64) -> Self {
        if source.is_timeout() {
            DownloadError::Timeout {
                url: url.to_string(),
                bytes_written,
            }
        } else {
            DownloadError::Http {
                url: url.to_string(),
                bytes_written,
                source,
            }
        }
    }

    /// Whether this error is transient and worth retrying against the same URL.
    pub fn is_retryable(&self) -> bool {
        match self {
            DownloadError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            DownloadError::Timeout { .. } => true,
            DownloadError::Http { .. } => true,
            DownloadError::Disk(_) => false,
        }
    }

    /// Whether the resized rendition is worth trying after this error on the original.
    ///
    /// Any remote failure qualifies, timeouts included. A local disk failure
    /// would hit the fallback just the same, so it does not.
    pub fn allows_fallback(&self) -> bool {
        !matches!(self, DownloadError::Disk(_))
    }
}
