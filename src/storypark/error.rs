use thiserror::Error;

/// Failures talking to the Storypark web application and API.
///
/// `is_retryable()` separates transient faults (timeouts, dropped
/// connections, rate limits, server errors) from ones that will not change on
/// a second attempt (auth markup changes, client errors, schema violations).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("sign-in page has no authenticity_token input; the login markup may have changed")]
    AuthTokenMissing,

    #[error("sign-in page authenticity_token input is empty")]
    AuthTokenEmpty,

    #[error("HTTP error {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("request to {url} timed out")]
    NetworkTimeout { url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },
}

impl ApiError {
    /// Classify a reqwest failure, keeping timeouts distinct from other transport errors.
    pub fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            ApiError::NetworkTimeout {
                url: url.to_string(),
            }
        } else {
            ApiError::Transport {
                url: url.to_string(),
                source,
            }
        }
    }

    pub fn malformed(url: &str, reason: impl Into<String>) -> Self {
        ApiError::MalformedResponse {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            ApiError::NetworkTimeout { .. } => true,
            ApiError::Transport { .. } => true,
            ApiError::AuthTokenMissing
            | ApiError::AuthTokenEmpty
            | ApiError::MalformedResponse { .. } => false,
        }
    }
}
