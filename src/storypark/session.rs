use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};

use super::catalog::{parse_story_page, StoryPage};
use super::endpoints::Endpoints;
use super::error::ApiError;
use super::story::{parse_activity, Story};
use super::token::{extract_authenticity_token, AuthenticityToken};
use super::StoryparkApi;
use crate::download::file::media_client_builder;
use crate::types::{ChildId, PageToken, StoryId};

const DEFAULT_USER_AGENT: &str = concat!("storypark-sync/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Unauthenticated HTTP client with a cookie jar, ready to sign in.
pub struct StoryparkClient {
    client: Client,
    media_client: Client,
    endpoints: Endpoints,
}

impl StoryparkClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));

        let jar = Arc::new(reqwest::cookie::Jar::default());
        let client = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .default_headers(default_headers.clone())
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        // Same cookies, but no whole-request deadline: a large video may take
        // far longer than `timeout` to stream.
        let media_client = media_client_builder(timeout)
            .cookie_provider(jar)
            .default_headers(default_headers)
            .build()
            .context("Failed to build media HTTP client")?;

        Ok(Self {
            client,
            media_client,
            endpoints: Endpoints::new(base_url),
        })
    }

    /// Sign in with the web form and return the authenticated session.
    ///
    /// The sign-in page is scraped for the form's authenticity token, which is
    /// posted back with the credentials. Success is judged by HTTP status only;
    /// the session cookies set by the response are kept in the client's jar.
    pub async fn login(self, username: &str, password: &str) -> Result<Session, ApiError> {
        let url = self.endpoints.sign_in();

        tracing::info!(url = %url, "Fetching sign-in page for authenticity token");
        let response = send(self.client.get(&url), &url).await?;
        let html = response
            .text()
            .await
            .map_err(|e| ApiError::from_reqwest(&url, e))?;

        let token = extract_authenticity_token(&html).inspect_err(|e| {
            tracing::error!(error = %e, "Could not read authenticity token from sign-in page");
            tracing::debug!(html = %html, "Sign-in page markup");
        })?;
        tracing::debug!("Found authenticity token");

        let form = [
            ("user[email]", username),
            ("user[password]", password),
            ("authenticity_token", token.as_str()),
        ];
        tracing::info!(username, "Signing in");
        let response = send(self.client.post(&url).form(&form), &url).await?;
        tracing::debug!(status = response.status().as_u16(), "Sign-in accepted");

        Ok(Session {
            client: self.client,
            media_client: self.media_client,
            endpoints: self.endpoints,
            token,
        })
    }
}

/// An authenticated Storypark session.
///
/// Owns the cookie-bearing client and the authenticity token captured at
/// login. Dropping a session does not sign out; call [`Session::logout`].
pub struct Session {
    client: Client,
    media_client: Client,
    endpoints: Endpoints,
    token: AuthenticityToken,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base", &self.endpoints.base())
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// The cookie-bearing client for media downloads. It bounds connecting
    /// and each read by the configured timeout, not the whole transfer.
    pub fn media_client(&self) -> &Client {
        &self.media_client
    }

    /// Sign out, invalidating the session server-side.
    ///
    /// Best-effort: runs on both the success and failure paths of a sync, so
    /// errors are logged and swallowed.
    pub async fn logout(self) {
        let url = self.endpoints.sign_out();
        let form = [
            ("_method", "delete"),
            ("authenticity_token", self.token.as_str()),
        ];
        tracing::info!("Logging out of Storypark");
        tracing::debug!(url = %url, "Sending sign-out request");

        match send(self.client.post(&url).form(&form), &url).await {
            Ok(response) => {
                tracing::debug!(status = response.status().as_u16(), "Signed out");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Logout failed; the server session may stay open until it expires");
            }
        }
    }

    async fn get_body(&self, builder: RequestBuilder, url: &str) -> Result<String, ApiError> {
        let response = send(builder.header(ACCEPT, "application/json"), url).await?;
        response
            .text()
            .await
            .map_err(|e| ApiError::from_reqwest(url, e))
    }
}

#[async_trait::async_trait]
impl StoryparkApi for Session {
    async fn list_stories(
        &self,
        child_id: &ChildId,
        page_token: Option<&PageToken>,
    ) -> Result<StoryPage, ApiError> {
        let url = self.endpoints.stories(child_id);
        // The first request carries an empty token.
        let token = page_token.map(PageToken::as_str).unwrap_or("");
        let query = [
            ("sort_by", "updated_at"),
            ("story_type", "all"),
            ("page_token", token),
        ];

        let body = self.get_body(self.client.get(&url).query(&query), &url).await?;
        parse_story_page(&url, &body)
    }

    async fn get_story(&self, story_id: &StoryId) -> Result<Story, ApiError> {
        let url = self.endpoints.activity(story_id);
        tracing::info!(story_id = %story_id, "Fetching story details");

        let body = self.get_body(self.client.get(&url), &url).await?;
        parse_activity(&url, story_id, &body)
    }
}

/// Send a request and reject non-2xx responses.
async fn send(builder: RequestBuilder, url: &str) -> Result<Response, ApiError> {
    tracing::debug!("Request to {}", url);
    let response = builder
        .send()
        .await
        .map_err(|e| ApiError::from_reqwest(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(response)
}
