use serde::Deserialize;

use super::error::ApiError;
use super::StoryparkApi;
use crate::retry::{self, RetryConfig};
use crate::types::{ChildId, PageToken, StoryId};

/// One page of the story listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryPage {
    pub story_ids: Vec<StoryId>,
    /// `None` when the server signalled that this was the last page.
    pub next_page_token: Option<PageToken>,
}

#[derive(Deserialize)]
struct ListingResponse {
    stories: Vec<StoryRef>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct StoryRef {
    id: StoryId,
}

/// Parse the body of `GET /api/v3/children/{child_id}/stories`.
pub fn parse_story_page(url: &str, body: &str) -> Result<StoryPage, ApiError> {
    let listing: ListingResponse = serde_json::from_str(body)
        .map_err(|e| ApiError::malformed(url, format!("unexpected story listing: {e}")))?;

    Ok(StoryPage {
        story_ids: listing.stories.into_iter().map(|s| s.id).collect(),
        next_page_token: PageToken::from_response(listing.next_page_token),
    })
}

enum Cursor {
    Start,
    Next(PageToken),
    Exhausted,
}

/// Walks the story listing page by page in server order.
///
/// A page is handed to the caller before the walker looks at its
/// continuation token, so the final page (the one with an empty token) is
/// always yielded.
pub struct CatalogWalker<'a> {
    api: &'a dyn StoryparkApi,
    child_id: &'a ChildId,
    retry: &'a RetryConfig,
    cursor: Cursor,
    pages_fetched: usize,
}

impl<'a> CatalogWalker<'a> {
    pub fn new(api: &'a dyn StoryparkApi, child_id: &'a ChildId, retry: &'a RetryConfig) -> Self {
        Self {
            api,
            child_id,
            retry,
            cursor: Cursor::Start,
            pages_fetched: 0,
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Fetch the next page of story ids, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<StoryId>>, ApiError> {
        let token = match &self.cursor {
            Cursor::Exhausted => return Ok(None),
            Cursor::Start => None,
            Cursor::Next(token) => Some(token.clone()),
        };

        tracing::info!(
            child_id = %self.child_id,
            page_token = token.as_ref().map(PageToken::as_str).unwrap_or(""),
            "Listing stories"
        );

        let api = self.api;
        let child_id = self.child_id;
        let page =
            retry::retry_transient(self.retry, || api.list_stories(child_id, token.as_ref()))
                .await?;

        self.pages_fetched += 1;
        tracing::debug!(
            page = self.pages_fetched,
            stories = page.story_ids.len(),
            last_page = page.next_page_token.is_none(),
            "Received story listing page"
        );

        self.cursor = match page.next_page_token {
            Some(next) => Cursor::Next(next),
            None => Cursor::Exhausted,
        };
        Ok(Some(page.story_ids))
    }

    /// Drain the whole listing into one vector, preserving page order.
    pub async fn collect_all(mut self) -> Result<Vec<StoryId>, ApiError> {
        let mut ids = Vec::new();
        while let Some(page) = self.next_page().await? {
            ids.extend(page);
        }
        Ok(ids)
    }
}
