use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ApiError;
use super::StoryparkApi;
use crate::retry::{self, RetryConfig};
use crate::types::StoryId;

/// One file attached to a story, available at two quality tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub file_name: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub original_url: String,
    /// Lower-quality rendition, used when the original is refused.
    #[serde(default)]
    pub resized_url: String,
}

/// A fully fetched story.
///
/// The typed fields are what the mirror needs to lay files out; `record` is
/// the untouched `activity` object, which is what gets written to disk.
#[derive(Debug, Clone)]
pub struct Story {
    id: StoryId,
    title: String,
    created_at: String,
    media: Vec<MediaItem>,
    record: Value,
}

impl Story {
    /// Build a story from the `activity` object of the detail endpoint.
    ///
    /// `requested` is used when the record itself carries no usable id.
    pub fn from_record(url: &str, requested: &StoryId, record: Value) -> Result<Self, ApiError> {
        if !record.is_object() {
            return Err(ApiError::malformed(url, "`activity` is not an object"));
        }

        let id = StoryId::from_json(&record["id"]).unwrap_or_else(|| requested.clone());

        let created_at = match record["created_at"].as_str() {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => return Err(ApiError::malformed(url, "story has no `created_at`")),
        };

        let title = record["title"].as_str().unwrap_or_default().to_string();

        let media = match &record["media"] {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| {
                    match serde_json::from_value::<MediaItem>(item.clone()) {
                        Ok(media) => Some(media),
                        Err(e) => {
                            tracing::warn!(story_id = %id, index, error = %e, "Ignoring unreadable media entry");
                            None
                        }
                    }
                })
                .collect(),
            Value::Null => Vec::new(),
            _ => return Err(ApiError::malformed(url, "story `media` is not an array")),
        };

        Ok(Self {
            id,
            title,
            created_at,
            media,
            record,
        })
    }

    pub fn id(&self) -> &StoryId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    pub fn media(&self) -> &[MediaItem] {
        &self.media
    }

    /// The story exactly as the server sent it.
    pub fn record(&self) -> &Value {
        &self.record
    }
}

/// Parse the body of `GET /api/v3/activity/{id}`, unwrapping the `activity` envelope.
pub fn parse_activity(url: &str, requested: &StoryId, body: &str) -> Result<Story, ApiError> {
    let mut envelope: Value = serde_json::from_str(body)
        .map_err(|e| ApiError::malformed(url, format!("invalid JSON: {e}")))?;

    let record = match envelope.get_mut("activity").map(Value::take) {
        Some(record) if !record.is_null() => record,
        _ => return Err(ApiError::malformed(url, "missing `activity` field")),
    };

    Story::from_record(url, requested, record)
}

/// Fetch one story, retrying transient failures.
pub async fn fetch_story(
    api: &dyn StoryparkApi,
    story_id: &StoryId,
    retry_config: &RetryConfig,
) -> Result<Story, ApiError> {
    retry::retry_transient(retry_config, || api.get_story(story_id)).await
}
