//! Storypark client. Signs in through the Rails web form, then reads the
//! JSON API with the resulting session cookies.

pub mod catalog;
pub mod endpoints;
pub mod error;
pub mod session;
pub mod story;
pub mod token;

pub use catalog::{CatalogWalker, StoryPage};
pub use error::ApiError;
pub use session::{Session, StoryparkClient};
pub use story::{MediaItem, Story};

use crate::types::{ChildId, PageToken, StoryId};

/// The read side of the API that the sync pipeline depends on.
/// The concrete implementation is [`Session`].
#[async_trait::async_trait]
pub trait StoryparkApi: Send + Sync {
    /// Fetch one page of a child's stories. `None` requests the first page.
    async fn list_stories(
        &self,
        child_id: &ChildId,
        page_token: Option<&PageToken>,
    ) -> Result<StoryPage, ApiError>;

    async fn get_story(&self, story_id: &StoryId) -> Result<Story, ApiError>;
}
