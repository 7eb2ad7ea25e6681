//! URLs of the Storypark endpoints this tool talks to, rooted at a
//! configurable origin so tests and staging hosts can stand in for production.

use crate::types::{ChildId, StoryId};

pub const DEFAULT_BASE_URL: &str = "https://app.storypark.com";

#[derive(Debug, Clone)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn sign_in(&self) -> String {
        format!("{}/users/sign_in", self.base)
    }

    pub fn sign_out(&self) -> String {
        format!("{}/users/sign_out", self.base)
    }

    /// Story listing for a child. Query parameters are attached by the caller.
    pub fn stories(&self, child_id: &ChildId) -> String {
        format!("{}/api/v3/children/{}/stories", self.base, child_id)
    }

    pub fn activity(&self, story_id: &StoryId) -> String {
        format!("{}/api/v3/activity/{}", self.base, story_id)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
