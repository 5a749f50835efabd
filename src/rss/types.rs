use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Duration;

use crate::classification::Classification;
use crate::db::NewArticle;

/// One feed entry in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchedArticle {
    pub title: String,
    /// Entry description with markup removed.
    pub content: String,
    pub link: String,
    pub image_url: Option<String>,
    pub source_feed: String,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl FetchedArticle {
    pub fn to_new_article(&self, classification: Classification) -> NewArticle {
        NewArticle {
            title: self.title.clone(),
            content: self.content.clone(),
            link: self.link.clone(),
            classification,
            image_url: self.image_url.clone(),
            source_feed: self.source_feed.clone(),
            source: self.source.clone(),
            published_at: self.published_at,
        }
    }
}

// Constants
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const RETRY_DELAY: Duration = Duration::from_secs(5);
pub const MAX_RETRIES: usize = 3;
