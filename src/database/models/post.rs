use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A post as served to clients. `hashtags` holds hashtag ids in ascending order.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: i64,
    pub user: i64,
    pub content: String,
    pub image: Option<String>,
    pub hashtags: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// True when the post carries at least one of the given hashtag ids
    pub fn tagged_with_any(&self, ids: &[i64]) -> bool {
        self.hashtags.iter().any(|id| ids.contains(id))
    }
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub user: i64,
    pub content: String,
    pub hashtags: Vec<i64>,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub content: Option<String>,
    pub hashtags: Option<Vec<i64>>,
}
