use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Like {
    pub id: i64,
    pub post: i64,
    pub user: i64,
    pub is_liked: bool,
}

/// Outcome of toggling the like for a (post, user) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeToggle {
    Liked,
    Unliked,
}
