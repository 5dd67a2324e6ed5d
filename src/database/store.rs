//! Persistence contract shared by the Postgres and in-memory backends.

use async_trait::async_trait;
use thiserror::Error;

use crate::database::models::{
    Comment, Hashtag, Like, LikeToggle, NewPost, NewProfile, NewUser, Post, PostChanges, Profile,
    ProfileChanges, User,
};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced row (post, hashtag, profile, user) does not exist
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// A uniqueness rule would be broken
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Filter, create, update and delete over the five social entities.
///
/// Lookups return `Ok(None)` / `Ok(false)` for missing rows; handlers decide
/// whether that is a 404.
#[async_trait]
pub trait SocialStore: Send + Sync {
    async fn health_check(&self) -> StoreResult<()>;

    // Users
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    // Hashtags
    async fn list_hashtags(&self) -> StoreResult<Vec<Hashtag>>;
    async fn get_hashtag(&self, id: i64) -> StoreResult<Option<Hashtag>>;
    async fn create_hashtag(&self, name: String) -> StoreResult<Hashtag>;
    async fn update_hashtag(&self, id: i64, name: String) -> StoreResult<Option<Hashtag>>;
    async fn delete_hashtag(&self, id: i64) -> StoreResult<bool>;

    // Posts
    /// Distinct posts ordered by id. With `Some(ids)` only posts tagged with
    /// at least one of the ids are returned.
    async fn list_posts(&self, hashtags: Option<&[i64]>) -> StoreResult<Vec<Post>>;
    async fn get_post(&self, id: i64) -> StoreResult<Option<Post>>;
    async fn create_post(&self, post: NewPost) -> StoreResult<Post>;
    async fn update_post(&self, id: i64, changes: PostChanges) -> StoreResult<Option<Post>>;
    async fn set_post_image(&self, id: i64, image: String) -> StoreResult<Option<Post>>;
    /// Removes the post together with its comments and likes
    async fn delete_post(&self, id: i64) -> StoreResult<bool>;

    // Profiles
    async fn list_profiles(&self, search: &[String]) -> StoreResult<Vec<Profile>>;
    async fn get_profile(&self, id: i64) -> StoreResult<Option<Profile>>;
    async fn get_profile_by_user(&self, user_id: i64) -> StoreResult<Option<Profile>>;
    /// Returns the user's profile and whether it was created by this call.
    /// An existing profile is returned untouched.
    async fn get_or_create_profile(&self, user_id: i64, profile: NewProfile) -> StoreResult<(Profile, bool)>;
    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> StoreResult<Option<Profile>>;
    /// Returns false when the target was already followed
    async fn add_follow(&self, profile_id: i64, target_id: i64) -> StoreResult<bool>;
    /// Returns false when the target was not followed
    async fn remove_follow(&self, profile_id: i64, target_id: i64) -> StoreResult<bool>;

    // Comments
    async fn list_comments_by_user(&self, user_id: i64) -> StoreResult<Vec<Comment>>;
    async fn get_comment(&self, id: i64) -> StoreResult<Option<Comment>>;
    async fn create_comment(&self, post_id: i64, user_id: i64, content: String) -> StoreResult<Comment>;
    async fn update_comment(&self, id: i64, content: String) -> StoreResult<Option<Comment>>;
    async fn delete_comment(&self, id: i64) -> StoreResult<bool>;

    // Likes
    async fn list_likes(&self) -> StoreResult<Vec<Like>>;
    async fn get_like(&self, id: i64) -> StoreResult<Option<Like>>;
    async fn find_like(&self, post_id: i64, user_id: i64) -> StoreResult<Option<Like>>;
    async fn create_like(&self, post_id: i64, user_id: i64, is_liked: bool) -> StoreResult<Like>;
    async fn update_like(&self, id: i64, is_liked: bool) -> StoreResult<Option<Like>>;
    async fn delete_like(&self, id: i64) -> StoreResult<bool>;
    /// Deletes the (post, user) like if present, otherwise creates one with `is_liked = true`
    async fn toggle_like(&self, post_id: i64, user_id: i64) -> StoreResult<LikeToggle>;
}
