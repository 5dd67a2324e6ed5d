use axum::{
    extract::{Multipart, State},
    http::{Method, StatusCode},
    Extension,
};
use serde::Deserialize;

use crate::database::models::{LikeToggle, NewPost, Post, PostChanges};
use crate::error::ApiError;
use crate::media::{validate_image, MediaError};
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, Requester};
use crate::permissions::check_object_permission;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PostListQuery {
    /// Comma separated hashtag ids, e.g. `?hashtags=1,2,3`
    pub hashtags: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PostPayload {
    pub content: Option<String>,
    pub hashtags: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
pub struct CommentPayload {
    pub content: Option<String>,
}

/// Parse the `hashtags` list filter. An empty value means "no filter";
/// a single non-integer token rejects the whole request.
pub fn parse_hashtag_ids(raw: &str) -> Result<Option<Vec<i64>>, ApiError> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.split(',')
        .map(|token| {
            token
                .trim()
                .parse::<i64>()
                .map_err(|_| ApiError::bad_request(format!("Invalid hashtag id '{}'", token.trim())))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn required_content(content: Option<String>) -> Result<String, ApiError> {
    match content {
        None => Err(ApiError::field_error("content", "This field is required.")),
        Some(c) if c.trim().is_empty() => Err(ApiError::field_error("content", "This field may not be blank.")),
        Some(c) => Ok(c),
    }
}

async fn load(state: &AppState, id: i64) -> Result<Post, ApiError> {
    state
        .store
        .get_post(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Post {} not found", id)))
}

/// Load the post and run the author check for the current method
async fn load_for(state: &AppState, requester: &Requester, id: i64, method: &Method) -> Result<Post, ApiError> {
    let post = load(state, id).await?;
    check_object_permission(requester, &post, method)?;
    Ok(post)
}

/// GET /api/posts
pub async fn list(State(state): State<AppState>, ApiQuery(query): ApiQuery<PostListQuery>) -> ApiResult<Vec<Post>> {
    let filter = match query.hashtags.as_deref() {
        Some(raw) => parse_hashtag_ids(raw)?,
        None => None,
    };
    let posts = state.store.list_posts(filter.as_deref()).await?;
    Ok(ApiResponse::Success(posts))
}

/// POST /api/posts
pub async fn create(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiJson(payload): ApiJson<PostPayload>,
) -> ApiResult<Post> {
    let user = requester.require_user()?;
    let content = required_content(payload.content)?;

    let post = state
        .store
        .create_post(NewPost {
            user: user.user_id,
            content,
            hashtags: payload.hashtags.unwrap_or_default(),
        })
        .await?;

    tracing::info!(post_id = post.id, user_id = user.user_id, "post created");
    Ok(ApiResponse::Created(post))
}

/// GET /api/posts/:id
pub async fn retrieve(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Post> {
    Ok(ApiResponse::Success(load(&state, id).await?))
}

/// PUT /api/posts/:id - replaces content and the hashtag set
pub async fn update(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    method: Method,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<PostPayload>,
) -> ApiResult<Post> {
    load_for(&state, &requester, id, &method).await?;
    let changes = PostChanges {
        content: Some(required_content(payload.content)?),
        hashtags: Some(payload.hashtags.unwrap_or_default()),
    };
    apply(&state, id, changes).await
}

/// PATCH /api/posts/:id
pub async fn partial_update(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    method: Method,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<PostPayload>,
) -> ApiResult<Post> {
    load_for(&state, &requester, id, &method).await?;
    let content = match payload.content {
        Some(c) => Some(required_content(Some(c))?),
        None => None,
    };
    let changes = PostChanges {
        content,
        hashtags: payload.hashtags,
    };
    apply(&state, id, changes).await
}

async fn apply(state: &AppState, id: i64, changes: PostChanges) -> ApiResult<Post> {
    let post = state
        .store
        .update_post(id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Post {} not found", id)))?;
    tracing::debug!(post_id = id, "post updated");
    Ok(ApiResponse::Success(post))
}

/// DELETE /api/posts/:id - comments and likes go with it
pub async fn destroy(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    method: Method,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    load_for(&state, &requester, id, &method).await?;
    state.store.delete_post(id).await?;
    tracing::info!(post_id = id, "post deleted");
    Ok(ApiResponse::NoContent)
}

/// POST /api/posts/:id/upload-image
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    method: Method,
    ApiPath(id): ApiPath<i64>,
    mut multipart: Multipart,
) -> ApiResult<Post> {
    load_for(&state, &requester, id, &method).await?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() == Some("image") {
            let bytes = field.bytes().await.map_err(|e| ApiError::bad_request(e.body_text()))?;
            upload = Some(bytes);
            break;
        }
    }

    let data = upload.ok_or(MediaError::Missing)?;
    let image = validate_image(&data)?;
    let url = state.media.save_image(&data, &image).await?;

    let post = state
        .store
        .set_post_image(id, url)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Post {} not found", id)))?;

    tracing::info!(post_id = id, width = image.width, height = image.height, "post image uploaded");
    Ok(ApiResponse::Success(post))
}

/// POST /api/posts/:id/like - toggles the requester's like
pub async fn like(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let user = requester.require_user()?;
    load(&state, id).await?;

    let outcome = state.store.toggle_like(id, user.user_id).await?;
    match outcome {
        LikeToggle::Liked => tracing::debug!(post_id = id, user_id = user.user_id, "post liked"),
        LikeToggle::Unliked => tracing::debug!(post_id = id, user_id = user.user_id, "post unliked"),
    }
    Ok(StatusCode::OK)
}

/// POST /api/posts/:id/add_comment
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<CommentPayload>,
) -> Result<StatusCode, ApiError> {
    let user = requester.require_user()?;
    load(&state, id).await?;

    let content = payload
        .content
        .ok_or_else(|| ApiError::field_error("content", "This field is required."))?;
    let comment = state.store.create_comment(id, user.user_id, content).await?;

    tracing::debug!(post_id = id, comment_id = comment.id, "comment added");
    Ok(StatusCode::OK)
}
