use axum::{
    extract::State,
    http::Method,
    Extension,
};
use serde::Deserialize;

use crate::database::models::Comment;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, Requester};
use crate::permissions::check_object_permission;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateComment {
    pub post: Option<i64>,
    pub content: Option<String>,
}

/// Only `content` is writable after creation
#[derive(Debug, Deserialize)]
pub struct UpdateComment {
    pub content: Option<String>,
}

fn required_content(content: Option<String>) -> Result<String, ApiError> {
    match content {
        None => Err(ApiError::field_error("content", "This field is required.")),
        Some(c) if c.trim().is_empty() => Err(ApiError::field_error("content", "This field may not be blank.")),
        Some(c) => Ok(c),
    }
}

async fn load_for(state: &AppState, requester: &Requester, id: i64, method: &Method) -> Result<Comment, ApiError> {
    let comment = state
        .store
        .get_comment(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Comment {} not found", id)))?;
    check_object_permission(requester, &comment, method)?;
    Ok(comment)
}

/// GET /api/comments - the requester's own comments only
pub async fn list(State(state): State<AppState>, Extension(requester): Extension<Requester>) -> ApiResult<Vec<Comment>> {
    let comments = match requester.user_id() {
        Some(user_id) => state.store.list_comments_by_user(user_id).await?,
        None => Vec::new(),
    };
    Ok(ApiResponse::Success(comments))
}

/// POST /api/comments
pub async fn create(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiJson(payload): ApiJson<CreateComment>,
) -> ApiResult<Comment> {
    let user = requester.require_user()?;
    let post = payload
        .post
        .ok_or_else(|| ApiError::field_error("post", "This field is required."))?;
    let content = required_content(payload.content)?;

    let comment = state.store.create_comment(post, user.user_id, content).await?;
    tracing::info!(comment_id = comment.id, post_id = post, "comment created");
    Ok(ApiResponse::Created(comment))
}

/// GET /api/comments/:id - same scope as the listing, so another user's
/// comment reads as missing
pub async fn retrieve(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Comment> {
    match state.store.get_comment(id).await? {
        Some(comment) if requester.user_id() == Some(comment.user) => Ok(ApiResponse::Success(comment)),
        _ => Err(ApiError::not_found(format!("Comment {} not found", id))),
    }
}

/// PUT /api/comments/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    method: Method,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UpdateComment>,
) -> ApiResult<Comment> {
    load_for(&state, &requester, id, &method).await?;
    let content = required_content(payload.content)?;
    apply(&state, id, content).await
}

/// PATCH /api/comments/:id
pub async fn partial_update(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    method: Method,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UpdateComment>,
) -> ApiResult<Comment> {
    let current = load_for(&state, &requester, id, &method).await?;
    match payload.content {
        None => Ok(ApiResponse::Success(current)),
        content => apply(&state, id, required_content(content)?).await,
    }
}

async fn apply(state: &AppState, id: i64, content: String) -> ApiResult<Comment> {
    let comment = state
        .store
        .update_comment(id, content)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Comment {} not found", id)))?;
    Ok(ApiResponse::Success(comment))
}

/// DELETE /api/comments/:id
pub async fn destroy(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    method: Method,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    load_for(&state, &requester, id, &method).await?;
    state.store.delete_comment(id).await?;
    tracing::info!(comment_id = id, "comment deleted");
    Ok(ApiResponse::NoContent)
}
