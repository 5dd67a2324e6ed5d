use axum::{
    extract::State,
    http::Method,
    Extension,
};
use serde::Deserialize;

use crate::database::models::Like;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, Requester};
use crate::permissions::check_object_permission;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateLike {
    pub post: Option<i64>,
    pub is_liked: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLike {
    pub is_liked: Option<bool>,
}

async fn load_for(state: &AppState, requester: &Requester, id: i64, method: &Method) -> Result<Like, ApiError> {
    let like = state
        .store
        .get_like(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Like {} not found", id)))?;
    check_object_permission(requester, &like, method)?;
    Ok(like)
}

/// GET /api/likes
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Like>> {
    Ok(ApiResponse::Success(state.store.list_likes().await?))
}

/// POST /api/likes
pub async fn create(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiJson(payload): ApiJson<CreateLike>,
) -> ApiResult<Like> {
    let user = requester.require_user()?;
    let post = payload
        .post
        .ok_or_else(|| ApiError::field_error("post", "This field is required."))?;

    if state.store.find_like(post, user.user_id).await?.is_some() {
        return Err(ApiError::validation_error(
            "The fields post, user must make a unique set.",
            None,
        ));
    }

    let like = state
        .store
        .create_like(post, user.user_id, payload.is_liked.unwrap_or(true))
        .await?;
    tracing::info!(like_id = like.id, post_id = post, "like created");
    Ok(ApiResponse::Created(like))
}

/// GET /api/likes/:id
pub async fn retrieve(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    method: Method,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Like> {
    Ok(ApiResponse::Success(load_for(&state, &requester, id, &method).await?))
}

/// PUT /api/likes/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    method: Method,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UpdateLike>,
) -> ApiResult<Like> {
    load_for(&state, &requester, id, &method).await?;
    let is_liked = payload
        .is_liked
        .ok_or_else(|| ApiError::field_error("is_liked", "This field is required."))?;
    apply(&state, id, is_liked).await
}

/// PATCH /api/likes/:id
pub async fn partial_update(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    method: Method,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UpdateLike>,
) -> ApiResult<Like> {
    let current = load_for(&state, &requester, id, &method).await?;
    match payload.is_liked {
        Some(is_liked) => apply(&state, id, is_liked).await,
        None => Ok(ApiResponse::Success(current)),
    }
}

async fn apply(state: &AppState, id: i64, is_liked: bool) -> ApiResult<Like> {
    let like = state
        .store
        .update_like(id, is_liked)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Like {} not found", id)))?;
    Ok(ApiResponse::Success(like))
}

/// DELETE /api/likes/:id
pub async fn destroy(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    method: Method,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    load_for(&state, &requester, id, &method).await?;
    state.store.delete_like(id).await?;
    tracing::info!(like_id = id, "like deleted");
    Ok(ApiResponse::NoContent)
}
